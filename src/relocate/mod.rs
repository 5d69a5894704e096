//! # Relocate
//!
//! Moves files and directories while keeping the declaration and the
//! derived artifacts consistent.
//!
//! | Step | Where |
//! |------|-------|
//! | validate the request, expand directories | [`plan_move`] |
//! | move the file, then update the declaration | [`execute`] |
//! | move rendered artifact, sidecar and media, keep timestamps | [`relocate_artifacts`] |
//!
//! The planning step changes nothing, so every validation error leaves
//! the project untouched.

mod execute;
mod plan;

use std::io;

use thiserror::Error;

use crate::domain::{ErrorKind, GraphError};

pub use execute::{execute, relocate_artifacts, MoveReport};
pub use plan::{plan_move, MovePair, MovePlan, PlannedMove};

#[derive(Error, Debug)]
pub enum MoveError {
    #[error("{0} does not exist")]
    SourceNotFound(String),

    #[error("cannot move several files to {0}: destination must be an existing directory")]
    MultipleToFile(String),

    #[error("wildcard characters are not allowed in {0}")]
    Wildcard(String),

    #[error("cannot move {0} into itself")]
    IntoItself(String),

    #[error("{0} already exists")]
    DestinationExists(String),

    #[error("{0} would be moved onto itself")]
    SameLocation(String),

    #[error("{file}: .{extension} is not a supported document extension")]
    UnsupportedExtension { file: String, extension: String },

    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl MoveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MoveError::SourceNotFound(_) => ErrorKind::NotFound,
            MoveError::MultipleToFile(_)
            | MoveError::Wildcard(_)
            | MoveError::IntoItself(_)
            | MoveError::SameLocation(_)
            | MoveError::UnsupportedExtension { .. } => ErrorKind::Invalid,
            MoveError::DestinationExists(_) => ErrorKind::Collision,
            MoveError::Io { .. } => ErrorKind::ExternalFailure,
            MoveError::Graph(e) => e.kind(),
        }
    }
}

//! scikick - keeps a report of data-analysis documents consistent
//!
//! Documents (R scripts, R Markdown files, notebooks) are declared with
//! their dependencies in `scikick.yml`. An external workflow engine
//! executes them into rendered markdown and presentation pages; this crate
//! answers what such a build would do, arranges the site's tabs and moves
//! files without losing build state.

pub mod cli;
pub mod domain;
pub mod edit;
pub mod relocate;
pub mod status;
pub mod storage;

pub use domain::{Artifacts, DocumentGraph, ErrorKind, Marker, Symbol};

//! Domain models for scikick
//!
//! Contains the document graph, artifact naming, status markers and the
//! layout algorithm, without any I/O concerns.

mod document;
mod error;
mod graph;
pub mod layout;
mod marker;
mod ordered;
pub mod paths;

pub use document::{
    is_index_name, is_supported, Artifacts, DependencyList, DocumentKind, INDEX_STEM, MEDIA_DIR,
    PRESENTATION_DIR, RENDERED_DIR, SIDECAR_SUFFIX, SUPPORTED_EXTENSIONS,
};
pub use error::ErrorKind;
pub use graph::{Dependency, DocumentGraph, GraphError, IndexDocument, ResolvedDocument};
pub use layout::{LayoutError, Tab};
pub use marker::{Marker, Symbol};
pub use ordered::OrderedMap;

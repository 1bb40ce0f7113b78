//! Whitelisted write projection of JSON input onto documents
//!
//! `project` walks a resource's editable field paths, writes the permitted
//! values onto a document and, through populated references, onto the
//! documents it points at. It never persists; the caller receives the set of
//! documents that now need saving.

pub mod engine;
pub mod error;
pub mod path;

pub use engine::{project, DirtyEntry, DirtySet, Projectable};
pub use error::ConfigurationError;
pub use path::{resolve, FieldPath};

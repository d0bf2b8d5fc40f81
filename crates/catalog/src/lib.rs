//! Menu catalog and search.
//!
//! The catalog is an in-process read-mostly cache warmed at startup
//! (and on background reindex) from the menu store. Search goes through
//! the vector backend first and falls back to lexical matching over the
//! cache.

pub mod catalog;
pub mod search;
pub mod vector;

pub use catalog::MenuCatalog;
pub use search::{MenuSearch, ScoredItem};
pub use vector::{InputType, PineconeBackend, VectorBackend, VectorMatch};

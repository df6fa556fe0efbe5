//! Media catalog: the read-only track library the session plays from.
//!
//! The catalog is built once at startup (usually by scanning a music
//! directory) and shared by reference. The session only ever resolves ids
//! through the `MediaCatalog` trait, which keeps it substitutable in tests.

mod model;
mod scan;

pub use model::*;
pub use scan::scan;

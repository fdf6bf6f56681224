pub mod document;
pub mod parser;
pub mod splicer;

pub use document::PlaylistDocument;
pub use splicer::{AdSplicer, SpliceReport};

pub mod generator;

pub use generator::{AD_CHUNK_SECS, AdBreak, AdSegment, format_duration, generate};

#[cfg(test)]
pub(crate) use generator::test_support;

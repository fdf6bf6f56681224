use super::section::{self, SpliceCommand, SpliceInfoSection};
use crate::error::Result;

/// Returns `true` only when the cue's top-level command is a `splice_insert`.
///
/// Time signals, null commands and private/unknown commands never qualify.
pub fn is_splice_insert(cue: &SpliceInfoSection) -> bool {
    matches!(cue.splice_command, SpliceCommand::SpliceInsert(_))
}

/// Decodes the opaque cue payload carried on a playlist segment.
pub trait CueDecoder: Send + Sync {
    fn decode(&self, payload: &str) -> Result<SpliceInfoSection>;
}

/// Base64 SCTE-35 decoder used by default.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scte35Decoder;

impl CueDecoder for Scte35Decoder {
    fn decode(&self, payload: &str) -> Result<SpliceInfoSection> {
        section::decode_base64(payload)
    }
}

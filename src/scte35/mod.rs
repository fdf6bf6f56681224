//! SCTE-35 splice cue decoding and classification.
//!
//! Only the parts of `splice_info_section` needed to tell a `splice_insert`
//! apart from other commands are interpreted; descriptors and CRC are ignored.

pub mod cue;
pub mod section;

pub use cue::{CueDecoder, Scte35Decoder, is_splice_insert};
pub use section::{SpliceCommand, SpliceCommandType, SpliceInfoSection, decode_base64};

use crate::error::{LivehlsError, Result};
use base64::{Engine, engine::general_purpose::STANDARD};

/// SCTE-35 table ID
pub const SCTE35_TABLE_ID: u8 = 0xFC;

/// Bytes preceding the splice command body (table_id through splice_command_type).
const HEADER_LEN: usize = 14;

/// SCTE-35 splice command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceCommandType {
    SpliceNull,
    SpliceSchedule,
    SpliceInsert,
    TimeSignal,
    BandwidthReservation,
    PrivateCommand,
    Unknown(u8),
}

impl From<u8> for SpliceCommandType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => SpliceCommandType::SpliceNull,
            0x04 => SpliceCommandType::SpliceSchedule,
            0x05 => SpliceCommandType::SpliceInsert,
            0x06 => SpliceCommandType::TimeSignal,
            0x07 => SpliceCommandType::BandwidthReservation,
            0xFF => SpliceCommandType::PrivateCommand,
            v => SpliceCommandType::Unknown(v),
        }
    }
}

/// Parsed splice command
#[derive(Debug, Clone, PartialEq)]
pub enum SpliceCommand {
    SpliceNull,
    SpliceInsert(SpliceInsert),
    TimeSignal(TimeSignal),
    /// Any command this decoder does not interpret, kept as raw bytes.
    Other(Vec<u8>),
}

/// SCTE-35 splice_insert command
#[derive(Debug, Clone, PartialEq)]
pub struct SpliceInsert {
    pub splice_event_id: u32,
    pub splice_event_cancel_indicator: bool,
    pub out_of_network_indicator: bool,
    pub program_splice_flag: bool,
    pub splice_immediate_flag: bool,
    /// PTS in 90kHz ticks when `time_specified_flag` is set
    pub splice_time: Option<u64>,
    pub break_duration: Option<BreakDuration>,
    pub unique_program_id: u16,
    pub avail_num: u8,
    pub avails_expected: u8,
}

/// break_duration() of a splice_insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakDuration {
    pub auto_return: bool,
    /// Duration in 90kHz ticks (33-bit)
    pub duration: u64,
}

impl BreakDuration {
    /// Duration in seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.duration as f64 / 90_000.0
    }
}

/// SCTE-35 time_signal command
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSignal {
    pub splice_time: Option<u64>,
}

/// Top-level SCTE-35 splice_info_section.
#[derive(Debug, Clone, PartialEq)]
pub struct SpliceInfoSection {
    pub table_id: u8,
    pub section_length: u16,
    pub protocol_version: u8,
    pub encrypted_packet: bool,
    pub pts_adjustment: u64,
    pub tier: u16,
    pub splice_command_type: SpliceCommandType,
    pub splice_command: SpliceCommand,
}

/// Decode a base64 cue payload as carried in HLS `#EXT-X-SCTE35` style tags.
///
/// Leading/trailing whitespace and a single pair of surrounding double quotes
/// are tolerated.
pub fn decode_base64(encoded: &str) -> Result<SpliceInfoSection> {
    let trimmed = encoded.trim();
    let trimmed = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);

    let bytes = STANDARD
        .decode(trimmed)
        .map_err(|e| LivehlsError::CueDecode(format!("invalid base64: {}", e)))?;

    SpliceInfoSection::parse(&bytes)
}

/// Parse a splice_time() structure. Returns (time_value, bytes_consumed).
fn parse_splice_time(data: &[u8]) -> (Option<u64>, usize) {
    if data.is_empty() {
        return (None, 0);
    }
    let time_specified_flag = (data[0] & 0x80) != 0;
    if time_specified_flag {
        if data.len() < 5 {
            return (None, data.len());
        }
        (Some(read_33_bits(&data[..5])), 5)
    } else {
        (None, 1)
    }
}

/// Parse a break_duration() structure
fn parse_break_duration(data: &[u8]) -> Option<BreakDuration> {
    if data.len() < 5 {
        return None;
    }
    Some(BreakDuration {
        auto_return: (data[0] & 0x80) != 0,
        duration: read_33_bits(&data[..5]),
    })
}

/// Read a 33-bit value whose top bit is the LSB of `data[0]`.
fn read_33_bits(data: &[u8]) -> u64 {
    (((data[0] as u64) & 0x01) << 32)
        | ((data[1] as u64) << 24)
        | ((data[2] as u64) << 16)
        | ((data[3] as u64) << 8)
        | (data[4] as u64)
}

impl SpliceInfoSection {
    /// Parse a splice_info_section from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(LivehlsError::CueDecode(format!(
                "splice_info_section too short: {} bytes, need at least {}",
                data.len(),
                HEADER_LEN
            )));
        }

        let table_id = data[0];
        if table_id != SCTE35_TABLE_ID {
            return Err(LivehlsError::CueDecode(format!(
                "unexpected table_id 0x{:02X}, expected 0x{:02X}",
                table_id, SCTE35_TABLE_ID
            )));
        }

        let section_length = ((data[1] as u16 & 0x0F) << 8) | data[2] as u16;
        let protocol_version = data[3];
        let encrypted_packet = (data[4] & 0x80) != 0;

        // pts_adjustment: low bit of byte 4 plus bytes 5..9
        let pts_adjustment = read_33_bits(&data[4..9]);

        // byte 9 is cw_index; tier is 12 bits over bytes 10-11
        let tier = ((data[10] as u16) << 4) | ((data[11] as u16) >> 4);
        let splice_command_length = ((data[11] as u16 & 0x0F) << 8) | data[12] as u16;
        let splice_command_type = SpliceCommandType::from(data[13]);

        let cmd_end = if splice_command_length == 0xFFF {
            // Legacy "unknown length": command runs up to the CRC
            data.len().saturating_sub(4)
        } else {
            (HEADER_LEN + splice_command_length as usize).min(data.len())
        };

        let cmd_data = if HEADER_LEN < cmd_end {
            &data[HEADER_LEN..cmd_end]
        } else {
            &[]
        };

        let splice_command = match splice_command_type {
            SpliceCommandType::SpliceNull => SpliceCommand::SpliceNull,
            SpliceCommandType::SpliceInsert => {
                SpliceCommand::SpliceInsert(Self::parse_splice_insert(cmd_data)?)
            }
            SpliceCommandType::TimeSignal => {
                let (splice_time, _) = parse_splice_time(cmd_data);
                SpliceCommand::TimeSignal(TimeSignal { splice_time })
            }
            _ => SpliceCommand::Other(cmd_data.to_vec()),
        };

        Ok(SpliceInfoSection {
            table_id,
            section_length,
            protocol_version,
            encrypted_packet,
            pts_adjustment,
            tier,
            splice_command_type,
            splice_command,
        })
    }

    fn parse_splice_insert(data: &[u8]) -> Result<SpliceInsert> {
        if data.len() < 5 {
            return Err(LivehlsError::CueDecode(
                "splice_insert too short".to_string(),
            ));
        }

        let splice_event_id = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let splice_event_cancel_indicator = (data[4] & 0x80) != 0;

        if splice_event_cancel_indicator {
            return Ok(SpliceInsert {
                splice_event_id,
                splice_event_cancel_indicator: true,
                out_of_network_indicator: false,
                program_splice_flag: false,
                splice_immediate_flag: false,
                splice_time: None,
                break_duration: None,
                unique_program_id: 0,
                avail_num: 0,
                avails_expected: 0,
            });
        }

        if data.len() < 6 {
            return Err(LivehlsError::CueDecode(
                "splice_insert missing flags".to_string(),
            ));
        }

        let flags = data[5];
        let out_of_network_indicator = (flags & 0x80) != 0;
        let program_splice_flag = (flags & 0x40) != 0;
        let duration_flag = (flags & 0x20) != 0;
        let splice_immediate_flag = (flags & 0x10) != 0;

        let mut offset = 6;
        let mut splice_time = None;

        if program_splice_flag && !splice_immediate_flag {
            let (time, consumed) = parse_splice_time(&data[offset..]);
            splice_time = time;
            offset += consumed;
        }

        if !program_splice_flag {
            // component loop: count, then (tag, optional splice_time) per component
            let count = data.get(offset).copied().unwrap_or(0) as usize;
            offset += 1;
            for _ in 0..count {
                offset += 1;
                if !splice_immediate_flag && offset < data.len() {
                    let (_, consumed) = parse_splice_time(&data[offset..]);
                    offset += consumed;
                }
            }
        }

        let break_duration = if duration_flag && offset + 5 <= data.len() {
            let bd = parse_break_duration(&data[offset..]);
            offset += 5;
            bd
        } else {
            None
        };

        let (unique_program_id, avail_num, avails_expected) = if offset + 4 <= data.len() {
            (
                u16::from_be_bytes([data[offset], data[offset + 1]]),
                data[offset + 2],
                data[offset + 3],
            )
        } else {
            (0, 0, 0)
        };

        Ok(SpliceInsert {
            splice_event_id,
            splice_event_cancel_indicator: false,
            out_of_network_indicator,
            program_splice_flag,
            splice_immediate_flag,
            splice_time,
            break_duration,
            unique_program_id,
            avail_num,
            avails_expected,
        })
    }
}

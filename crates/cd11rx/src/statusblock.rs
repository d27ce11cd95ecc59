//! CD-1.1 channel status block
//!
//! Every CD-1.1 channel subframe carries a channel status block.
//! When the first byte (the *format*) is `1`, the block has the
//! following layout. Flags are numbered from the least significant
//! bit.
//!
//! | Byte    | Bit | Meaning                                 |
//! |---------|-----|-----------------------------------------|
//! | 0       |     | format (`1`)                            |
//! | 1       | 0   | dead sensor channel                     |
//! | 1       | 1   | zeroed data                             |
//! | 1       | 2   | clipped                                 |
//! | 1       | 3   | calibration underway                    |
//! | 2       | 0   | equipment housing open                  |
//! | 2       | 1   | digitizing equipment open               |
//! | 2       | 2   | vault door opened                       |
//! | 2       | 3   | authentication seal broken              |
//! | 2       | 4   | equipment moved                         |
//! | 3       | 0   | clock differential too large            |
//! | 3       | 1   | GPS receiver off                        |
//! | 3       | 2   | GPS receiver unlocked                   |
//! | 3       | 3   | digitizer analog input shorted          |
//! | 3       | 4   | digitizer calibration loop back         |
//! | 4       | 0   | main power failure                      |
//! | 4       | 1   | backup power unstable                   |
//! | 28..32  |     | clock differential (µs, big-endian i32) |
//!
//! Bytes 5 through 27 hold time-of-last-lock and calibration
//! information which is not decoded here.

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Utc};
use log::warn;
use thiserror::Error;

use crate::health::{AnalogHealthType, BooleanHealthType, HealthObservation, HealthRecord};
use crate::waveform::{ChannelId, CreationInfo};

/// Length of a channel status block, in bytes
pub const STATUS_BLOCK_LEN: usize = 32;

/// Status block format which this crate decodes
pub const STATUS_FORMAT_CD11: u8 = 1;

/// Flags in the status block, in output order: (byte, bit, type)
const BOOLEAN_FLAGS: [(usize, u8, BooleanHealthType); 16] = [
    (1, 0, BooleanHealthType::DeadSensorChannel),
    (1, 1, BooleanHealthType::ZeroedData),
    (1, 2, BooleanHealthType::Clipped),
    (1, 3, BooleanHealthType::CalibrationUnderway),
    (2, 0, BooleanHealthType::EquipmentHousingOpen),
    (2, 1, BooleanHealthType::DigitizingEquipmentOpen),
    (2, 2, BooleanHealthType::VaultDoorOpened),
    (2, 3, BooleanHealthType::AuthenticationSealBroken),
    (2, 4, BooleanHealthType::EquipmentMoved),
    (3, 0, BooleanHealthType::ClockDifferentialTooLarge),
    (3, 1, BooleanHealthType::GpsReceiverOff),
    (3, 2, BooleanHealthType::GpsReceiverUnlocked),
    (3, 3, BooleanHealthType::DigitizerAnalogInputShorted),
    (3, 4, BooleanHealthType::DigitizerCalibrationLoopBack),
    (4, 0, BooleanHealthType::MainPowerFailure),
    (4, 1, BooleanHealthType::BackupPowerUnstable),
];

/// Byte offset of the clock differential
const CLOCK_DIFFERENTIAL_OFFSET: usize = 28;

/// Error decoding a channel status block
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum StatusBlockErr {
    /// The block is too short to decode
    #[error("channel status block has {0} bytes; at least 32 are required")]
    TooShort(usize),
}

/// A 32-byte channel status block
///
/// Borrowed from a subframe. Longer inputs are accepted; only the
/// first [`STATUS_BLOCK_LEN`] bytes are examined.
///
/// ```
/// use cd11rx::{BooleanHealthType, StatusBlock};
///
/// let mut raw = [0u8; 32];
/// raw[0] = 1;
/// raw[2] = 0b0000_0100;
/// raw[28..32].copy_from_slice(&2i32.to_be_bytes());
///
/// let block = StatusBlock::new(&raw).unwrap();
/// assert!(block.is_recognized());
/// assert!(block.flag(BooleanHealthType::VaultDoorOpened));
/// assert!(!block.flag(BooleanHealthType::Clipped));
/// assert_eq!(2, block.clock_differential_us());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusBlock<'a> {
    raw: &'a [u8],
}

impl<'a> StatusBlock<'a> {
    /// Wrap raw status bytes
    ///
    /// Fails if fewer than [`STATUS_BLOCK_LEN`] bytes are given.
    pub fn new(raw: &'a [u8]) -> Result<Self, StatusBlockErr> {
        if raw.len() < STATUS_BLOCK_LEN {
            return Err(StatusBlockErr::TooShort(raw.len()));
        }

        Ok(Self {
            raw: &raw[0..STATUS_BLOCK_LEN],
        })
    }

    /// Format byte
    pub fn format(&self) -> u8 {
        self.raw[0]
    }

    /// True if the format is one this crate can decode
    pub fn is_recognized(&self) -> bool {
        self.format() == STATUS_FORMAT_CD11
    }

    /// State of a boolean health flag
    pub fn flag(&self, kind: BooleanHealthType) -> bool {
        BOOLEAN_FLAGS
            .iter()
            .find(|(_, _, ty)| *ty == kind)
            .map(|&(byte, bit, _)| bit_is_set(self.raw[byte], bit))
            .unwrap_or(false)
    }

    /// Clock differential, in microseconds
    pub fn clock_differential_us(&self) -> i32 {
        BigEndian::read_i32(&self.raw[CLOCK_DIFFERENTIAL_OFFSET..STATUS_BLOCK_LEN])
    }

    /// Convert to health records
    ///
    /// Emits sixteen boolean records, in status-block order, then
    /// one analog record for the clock differential. All records
    /// apply to `channel_id` over `[start_time, end_time)`. If the
    /// format is not recognized, a warning is logged and no records
    /// are emitted.
    pub fn to_records(
        &self,
        channel_id: ChannelId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        creation_info: &CreationInfo,
    ) -> Vec<HealthRecord> {
        if !self.is_recognized() {
            warn!(
                "channel {}: unrecognized channel status format {}; no health records decoded",
                channel_id,
                self.format()
            );
            return Vec::new();
        }

        let mut out: Vec<HealthRecord> = BOOLEAN_FLAGS
            .iter()
            .map(|&(byte, bit, kind)| {
                HealthRecord::Boolean(HealthObservation {
                    channel_id,
                    kind,
                    value: bit_is_set(self.raw[byte], bit),
                    start_time,
                    end_time,
                    creation_info: creation_info.clone(),
                })
            })
            .collect();

        out.push(HealthRecord::Analog(HealthObservation {
            channel_id,
            kind: AnalogHealthType::ClockDifferentialInMicrosecondsOverThreshold,
            value: self.clock_differential_us() as f64,
            start_time,
            end_time,
            creation_info: creation_info.clone(),
        }));
        out
    }
}

/// Decode a raw channel status block into health records
///
/// See [`StatusBlock::to_records()`].
pub fn decode_status_block(
    raw: &[u8],
    channel_id: ChannelId,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    creation_info: &CreationInfo,
) -> Result<Vec<HealthRecord>, StatusBlockErr> {
    Ok(StatusBlock::new(raw)?.to_records(channel_id, start_time, end_time, creation_info))
}

#[inline]
fn bit_is_set(byte: u8, bit: u8) -> bool {
    (byte >> bit) & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};
    use strum::IntoEnumIterator;
    use uuid::Uuid;

    fn span() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        (start, start + Duration::seconds(10))
    }

    fn decode(raw: &[u8]) -> Result<Vec<HealthRecord>, StatusBlockErr> {
        let (start, end) = span();
        decode_status_block(
            raw,
            ChannelId::new(Uuid::nil()),
            start,
            end,
            &CreationInfo::new("test", start),
        )
    }

    #[test]
    fn test_table_is_complete() {
        for ty in BooleanHealthType::iter() {
            assert_eq!(
                1,
                BOOLEAN_FLAGS.iter().filter(|(_, _, t)| *t == ty).count(),
                "{}",
                ty
            );
        }
    }

    #[test]
    fn test_vault_door() {
        let mut raw = [0u8; 32];
        raw[0] = 1;
        raw[2] = 1 << 2;
        raw[28..32].copy_from_slice(&[0x00, 0x00, 0x00, 0x02]);

        let records = decode(&raw).unwrap();
        assert_eq!(17, records.len());

        for (rec, (_, _, kind)) in records.iter().zip(BOOLEAN_FLAGS.iter()) {
            assert_eq!(kind.as_str(), rec.type_str());
            assert_eq!(
                Some(*kind == BooleanHealthType::VaultDoorOpened),
                rec.as_bool()
            );
        }

        let analog = &records[16];
        assert_eq!(
            "CLOCK_DIFFERENTIAL_IN_MICROSECONDS_OVER_THRESHOLD",
            analog.type_str()
        );
        assert_eq!(Some(2.0), analog.as_f64());

        let (start, end) = span();
        for rec in &records {
            assert_eq!(start, rec.start_time());
            assert_eq!(end, rec.end_time());
            assert_eq!(ChannelId::new(Uuid::nil()), rec.channel_id());
        }
    }

    #[test]
    fn test_each_flag() {
        for (i, &(byte, bit, kind)) in BOOLEAN_FLAGS.iter().enumerate() {
            let mut raw = [0u8; 32];
            raw[0] = 1;
            raw[byte] = 1 << bit;

            let records = decode(&raw).unwrap();
            let set: Vec<usize> = records
                .iter()
                .enumerate()
                .filter(|(_, rec)| rec.as_bool() == Some(true))
                .map(|(j, _)| j)
                .collect();
            assert_eq!(vec![i], set, "{}", kind);
            assert!(StatusBlock::new(&raw).unwrap().flag(kind));
        }
    }

    #[test]
    fn test_unused_bits_ignored() {
        let mut raw = [0u8; 32];
        raw[0] = 1;
        raw[1] = 0xf0;
        raw[2] = 0xe0;
        raw[3] = 0xe0;
        raw[4] = 0xfc;
        raw[5..28].fill(0xff);

        let records = decode(&raw).unwrap();
        assert!(records.iter().all(|rec| rec.as_bool() != Some(true)));
        assert_eq!(Some(0.0), records[16].as_f64());
    }

    #[test]
    fn test_negative_clock_differential() {
        let mut raw = [0u8; 32];
        raw[0] = 1;
        raw[28..32].copy_from_slice(&(-1500i32).to_be_bytes());

        let records = decode(&raw).unwrap();
        assert_eq!(Some(-1500.0), records[16].as_f64());
    }

    #[test]
    fn test_unrecognized_format() {
        for format in [0u8, 2, 0xff] {
            let mut raw = [0xffu8; 32];
            raw[0] = format;
            assert_eq!(Ok(vec![]), decode(&raw));
        }
    }

    #[test]
    fn test_too_short() {
        assert_eq!(Err(StatusBlockErr::TooShort(0)), decode(&[]));
        assert_eq!(Err(StatusBlockErr::TooShort(31)), decode(&[1u8; 31]));

        // longer blocks are fine
        let mut raw = vec![0u8; 40];
        raw[0] = 1;
        assert_eq!(17, decode(&raw).unwrap().len());
    }
}

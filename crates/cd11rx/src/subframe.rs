//! Tokenized CD-1.1 data frames

use std::fmt;

use chrono::{DateTime, Utc};

/// Compression applied to a subframe's samples
///
/// Taken from the *transformation* byte of the channel
/// description. Canadian compression may be applied either
/// before or after the subframe is signed.
///
/// ```
/// use cd11rx::CompressionFormat;
///
/// assert_eq!(CompressionFormat::None, CompressionFormat::from(0));
/// assert_eq!(CompressionFormat::CanadianAfterSignature, CompressionFormat::from(2));
/// assert_eq!(CompressionFormat::Other(3), CompressionFormat::from(3));
/// assert!(CompressionFormat::from(1).is_canadian());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompressionFormat {
    /// Uncompressed samples
    None,

    /// Canadian compression, applied before signing
    CanadianBeforeSignature,

    /// Canadian compression, applied after signing
    CanadianAfterSignature,

    /// Some other transformation, by its wire value
    Other(u8),
}

impl CompressionFormat {
    /// Wire value of the transformation byte
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::CanadianBeforeSignature => 1,
            Self::CanadianAfterSignature => 2,
            Self::Other(val) => *val,
        }
    }

    /// True for either kind of Canadian compression
    pub fn is_canadian(&self) -> bool {
        matches!(
            self,
            Self::CanadianBeforeSignature | Self::CanadianAfterSignature
        )
    }
}

impl From<u8> for CompressionFormat {
    fn from(transformation: u8) -> Self {
        match transformation {
            0 => Self::None,
            1 => Self::CanadianBeforeSignature,
            2 => Self::CanadianAfterSignature,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::CanadianBeforeSignature => write!(f, "CANADIAN_BEFORE_SIGNATURE"),
            Self::CanadianAfterSignature => write!(f, "CANADIAN_AFTER_SIGNATURE"),
            Self::Other(val) => write!(f, "transformation {}", val),
        }
    }
}

/// One channel's worth of a CD-1.1 data frame
#[derive(Clone, Debug, PartialEq)]
pub struct Subframe {
    /// Station site name, like `ABC12`
    pub site_name: String,

    /// Channel name, like `BHZ`
    pub channel_name: String,

    /// Location code, possibly empty
    pub location_name: String,

    /// Number of samples in `channel_data`
    pub sample_count: usize,

    /// Samples per second
    pub sample_rate: f64,

    /// Time of the first sample
    pub start_time: DateTime<Utc>,

    /// End of the subframe's time span, exclusive
    pub end_time: DateTime<Utc>,

    /// Compression applied to `channel_data`
    pub compression_format: CompressionFormat,

    /// Declared sample data type, like `s4`
    pub data_type: String,

    /// Raw sample bytes
    pub channel_data: Vec<u8>,

    /// Raw channel status block
    pub channel_status: Vec<u8>,
}

/// A tokenized CD-1.1 data frame
#[derive(Clone, Debug, PartialEq)]
pub struct Cd11Frame {
    /// Station or system which created the frame
    pub creator: String,

    /// Intended recipient
    pub destination: String,

    /// Frame sequence number
    pub sequence_number: i64,

    /// Nominal start time of the frame
    pub nominal_time: DateTime<Utc>,

    /// Nominal length of the frame, in milliseconds
    pub frame_time_length_ms: i32,

    /// Per-channel subframes, in frame order
    pub subframes: Vec<Subframe>,
}

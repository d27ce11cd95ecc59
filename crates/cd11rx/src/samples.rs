//! Waveform sample decoding

use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use thiserror::Error;

/// Format name for Canadian-compressed samples
///
/// Canadian-compressed subframes are always decoded with this
/// format, whatever data type the subframe declares.
pub const CANADIAN_COMPRESSION: &str = "cc";

/// Converts raw sample bytes into sample values
pub trait WaveformDecoder {
    /// Decode `sample_count` samples of `format` from `data`
    ///
    /// Decoding begins `offset` bytes into `data`. The `format`
    /// is a CD-1.1 data type name like `s4`, or
    /// [`CANADIAN_COMPRESSION`].
    fn decode(
        &self,
        data: &[u8],
        format: &str,
        sample_count: usize,
        offset: usize,
    ) -> Result<Vec<f64>, SampleDecodeErr>;
}

/// Error decoding samples
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SampleDecodeErr {
    /// The sample format is not supported by this decoder
    #[error("unsupported sample format \"{0}\"")]
    UnsupportedFormat(String),

    /// There are not enough bytes for the requested samples
    #[error("need {needed} bytes of sample data but only {available} are present")]
    Truncated {
        /// Bytes required
        needed: usize,

        /// Bytes present after the offset
        available: usize,
    },
}

/// Uncompressed CD-1.1 sample types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::EnumString)]
enum SampleFormat {
    /// Big-endian 32-bit signed integer
    #[strum(serialize = "s4")]
    S4,

    /// Big-endian 24-bit signed integer
    #[strum(serialize = "s3")]
    S3,

    /// Big-endian 16-bit signed integer
    #[strum(serialize = "s2")]
    S2,

    /// Little-endian 32-bit signed integer
    #[strum(serialize = "i4")]
    I4,

    /// Little-endian 16-bit signed integer
    #[strum(serialize = "i2")]
    I2,

    /// Big-endian IEEE single-precision float
    #[strum(serialize = "t4")]
    T4,

    /// Big-endian IEEE double-precision float
    #[strum(serialize = "t8")]
    T8,
}

impl SampleFormat {
    /// Bytes per sample
    fn width(&self) -> usize {
        match self {
            Self::S4 | Self::I4 | Self::T4 => 4,
            Self::S3 => 3,
            Self::S2 | Self::I2 => 2,
            Self::T8 => 8,
        }
    }

    /// Convert one sample of exactly `width()` bytes
    fn read(&self, buf: &[u8]) -> f64 {
        match self {
            Self::S4 => BigEndian::read_i32(buf) as f64,
            Self::S3 => BigEndian::read_i24(buf) as f64,
            Self::S2 => BigEndian::read_i16(buf) as f64,
            Self::I4 => LittleEndian::read_i32(buf) as f64,
            Self::I2 => LittleEndian::read_i16(buf) as f64,
            Self::T4 => BigEndian::read_f32(buf) as f64,
            Self::T8 => BigEndian::read_f64(buf),
        }
    }
}

/// Decoder for uncompressed CD-1.1 samples
///
/// Supports the data types `s4`, `s3`, `s2`, `i4`, `i2`, `t4`,
/// and `t8`. Canadian-compressed data is not supported; wrap
/// or replace this decoder if your stations send it.
///
/// ```
/// use cd11rx::{RawSampleDecoder, SampleDecodeErr, WaveformDecoder};
///
/// let data = [0x00, 0x01, 0xff, 0xfe];
/// assert_eq!(vec![1.0, -2.0], RawSampleDecoder.decode(&data, "s2", 2, 0).unwrap());
/// assert!(matches!(
///     RawSampleDecoder.decode(&data, "cc", 2, 0),
///     Err(SampleDecodeErr::UnsupportedFormat(_))
/// ));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawSampleDecoder;

impl WaveformDecoder for RawSampleDecoder {
    fn decode(
        &self,
        data: &[u8],
        format: &str,
        sample_count: usize,
        offset: usize,
    ) -> Result<Vec<f64>, SampleDecodeErr> {
        let fmt = SampleFormat::from_str(format)
            .map_err(|_| SampleDecodeErr::UnsupportedFormat(format.to_owned()))?;

        let tail = data.get(offset..).unwrap_or(&[]);
        let needed = sample_count.saturating_mul(fmt.width());
        if needed > tail.len() {
            return Err(SampleDecodeErr::Truncated {
                needed,
                available: tail.len(),
            });
        }

        Ok(tail[..needed]
            .chunks_exact(fmt.width())
            .map(|sa| fmt.read(sa))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_integer_formats() {
        let data = [0x00, 0x00, 0x01, 0x00, 0xff, 0xff, 0xff, 0x9c];
        assert_eq!(
            vec![256.0, -100.0],
            RawSampleDecoder.decode(&data, "s4", 2, 0).unwrap()
        );
        assert_eq!(
            vec![0.0, 256.0, -1.0, -100.0],
            RawSampleDecoder.decode(&data, "s2", 4, 0).unwrap()
        );
        assert_eq!(
            vec![65536.0],
            RawSampleDecoder.decode(&data, "i4", 1, 0).unwrap()
        );
        assert_eq!(
            vec![1.0, -1.0],
            RawSampleDecoder.decode(&data, "i2", 2, 2).unwrap()
        );
        assert_eq!(
            vec![1.0, -1.0],
            RawSampleDecoder.decode(&[0, 0, 1, 0xff, 0xff, 0xff], "s3", 2, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_float_formats() {
        let mut data = Vec::new();
        data.extend_from_slice(&1.5f32.to_be_bytes());
        data.extend_from_slice(&(-0.25f32).to_be_bytes());
        let out = RawSampleDecoder.decode(&data, "t4", 2, 0).unwrap();
        assert_approx_eq!(1.5, out[0]);
        assert_approx_eq!(-0.25, out[1]);

        let data = 1.0e-9f64.to_be_bytes();
        let out = RawSampleDecoder.decode(&data, "t8", 1, 0).unwrap();
        assert_approx_eq!(1.0e-9, out[0], 1.0e-15);
    }

    #[test]
    fn test_offset_and_count() {
        let data = [9, 9, 0, 1, 0, 2, 0, 3];
        assert_eq!(
            vec![1.0, 2.0],
            RawSampleDecoder.decode(&data, "s2", 2, 2).unwrap()
        );
        assert!(RawSampleDecoder
            .decode(&data, "s2", 0, 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_errors() {
        let data = [0u8; 6];
        assert_eq!(
            Err(SampleDecodeErr::Truncated {
                needed: 8,
                available: 6
            }),
            RawSampleDecoder.decode(&data, "s4", 2, 0)
        );
        assert_eq!(
            Err(SampleDecodeErr::Truncated {
                needed: 4,
                available: 0
            }),
            RawSampleDecoder.decode(&data, "s4", 1, 10)
        );
        assert_eq!(
            Err(SampleDecodeErr::UnsupportedFormat("cc".to_owned())),
            RawSampleDecoder.decode(&data, CANADIAN_COMPRESSION, 1, 0)
        );
        assert_eq!(
            Err(SampleDecodeErr::UnsupportedFormat("S4".to_owned())),
            RawSampleDecoder.decode(&data, "S4", 1, 0)
        );
    }
}

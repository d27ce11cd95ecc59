//! CD-1.1 data frame tokenizer
//!
//! Splits the bytes of a CD-1.1 data frame into its channel
//! subframes. All integers on the wire are big-endian. Variable
//! length fields are zero-padded to a multiple of four bytes.
//!
//! ```txt
//! +------------------+  frame type, trailer offset, creator,
//! |  frame header    |  destination, sequence number, series
//! +------------------+
//! |  channel subframe|  channel count, frame time length,
//! |  header          |  nominal time, channel string
//! +------------------+
//! |  subframe 1      |  length, description, time stamp,
//! |  ...             |  samples, status, data, authentication
//! |  subframe N      |
//! +------------------+
//! |  frame trailer   |  (not read)
//! +------------------+
//! ```

use std::io::{self, Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

use crate::subframe::{Cd11Frame, CompressionFormat, Subframe};

/// Frame type of a CD-1.1 data frame
pub(crate) const FRAME_TYPE_DATA: i32 = 5;

/// Length of CD-1.1 time stamps, in bytes
const TIME_STAMP_LEN: usize = 20;

/// Format of CD-1.1 time stamps: `yyyyddd hh:mm:ss.mmm`
const TIME_STAMP_FORMAT: &str = "%Y%j %H:%M:%S%.3f";

/// Converts a frame payload into subframes
///
/// The tokenizer owns the byte layout of a protocol frame. It knows
/// nothing about channel identities or sample encodings.
pub trait FrameTokenizer {
    /// Tokenize one complete frame
    fn tokenize(&self, payload: &[u8]) -> Result<Cd11Frame, TokenizeErr>;
}

/// Error tokenizing a CD-1.1 frame
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum TokenizeErr {
    /// The frame ended before a field could be read
    #[error("CD-1.1 frame is truncated")]
    Truncated,

    /// The frame is not a data frame
    #[error("CD-1.1 frame type {0} is not a data frame")]
    NotDataFrame(i32),

    /// A length or count field is negative
    #[error("CD-1.1 field \"{field}\" has invalid length {value}")]
    InvalidLength {
        /// Name of the field
        field: &'static str,

        /// Value on the wire
        value: i32,
    },

    /// A time stamp could not be parsed
    #[error("CD-1.1 time stamp \"{0}\" is not valid")]
    InvalidTimeStamp(String),
}

impl From<io::Error> for TokenizeErr {
    fn from(_err: io::Error) -> Self {
        // cursors over a slice only fail at the end of the slice
        TokenizeErr::Truncated
    }
}

/// Tokenizer for CD-1.1 data frames
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cd11Tokenizer;

impl FrameTokenizer for Cd11Tokenizer {
    fn tokenize(&self, payload: &[u8]) -> Result<Cd11Frame, TokenizeErr> {
        let mut rd = Cursor::new(payload);

        // frame header
        let frame_type = rd.read_i32::<BigEndian>()?;
        if frame_type != FRAME_TYPE_DATA {
            return Err(TokenizeErr::NotDataFrame(frame_type));
        }
        let _trailer_offset = rd.read_i32::<BigEndian>()?;
        let creator = read_ascii(&mut rd, 8)?;
        let destination = read_ascii(&mut rd, 8)?;
        let sequence_number = rd.read_i64::<BigEndian>()?;
        let _series = rd.read_i32::<BigEndian>()?;

        // channel subframe header
        let channel_count = read_len(&mut rd, "number of channels")?;
        let frame_time_length_ms = rd.read_i32::<BigEndian>()?;
        let nominal_time = read_time_stamp(&mut rd)?;
        let channel_string_len = read_len(&mut rd, "channel string count")?;
        let _channel_string = read_padded(&mut rd, channel_string_len)?;

        let mut subframes = Vec::with_capacity(channel_count.min(64));
        for _ in 0..channel_count {
            let length = read_len(&mut rd, "channel length")?;
            let body = read_exact(&mut rd, length)?;
            subframes.push(read_subframe(&body)?);
        }

        Ok(Cd11Frame {
            creator,
            destination,
            sequence_number,
            nominal_time,
            frame_time_length_ms,
            subframes,
        })
    }
}

// Parse one channel subframe, excluding its leading length field
fn read_subframe(body: &[u8]) -> Result<Subframe, TokenizeErr> {
    let mut rd = Cursor::new(body);

    let _authentication_offset = rd.read_i32::<BigEndian>()?;

    // channel description
    let _authentication = rd.read_u8()?;
    let transformation = rd.read_u8()?;
    let _sensor_type = rd.read_u8()?;
    let _option_flag = rd.read_u8()?;
    let site_name = read_ascii(&mut rd, 5)?;
    let channel_name = read_ascii(&mut rd, 3)?;
    let location_name = read_ascii(&mut rd, 2)?;
    let data_type = read_ascii(&mut rd, 2)?;
    let _calibration_factor = rd.read_f32::<BigEndian>()?;
    let _calibration_period = rd.read_f32::<BigEndian>()?;

    let start_time = read_time_stamp(&mut rd)?;
    let time_length_ms = rd.read_i32::<BigEndian>()?;
    if time_length_ms <= 0 {
        return Err(TokenizeErr::InvalidLength {
            field: "subframe time length",
            value: time_length_ms,
        });
    }
    let sample_count = read_len(&mut rd, "samples")?;

    let status_len = read_len(&mut rd, "channel status size")?;
    let channel_status = read_padded(&mut rd, status_len)?;
    let data_len = read_len(&mut rd, "data size")?;
    let channel_data = read_padded(&mut rd, data_len)?;

    // subframe count and authentication follow; they are not needed

    Ok(Subframe {
        site_name,
        channel_name,
        location_name,
        sample_count,
        sample_rate: sample_count as f64 * 1000.0 / time_length_ms as f64,
        start_time,
        end_time: start_time + Duration::milliseconds(time_length_ms as i64),
        compression_format: CompressionFormat::from(transformation),
        data_type,
        channel_data,
        channel_status,
    })
}

// Read a non-negative length or count
fn read_len(rd: &mut Cursor<&[u8]>, field: &'static str) -> Result<usize, TokenizeErr> {
    let value = rd.read_i32::<BigEndian>()?;
    usize::try_from(value).map_err(|_| TokenizeErr::InvalidLength { field, value })
}

// Read exactly `len` bytes, refusing lengths longer than the input
fn read_exact(rd: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>, TokenizeErr> {
    let remaining = rd.get_ref().len() as u64 - rd.position().min(rd.get_ref().len() as u64);
    if len as u64 > remaining {
        return Err(TokenizeErr::Truncated);
    }

    let mut out = vec![0u8; len];
    rd.read_exact(&mut out)?;
    Ok(out)
}

// Read `len` bytes, then skip padding to the next four-byte boundary
//
// Padding at the very end of the input may be absent.
fn read_padded(rd: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>, TokenizeErr> {
    let out = read_exact(rd, len)?;
    let pad = padded_len(len) - len;
    let end = rd.get_ref().len() as u64;
    rd.set_position(u64::min(rd.position() + pad as u64, end));
    Ok(out)
}

// Read a fixed-width ASCII field, stripping NUL and space padding
fn read_ascii(rd: &mut Cursor<&[u8]>, len: usize) -> Result<String, TokenizeErr> {
    let raw = read_exact(rd, len)?;
    Ok(String::from_utf8_lossy(&raw)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_owned())
}

fn read_time_stamp(rd: &mut Cursor<&[u8]>) -> Result<DateTime<Utc>, TokenizeErr> {
    let text = read_ascii(rd, TIME_STAMP_LEN)?;
    parse_time_stamp(&text)
}

// Parse a `yyyyddd hh:mm:ss.mmm` time stamp
pub(crate) fn parse_time_stamp(text: &str) -> Result<DateTime<Utc>, TokenizeErr> {
    NaiveDateTime::parse_from_str(text, TIME_STAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| TokenizeErr::InvalidTimeStamp(text.to_owned()))
}

// Round up to a multiple of four
pub(crate) fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// Encode frames for tests
#[cfg(test)]
pub(crate) mod encode {
    use std::io::Write;

    use byteorder::{BigEndian, WriteBytesExt};
    use chrono::{DateTime, Utc};

    use super::{padded_len, FRAME_TYPE_DATA, TIME_STAMP_FORMAT};
    use crate::subframe::{Cd11Frame, Subframe};

    /// Serialize `frame` as a CD-1.1 data frame
    ///
    /// Subframe time lengths are taken from the subframe start
    /// and end times.
    pub fn encode_frame(frame: &Cd11Frame) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_i32::<BigEndian>(FRAME_TYPE_DATA).unwrap();
        out.write_i32::<BigEndian>(0).unwrap();
        write_fixed(&mut out, &frame.creator, 8);
        write_fixed(&mut out, &frame.destination, 8);
        out.write_i64::<BigEndian>(frame.sequence_number).unwrap();
        out.write_i32::<BigEndian>(0).unwrap();

        out.write_i32::<BigEndian>(frame.subframes.len() as i32).unwrap();
        out.write_i32::<BigEndian>(frame.frame_time_length_ms).unwrap();
        write_time(&mut out, &frame.nominal_time);
        let channel_string: String = frame
            .subframes
            .iter()
            .map(|sf| {
                format!(
                    "{:<5}{:<3}{:<2}",
                    sf.site_name, sf.channel_name, sf.location_name
                )
            })
            .collect();
        out.write_i32::<BigEndian>(channel_string.len() as i32).unwrap();
        write_padded(&mut out, channel_string.as_bytes());

        for sf in &frame.subframes {
            let body = encode_subframe(sf);
            out.write_i32::<BigEndian>(body.len() as i32).unwrap();
            out.extend_from_slice(&body);
        }

        // empty trailer
        out.write_i32::<BigEndian>(0).unwrap();
        out.write_i32::<BigEndian>(0).unwrap();
        out.write_i64::<BigEndian>(0).unwrap();
        out
    }

    fn encode_subframe(sf: &Subframe) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_i32::<BigEndian>(0).unwrap();
        out.write_u8(0).unwrap();
        out.write_u8(sf.compression_format.as_u8()).unwrap();
        out.write_u8(0).unwrap();
        out.write_u8(0).unwrap();
        write_fixed(&mut out, &sf.site_name, 5);
        write_fixed(&mut out, &sf.channel_name, 3);
        write_fixed(&mut out, &sf.location_name, 2);
        write_fixed(&mut out, &sf.data_type, 2);
        out.write_f32::<BigEndian>(1.0).unwrap();
        out.write_f32::<BigEndian>(1.0).unwrap();
        write_time(&mut out, &sf.start_time);
        let time_length = (sf.end_time - sf.start_time).num_milliseconds() as i32;
        out.write_i32::<BigEndian>(time_length).unwrap();
        out.write_i32::<BigEndian>(sf.sample_count as i32).unwrap();
        out.write_i32::<BigEndian>(sf.channel_status.len() as i32).unwrap();
        write_padded(&mut out, &sf.channel_status);
        out.write_i32::<BigEndian>(sf.channel_data.len() as i32).unwrap();
        write_padded(&mut out, &sf.channel_data);
        out.write_i32::<BigEndian>(0).unwrap();
        out.write_i32::<BigEndian>(0).unwrap();
        out.write_i32::<BigEndian>(0).unwrap();
        out
    }

    fn write_fixed(out: &mut Vec<u8>, text: &str, len: usize) {
        let mut field = text.as_bytes().to_vec();
        field.resize(len, 0);
        out.write_all(&field).unwrap();
    }

    fn write_padded(out: &mut Vec<u8>, data: &[u8]) {
        out.write_all(data).unwrap();
        out.resize(out.len() + padded_len(data.len()) - data.len(), 0);
    }

    fn write_time(out: &mut Vec<u8>, tm: &DateTime<Utc>) {
        write_fixed(out, &tm.format(TIME_STAMP_FORMAT).to_string(), 20);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use byteorder::WriteBytesExt;

    fn test_subframe() -> Subframe {
        let start = parse_time_stamp("2024123 12:00:00.000").unwrap();
        let mut status = vec![0u8; 32];
        status[0] = 1;
        status[2] = 0x04;

        Subframe {
            site_name: "ABC12".to_owned(),
            channel_name: "BHZ".to_owned(),
            location_name: "00".to_owned(),
            sample_count: 3,
            sample_rate: 0.3,
            start_time: start,
            end_time: start + Duration::seconds(10),
            compression_format: CompressionFormat::None,
            data_type: "s3".to_owned(),
            channel_data: vec![0, 0, 1, 0, 0, 2, 0xff, 0xff, 0xff],
            channel_status: status,
        }
    }

    fn test_frame() -> Cd11Frame {
        let sf = test_subframe();
        let mut sf2 = test_subframe();
        sf2.channel_name = "BHN".to_owned();
        sf2.location_name = "".to_owned();
        sf2.compression_format = CompressionFormat::CanadianAfterSignature;

        Cd11Frame {
            creator: "ABC12".to_owned(),
            destination: "0".to_owned(),
            sequence_number: 1234567,
            nominal_time: sf.start_time,
            frame_time_length_ms: 10000,
            subframes: vec![sf, sf2],
        }
    }

    #[test]
    fn test_parse_time_stamp() {
        let tm = parse_time_stamp("2024123 01:02:03.456").unwrap();
        assert_eq!("2024-05-02T01:02:03.456+00:00", tm.to_rfc3339());

        assert_eq!(
            Err(TokenizeErr::InvalidTimeStamp("2024-05-02".to_owned())),
            parse_time_stamp("2024-05-02")
        );
    }

    #[test]
    fn test_padded_len() {
        assert_eq!(0, padded_len(0));
        assert_eq!(4, padded_len(1));
        assert_eq!(4, padded_len(4));
        assert_eq!(12, padded_len(9));
        assert_eq!(32, padded_len(32));
    }

    #[test]
    fn test_tokenize() {
        let frame = test_frame();
        let bytes = encode::encode_frame(&frame);

        let out = Cd11Tokenizer.tokenize(&bytes).unwrap();
        assert_eq!("ABC12", out.creator);
        assert_eq!("0", out.destination);
        assert_eq!(1234567, out.sequence_number);
        assert_eq!(frame.nominal_time, out.nominal_time);
        assert_eq!(2, out.subframes.len());

        let sf = &out.subframes[0];
        assert_eq!("ABC12", sf.site_name);
        assert_eq!("BHZ", sf.channel_name);
        assert_eq!("00", sf.location_name);
        assert_eq!("s3", sf.data_type);
        assert_eq!(3, sf.sample_count);
        assert_eq!(0.3, sf.sample_rate);
        assert_eq!(frame.subframes[0].start_time, sf.start_time);
        assert_eq!(frame.subframes[0].end_time, sf.end_time);
        assert_eq!(CompressionFormat::None, sf.compression_format);
        assert_eq!(frame.subframes[0].channel_data, sf.channel_data);
        assert_eq!(frame.subframes[0].channel_status, sf.channel_status);

        let sf = &out.subframes[1];
        assert_eq!("BHN", sf.channel_name);
        assert_eq!("", sf.location_name);
        assert_eq!(
            CompressionFormat::CanadianAfterSignature,
            sf.compression_format
        );
    }

    #[test]
    fn test_not_data_frame() {
        let mut bytes = Vec::new();
        bytes.write_i32::<BigEndian>(1).unwrap();
        bytes.resize(64, 0);
        assert_eq!(
            Err(TokenizeErr::NotDataFrame(1)),
            Cd11Tokenizer.tokenize(&bytes)
        );
    }

    #[test]
    fn test_truncated() {
        let bytes = encode::encode_frame(&test_frame());
        for len in [0, 3, 40, 80, bytes.len() / 2] {
            assert_eq!(
                Err(TokenizeErr::Truncated),
                Cd11Tokenizer.tokenize(&bytes[0..len]),
                "length {}",
                len
            );
        }
    }

    #[test]
    fn test_oversize_length() {
        let mut bytes = encode::encode_frame(&test_frame());

        // the first channel length follows the 36-byte frame header
        // and the 4 + 4 + 20 + 4 + 20 byte subframe header
        let offset = 36 + 52;
        bytes[offset..offset + 4].copy_from_slice(&i32::MAX.to_be_bytes());
        assert_eq!(Err(TokenizeErr::Truncated), Cd11Tokenizer.tokenize(&bytes));

        bytes[offset..offset + 4].copy_from_slice(&(-4i32).to_be_bytes());
        assert_eq!(
            Err(TokenizeErr::InvalidLength {
                field: "channel length",
                value: -4
            }),
            Cd11Tokenizer.tokenize(&bytes)
        );
    }
}

//! Frame decoding: subframes to waveforms and health records

use log::{debug, error};
use thiserror::Error;

use crate::frame::RawStationDataFrame;
use crate::health::HealthRecord;
use crate::resolver::ChannelResolver;
use crate::samples::{SampleDecodeErr, WaveformDecoder, CANADIAN_COMPRESSION};
use crate::statusblock::{decode_status_block, StatusBlockErr};
use crate::subframe::{CompressionFormat, Subframe};
use crate::tokenizer::{Cd11Tokenizer, FrameTokenizer, TokenizeErr};
use crate::waveform::{CreationInfo, Waveform, WaveformSegment};

/// Everything derived from one frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedFrame {
    /// One segment per resolved subframe
    pub segments: Vec<WaveformSegment>,

    /// Health records of every resolved subframe
    pub health: Vec<HealthRecord>,
}

impl DecodedFrame {
    /// True if nothing was decoded
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.health.is_empty()
    }
}

/// Error decoding a frame
///
/// Any of these errors aborts the decoding of the *entire* frame.
/// No partial output is returned.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum DecodeErr {
    /// The frame payload could not be tokenized
    #[error(transparent)]
    Tokenize(#[from] TokenizeErr),

    /// A subframe uses a compression format which is not supported
    #[error("unsupported compression format: {0}")]
    UnsupportedCompression(CompressionFormat),

    /// Samples could not be decoded
    #[error(transparent)]
    Samples(#[from] SampleDecodeErr),

    /// A channel status block could not be decoded
    #[error(transparent)]
    StatusBlock(#[from] StatusBlockErr),
}

/// Decodes the payload of frames in one acquisition protocol
///
/// The [`Ingester`](crate::Ingester) keeps one `ProtocolDecoder`
/// per [`AcquisitionProtocol`](crate::AcquisitionProtocol).
pub trait ProtocolDecoder {
    /// Decode a raw frame into segments and health records
    fn decode(&self, frame: &RawStationDataFrame) -> Result<DecodedFrame, DecodeErr>;
}

/// Decodes CD-1.1 frames
///
/// Tokenizes each frame payload, then runs
/// [`decode_subframes()`] with the configured channel resolver
/// and sample decoder.
pub struct Cd11Decoder {
    tokenizer: Box<dyn FrameTokenizer>,
    resolver: Box<dyn ChannelResolver>,
    samples: Box<dyn WaveformDecoder>,
}

impl Cd11Decoder {
    /// New decoder with the standard CD-1.1 tokenizer
    pub fn new<R, W>(resolver: R, samples: W) -> Self
    where
        R: ChannelResolver + 'static,
        W: WaveformDecoder + 'static,
    {
        Self {
            tokenizer: Box::new(Cd11Tokenizer),
            resolver: Box::new(resolver),
            samples: Box::new(samples),
        }
    }

    /// Replace the frame tokenizer
    pub fn with_tokenizer<T>(mut self, tokenizer: T) -> Self
    where
        T: FrameTokenizer + 'static,
    {
        self.tokenizer = Box::new(tokenizer);
        self
    }
}

impl ProtocolDecoder for Cd11Decoder {
    fn decode(&self, frame: &RawStationDataFrame) -> Result<DecodedFrame, DecodeErr> {
        let tokens = self.tokenizer.tokenize(&frame.raw_payload)?;
        debug!(
            "frame {}: CD-1.1 sequence {} from \"{}\" has {} subframe(s)",
            frame.id,
            tokens.sequence_number,
            tokens.creator,
            tokens.subframes.len()
        );

        decode_subframes(
            &tokens.subframes,
            self.resolver.as_ref(),
            self.samples.as_ref(),
            &CreationInfo::now(),
        )
    }
}

impl std::fmt::Debug for Cd11Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cd11Decoder").finish_non_exhaustive()
    }
}

/// Decode tokenized CD-1.1 subframes
///
/// Each subframe is handled independently:
///
/// 1. Its site and channel are resolved with `resolver`. If the
///    channel is unknown, an error is logged and the subframe is
///    skipped. The remaining subframes are still decoded.
///
/// 2. Its samples are decoded with `samples`. Uncompressed data is
///    decoded by its declared data type. Canadian-compressed data
///    is decoded as [`CANADIAN_COMPRESSION`], whatever its declared
///    type. Any other compression fails the **whole frame** with
///    [`DecodeErr::UnsupportedCompression`].
///
/// 3. Its channel status block becomes health records over the
///    subframe's time span.
///
/// The output is the union of all resolved subframes, in order.
pub fn decode_subframes<R, W>(
    subframes: &[Subframe],
    resolver: &R,
    samples: &W,
    creation_info: &CreationInfo,
) -> Result<DecodedFrame, DecodeErr>
where
    R: ChannelResolver + ?Sized,
    W: WaveformDecoder + ?Sized,
{
    let mut out = DecodedFrame::default();

    for sf in subframes {
        let channel_id = match resolver.resolve(&sf.site_name, &sf.channel_name) {
            Some(id) => id,
            None => {
                error!(
                    "unable to resolve channel {}/{} at {}; skipping subframe",
                    sf.site_name, sf.channel_name, sf.start_time
                );
                continue;
            }
        };

        let format = match sf.compression_format {
            CompressionFormat::None => sf.data_type.as_str(),
            CompressionFormat::CanadianBeforeSignature
            | CompressionFormat::CanadianAfterSignature => CANADIAN_COMPRESSION,
            other => return Err(DecodeErr::UnsupportedCompression(other)),
        };

        let values = samples.decode(&sf.channel_data, format, sf.sample_count, 0)?;
        out.segments.push(WaveformSegment::acquired(
            channel_id,
            &sf.site_name,
            &sf.channel_name,
            Waveform::new(sf.start_time, sf.sample_rate, values),
            creation_info.clone(),
        ));

        out.health.extend(decode_status_block(
            &sf.channel_status,
            channel_id,
            sf.start_time,
            sf.end_time,
            creation_info,
        )?);
    }

    Ok(out)
}

//! # cd11rx: CD-1.1 Station Data Ingestion
//!
//! This crate turns seismic station data, delivered as files into a
//! watched directory, into typed waveform and state-of-health records.
//! Station data arrives as frames in the CD-1.1 station-data protocol.
//!
//! There are two halves:
//!
//! 1. **Ingestion**: a transfer agent drops *data files* into a
//!    directory, along with *manifest* files (`*.inv`) which list the
//!    data files it intends to deliver. The [`Ingester`] reads the
//!    manifests, remembers which files are pending, processes each one
//!    when it shows up on disk, and reports the ones that never do.
//!
//! 2. **Decoding**: every data file holds one [`RawStationDataFrame`].
//!    For CD-1.1 frames, the [`Cd11Decoder`] tokenizes the payload
//!    into channel [`Subframe`]s, resolves each channel, decodes its
//!    samples into a [`WaveformSegment`], and decodes its 32-byte
//!    channel status block into [`HealthRecord`]s.
//!
//! ## Example
//!
//! ```
//! use cd11rx::{
//!     AcquisitionProtocol, Cd11Decoder, ChannelTable, IngesterBuilder, LogNotifier,
//!     MemoryStore, RawSampleDecoder,
//! };
//! use chrono::{Duration, Utc};
//!
//! # let dir = tempfile::tempdir().unwrap();
//! # let watch_dir = dir.path();
//! let channels = ChannelTable::new();
//! let mut ingester = IngesterBuilder::new(watch_dir)
//!     .with_missing_file_age(Duration::minutes(2))
//!     .with_notifier(LogNotifier)
//!     .with_decoder(
//!         AcquisitionProtocol::Cd11,
//!         Cd11Decoder::new(channels, RawSampleDecoder),
//!     )
//!     .build(MemoryStore::new());
//!
//! // one iteration of the ingestion loop
//! let report = ingester.poll(Utc::now()).expect("watch directory exists");
//! assert_eq!(0, report.manifests_read);
//! ```
//!
//! Applications call [`Ingester::poll()`] in a loop, sleeping briefly
//! between iterations. See the `cd11watch` binary for a complete
//! program.
//!
//! ## Collaborators
//!
//! The storage backend, channel lookup, and sample decompression are
//! all traits:
//!
//! * [`StorageClient`]: persists frames, segments, and health records.
//!   [`JsonLinesStore`] and [`MemoryStore`] are provided.
//! * [`ChannelResolver`]: maps a site and channel name to a
//!   [`ChannelId`]. [`ChannelTable`] is provided.
//! * [`WaveformDecoder`]: converts raw sample bytes to `f64`.
//!   [`RawSampleDecoder`] handles the uncompressed CD-1.1 data types.
//! * [`MissingFileNotifier`]: hears about files which were announced
//!   but never delivered.
//!
//! ## Background
//!
//! CD-1.1 is the continuous data protocol used by the International
//! Monitoring System to move waveform data from stations to data
//! centers. Each data frame carries one or more *channel subframes*.
//! Every subframe has a few seconds of samples for one channel and a
//! small binary *channel status* block describing the health of the
//! sensor, digitizer, and station equipment.

mod builder;
mod cleanup;
mod decoder;
mod frame;
mod health;
mod ingest;
mod manifest;
mod pending;
mod resolver;
mod samples;
mod statusblock;
mod storage;
mod subframe;
mod tokenizer;
mod waveform;

pub use builder::IngesterBuilder;
pub use decoder::{decode_subframes, Cd11Decoder, DecodeErr, DecodedFrame, ProtocolDecoder};
pub use frame::{AcquisitionProtocol, AuthenticationStatus, FrameReadErr, RawStationDataFrame};
pub use health::{AnalogHealthType, BooleanHealthType, HealthObservation, HealthRecord};
pub use ingest::{IngestErr, Ingester, LogNotifier, MissingFileNotifier, PollReport};
pub use manifest::{ManifestReader, ManifestScan, DEFAULT_MANIFEST_SUFFIX};
pub use pending::PendingFiles;
pub use resolver::{ChannelResolver, ChannelTable, ResolverErr};
pub use samples::{RawSampleDecoder, SampleDecodeErr, WaveformDecoder, CANADIAN_COMPRESSION};
pub use statusblock::{
    decode_status_block, StatusBlock, StatusBlockErr, STATUS_BLOCK_LEN, STATUS_FORMAT_CD11,
};
pub use storage::{JsonLinesStore, MemoryStore, StorageClient, StorageErr};
pub use subframe::{Cd11Frame, CompressionFormat, Subframe};
pub use tokenizer::{Cd11Tokenizer, FrameTokenizer, TokenizeErr};
pub use waveform::{ChannelId, ChannelSegmentType, CreationInfo, Waveform, WaveformSegment};

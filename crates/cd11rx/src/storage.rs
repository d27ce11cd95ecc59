//! Persistence of frames and derived records

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::frame::RawStationDataFrame;
use crate::health::HealthRecord;
use crate::waveform::WaveformSegment;

/// Persists frames and the records derived from them
///
/// Every method may fail. The [`Ingester`](crate::Ingester) logs
/// storage failures and discards the data file which produced them.
pub trait StorageClient {
    /// Store a raw station data frame
    fn store_raw_frame(&mut self, frame: &RawStationDataFrame) -> Result<(), StorageErr>;

    /// Store decoded waveform segments
    fn store_waveform_segments(&mut self, segments: &[WaveformSegment])
        -> Result<(), StorageErr>;

    /// Store decoded health records
    fn store_health_records(&mut self, records: &[HealthRecord]) -> Result<(), StorageErr>;
}

/// Error storing data
#[derive(Error, Debug)]
pub enum StorageErr {
    /// Input/output error
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record could not be serialized
    #[error("unable to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backend refused the request
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Stores everything in memory
///
/// Useful for testing. Stored values may be inspected, and each
/// kind of write may be made to fail on demand.
///
/// ```
/// use cd11rx::{MemoryStore, StorageClient};
///
/// let mut store = MemoryStore::new();
/// store.fail_health(true);
/// assert!(store.store_health_records(&[]).is_err());
/// assert!(store.store_waveform_segments(&[]).is_ok());
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    frames: Vec<RawStationDataFrame>,
    segments: Vec<WaveformSegment>,
    health: Vec<HealthRecord>,
    fail_frames: bool,
    fail_segments: bool,
    fail_health: bool,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames stored so far
    pub fn frames(&self) -> &[RawStationDataFrame] {
        &self.frames
    }

    /// Waveform segments stored so far
    pub fn segments(&self) -> &[WaveformSegment] {
        &self.segments
    }

    /// Health records stored so far
    pub fn health(&self) -> &[HealthRecord] {
        &self.health
    }

    /// Make frame writes fail
    pub fn fail_frames(&mut self, fail: bool) {
        self.fail_frames = fail;
    }

    /// Make segment writes fail
    pub fn fail_segments(&mut self, fail: bool) {
        self.fail_segments = fail;
    }

    /// Make health record writes fail
    pub fn fail_health(&mut self, fail: bool) {
        self.fail_health = fail;
    }
}

impl StorageClient for MemoryStore {
    fn store_raw_frame(&mut self, frame: &RawStationDataFrame) -> Result<(), StorageErr> {
        refuse_if(self.fail_frames, "frames")?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn store_waveform_segments(
        &mut self,
        segments: &[WaveformSegment],
    ) -> Result<(), StorageErr> {
        refuse_if(self.fail_segments, "segments")?;
        self.segments.extend_from_slice(segments);
        Ok(())
    }

    fn store_health_records(&mut self, records: &[HealthRecord]) -> Result<(), StorageErr> {
        refuse_if(self.fail_health, "health records")?;
        self.health.extend_from_slice(records);
        Ok(())
    }
}

fn refuse_if(fail: bool, what: &str) -> Result<(), StorageErr> {
    if fail {
        Err(StorageErr::Unavailable(format!("{} store is offline", what)))
    } else {
        Ok(())
    }
}

/// Appends JSON documents to files in a directory
///
/// Each kind of record gets its own file, with one JSON document
/// per line:
///
/// | File              | Contents                  |
/// |-------------------|---------------------------|
/// | `frames.jsonl`    | [`RawStationDataFrame`]   |
/// | `segments.jsonl`  | [`WaveformSegment`]       |
/// | `health.jsonl`    | [`HealthRecord`]          |
///
/// Files are opened for append on every write, so they may be
/// rotated or truncated while the store is in use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonLinesStore {
    dir: PathBuf,
}

impl JsonLinesStore {
    /// File name for raw frames
    pub const FRAMES_FILE: &'static str = "frames.jsonl";

    /// File name for waveform segments
    pub const SEGMENTS_FILE: &'static str = "segments.jsonl";

    /// File name for health records
    pub const HEALTH_FILE: &'static str = "health.jsonl";

    /// Store into `dir`, creating it if necessary
    pub fn new<P>(dir: P) -> Result<Self, StorageErr>
    where
        P: AsRef<Path>,
    {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_owned(),
        })
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append<'a, T, I>(&self, file: &str, items: I) -> Result<(), StorageErr>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut wr = BufWriter::new(self.open(file)?);
        for item in items {
            serde_json::to_writer(&mut wr, item)?;
            wr.write_all(b"\n")?;
        }
        wr.flush()?;
        Ok(())
    }

    fn open(&self, file: &str) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))
    }
}

impl StorageClient for JsonLinesStore {
    fn store_raw_frame(&mut self, frame: &RawStationDataFrame) -> Result<(), StorageErr> {
        self.append(Self::FRAMES_FILE, [frame])
    }

    fn store_waveform_segments(
        &mut self,
        segments: &[WaveformSegment],
    ) -> Result<(), StorageErr> {
        self.append(Self::SEGMENTS_FILE, segments)
    }

    fn store_health_records(&mut self, records: &[HealthRecord]) -> Result<(), StorageErr> {
        self.append(Self::HEALTH_FILE, records)
    }
}

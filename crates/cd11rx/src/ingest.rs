//! Manifest-driven ingestion
//!
//! The [`Ingester`] owns all ingestion state. Each call to
//! [`Ingester::poll()`] runs one iteration of the loop:
//!
//! ```txt
//! scan manifests ──► announce names ──► process every pending file
//!                                                   │
//!            notify missing ◄── evict stale ◄───────┘
//! ```
//!
//! The caller sleeps between iterations.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, trace, warn};
use thiserror::Error;

use crate::builder::IngesterBuilder;
use crate::cleanup::RemoveOnDrop;
use crate::decoder::{DecodeErr, ProtocolDecoder};
use crate::frame::{AcquisitionProtocol, RawStationDataFrame};
use crate::manifest::ManifestReader;
use crate::pending::PendingFiles;
use crate::storage::{StorageClient, StorageErr};

/// Hears about files which were announced but never delivered
pub trait MissingFileNotifier {
    /// Report files which aged out of the pending registry
    ///
    /// Called at most once per poll, with a non-empty list.
    /// Implementations should return promptly.
    fn notify_missing(&mut self, names: &[String]);
}

impl<F> MissingFileNotifier for F
where
    F: FnMut(&[String]),
{
    fn notify_missing(&mut self, names: &[String]) {
        self(names)
    }
}

/// Logs missing files as warnings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogNotifier;

impl MissingFileNotifier for LogNotifier {
    fn notify_missing(&mut self, names: &[String]) {
        warn!(
            "{} announced file(s) never arrived: {}",
            names.len(),
            names.join(", ")
        );
    }
}

/// Error which stops one iteration of the ingestion loop
#[derive(Error, Debug)]
pub enum IngestErr {
    /// The watched directory could not be listed
    #[error("unable to scan watch directory \"{}\": {source}", .path.display())]
    ScanDir {
        /// Watched directory
        path: PathBuf,

        /// Cause
        source: io::Error,
    },

    /// A frame could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeErr),

    /// Derived data could not be stored
    #[error(transparent)]
    Storage(#[from] StorageErr),
}

/// Summary of one poll
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Manifests found and consumed
    pub manifests_read: usize,

    /// File names announced by those manifests
    pub names_announced: usize,

    /// Manifest entries ignored because they name a path outside
    /// the watched directory
    pub names_rejected: usize,

    /// Files processed successfully and removed from the registry
    pub files_processed: usize,

    /// Files still pending after this poll
    pub files_pending: usize,

    /// Files evicted as missing
    pub evicted: Vec<String>,

    /// True if this poll warned about consecutive scans with no
    /// manifests
    pub idle_warning: bool,
}

impl PollReport {
    /// True if the poll found and did nothing
    pub fn is_quiet(&self) -> bool {
        self.manifests_read == 0 && self.files_processed == 0 && self.evicted.is_empty()
    }
}

/// Ingests station data files from a watched directory
///
/// Create with an [`IngesterBuilder`]. Then call
/// [`poll()`](Ingester::poll) repeatedly.
///
/// Files are processed at least once. A file is deleted from the
/// watched directory as soon as any attempt is made to process it,
/// whatever the outcome. Only files which are stored and decoded
/// without error leave the pending registry right away. Anything
/// else stays pending until it ages out and is reported as missing.
pub struct Ingester<S> {
    watch_dir: PathBuf,
    manifests: ManifestReader,
    pending: PendingFiles,
    decoders: HashMap<AcquisitionProtocol, Box<dyn ProtocolDecoder>>,
    storage: S,
    notifier: Box<dyn MissingFileNotifier>,
    max_age: Duration,
    idle_warning_scans: u64,
    idle_scans: u64,
}

impl<S> Ingester<S>
where
    S: StorageClient,
{
    pub(crate) fn from_builder(cfg: IngesterBuilder, storage: S) -> Self {
        let watch_dir = cfg.watch_dir().to_owned();
        let manifests = ManifestReader::new(cfg.manifest_suffix());
        let max_age = cfg.missing_file_age();
        let idle_warning_scans = cfg.idle_warning_scans().max(1);
        let (decoders, notifier) = cfg.into_parts();

        Self {
            watch_dir,
            manifests,
            pending: PendingFiles::new(),
            decoders,
            storage,
            notifier,
            max_age,
            idle_warning_scans,
            idle_scans: 0,
        }
    }

    /// Run one iteration of the ingestion loop
    ///
    /// 1. Read and delete all manifests in the watched directory.
    /// 2. Announce the names they list, at time `now`.
    /// 3. Attempt to [process](Ingester::process_file) **every**
    ///    pending file. Successes leave the registry.
    /// 4. Evict files last announced more than the missing file
    ///    age before `now`, and notify about them.
    ///
    /// Fails only if the watched directory cannot be listed. Nothing
    /// else is done in that case.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Result<PollReport, IngestErr> {
        let scan = self
            .manifests
            .scan(&self.watch_dir)
            .map_err(|source| IngestErr::ScanDir {
                path: self.watch_dir.clone(),
                source,
            })?;

        let idle_warning = self.count_idle_scan(scan.manifests);

        let (names, rejected): (Vec<String>, Vec<String>) =
            scan.names.into_iter().partition(|name| is_contained(name));
        for name in &rejected {
            error!(
                "manifest entry \"{}\" is not a file inside \"{}\"; ignored",
                name,
                self.watch_dir.display()
            );
        }

        let mut report = PollReport {
            manifests_read: scan.manifests,
            names_announced: names.len(),
            names_rejected: rejected.len(),
            idle_warning,
            ..PollReport::default()
        };
        self.pending.announce(names, now);

        for name in self.pending.names() {
            if self.process_file(&name) {
                self.pending.remove(&name);
                report.files_processed += 1;
            }
        }

        report.evicted = match now.checked_sub_signed(self.max_age) {
            Some(threshold) => self.pending.evict_older_than(threshold),
            None => Vec::new(),
        };
        if !report.evicted.is_empty() {
            self.notifier.notify_missing(&report.evicted);
        }

        report.files_pending = self.pending.len();
        Ok(report)
    }

    // Track consecutive scans which found no manifests, warning on
    // every Nth one. Returns true if a warning was logged.
    fn count_idle_scan(&mut self, manifests: usize) -> bool {
        if manifests > 0 {
            self.idle_scans = 0;
            return false;
        }

        self.idle_scans = self.idle_scans.wrapping_add(1);
        if self.idle_scans % self.idle_warning_scans != 0 {
            return false;
        }

        warn!(
            "no manifests found in \"{}\" for {} consecutive scans",
            self.watch_dir.display(),
            self.idle_scans
        );
        true
    }

    /// Process the data file `name`, if it has arrived
    ///
    /// Returns `true` if the file's frame was stored and, when a
    /// decoder is registered for its protocol, decoded and stored.
    /// Frames with no registered decoder are logged and count as a
    /// success.
    ///
    /// Returns `false` if the file does not exist yet. This is not
    /// an error. It also returns `false` if the file could not be
    /// read, parsed, stored, or decoded; these are logged.
    ///
    /// If the file exists, it is always deleted before returning.
    /// Names which are absolute, or which climb out of the watched
    /// directory with `..`, are refused without touching anything.
    pub fn process_file(&mut self, name: &str) -> bool {
        if !is_contained(name) {
            error!("{}: not a file inside the watch directory; refused", name);
            return false;
        }

        let path = self.watch_dir.join(name);
        if !path.exists() {
            trace!("{}: not delivered yet", name);
            return false;
        }

        let _cleanup = RemoveOnDrop(&path);

        let frame = match RawStationDataFrame::from_path(&path) {
            Ok(frame) => frame,
            Err(err) => {
                error!("{}: unable to read station data frame: {}", name, err);
                return false;
            }
        };

        if let Err(err) = self.storage.store_raw_frame(&frame) {
            error!("{}: unable to store frame {}: {}", name, frame.id, err);
            return false;
        }

        match self.decode_and_store(&frame) {
            Ok(()) => {
                info!(
                    "{}: ingested {} frame {}",
                    name, frame.acquisition_protocol, frame.id
                );
                true
            }
            Err(err) => {
                error!("{}: frame {}: {}", name, frame.id, err);
                false
            }
        }
    }

    // Decode with the registered protocol decoder and store the output
    fn decode_and_store(&mut self, frame: &RawStationDataFrame) -> Result<(), IngestErr> {
        let decoder = match self.decoders.get(&frame.acquisition_protocol) {
            Some(decoder) => decoder,
            None => {
                error!(
                    "frame {}: unsupported acquisition protocol {}; not decoded",
                    frame.id, frame.acquisition_protocol
                );
                return Ok(());
            }
        };

        let decoded = decoder.decode(frame)?;
        debug!(
            "frame {}: decoded {} segment(s) and {} health record(s)",
            frame.id,
            decoded.segments.len(),
            decoded.health.len()
        );

        self.storage.store_waveform_segments(&decoded.segments)?;
        self.storage.store_health_records(&decoded.health)?;
        Ok(())
    }

    /// Watched directory
    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    /// Pending-file registry
    pub fn pending(&self) -> &PendingFiles {
        &self.pending
    }

    /// Consecutive polls which found no manifests
    pub fn idle_scans(&self) -> u64 {
        self.idle_scans
    }

    /// Storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Storage backend, mutably
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

impl<S> std::fmt::Debug for Ingester<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingester")
            .field("watch_dir", &self.watch_dir)
            .field("manifests", &self.manifests)
            .field("pending", &self.pending.len())
            .field("protocols", &self.decoders.keys().collect::<Vec<_>>())
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

// True if `name` is a relative path that stays inside the watched
// directory
fn is_contained(name: &str) -> bool {
    let mut has_file = false;
    for part in Path::new(name).components() {
        match part {
            Component::Normal(_) => has_file = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    has_file
}

//! Ingester configuration

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::decoder::ProtocolDecoder;
use crate::frame::AcquisitionProtocol;
use crate::ingest::{Ingester, LogNotifier, MissingFileNotifier};
use crate::manifest::DEFAULT_MANIFEST_SUFFIX;
use crate::storage::StorageClient;

/// Configures and creates an [`Ingester`]
///
/// Only the watched directory is required up front; storage is
/// supplied to [`build()`](IngesterBuilder::build). Manifests end in
/// [`DEFAULT_MANIFEST_SUFFIX`], files are reported missing after two
/// minutes, and missing files go to a [`LogNotifier`] unless
/// overridden.
///
/// Decoders are registered per [`AcquisitionProtocol`]. An ingester
/// with no decoder for a frame's protocol still stores the frame but
/// produces no waveforms or health records from it. Most users want
/// at least a [`Cd11Decoder`](crate::Cd11Decoder).
pub struct IngesterBuilder {
    watch_dir: PathBuf,
    manifest_suffix: String,
    missing_file_age: Duration,
    idle_warning_scans: u64,
    notifier: Box<dyn MissingFileNotifier>,
    decoders: HashMap<AcquisitionProtocol, Box<dyn ProtocolDecoder>>,
}

impl IngesterBuilder {
    /// New ingester for `watch_dir`, with defaults
    ///
    /// Missing files are logged with a [`LogNotifier`].
    pub fn new<P>(watch_dir: P) -> Self
    where
        P: AsRef<Path>,
    {
        Self {
            watch_dir: watch_dir.as_ref().to_owned(),
            manifest_suffix: DEFAULT_MANIFEST_SUFFIX.to_owned(),
            missing_file_age: Duration::minutes(2),
            idle_warning_scans: 100,
            notifier: Box::new(LogNotifier),
            decoders: HashMap::new(),
        }
    }

    /// Build the ingester
    ///
    /// The ingester starts with nothing pending. Everything it
    /// ingests goes to `storage`.
    pub fn build<S>(self, storage: S) -> Ingester<S>
    where
        S: StorageClient,
    {
        Ingester::from_builder(self, storage)
    }

    /// Manifest file name suffix
    ///
    /// Files in the watched directory whose names end in this
    /// suffix are read as manifests, then deleted.
    pub fn with_manifest_suffix<S>(mut self, suffix: S) -> Self
    where
        S: Into<String>,
    {
        self.manifest_suffix = suffix.into();
        self
    }

    /// Missing file age
    ///
    /// A file which has been pending for longer than this,
    /// measured from the last manifest that announced it, is
    /// evicted and reported as missing. Negative ages are
    /// treated as zero.
    pub fn with_missing_file_age(mut self, age: Duration) -> Self {
        self.missing_file_age = std::cmp::max(age, Duration::zero());
        self
    }

    /// Idle warning interval
    ///
    /// A warning is logged every `scans` consecutive polls that
    /// find no manifests. Values less than one are treated as
    /// one.
    pub fn with_idle_warning_scans(mut self, scans: u64) -> Self {
        self.idle_warning_scans = scans.max(1);
        self
    }

    /// Missing file notifier
    ///
    /// Replaces the default [`LogNotifier`]. Any
    /// `FnMut(&[String])` will do.
    pub fn with_notifier<N>(mut self, notifier: N) -> Self
    where
        N: MissingFileNotifier + 'static,
    {
        self.notifier = Box::new(notifier);
        self
    }

    /// Register the decoder for `protocol`
    ///
    /// Replaces any decoder previously registered for it.
    pub fn with_decoder<D>(mut self, protocol: AcquisitionProtocol, decoder: D) -> Self
    where
        D: ProtocolDecoder + 'static,
    {
        self.decoders.insert(protocol, Box::new(decoder));
        self
    }

    /// Watched directory
    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    /// Manifest file name suffix
    pub fn manifest_suffix(&self) -> &str {
        &self.manifest_suffix
    }

    /// Missing file age
    pub fn missing_file_age(&self) -> Duration {
        self.missing_file_age
    }

    /// Idle warning interval, in polls
    pub fn idle_warning_scans(&self) -> u64 {
        self.idle_warning_scans
    }

    /// True if a decoder is registered for `protocol`
    pub fn has_decoder(&self, protocol: AcquisitionProtocol) -> bool {
        self.decoders.contains_key(&protocol)
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        HashMap<AcquisitionProtocol, Box<dyn ProtocolDecoder>>,
        Box<dyn MissingFileNotifier>,
    ) {
        (self.decoders, self.notifier)
    }
}

impl std::fmt::Debug for IngesterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngesterBuilder")
            .field("watch_dir", &self.watch_dir)
            .field("manifest_suffix", &self.manifest_suffix)
            .field("missing_file_age", &self.missing_file_age)
            .field("idle_warning_scans", &self.idle_warning_scans)
            .field("protocols", &self.decoders.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

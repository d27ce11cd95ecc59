//! Channel identity lookup

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::waveform::ChannelId;

/// Looks up channel identifiers by name
pub trait ChannelResolver {
    /// Find the channel recorded by `site` and `channel`
    ///
    /// Returns `None` if the channel is not known.
    fn resolve(&self, site: &str, channel: &str) -> Option<ChannelId>;
}

impl<R> ChannelResolver for &R
where
    R: ChannelResolver + ?Sized,
{
    fn resolve(&self, site: &str, channel: &str) -> Option<ChannelId> {
        (**self).resolve(site, channel)
    }
}

/// Error loading a channel table
#[derive(Error, Debug)]
pub enum ResolverErr {
    /// The table could not be read
    #[error("unable to read channel table: {0}")]
    Io(#[from] io::Error),

    /// The table is not valid
    #[error("malformed channel table: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One row of a channel table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct ChannelEntry {
    site: String,
    channel: String,
    id: ChannelId,
}

/// A fixed table of known channels
///
/// Tables are usually loaded from a JSON array of objects with
/// `site`, `channel`, and `id` keys:
///
/// ```
/// use cd11rx::{ChannelResolver, ChannelTable};
///
/// let table = ChannelTable::from_reader(r#"[
///     {"site": "ABC12", "channel": "BHZ", "id": "3f1e0c4e-52a6-4c1a-9d0b-7a4f4ef0d2a1"}
/// ]"#.as_bytes()).unwrap();
///
/// assert!(table.resolve("ABC12", "BHZ").is_some());
/// assert!(table.resolve("ABC12", "BHN").is_none());
/// ```
///
/// Site and channel names are matched exactly, after trimming
/// surrounding whitespace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelTable {
    channels: HashMap<(String, String), ChannelId>,
}

impl ChannelTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from a JSON document
    pub fn from_reader<R>(rdr: R) -> Result<Self, ResolverErr>
    where
        R: io::Read,
    {
        let entries: Vec<ChannelEntry> = serde_json::from_reader(rdr)?;
        Ok(entries
            .into_iter()
            .map(|ent| ((ent.site, ent.channel), ent.id))
            .collect())
    }

    /// Load a table from the JSON file at `path`
    pub fn from_path<P>(path: P) -> Result<Self, ResolverErr>
    where
        P: AsRef<Path>,
    {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Add or replace a channel
    pub fn insert(&mut self, site: &str, channel: &str, id: ChannelId) -> Option<ChannelId> {
        self.channels.insert(key(site, channel), id)
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True if there are no channels
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl ChannelResolver for ChannelTable {
    fn resolve(&self, site: &str, channel: &str) -> Option<ChannelId> {
        self.channels.get(&key(site, channel)).copied()
    }
}

impl FromIterator<((String, String), ChannelId)> for ChannelTable {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = ((String, String), ChannelId)>,
    {
        let mut out = Self::new();
        for ((site, channel), id) in iter {
            out.insert(&site, &channel, id);
        }
        out
    }
}

fn key(site: &str, channel: &str) -> (String, String) {
    (site.trim().to_owned(), channel.trim().to_owned())
}

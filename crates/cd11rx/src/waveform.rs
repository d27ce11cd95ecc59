//! Decoded waveform segments

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name recorded as the creator of everything this crate derives
pub(crate) const CREATOR_NAME: &str = "cd11rx";

/// Stable channel identifier
///
/// Assigned by a [`ChannelResolver`](crate::ChannelResolver) from
/// a site and channel name. `ChannelId` may be parsed from, and
/// displays as, its hyphenated UUID.
///
/// ```
/// use cd11rx::ChannelId;
///
/// let id: ChannelId = "3f1e0c4e-52a6-4c1a-9d0b-7a4f4ef0d2a1".parse().unwrap();
/// assert_eq!("3f1e0c4e-52a6-4c1a-9d0b-7a4f4ef0d2a1", id.to_string());
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChannelId(Uuid);

impl ChannelId {
    /// Wrap an existing UUID
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ChannelId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for ChannelId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Provenance for derived data
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationInfo {
    /// Software or operator which created the data
    pub creator_name: String,

    /// When it was created
    pub creation_time: DateTime<Utc>,
}

impl CreationInfo {
    /// Creation info for `creator`, stamped at `creation_time`
    pub fn new<S>(creator: S, creation_time: DateTime<Utc>) -> Self
    where
        S: Into<String>,
    {
        Self {
            creator_name: creator.into(),
            creation_time,
        }
    }

    /// Creation info for this crate, stamped now
    pub fn now() -> Self {
        Self::new(CREATOR_NAME, Utc::now())
    }
}

/// Kind of channel segment
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelSegmentType {
    /// Samples exactly as acquired from the station
    Acquired,
}

impl ChannelSegmentType {
    /// Upper-case name, like "`ACQUIRED`"
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for ChannelSegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Evenly-sampled series of values
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waveform {
    /// Time of the first sample
    pub start_time: DateTime<Utc>,

    /// Samples per second
    pub sample_rate: f64,

    /// Sample values
    pub values: Vec<f64>,
}

impl Waveform {
    /// Create waveform
    pub fn new(start_time: DateTime<Utc>, sample_rate: f64, values: Vec<f64>) -> Self {
        Self {
            start_time,
            sample_rate,
            values,
        }
    }

    /// Number of samples
    pub fn sample_count(&self) -> usize {
        self.values.len()
    }

    /// Time of the last sample
    ///
    /// Equal to the start time if there are fewer than two samples
    /// or the sample rate is not positive.
    pub fn end_time(&self) -> DateTime<Utc> {
        if self.values.len() < 2 || !(self.sample_rate > 0.0) {
            return self.start_time;
        }

        let span_us = (self.values.len() - 1) as f64 * 1.0e6 / self.sample_rate;
        self.start_time + Duration::microseconds(span_us.round() as i64)
    }
}

/// Samples for one channel
///
/// Built once per resolved [`Subframe`](crate::Subframe) and never
/// modified afterwards. The segment `name` has the form
/// "`{site}/{channel} ACQUIRED`."
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveformSegment {
    /// Unique id of this segment
    pub id: Uuid,

    /// Channel which recorded the samples
    pub channel_id: ChannelId,

    /// Human-readable name
    pub name: String,

    /// Segment kind
    #[serde(rename = "type")]
    pub segment_type: ChannelSegmentType,

    /// The samples
    pub waveform: Waveform,

    /// Provenance
    pub creation_info: CreationInfo,
}

impl WaveformSegment {
    /// Segment of samples as received from `site`/`channel`
    pub fn acquired(
        channel_id: ChannelId,
        site: &str,
        channel: &str,
        waveform: Waveform,
        creation_info: CreationInfo,
    ) -> Self {
        let segment_type = ChannelSegmentType::Acquired;
        Self {
            id: Uuid::new_v4(),
            channel_id,
            name: format!("{}/{} {}", site, channel, segment_type),
            segment_type,
            waveform,
            creation_info,
        }
    }
}

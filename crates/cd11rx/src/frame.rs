//! Raw station data frames, as delivered on disk

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::waveform::ChannelId;

/// Protocol a frame was acquired with
///
/// Determines which [`ProtocolDecoder`](crate::ProtocolDecoder)
/// turns the frame's payload into waveforms and health records.
/// Protocol tags convert from their upper-case string form. Tags
/// which are not recognized become `Unrecognized` rather than
/// failing.
///
/// ```
/// use cd11rx::AcquisitionProtocol;
///
/// assert_eq!(AcquisitionProtocol::Cd11, AcquisitionProtocol::from("CD11"));
/// assert_eq!("SEEDLINK", AcquisitionProtocol::Seedlink.as_str());
/// assert_eq!(AcquisitionProtocol::Unrecognized, AcquisitionProtocol::from("CARRIER_PIGEON"));
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::IntoStaticStr,
)]
#[serde(from = "String", into = "String")]
pub enum AcquisitionProtocol {
    /// CD-1.1 continuous data protocol
    #[strum(serialize = "CD11")]
    Cd11,

    /// SeedLink
    #[strum(serialize = "SEEDLINK")]
    Seedlink,

    /// IMS 2.0 waveform messages
    #[strum(serialize = "IMS_WAVEFORM")]
    ImsWaveform,

    /// A protocol tag this crate does not know about
    #[strum(serialize = "UNRECOGNIZED")]
    Unrecognized,
}

impl AcquisitionProtocol {
    /// Upper-case protocol tag, like "`CD11`"
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl From<&str> for AcquisitionProtocol {
    fn from(s: &str) -> AcquisitionProtocol {
        match s {
            "CD11" => AcquisitionProtocol::Cd11,
            "SEEDLINK" => AcquisitionProtocol::Seedlink,
            "IMS_WAVEFORM" => AcquisitionProtocol::ImsWaveform,
            _ => AcquisitionProtocol::Unrecognized,
        }
    }
}

impl From<String> for AcquisitionProtocol {
    fn from(s: String) -> AcquisitionProtocol {
        AcquisitionProtocol::from(s.as_str())
    }
}

impl From<AcquisitionProtocol> for String {
    fn from(proto: AcquisitionProtocol) -> String {
        proto.as_str().to_owned()
    }
}

impl fmt::Display for AcquisitionProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Result of authenticating a frame's signature
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthenticationStatus {
    /// Station does not sign its frames
    NotApplicable,

    /// Signature checked and rejected
    AuthenticationFailed,

    /// Signature checked and accepted
    AuthenticationSucceeded,

    /// Signature not yet checked
    NotYetAuthenticated,
}

/// Error reading a [`RawStationDataFrame`] from a data file
#[derive(Error, Debug)]
pub enum FrameReadErr {
    /// The file could not be read
    #[error("unable to read station data file: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents are not a valid frame
    #[error("malformed station data frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One frame of station data, exactly as received
///
/// A transfer agent writes each frame to its own data file as a
/// JSON document with camelCase keys. The `rawPayload` is the
/// complete protocol frame, encoded as base64. Frames are stored
/// once and never modified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStationDataFrame {
    /// Unique id of this frame
    pub id: Uuid,

    /// Station which sent the frame
    pub station_id: Uuid,

    /// Channels with data in the frame
    pub channel_ids: Vec<ChannelId>,

    /// Protocol the payload is encoded in
    pub acquisition_protocol: AcquisitionProtocol,

    /// Time of the earliest data in the payload
    pub payload_data_start_time: DateTime<Utc>,

    /// Time of the latest data in the payload
    pub payload_data_end_time: DateTime<Utc>,

    /// When the frame was received from the station
    pub reception_time: DateTime<Utc>,

    /// Signature check outcome
    pub authentication_status: AuthenticationStatus,

    /// Protocol frame bytes
    #[serde(with = "base64_payload")]
    pub raw_payload: Vec<u8>,
}

impl RawStationDataFrame {
    /// Parse a frame from the contents of a data file
    pub fn from_slice(data: &[u8]) -> Result<Self, FrameReadErr> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Read and parse a frame from the data file at `path`
    pub fn from_path<P>(path: P) -> Result<Self, FrameReadErr>
    where
        P: AsRef<Path>,
    {
        let data = fs::read(path)?;
        Self::from_slice(&data)
    }

    /// Serialize to the data file representation
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

mod base64_payload {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

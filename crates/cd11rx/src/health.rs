//! Station state-of-health records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumMessage;

use crate::waveform::{ChannelId, CreationInfo};

/// Boolean state-of-health attribute
///
/// Each attribute is a single flag in the CD-1.1 channel status
/// block. Attributes display as their upper-case code and may be
/// parsed from it.
///
/// ```
/// use cd11rx::BooleanHealthType;
///
/// let ty: BooleanHealthType = "VAULT_DOOR_OPENED".parse().unwrap();
/// assert_eq!(BooleanHealthType::VaultDoorOpened, ty);
/// assert_eq!("VAULT_DOOR_OPENED", ty.as_str());
/// assert_eq!("Vault door opened", ty.as_display_str());
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::EnumIter,
    strum_macros::EnumMessage,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BooleanHealthType {
    /// Sensor channel is dead
    #[strum(detailed_message = "Dead sensor channel")]
    DeadSensorChannel,

    /// Samples were zeroed
    #[strum(detailed_message = "Zeroed data")]
    ZeroedData,

    /// Samples were clipped
    #[strum(detailed_message = "Clipped")]
    Clipped,

    /// Calibration in progress
    #[strum(detailed_message = "Calibration underway")]
    CalibrationUnderway,

    /// Equipment housing is open
    #[strum(detailed_message = "Equipment housing open")]
    EquipmentHousingOpen,

    /// Digitizing equipment is open
    #[strum(detailed_message = "Digitizing equipment open")]
    DigitizingEquipmentOpen,

    /// Vault door opened
    #[strum(detailed_message = "Vault door opened")]
    VaultDoorOpened,

    /// Authentication seal broken
    #[strum(detailed_message = "Authentication seal broken")]
    AuthenticationSealBroken,

    /// Equipment has moved
    #[strum(detailed_message = "Equipment moved")]
    EquipmentMoved,

    /// Clock differential exceeds its threshold
    #[strum(detailed_message = "Clock differential too large")]
    ClockDifferentialTooLarge,

    /// GPS receiver powered off
    #[strum(detailed_message = "GPS receiver off")]
    GpsReceiverOff,

    /// GPS receiver has no lock
    #[strum(detailed_message = "GPS receiver unlocked")]
    GpsReceiverUnlocked,

    /// Digitizer analog input shorted
    #[strum(detailed_message = "Digitizer analog input shorted")]
    DigitizerAnalogInputShorted,

    /// Digitizer calibration loop back
    #[strum(detailed_message = "Digitizer calibration loop back")]
    DigitizerCalibrationLoopBack,

    /// Main power has failed
    #[strum(detailed_message = "Main power failure")]
    MainPowerFailure,

    /// Backup power is unstable
    #[strum(detailed_message = "Backup power unstable")]
    BackupPowerUnstable,
}

/// Analog (numeric) state-of-health attribute
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::EnumIter,
    strum_macros::EnumMessage,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalogHealthType {
    /// Clock differential, in microseconds
    ///
    /// Reported by the station whenever the clock differential
    /// exceeds its threshold.
    #[strum(detailed_message = "Clock differential in microseconds over threshold")]
    ClockDifferentialInMicrosecondsOverThreshold,
}

macro_rules! health_type_strs {
    ($ty:ty) => {
        impl $ty {
            /// Upper-case code, like "`CLIPPED`"
            pub fn as_str(&self) -> &'static str {
                self.into()
            }

            /// Human-readable description
            pub fn as_display_str(&self) -> &'static str {
                self.get_detailed_message().unwrap_or_else(|| self.as_str())
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &'static str {
                self.as_str()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.as_str().fmt(f)
            }
        }
    };
}

health_type_strs!(BooleanHealthType);
health_type_strs!(AnalogHealthType);

/// One observation of a health attribute over a time span
///
/// `T` is the attribute type and `V` is the observed value. The
/// observation holds for `[start_time, end_time)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthObservation<T, V> {
    /// Channel the observation applies to
    pub channel_id: ChannelId,

    /// Attribute which was observed
    #[serde(rename = "type")]
    pub kind: T,

    /// Observed value
    pub value: V,

    /// Start of the observation, inclusive
    pub start_time: DateTime<Utc>,

    /// End of the observation, exclusive
    pub end_time: DateTime<Utc>,

    /// Provenance
    pub creation_info: CreationInfo,
}

/// A station state-of-health record
///
/// Derived from the channel status block of a CD-1.1 subframe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "recordType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthRecord {
    /// A flag which is either set or clear
    Boolean(HealthObservation<BooleanHealthType, bool>),

    /// A numeric measurement
    Analog(HealthObservation<AnalogHealthType, f64>),
}

impl HealthRecord {
    /// Channel the record applies to
    pub fn channel_id(&self) -> ChannelId {
        match self {
            Self::Boolean(obs) => obs.channel_id,
            Self::Analog(obs) => obs.channel_id,
        }
    }

    /// Upper-case code of the observed attribute
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::Boolean(obs) => obs.kind.as_str(),
            Self::Analog(obs) => obs.kind.as_str(),
        }
    }

    /// Start of the observation, inclusive
    pub fn start_time(&self) -> DateTime<Utc> {
        match self {
            Self::Boolean(obs) => obs.start_time,
            Self::Analog(obs) => obs.start_time,
        }
    }

    /// End of the observation, exclusive
    pub fn end_time(&self) -> DateTime<Utc> {
        match self {
            Self::Boolean(obs) => obs.end_time,
            Self::Analog(obs) => obs.end_time,
        }
    }

    /// Boolean value, if this is a boolean record
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(obs) => Some(obs.value),
            Self::Analog(_) => None,
        }
    }

    /// Numeric value, if this is an analog record
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Boolean(_) => None,
            Self::Analog(obs) => Some(obs.value),
        }
    }
}

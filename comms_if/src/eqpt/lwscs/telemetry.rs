//! # LWSCS Telemetry
//!
//! Conversion of a validated status into the telemetry published to downstream consumers. The
//! controller reports angles in radians, telemetry is published in degrees.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{serialize_number, ChannelPair, LwscsStatus};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the telemetry conversion.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TelemetryParams {
    /// Convert the angular fields (position and velocity) from radians to degrees.
    pub convert_to_degrees: bool,
}

/// Light and wind screen telemetry.
///
/// Same readings as [`LwscsStatus`] minus the `status` string, which consumers receive as a
/// motion event instead.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LwscsTelemetry {
    /// deg (or rad if not converted)
    #[serde(serialize_with = "serialize_number")]
    pub position_actual: f64,
    #[serde(serialize_with = "serialize_number")]
    pub position_commanded: f64,

    /// deg/s (or rad/s if not converted)
    #[serde(serialize_with = "serialize_number")]
    pub velocity_actual: f64,
    #[serde(serialize_with = "serialize_number")]
    pub velocity_commanded: f64,

    pub drive_torque_actual: ChannelPair,
    pub drive_torque_commanded: ChannelPair,
    pub drive_current_actual: ChannelPair,
    pub drive_temperature: ChannelPair,
    pub encoder_head_raw: ChannelPair,
    pub encoder_head_calibrated: ChannelPair,
    pub resolver_raw: ChannelPair,
    pub resolver_calibrated: ChannelPair,
    #[serde(serialize_with = "serialize_number")]
    pub power_draw: f64,

    /// Sample time in seconds, `timestampUTC` in the status reply.
    #[serde(serialize_with = "serialize_number")]
    pub timestamp: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for TelemetryParams {
    fn default() -> Self {
        Self {
            convert_to_degrees: true,
        }
    }
}

impl LwscsStatus {
    /// Build the telemetry for this status.
    pub fn to_telemetry(&self, params: &TelemetryParams) -> LwscsTelemetry {
        let angle = |rad: f64| {
            if params.convert_to_degrees {
                rad.to_degrees()
            } else {
                rad
            }
        };

        LwscsTelemetry {
            position_actual: angle(self.position_actual),
            position_commanded: angle(self.position_commanded),
            velocity_actual: angle(self.velocity_actual),
            velocity_commanded: angle(self.velocity_commanded),
            drive_torque_actual: self.drive_torque_actual,
            drive_torque_commanded: self.drive_torque_commanded,
            drive_current_actual: self.drive_current_actual,
            drive_temperature: self.drive_temperature,
            encoder_head_raw: self.encoder_head_raw,
            encoder_head_calibrated: self.encoder_head_calibrated,
            resolver_raw: self.resolver_raw,
            resolver_calibrated: self.resolver_calibrated,
            power_draw: self.power_draw,
            timestamp: self.timestamp_utc,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

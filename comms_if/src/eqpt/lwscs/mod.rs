//! # Light and Wind Screen Control System (LWSCS) Status
//!
//! The LWSCS controller answers a status request with a single JSON reply: a numeric `response`
//! code plus an `LWSCS` object carrying the screen's position and velocity, the readings of both
//! drives, both encoder heads and both resolvers, the power draw and a timestamp.
//!
//! Both levels of the reply are closed: every field is required and no other field is allowed.
//! Decoded replies become typed values only through [`validate`] (or the `Deserialize` and
//! [`LwscsEnvelope::from_json`] wrappers around it). Pair fields are fixed size arrays, so the
//! channel count of a typed value never needs checking again.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod schema;
mod telemetry;
mod validate;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{
    de::{self, IntoDeserializer},
    ser::SerializeTuple,
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::Value;
use thiserror::Error;

pub use schema::{ENVELOPE_FIELDS, LWSCS_KEY, LWSCS_STATUS_SCHEMA, STATUS_FIELDS};
pub use telemetry::{LwscsTelemetry, TelemetryParams};
pub use validate::{validate, validate_status, FieldPath, JsonType, ValidationError, Violation};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of channels in every pair field (two drives, two encoder heads, two resolvers).
pub const NUM_CHANNELS: usize = 2;

const NANOS_PER_SECOND: f64 = 1e9;

/// Largest magnitude below which every whole `f64` is an exact integer (2^53).
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A complete status reply from the LWSCS controller.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LwscsEnvelope {
    /// Response code of the reply, see [`ResponseCode`].
    #[serde(serialize_with = "serialize_number")]
    pub response: f64,

    /// The status payload.
    #[serde(rename = "LWSCS")]
    pub lwscs: LwscsStatus,
}

/// The status of the light and wind screen.
///
/// All `*Commanded` fields are readbacks of what the controller is currently tracking, not
/// demands.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LwscsStatus {
    /// Motion state reported by the controller, see [`LwscsStatus::motion_state`].
    pub status: String,

    #[serde(serialize_with = "serialize_number")]
    pub position_actual: f64,
    #[serde(serialize_with = "serialize_number")]
    pub position_commanded: f64,
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

    /// Time at which the controller sampled the status, in seconds.
    #[serde(rename = "timestampUTC", serialize_with = "serialize_number")]
    pub timestamp_utc: f64,
}

/// A reading from two independent channels, index 0 and index 1.
///
/// Channel order is part of the contract, the pair is never sorted. Serializes as a two element
/// array.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(transparent)]
pub struct ChannelPair(pub [f64; NUM_CHANNELS]);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Interpretation of the envelope's numeric `response` field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseCode {
    /// The request was executed
    Ok,

    /// The controller did not recognise the request
    UnsupportedCommand,

    /// The request had missing or incorrect parameters
    IncorrectParameter,

    /// Any other code
    Other(f64),
}

/// Motion states the controller reports in the `status` field.
///
/// The contract does not restrict `status` to these values, an unrecognised state is still a
/// valid status.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MotionState {
    Moving,
    Crawling,
    Stopping,
    Stopped,
    Parking,
    Parked,
}

/// Errors which can occur when parsing a status reply from text.
#[derive(Debug, Error)]
pub enum StatusParseError {
    #[error("Status reply contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LwscsEnvelope {
    /// Validate a decoded reply, see [`validate`].
    pub fn validate(value: &Value) -> Result<Self, ValidationError> {
        validate(value)
    }

    /// Parse and validate a reply line.
    ///
    /// Surrounding whitespace, including the `\r\n` terminator the controller writes after each
    /// reply, is ignored.
    pub fn from_json(json_str: &str) -> Result<Self, StatusParseError> {
        let value: Value = match serde_json::from_str(json_str.trim()) {
            Ok(v) => v,
            Err(e) => return Err(StatusParseError::InvalidJson(e)),
        };

        Ok(validate(&value)?)
    }

    /// Convert back into the wire shape.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Serialize into a single line of JSON in contract field order, without the line
    /// terminator.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Interpretation of the `response` field.
    pub fn response_code(&self) -> ResponseCode {
        ResponseCode::from_value(self.response)
    }

    /// True if the controller reported success.
    pub fn is_ok(&self) -> bool {
        self.response_code() == ResponseCode::Ok
    }
}

impl LwscsStatus {
    /// The reported motion state, or `None` if the controller reported a state this software
    /// does not know about.
    pub fn motion_state(&self) -> Option<MotionState> {
        self.status.parse().ok()
    }

    /// The sample time as a UTC date time.
    ///
    /// `None` if the timestamp is not finite or cannot be represented.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if !self.timestamp_utc.is_finite() {
            return None;
        }

        let secs = self.timestamp_utc.floor();
        if secs < i64::MIN as f64 || secs >= i64::MAX as f64 {
            return None;
        }

        let mut secs = secs as i64;
        let mut nanos = ((self.timestamp_utc - secs as f64) * NANOS_PER_SECOND).round() as u32;
        if nanos >= NANOS_PER_SECOND as u32 {
            secs = secs.checked_add(1)?;
            nanos = 0;
        }

        Utc.timestamp_opt(secs, nanos).single()
    }
}

impl ChannelPair {
    /// Create a new pair from channel 0 and channel 1.
    pub fn new(first: f64, second: f64) -> Self {
        Self([first, second])
    }

    /// Channel 0 (primary drive, head A).
    pub fn first(&self) -> f64 {
        self.0[0]
    }

    /// Channel 1 (secondary drive, head B).
    pub fn second(&self) -> f64 {
        self.0[1]
    }

    /// Get a channel by index, `None` if out of range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }
}

impl Serialize for ChannelPair {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(NUM_CHANNELS)?;
        for channel in self.0.iter() {
            tuple.serialize_element(&WireNumber(*channel))?;
        }
        tuple.end()
    }
}

impl ResponseCode {
    /// Interpret a numeric response code.
    pub fn from_value(value: f64) -> Self {
        if value == 0.0 {
            ResponseCode::Ok
        } else if value == 2.0 {
            ResponseCode::UnsupportedCommand
        } else if value == 3.0 {
            ResponseCode::IncorrectParameter
        } else {
            ResponseCode::Other(value)
        }
    }
}

impl MotionState {
    /// True if the screen is considered in position while in this state.
    pub fn in_position(&self) -> bool {
        matches!(self, MotionState::Stopped | MotionState::Crawling)
    }
}

impl FromStr for MotionState {
    type Err = de::value::Error;

    /// Parse a state from its wire name, using the names serde declares for the enum.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::deserialize(s.into_deserializer())
    }
}

impl<'de> Deserialize<'de> for LwscsEnvelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        validate(&value).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for LwscsStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        validate_status(&value).map_err(de::Error::custom)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// A number as written on the wire.
///
/// Whole numbers inside the exactly representable integer range are written as integers so that
/// a reply like `"response": 0` comes back out the way it went in. Negative zero and fractional
/// values stay floats. Non-finite values are left to the serializer (`null` in JSON).
struct WireNumber(f64);

impl Serialize for WireNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let v = self.0;
        let is_negative_zero = v == 0.0 && v.is_sign_negative();

        if v.fract() == 0.0 && v.abs() <= MAX_EXACT_INT && !is_negative_zero {
            serializer.serialize_i64(v as i64)
        } else {
            serializer.serialize_f64(v)
        }
    }
}

/// `serialize_with` helper for the scalar numeric fields.
pub(crate) fn serialize_number<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    WireNumber(*value).serialize(serializer)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn minimal_reply() -> Value {
        json!({
            "response": 0,
            "LWSCS": {
                "status": "OK",
                "positionActual": 1.0,
                "positionCommanded": 1.0,
                "velocityActual": 0.0,
                "velocityCommanded": 0.0,
                "driveTorqueActual": [0, 0],
                "driveTorqueCommanded": [0, 0],
                "driveCurrentActual": [0, 0],
                "driveTemperature": [20, 20],
                "encoderHeadRaw": [0, 0],
                "encoderHeadCalibrated": [0, 0],
                "resolverRaw": [0, 0],
                "resolverCalibrated": [0, 0],
                "powerDraw": 5.0,
                "timestampUTC": 1700000000
            }
        })
    }

    /// Compare two documents, treating numbers as equal if they have the same value regardless of
    /// whether they were written as integers or floats.
    fn assert_equivalent(a: &Value, b: &Value) {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => assert_eq!(x.as_f64(), y.as_f64()),
            (Value::Array(x), Value::Array(y)) => {
                assert_eq!(x.len(), y.len());
                x.iter().zip(y).for_each(|(x, y)| assert_equivalent(x, y));
            }
            (Value::Object(x), Value::Object(y)) => {
                assert_eq!(x.keys().collect::<Vec<_>>(), y.keys().collect::<Vec<_>>());
                x.iter().for_each(|(k, v)| assert_equivalent(v, &y[k]));
            }
            (x, y) => assert_eq!(x, y),
        }
    }

    #[test]
    fn test_minimal_reply_round_trip() {
        let reply = minimal_reply();
        let envelope = LwscsEnvelope::validate(&reply).unwrap();

        assert_eq!(envelope.response, 0.0);
        assert_eq!(envelope.lwscs.status, "OK");
        assert_eq!(envelope.lwscs.drive_temperature, ChannelPair::new(20.0, 20.0));
        assert_eq!(envelope.lwscs.timestamp_utc, 1_700_000_000.0);

        // The rebuilt document has the same fields and values
        assert_equivalent(&envelope.to_value().unwrap(), &reply);
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let first = LwscsEnvelope::validate(&minimal_reply()).unwrap();
        let second = LwscsEnvelope::validate(&first.to_value().unwrap()).unwrap();
        assert_eq!(first, second);

        let line = first.to_json().unwrap();
        assert_eq!(LwscsEnvelope::from_json(&line).unwrap(), first);
    }

    #[test]
    fn test_serializers_agree() {
        let envelope = LwscsEnvelope::validate(&minimal_reply()).unwrap();

        // Going through serde directly gives exactly the same document, numbers included
        let value = envelope.to_value().unwrap();
        assert_eq!(serde_json::to_value(&envelope).unwrap(), value);
        assert_eq!(value["response"], json!(0));
        assert!(value["response"].is_i64());
        assert_eq!(value["LWSCS"]["positionActual"], json!(1));
        assert_eq!(value["LWSCS"]["driveTemperature"], json!([20, 20]));

        // Keys come out in contract order, not sorted
        let line = envelope.to_json().unwrap();
        assert_eq!(serde_json::to_string(&envelope).unwrap(), line);
        assert!(line.starts_with(
            "{\"response\":0,\"LWSCS\":{\"status\":\"OK\",\"positionActual\":1,\"positionCommanded\""
        ));
        assert!(line.ends_with("\"powerDraw\":5,\"timestampUTC\":1700000000}}"));
    }

    #[test]
    fn test_from_json_line() {
        let line = format!("{}\r\n", minimal_reply());
        let envelope = LwscsEnvelope::from_json(&line).unwrap();
        assert!(envelope.is_ok());

        match LwscsEnvelope::from_json("{\"response\": 0,") {
            Err(StatusParseError::InvalidJson(_)) => (),
            r => panic!("Expected InvalidJson, got {:?}", r),
        }

        match LwscsEnvelope::from_json("{\"response\": 0}") {
            Err(StatusParseError::Invalid(e)) => {
                assert_eq!(e.violations(), &[Violation::MissingField(FieldPath::from("LWSCS"))])
            }
            r => panic!("Expected Invalid, got {:?}", r),
        }
    }

    #[test]
    fn test_deserialize_is_strict() {
        let mut reply = minimal_reply();
        assert!(serde_json::from_value::<LwscsEnvelope>(reply.clone()).is_ok());

        reply["LWSCS"]["positionError"] = json!(0.1);
        let err = serde_json::from_value::<LwscsEnvelope>(reply.clone()).unwrap_err();
        assert!(err.to_string().contains("LWSCS.positionError"));

        // The status object on its own is held to the same rules
        assert!(serde_json::from_value::<LwscsStatus>(reply["LWSCS"].clone()).is_err());
    }

    #[test]
    fn test_channel_order_preserved() {
        let mut reply = minimal_reply();
        reply["LWSCS"]["encoderHeadRaw"] = json!([3.5, -1.25]);
        let envelope = LwscsEnvelope::validate(&reply).unwrap();

        assert_eq!(envelope.lwscs.encoder_head_raw.first(), 3.5);
        assert_eq!(envelope.lwscs.encoder_head_raw.second(), -1.25);
        assert_eq!(envelope.lwscs.encoder_head_raw.get(2), None);
        assert_eq!(
            envelope.to_value().unwrap()["LWSCS"]["encoderHeadRaw"],
            json!([3.5, -1.25])
        );
    }

    #[test]
    fn test_response_code() {
        assert_eq!(ResponseCode::from_value(0.0), ResponseCode::Ok);
        assert_eq!(ResponseCode::from_value(2.0), ResponseCode::UnsupportedCommand);
        assert_eq!(ResponseCode::from_value(3.0), ResponseCode::IncorrectParameter);
        assert_eq!(ResponseCode::from_value(7.5), ResponseCode::Other(7.5));

        // Any numeric response is structurally valid
        let mut reply = minimal_reply();
        reply["response"] = json!(3);
        let envelope = LwscsEnvelope::validate(&reply).unwrap();
        assert!(!envelope.is_ok());
        assert_eq!(envelope.response_code(), ResponseCode::IncorrectParameter);
    }

    #[test]
    fn test_motion_state() {
        let mut reply = minimal_reply();
        let envelope = LwscsEnvelope::validate(&reply).unwrap();
        assert_eq!(envelope.lwscs.motion_state(), None);

        reply["LWSCS"]["status"] = json!("CRAWLING");
        let envelope = LwscsEnvelope::validate(&reply).unwrap();
        let state = envelope.lwscs.motion_state().unwrap();
        assert_eq!(state, MotionState::Crawling);
        assert!(state.in_position());
        assert!(!MotionState::Moving.in_position());

        for state in &[
            MotionState::Moving,
            MotionState::Crawling,
            MotionState::Stopping,
            MotionState::Stopped,
            MotionState::Parking,
            MotionState::Parked,
        ] {
            // Parsing accepts exactly the names the state serializes as
            let name = serde_json::to_value(state).unwrap();
            let name = name.as_str().unwrap();
            assert_eq!(name.parse::<MotionState>().unwrap(), *state);
            assert_eq!(name.to_lowercase().parse::<MotionState>().ok(), None);
        }

        assert_eq!("STOPPED".parse::<MotionState>().unwrap(), MotionState::Stopped);
        assert!("OK".parse::<MotionState>().is_err());
    }

    #[test]
    fn test_timestamp() {
        let mut status = LwscsEnvelope::validate(&minimal_reply()).unwrap().lwscs;
        let ts = status.timestamp().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_nanos(), 0);

        status.timestamp_utc = 1_700_000_000.5;
        let ts = status.timestamp().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 500);

        status.timestamp_utc = f64::NAN;
        assert_eq!(status.timestamp(), None);

        status.timestamp_utc = 1e300;
        assert_eq!(status.timestamp(), None);
    }

    #[test]
    fn test_wire_numbers() {
        let number = |v: f64| serde_json::to_value(WireNumber(v)).unwrap();

        assert_eq!(number(0.0), json!(0));
        assert_eq!(number(-12.0), json!(-12));
        assert_eq!(number(1.5), json!(1.5));
        assert_eq!(number(1e300), json!(1e300));
        assert_eq!(number(f64::INFINITY), Value::Null);

        // Negative zero keeps its sign
        let zero = number(-0.0);
        assert!(zero.is_f64());
        assert!(zero.as_f64().unwrap().is_sign_negative());
        assert_eq!(serde_json::to_string(&WireNumber(-0.0)).unwrap(), "-0.0");

        let mut reply = minimal_reply();
        reply["LWSCS"]["velocityActual"] = json!(-0.0);
        reply["LWSCS"]["resolverRaw"] = json!([-0.0, 2]);
        let envelope = LwscsEnvelope::validate(&reply).unwrap();
        let value = envelope.to_value().unwrap();
        assert!(value["LWSCS"]["velocityActual"].as_f64().unwrap().is_sign_negative());
        assert!(value["LWSCS"]["resolverRaw"][0].as_f64().unwrap().is_sign_negative());
        assert_eq!(value["LWSCS"]["resolverRaw"][1], json!(2));
    }
}

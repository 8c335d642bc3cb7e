//! # LWSCS Status Schema
//!
//! Field allow-lists used by the validator, and the JSON Schema (draft-07) document describing the
//! same contract for producers which validate on their side.

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Key of the status object inside the envelope.
pub const LWSCS_KEY: &str = "LWSCS";

/// Every field of the envelope, all required.
pub const ENVELOPE_FIELDS: [&str; 2] = ["response", LWSCS_KEY];

/// Every field of the status object, all required, in reply order.
pub const STATUS_FIELDS: [&str; 15] = [
    "status",
    "positionActual",
    "positionCommanded",
    "velocityActual",
    "velocityCommanded",
    "driveTorqueActual",
    "driveTorqueCommanded",
    "driveCurrentActual",
    "driveTemperature",
    "encoderHeadRaw",
    "encoderHeadCalibrated",
    "resolverRaw",
    "resolverCalibrated",
    "powerDraw",
    "timestampUTC",
];

/// JSON Schema of a status reply.
///
/// `$schema` is metadata only and is never sent with a reply.
pub const LWSCS_STATUS_SCHEMA: &str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "$id": "urn:lwscs:status",
  "description": "Status reply of the Light and Wind Screen Control System.",
  "definitions": {
    "pair": {
      "type": "array",
      "minItems": 2,
      "maxItems": 2,
      "items": { "type": "number" }
    }
  },
  "type": "object",
  "properties": {
    "response": { "type": "number" },
    "LWSCS": {
      "type": "object",
      "properties": {
        "status": { "type": "string" },
        "positionActual": { "type": "number" },
        "positionCommanded": { "type": "number" },
        "velocityActual": { "type": "number" },
        "velocityCommanded": { "type": "number" },
        "driveTorqueActual": { "$ref": "#/definitions/pair" },
        "driveTorqueCommanded": { "$ref": "#/definitions/pair" },
        "driveCurrentActual": { "$ref": "#/definitions/pair" },
        "driveTemperature": { "$ref": "#/definitions/pair" },
        "encoderHeadRaw": { "$ref": "#/definitions/pair" },
        "encoderHeadCalibrated": { "$ref": "#/definitions/pair" },
        "resolverRaw": { "$ref": "#/definitions/pair" },
        "resolverCalibrated": { "$ref": "#/definitions/pair" },
        "powerDraw": { "type": "number" },
        "timestampUTC": { "type": "number" }
      },
      "required": [
        "status",
        "positionActual",
        "positionCommanded",
        "velocityActual",
        "velocityCommanded",
        "driveTorqueActual",
        "driveTorqueCommanded",
        "driveCurrentActual",
        "driveTemperature",
        "encoderHeadRaw",
        "encoderHeadCalibrated",
        "resolverRaw",
        "resolverCalibrated",
        "powerDraw",
        "timestampUTC"
      ],
      "additionalProperties": false
    }
  },
  "required": ["response", "LWSCS"],
  "additionalProperties": false
}"##;

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_schema_matches_allow_lists() {
        let schema: Value = serde_json::from_str(LWSCS_STATUS_SCHEMA).unwrap();

        let required = |v: &Value| -> Vec<String> {
            v["required"]
                .as_array()
                .unwrap()
                .iter()
                .map(|s| s.as_str().unwrap().to_string())
                .collect()
        };

        assert_eq!(required(&schema), ENVELOPE_FIELDS);
        assert_eq!(required(&schema["properties"][LWSCS_KEY]), STATUS_FIELDS);

        let status_props = schema["properties"][LWSCS_KEY]["properties"].as_object().unwrap();
        assert_eq!(status_props.len(), STATUS_FIELDS.len());
        assert!(STATUS_FIELDS.iter().all(|f| status_props.contains_key(*f)));

        assert_eq!(schema["additionalProperties"], Value::Bool(false));
        assert_eq!(
            schema["properties"][LWSCS_KEY]["additionalProperties"],
            Value::Bool(false)
        );
    }
}

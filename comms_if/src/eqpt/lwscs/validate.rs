//! # LWSCS Status Validation
//!
//! Checks a decoded reply against the closed status contract. The check is explicit, field by
//! field against the allow-lists in [`super::schema`], and never relies on serde's derive to
//! reject unknown fields. Every violation found is reported, not just the first.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use log::{debug, trace};
use serde_json::{Map, Value};
use thiserror::Error;

use super::{
    schema::{ENVELOPE_FIELDS, LWSCS_KEY, STATUS_FIELDS},
    ChannelPair, LwscsEnvelope, LwscsStatus, NUM_CHANNELS,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Dotted path to a field in a reply, for example `LWSCS.powerDraw` or
/// `LWSCS.driveTorqueActual[1]`. The reply itself has the empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath(String);

/// The complete list of contract violations found in a reply.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "LWSCS status reply violates the contract ({} violation(s)): {}",
    .violations.len(),
    join_violations(.violations)
)]
pub struct ValidationError {
    violations: Vec<Violation>,
}

/// Walks one object of a reply, recording violations as it goes.
struct ObjectChecker<'a> {
    map: &'a Map<String, Value>,
    path: FieldPath,
    violations: &'a mut Vec<Violation>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A single breach of the status contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("{0}: required field is missing")]
    MissingField(FieldPath),

    #[error("{0}: field is not part of the contract")]
    UnexpectedField(FieldPath),

    #[error("{path}: expected {expected}, found {actual}")]
    TypeMismatch {
        path: FieldPath,
        expected: JsonType,
        actual: JsonType,
    },

    #[error("{path}: expected {expected} elements, found {actual}")]
    CardinalityMismatch {
        path: FieldPath,
        expected: usize,
        actual: usize,
    },
}

/// The kinds of value a generic decoder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Validate a decoded status reply.
///
/// On success the typed envelope is returned. On failure no partial value is returned, instead
/// the error lists every violation in the reply: envelope fields first, then the status fields in
/// contract order, then any unexpected fields.
///
/// Validation is a pure function of `value` and may be called from any number of threads.
pub fn validate(value: &Value) -> Result<LwscsEnvelope, ValidationError> {
    let mut violations = Vec::new();
    let envelope = check_envelope(value, &mut violations);

    finish(envelope, violations)
}

/// Validate a decoded `LWSCS` status object on its own, outside of an envelope.
///
/// Paths in the violations are still reported relative to the envelope (`LWSCS.<field>`).
pub fn validate_status(value: &Value) -> Result<LwscsStatus, ValidationError> {
    let mut violations = Vec::new();
    let status = check_status(value, FieldPath::from(LWSCS_KEY), &mut violations);

    finish(status, violations)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FieldPath {
    /// The path of a field inside the object at this path.
    pub fn field(&self, name: &str) -> Self {
        if self.0.is_empty() {
            Self(String::from(name))
        } else {
            Self(format!("{}.{}", self.0, name))
        }
    }

    /// The path of an element of the array at this path.
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "(reply)")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self(String::from(path))
    }
}

impl PartialEq<str> for FieldPath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for FieldPath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl ValidationError {
    /// All violations, in the order they were found.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Paths of every missing field.
    pub fn missing_fields(&self) -> Vec<&FieldPath> {
        self.violations
            .iter()
            .filter_map(|v| match v {
                Violation::MissingField(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

impl Violation {
    /// Path of the offending field.
    pub fn path(&self) -> &FieldPath {
        match self {
            Violation::MissingField(p) | Violation::UnexpectedField(p) => p,
            Violation::TypeMismatch { path, .. } | Violation::CardinalityMismatch { path, .. } => {
                path
            }
        }
    }
}

impl JsonType {
    /// The kind of the given value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Boolean,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        };
        write!(f, "{}", name)
    }
}

impl<'a> ObjectChecker<'a> {
    /// Start checking `value` as an object. `None` if it is not one, in which case a type mismatch
    /// has been recorded.
    fn new(
        value: &'a Value,
        path: FieldPath,
        violations: &'a mut Vec<Violation>,
    ) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self {
                map,
                path,
                violations,
            }),
            other => {
                violations.push(Violation::TypeMismatch {
                    path,
                    expected: JsonType::Object,
                    actual: JsonType::of(other),
                });
                None
            }
        }
    }

    /// Get a required field, recording it as missing if absent.
    fn required(&mut self, name: &str) -> Option<(&'a Value, FieldPath)> {
        let path = self.path.field(name);
        match self.map.get(name) {
            Some(v) => Some((v, path)),
            None => {
                self.violations.push(Violation::MissingField(path));
                None
            }
        }
    }

    fn number(&mut self, name: &str) -> Option<f64> {
        let (value, path) = self.required(name)?;
        check_number(value, path, self.violations)
    }

    fn string(&mut self, name: &str) -> Option<String> {
        let (value, path) = self.required(name)?;
        match value {
            Value::String(s) => Some(s.clone()),
            other => {
                self.violations.push(Violation::TypeMismatch {
                    path,
                    expected: JsonType::String,
                    actual: JsonType::of(other),
                });
                None
            }
        }
    }

    /// A two channel field. Every element is checked even if the length is wrong so that all
    /// problems with the field are reported together.
    fn pair(&mut self, name: &str) -> Option<ChannelPair> {
        let (value, path) = self.required(name)?;
        let elements = match value {
            Value::Array(a) => a,
            other => {
                self.violations.push(Violation::TypeMismatch {
                    path,
                    expected: JsonType::Array,
                    actual: JsonType::of(other),
                });
                return None;
            }
        };

        let mut valid = true;
        if elements.len() != NUM_CHANNELS {
            self.violations.push(Violation::CardinalityMismatch {
                path: path.clone(),
                expected: NUM_CHANNELS,
                actual: elements.len(),
            });
            valid = false;
        }

        let mut channels = [0.0; NUM_CHANNELS];
        for (i, element) in elements.iter().enumerate() {
            match check_number(element, path.index(i), self.violations) {
                Some(v) if i < NUM_CHANNELS => channels[i] = v,
                Some(_) => (),
                None => valid = false,
            }
        }

        if valid {
            Some(ChannelPair(channels))
        } else {
            None
        }
    }

    /// Record every field not in the allow-list.
    fn reject_unknown(&mut self, allowed: &[&str]) {
        for key in self.map.keys() {
            if !allowed.contains(&key.as_str()) {
                self.violations
                    .push(Violation::UnexpectedField(self.path.field(key)));
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn check_envelope(value: &Value, violations: &mut Vec<Violation>) -> Option<LwscsEnvelope> {
    let mut checker = ObjectChecker::new(value, FieldPath::default(), violations)?;

    let response = checker.number("response");
    let lwscs = checker
        .required(LWSCS_KEY)
        .and_then(|(v, path)| check_status(v, path, checker.violations));
    checker.reject_unknown(&ENVELOPE_FIELDS);

    Some(LwscsEnvelope {
        response: response?,
        lwscs: lwscs?,
    })
}

fn check_status(
    value: &Value,
    path: FieldPath,
    violations: &mut Vec<Violation>,
) -> Option<LwscsStatus> {
    let mut checker = ObjectChecker::new(value, path, violations)?;

    // Every field is checked before any is unwrapped so that all violations are recorded
    let status = checker.string("status");
    let position_actual = checker.number("positionActual");
    let position_commanded = checker.number("positionCommanded");
    let velocity_actual = checker.number("velocityActual");
    let velocity_commanded = checker.number("velocityCommanded");
    let drive_torque_actual = checker.pair("driveTorqueActual");
    let drive_torque_commanded = checker.pair("driveTorqueCommanded");
    let drive_current_actual = checker.pair("driveCurrentActual");
    let drive_temperature = checker.pair("driveTemperature");
    let encoder_head_raw = checker.pair("encoderHeadRaw");
    let encoder_head_calibrated = checker.pair("encoderHeadCalibrated");
    let resolver_raw = checker.pair("resolverRaw");
    let resolver_calibrated = checker.pair("resolverCalibrated");
    let power_draw = checker.number("powerDraw");
    let timestamp_utc = checker.number("timestampUTC");
    checker.reject_unknown(&STATUS_FIELDS);

    Some(LwscsStatus {
        status: status?,
        position_actual: position_actual?,
        position_commanded: position_commanded?,
        velocity_actual: velocity_actual?,
        velocity_commanded: velocity_commanded?,
        drive_torque_actual: drive_torque_actual?,
        drive_torque_commanded: drive_torque_commanded?,
        drive_current_actual: drive_current_actual?,
        drive_temperature: drive_temperature?,
        encoder_head_raw: encoder_head_raw?,
        encoder_head_calibrated: encoder_head_calibrated?,
        resolver_raw: resolver_raw?,
        resolver_calibrated: resolver_calibrated?,
        power_draw: power_draw?,
        timestamp_utc: timestamp_utc?,
    })
}

fn check_number(value: &Value, path: FieldPath, violations: &mut Vec<Violation>) -> Option<f64> {
    match value.as_f64() {
        Some(v) => Some(v),
        None => {
            violations.push(Violation::TypeMismatch {
                path,
                expected: JsonType::Number,
                actual: JsonType::of(value),
            });
            None
        }
    }
}

/// Turn the result of a check into the public result.
fn finish<T>(checked: Option<T>, violations: Vec<Violation>) -> Result<T, ValidationError> {
    match checked {
        Some(t) if violations.is_empty() => {
            trace!("LWSCS status reply valid");
            Ok(t)
        }
        _ => {
            debug!(
                "LWSCS status reply rejected with {} violation(s)",
                violations.len()
            );
            Err(ValidationError { violations })
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

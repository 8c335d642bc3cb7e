//! # Sample Checker
//!
//! Runs every recorded reply in a samples file through the status validator and keeps count of
//! the results.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::lwscs::{LwscsEnvelope, StatusParseError, TelemetryParams};
use log::{debug, warn};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Outcome of checking a samples file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Number of replies which honoured the contract
    pub num_valid: usize,

    /// Number of valid replies whose motion state puts the screen in position
    pub num_in_position: usize,

    /// Number of replies which did not parse or violated the contract
    pub num_invalid: usize,

    /// Line numbers (1 based) of the invalid replies
    pub invalid_lines: Vec<usize>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CheckReport {
    pub fn num_checked(&self) -> usize {
        self.num_valid + self.num_invalid
    }

    pub fn all_valid(&self) -> bool {
        self.num_invalid == 0
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Check every reply in `samples`, one JSON reply per line.
///
/// Lines may end in `\n` or `\r\n`, blank lines are skipped.
pub fn check_samples(
    samples: &str,
    telemetry_params: &TelemetryParams,
    stop_on_first_invalid: bool,
) -> CheckReport {
    let mut report = CheckReport::default();

    for (i, line) in samples.lines().enumerate() {
        let line_num = i + 1;
        if line.trim().is_empty() {
            continue;
        }

        match LwscsEnvelope::from_json(line) {
            Ok(envelope) => {
                report.num_valid += 1;

                if !envelope.is_ok() {
                    warn!(
                        "Line {}: controller responded with {:?}",
                        line_num,
                        envelope.response_code()
                    );
                }

                match envelope.lwscs.motion_state() {
                    Some(state) => {
                        let in_position = state.in_position();
                        if in_position {
                            report.num_in_position += 1;
                        }
                        debug!(
                            "Line {}: motion state {:?}, in position: {}",
                            line_num, state, in_position
                        );
                    }
                    None => warn!(
                        "Line {}: unrecognised motion state {:?}",
                        line_num, envelope.lwscs.status
                    ),
                }

                debug!(
                    "Line {}: telemetry {:?}",
                    line_num,
                    envelope.lwscs.to_telemetry(telemetry_params)
                );
            }
            Err(e) => {
                report.num_invalid += 1;
                report.invalid_lines.push(line_num);

                match e {
                    StatusParseError::InvalidJson(e) => {
                        warn!("Line {}: not valid JSON: {}", line_num, e)
                    }
                    StatusParseError::Invalid(e) => {
                        warn!(
                            "Line {}: {} contract violation(s)",
                            line_num,
                            e.violations().len()
                        );
                        for v in e.violations() {
                            warn!("    {}", v);
                        }
                    }
                }

                if stop_on_first_invalid {
                    break;
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLES: &str = include_str!("../../data/lwscs_samples.jsonl");

    #[test]
    fn test_recorded_samples() {
        let report = check_samples(SAMPLES, &TelemetryParams::default(), false);

        assert_eq!(report.num_valid, 4);
        assert_eq!(report.num_in_position, 3);
        assert_eq!(report.num_invalid, 3);
        assert_eq!(report.invalid_lines, vec![5, 6, 7]);
        assert_eq!(report.num_checked(), 7);
        assert!(!report.all_valid());
    }

    #[test]
    fn test_stop_on_first_invalid() {
        let report = check_samples(SAMPLES, &TelemetryParams::default(), true);

        assert_eq!(report.num_valid, 4);
        assert_eq!(report.num_invalid, 1);
        assert_eq!(report.invalid_lines, vec![5]);
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let line = SAMPLES.lines().next().unwrap();
        let samples = format!("\r\n{}\r\n\r\n   \n{}\r\n", line, line);
        let report = check_samples(&samples, &TelemetryParams::default(), false);

        assert_eq!(report.num_valid, 2);
        assert!(report.all_valid());
    }

    #[test]
    fn test_motion_states_counted() {
        let line = SAMPLES.lines().nth(1).unwrap();
        assert!(line.contains("\"MOVING\""));

        // A moving screen is valid but not in position
        let report = check_samples(line, &TelemetryParams::default(), false);
        assert_eq!(report.num_valid, 1);
        assert_eq!(report.num_in_position, 0);

        // An unknown state is still a valid reply
        let unknown = line.replace("\"MOVING\"", "\"OK\"");
        let stopped = line.replace("\"MOVING\"", "\"STOPPED\"");
        let samples = format!("{}\n{}\n", unknown, stopped);
        let report = check_samples(&samples, &TelemetryParams::default(), false);
        assert_eq!(report.num_valid, 2);
        assert_eq!(report.num_in_position, 1);
        assert!(report.all_valid());
    }

    #[test]
    fn test_empty_file() {
        let report = check_samples("", &TelemetryParams::default(), false);
        assert_eq!(report, CheckReport::default());
        assert!(report.all_valid());
    }
}

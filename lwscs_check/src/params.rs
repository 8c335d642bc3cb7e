//! # Status Check Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::lwscs::TelemetryParams;
use serde::Deserialize;
use std::path::PathBuf;
use util::logger::LevelFilter;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
pub struct LwscsCheckParams {
    /// File of recorded status replies, one JSON reply per line
    pub samples_path: PathBuf,

    /// Minimum level of log records to emit, must include `Info`
    #[serde(default = "default_log_level")]
    pub log_level: LevelFilter,

    /// Optional file to copy the log into
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Stop checking at the first reply which violates the contract
    #[serde(default)]
    pub stop_on_first_invalid: bool,

    /// Conversion applied to valid replies before they are logged as telemetry
    #[serde(default)]
    pub telemetry: TelemetryParams,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_log_level() -> LevelFilter {
    LevelFilter::Info
}

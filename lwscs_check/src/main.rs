//! # LWSCS Status Check Executable
//!
//! Checks a file of recorded status replies from the light and wind screen controller against the
//! status contract, reporting every violation found, and logs the telemetry derived from each
//! valid reply.
//!
//! Usage: `lwscs_check [PARAMS_FILE]`, where `PARAMS_FILE` defaults to
//! `params/lwscs_check.toml`.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Validation of the samples file.
mod checker;

/// Parameters for the status check executable.
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::info;

// Internal
use params::LwscsCheckParams;
use util::logger::logger_init;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const DEFAULT_PARAMS_PATH: &str = "params/lwscs_check.toml";

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- LOAD PARAMETERS ----

    let params_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from(DEFAULT_PARAMS_PATH));

    let params: LwscsCheckParams = util::params::load(&params_path)
        .wrap_err_with(|| format!("Failed to load parameters from {}", params_path))?;

    // ---- EARLY INITIALISATION ----

    logger_init(params.log_level, params.log_file.as_deref())
        .wrap_err("Failed to initialise logging")?;

    info!("LWSCS Status Check Executable\n");
    info!("Parameters loaded from {}", params_path);

    // ---- CHECK SAMPLES ----

    let samples = std::fs::read_to_string(&params.samples_path).wrap_err_with(|| {
        format!(
            "Failed to read the samples file {:?}",
            params.samples_path
        )
    })?;

    info!("Checking replies in {:?}", params.samples_path);

    let report =
        checker::check_samples(&samples, &params.telemetry, params.stop_on_first_invalid);

    info!(
        "Checked {} replies: {} valid ({} in position), {} invalid",
        report.num_checked(),
        report.num_valid,
        report.num_in_position,
        report.num_invalid
    );

    if report.all_valid() {
        Ok(())
    } else {
        Err(eyre!(
            "{} replies violate the LWSCS status contract (lines {:?})",
            report.num_invalid,
            report.invalid_lines
        ))
    }
}

//! Command line parsing for the `ad9361-rx` binary.

use clap::{ArgAction, CommandFactory, Parser};

use crate::RxConfig;

/// Exit status for usage errors and `-h`.
pub const USAGE_EXIT_CODE: i32 = 1;

/// Stream I/Q samples from an AD9361 over libiio and print per-refill statistics.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "ad9361-rx", disable_help_flag = true)]
pub struct Cli {
    /// libiio context URI, e.g. ip:192.168.2.1 (default context when omitted)
    #[arg(short = 'u', value_name = "URI")]
    pub uri: Option<String>,

    /// Sample rate in Msps
    #[arg(short = 'r', value_name = "MSPS", default_value_t = 20.0)]
    pub rate_msps: f64,

    /// Center frequency in GHz
    #[arg(short = 'f', value_name = "GHZ", default_value_t = 2.5)]
    pub freq_ghz: f64,

    /// RF bandwidth in MHz
    #[arg(short = 'w', value_name = "MHZ", default_value_t = 5.0)]
    pub bandwidth_mhz: f64,

    /// Buffer size in units of 1024 samples
    #[arg(short = 'b', value_name = "KSAMPLES", default_value_t = 1024)]
    pub buffer_ksamples: usize,

    /// Print this help and exit
    #[arg(short = 'h', action = ArgAction::SetTrue)]
    pub help: bool,
}

/// Reasons for not running.
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    /// `-h` was given.
    #[error("help requested")]
    Help,
    /// Arguments could not be parsed or are out of range.
    #[error("{0}")]
    Invalid(String),
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        USAGE_EXIT_CODE
    }
}

impl Cli {
    /// Parses `args`, the first item being the program name.
    pub fn try_parse_args<I, T>(args: I) -> Result<Cli, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| CliError::Invalid(e.to_string()))?;
        if cli.help {
            return Err(CliError::Help);
        }
        Ok(cli)
    }

    /// Usage text listing every flag.
    pub fn usage() -> String {
        Cli::command().render_help().to_string()
    }

    /// Converts the command line units to an [`RxConfig`].
    pub fn to_config(&self) -> Result<RxConfig, CliError> {
        let buffer_samples = self
            .buffer_ksamples
            .checked_mul(1024)
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                CliError::Invalid(format!("invalid value for -b: {}", self.buffer_ksamples))
            })?;

        Ok(RxConfig {
            uri: self.uri.clone(),
            sample_rate_hz: to_hz(self.rate_msps, 1e6, "-r")?,
            frequency_hz: to_hz(self.freq_ghz, 1e9, "-f")?,
            bandwidth_hz: to_hz(self.bandwidth_mhz, 1e6, "-w")?,
            buffer_samples,
            ..RxConfig::default()
        })
    }
}

fn to_hz(value: f64, scale: f64, flag: &str) -> Result<i64, CliError> {
    let hz = (value * scale).round();
    if !hz.is_finite() || hz <= 0.0 || hz > i64::MAX as f64 {
        return Err(CliError::Invalid(format!("invalid value for {flag}: {value}")));
    }
    Ok(hz as i64)
}

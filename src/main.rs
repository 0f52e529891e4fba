use std::process::ExitCode;

use ad9361_rx::cli::{Cli, CliError};
use ad9361_rx::iio::IioBackend;
use ad9361_rx::stream::{self, CancelToken, StopReason};
use ad9361_rx::{Ad9361, RxConfig};
use anyhow::{Context, Result};

fn main() -> ExitCode {
    let mut builder = env_logger::builder();
    builder
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stdout);
    builder.init();

    let config = match Cli::try_parse_args(std::env::args_os()).and_then(|cli| cli.to_config()) {
        Ok(config) => config,
        Err(e) => return usage(e),
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn usage(err: CliError) -> ExitCode {
    if let CliError::Invalid(msg) = &err {
        eprintln!("{}", msg.trim_end());
    }
    eprintln!("{}", Cli::usage());
    ExitCode::from(err.exit_code() as u8)
}

fn run(config: &RxConfig) -> Result<()> {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || token.cancel()).context("Failed to set Ctrl+C handler")?;

    log::info!("Creating IIO context");
    let backend = IioBackend::open(config.uri.as_deref()).context("Failed to open IIO context")?;
    let radio = Ad9361::open(backend).context("Failed to find AD9361")?;
    radio.configure(config).context("Failed to configure AD9361")?;

    let rx = radio
        .start_rx_stream(config.buffer_samples)
        .context("Failed to start rx stream")?;

    let summary = stream::run(rx, &cancel, config.check_overflow, |line| {
        println!("{line}");
    });

    match summary.reason {
        StopReason::Cancelled => log::info!("Streaming cancelled"),
        StopReason::RefillFailed(_) => log::info!("Streaming stopped after a refill error"),
    }
    log::info!(
        "Received {} samples in {} refills",
        summary.samples,
        summary.refills
    );

    drop(radio);
    Ok(())
}

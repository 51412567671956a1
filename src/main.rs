// src/main.rs

use anyhow::Result;
use clap::Parser;
use vaultport::cli::Cli;
use vaultport::config::ConfigBuilder;
use vaultport::errors::Error;
#[cfg(feature = "progress")]
use vaultport::progress::IndicatifProgress;
use vaultport::progress::ProgressReporter;
use vaultport::signal::setup_signal_handler;
use vaultport::{run, write_report, AutoConfirm, Confirmer, StdinConfirmer};
use std::sync::Arc;

fn main() -> Result<()> {
    // Initialize logging. Default to 'info' if RUST_LOG is not set.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                if cfg!(debug_assertions) {
                    "vaultport=debug".parse().unwrap()
                } else {
                    "vaultport=info".parse().unwrap()
                },
            ),
        )
        .init();

    log::info!("Starting vaultport v{}...", env!("CARGO_PKG_VERSION"));
    log::debug!("Raw arguments: {:?}", std::env::args().collect::<Vec<_>>());

    let args = Cli::parse();

    // Show a progress bar only when stderr is a TTY.
    let progress_reporter: Option<Arc<dyn ProgressReporter>> = {
        #[cfg(feature = "progress")]
        {
            if atty::is(atty::Stream::Stderr) {
                Some(Arc::new(IndicatifProgress::new()))
            } else {
                None
            }
        }
        #[cfg(not(feature = "progress"))]
        {
            None
        }
    };

    let config = ConfigBuilder::from_cli(args).build()?;
    log::debug!("Configuration built successfully.");

    let token = setup_signal_handler()?;

    let confirmer: Box<dyn Confirmer> = if config.assume_yes || config.dry_run {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(StdinConfirmer)
    };

    match run(&config, &token, progress_reporter, confirmer.as_ref()) {
        Ok(report) => {
            write_report(&mut std::io::stdout().lock(), &report)?;
            Ok(())
        }
        Err(Error::Interrupted) => {
            eprintln!("\nOperation cancelled.");
            std::process::exit(130);
        }
        Err(Error::NoDocumentsFound) => {
            eprintln!("vaultport: No documents found under the given root.");
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

//! e2e-harness binary entry point.

use std::process::ExitCode;

use e2e_harness::cli::{self, Args};
use e2e_harness::{logging, smoke, HarnessConfig};
use tracing::{debug, error};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run with --help for usage");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match HarnessConfig::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    // Another subscriber may already be installed when embedded.
    logging::try_init_with_level(&config.logging.level).ok();
    debug!(?config, "configuration loaded");

    run(&args, &config).await
}

async fn run(args: &Args, config: &HarnessConfig) -> ExitCode {
    match smoke::run(args, config).await {
        Ok(report) => {
            println!("{}", report);
            if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

//! matrix-informant entry point
//!
//! Run with:
//! ```bash
//! cargo run -p informant-api -- -c ./conf/informant.yaml
//! ```

use std::path::PathBuf;

use clap::Parser;
use informant_common::{
    init_tracing, try_init_tracing_with_config, AppConfig, TracingConfig, DEFAULT_CONFIG_PATH,
};
use tracing::{error, info};

const BUILD_HASH: &str = match option_env!("INFORMANT_BUILD_HASH") {
    Some(hash) => hash,
    None => "unknown",
};

const BUILD_DATE: &str = match option_env!("INFORMANT_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};

/// Relay webhook submissions into Matrix rooms
#[derive(Parser, Debug)]
#[command(name = "matrix-informant", about)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the build identifier and exit
    #[arg(short = 'v', long = "version-info")]
    version_info: bool,
}

fn version_string() -> String {
    format!("{BUILD_HASH} built on {BUILD_DATE}")
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.version_info {
        println!("{}", version_string());
        return;
    }

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            error!(error = %e, path = %cli.config.display(), "Failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(&TracingConfig::from_app_config(&config)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        version = %version_string(),
        config = %cli.config.display(),
        bind = %config.bind,
        "Starting matrix-informant"
    );

    if let Err(e) = informant_api::run(config).await {
        error!(error = %e, error_code = e.error_code(), "matrix-informant stopped");
        std::process::exit(1);
    }
}

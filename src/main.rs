/*!
 * Orbit Uplink CLI
 *
 * Fires N parallel uploads of one file at a media-upload server and
 * reports how many the server accepted.
 */

use clap::{Parser, ValueEnum};
use orbit_uplink::{
    cli_style::{self, print_error, print_info},
    config::{LogLevel, UploadConfig},
    error::{Result, EXIT_SUCCESS},
    logging, UploadOrchestrator,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "orbit-uplink")]
#[command(version, about = "Test parallel uploads to a media-upload server", long_about = None)]
struct Cli {
    /// Path to the file to upload
    #[arg(value_name = "FILE")]
    file_path: PathBuf,

    /// Number of parallel uploads [default: 5]
    #[arg(short = 'n', long = "num-uploads")]
    num_uploads: Option<usize>,

    /// Server port [default: 9000]
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,

    /// Server hostname [default: localhost]
    #[arg(short = 'H', long = "host")]
    host: Option<String>,

    /// TOML configuration file; command-line flags take precedence
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long = "log-level", value_enum)]
    log_level: Option<LogLevelArg>,

    /// Write JSON logs to this file instead of stdout
    #[arg(long = "log", value_name = "FILE")]
    log: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Skip the per-worker summary table
    #[arg(long = "no-table")]
    no_table: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            print_error(&e.to_string(), Some("Run with --help for usage"));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    config.validate()?;

    if let Err(e) = logging::init_logging(&config) {
        cli_style::print_warning(&format!("Failed to initialize logging: {}", e));
    }

    let address = config.server_address();
    cli_style::print_run_header(
        &address.to_string(),
        config.num_uploads,
        &cli.file_path.display().to_string(),
    );

    let summary = UploadOrchestrator::new().run(&cli.file_path, config.num_uploads, &address);

    if config.show_table {
        println!();
        println!("{}", cli_style::upload_summary_table(&summary));
        println!("{}", cli_style::run_totals_table(&summary));
    }
    cli_style::print_summary_line(&summary);

    // Partial failure is reported, not turned into an exit code
    Ok(())
}

/// File config first, then command-line overrides
fn build_config(cli: &Cli) -> Result<UploadConfig> {
    let mut config = match cli.config {
        Some(ref path) => {
            let config = UploadConfig::from_file(path)?;
            print_info(&format!("Loaded configuration from {}", path.display()));
            config
        }
        None => UploadConfig::default(),
    };

    if let Some(n) = cli.num_uploads {
        config.num_uploads = n;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(ref host) = cli.host {
        config.host = host.clone();
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    if cli.verbose {
        config.verbose = true;
    }
    if cli.no_table {
        config.show_table = false;
    }

    Ok(config)
}

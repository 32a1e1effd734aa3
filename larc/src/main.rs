//! # larc
//!
//! Small archive tool on top of the `libarchive` crate.
//!
//! # Usage
//!
//! ```bash
//! # List entries (use "-" to read from stdin)
//! larc list src.tar.gz
//! larc list --long src.tar.gz
//! larc list --json src.zip
//!
//! # Create; format and compression follow the extension
//! larc create src.tar.xz -C project src Cargo.toml
//! larc create --format ustar --filter zstd out.bin src
//!
//! # Extract
//! larc extract src.tar.gz -C out --strip-components 1
//!
//! # Settings from a file, verbose logging
//! larc --config larc.toml -v extract src.tar.gz
//! ```

mod commands;

use clap::{Args as ClapArgs, Parser, Subcommand};
use libarchive::config::{ArchiveConfig, ConfigLoader, LogLevel};
use std::path::PathBuf;
use tracing::{Level, debug, error};
use tracing_subscriber::EnvFilter;

/// larc - list, create and extract archives
#[derive(Parser, Debug)]
#[command(name = "larc")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "List, create and extract archives with libarchive")]
#[command(long_about = None)]
struct Args {
    /// TOML configuration file ([read], [write], [extract] tables)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List archive entries
    List(ListArgs),
    /// Create an archive from files and directories
    Create(CreateArgs),
    /// Extract an archive
    Extract(ExtractArgs),
    /// Print the linked libarchive version
    Version,
}

/// Arguments for `larc list`
#[derive(ClapArgs, Debug)]
pub struct ListArgs {
    /// Archive to read, or "-" for stdin
    pub archive: PathBuf,

    /// Show type, permissions, size and mtime
    #[arg(short, long)]
    pub long: bool,

    /// One JSON object per entry
    #[arg(long, conflicts_with = "long")]
    pub json: bool,
}

/// Arguments for `larc create`
#[derive(ClapArgs, Debug)]
pub struct CreateArgs {
    /// Archive to write
    pub archive: PathBuf,

    /// Files and directories to add, relative to --directory
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Change to DIR before adding paths
    #[arg(short = 'C', long = "directory", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Archive format (pax, ustar, zip, 7zip, cpio, ...) instead of the extension
    #[arg(long)]
    pub format: Option<String>,

    /// Compression filter (can be specified multiple times)
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
}

/// Arguments for `larc extract`
#[derive(ClapArgs, Debug)]
pub struct ExtractArgs {
    /// Archive to read, or "-" for stdin
    pub archive: PathBuf,

    /// Extract into DIR
    #[arg(short = 'C', long = "directory", value_name = "DIR", default_value = ".")]
    pub directory: PathBuf,

    /// Replace existing files
    #[arg(long)]
    pub overwrite: bool,

    /// Do not restore permission bits
    #[arg(long)]
    pub no_same_permissions: bool,

    /// Drop N leading path components
    #[arg(long, value_name = "N")]
    pub strip_components: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("larc failed: {}", e);
        eprintln!("larc: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let config = ArchiveConfig::load(path)?;
            config.validate()?;
            Some(config)
        }
        None => None,
    };

    setup_tracing(&args, config.as_ref());
    debug!("larc v{} starting", env!("CARGO_PKG_VERSION"));

    let config = config.unwrap_or_default();
    let mut stdout = std::io::stdout().lock();

    match &args.command {
        Command::List(list) => commands::list(list, &config, &mut stdout)?,
        Command::Create(create) => commands::create(create, &config)?,
        Command::Extract(extract) => commands::extract(extract, &config)?,
        Command::Version => commands::version(&mut stdout)?,
    }

    Ok(())
}

fn log_level(verbose: bool, config: Option<&ArchiveConfig>) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    match config.map(|c| c.log_level).unwrap_or_default() {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

fn setup_tracing(args: &Args, config: Option<&ArchiveConfig>) {
    let level = log_level(args.verbose, config);

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use versionlib::{LibraryConfig, Version};

mod commands;

use commands::TableSource;

#[derive(Parser)]
#[command(name = "versionlib")]
#[command(about = "Inspect and build version tables", version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = "versionlib.json")]
    config: PathBuf,

    /// Directory holding version tables (overrides the config file)
    #[arg(long, global = true, env = "VERSIONLIB_DIR")]
    search_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every entry as `<id>\t<hex offset>`
    Dump {
        #[command(flatten)]
        source: SourceArgs,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show header fields and load statistics
    Info {
        #[command(flatten)]
        source: SourceArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Translate between identifiers, offsets and addresses
    Lookup {
        #[command(flatten)]
        source: SourceArgs,

        /// Module base address (hex) used for address queries
        #[arg(long)]
        base: Option<String>,

        /// Identifier to look up
        #[arg(long, conflicts_with_all = ["offset", "address"])]
        id: Option<u64>,

        /// Offset (hex) to look up
        #[arg(long, conflicts_with = "address")]
        offset: Option<String>,

        /// Address (hex) to look up; requires --base
        #[arg(long, requires = "base")]
        address: Option<String>,
    },
    /// Build a binary table from dump text
    Pack {
        /// Dump text (`<id> <hex offset>` per line)
        input: PathBuf,

        /// Output table; defaults to the configured location for --table-version
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Version recorded in the header
        #[arg(long = "table-version")]
        version: Version,

        /// Module the offsets are relative to (empty for the executable)
        #[arg(long, default_value = "")]
        module: String,

        /// Pointer size used for scaled offsets
        #[arg(long, default_value_t = 8, value_parser = parse_pointer_size)]
        pointer_size: u32,

        /// Overwrite an existing output file
        #[arg(short, long)]
        force: bool,
    },
    /// Print where the table for a version is expected
    Path {
        /// Build version, e.g. 3.0.64.38113
        version: Version,
    },
}

/// Which table to open.
#[derive(Args)]
struct SourceArgs {
    /// Build version, e.g. 3.0.64.38113 (default: the configured version provider)
    #[arg(long = "table-version", conflicts_with = "file")]
    version: Option<Version>,

    /// Table file, bypassing the configured directory
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl From<SourceArgs> for TableSource {
    fn from(args: SourceArgs) -> Self {
        match (args.file, args.version) {
            (Some(path), _) => TableSource::File(path),
            (None, Some(version)) => TableSource::Version(version),
            (None, None) => TableSource::Current,
        }
    }
}

fn parse_pointer_size(s: &str) -> std::result::Result<u32, String> {
    match s.trim() {
        "4" => Ok(4),
        "8" => Ok(8),
        other => Err(format!("pointer size must be 4 or 8, got {other}")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("versionlib={level}").parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = LibraryConfig::load_or_default(&cli.config);
    if let Some(dir) = cli.search_dir {
        config.search_dir = dir;
    }
    debug!("Using table directory {}", config.search_dir.display());

    match cli.command {
        Command::Dump { source, output } => {
            commands::dump::run(&config, source.into(), output.as_deref())
        }
        Command::Info { source, json } => commands::info::run(&config, source.into(), json),
        Command::Lookup {
            source,
            base,
            id,
            offset,
            address,
        } => {
            let query =
                commands::lookup::Query::from_args(id, offset.as_deref(), address.as_deref())?;
            commands::lookup::run(&config, source.into(), base.as_deref(), query)
        }
        Command::Pack {
            input,
            output,
            version,
            module,
            pointer_size,
            force,
        } => commands::pack::run(
            &config,
            &input,
            output.as_deref(),
            commands::pack::PackOptions {
                version,
                module,
                pointer_size,
                force,
            },
        ),
        Command::Path { version } => commands::path::run(&config, version),
    }
}

//! qsort-bridge - command line front end
//!
//! Sorts integers through the native `qsort` adapter and shows the different
//! comparator variants side by side.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use qsort_bridge::{BackendKind, ContextSorter, QsbConfig, Sorter, Variant};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// The values the book's qsort examples sort
const DEMO_VALUES: [i64; 6] = [42, 9, 101, 95, 27, 25];

#[derive(Parser)]
#[command(name = "qsb")]
#[command(version)]
#[command(about = "Sort through the native C qsort with Rust closures", long_about = None)]
struct Cli {
    /// Config file (default: nearest qsb.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List native backends and whether they resolve on this host
    Backends,

    /// Run every variant over the book's example values
    Demo {
        /// Native backend
        #[arg(long, value_enum)]
        backend: Option<BackendKind>,
    },

    /// Sort integers given as arguments, or read from stdin
    Sort {
        /// Values to sort; whitespace-separated stdin when empty
        #[arg(allow_negative_numbers = true)]
        values: Vec<i64>,

        /// Adapter entry point
        #[arg(long, value_enum)]
        variant: Option<Variant>,

        /// Native backend
        #[arg(long, value_enum)]
        backend: Option<BackendKind>,

        /// Sort largest first
        #[arg(long)]
        desc: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Backends => cmd_backends(&config),
        Commands::Demo { backend } => cmd_demo(&config, backend),
        Commands::Sort {
            values,
            variant,
            backend,
            desc,
        } => cmd_sort(&config, values, variant, backend, desc),
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<QsbConfig> {
    match path {
        Some(path) => QsbConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => QsbConfig::load_from_cwd().context("Failed to load qsb.toml"),
    }
}

fn cmd_backends(config: &QsbConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for kind in [BackendKind::Libc, BackendKind::Dynamic, BackendKind::Process] {
        let status = match config.backend.build_kind(kind) {
            Ok(_) => "available".to_string(),
            Err(e) => format!("unavailable ({})", e),
        };
        let detail = if kind == BackendKind::Dynamic {
            format!(" [{}]", config.backend.library_name())
        } else {
            String::new()
        };
        writeln!(out, "{:<8} {}{}", kind, status, detail)?;
    }

    let context = match ContextSorter::shared() {
        Ok(_) => "available".to_string(),
        Err(e) => format!("unavailable ({})", e),
    };
    writeln!(out, "{:<8} {} [qsort_r]", "context", context)?;
    Ok(())
}

fn cmd_demo(config: &QsbConfig, backend: Option<BackendKind>) -> Result<()> {
    let native = config
        .backend
        .build_kind(backend.unwrap_or(config.backend.kind))?;
    let sorter = Sorter::with_native(native);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{:<8} {:?}", "input", DEMO_VALUES)?;

    for variant in Variant::ALL {
        let mut values = DEMO_VALUES;
        match variant.apply(&sorter, &mut values, false) {
            Ok(()) => writeln!(out, "{:<8} {:?}", variant, values)?,
            Err(e) => writeln!(out, "{:<8} skipped: {}", variant, e)?,
        }
    }
    Ok(())
}

fn cmd_sort(
    config: &QsbConfig,
    values: Vec<i64>,
    variant: Option<Variant>,
    backend: Option<BackendKind>,
    desc: bool,
) -> Result<()> {
    let variant = variant.unwrap_or(config.sort.variant);
    if let (Variant::Context, Some(backend)) = (variant, backend) {
        bail!(
            "--backend {} cannot be combined with the context variant, which always sorts with the process's qsort_r",
            backend
        );
    }

    let mut values = if values.is_empty() {
        read_stdin_values()?
    } else {
        values
    };

    let descending = desc || config.sort.descending;
    let native = config
        .backend
        .build_kind(backend.unwrap_or(config.backend.kind))?;
    let sorter = Sorter::with_native(native);

    variant
        .apply(&sorter, &mut values, descending)
        .with_context(|| format!("Variant '{}' is not usable here", variant))?;

    let line = values
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(io::stdout(), "{}", line)?;
    Ok(())
}

fn read_stdin_values() -> Result<Vec<i64>> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read stdin")?;

    let mut values = Vec::new();
    for token in input.split_whitespace() {
        match token.parse() {
            Ok(v) => values.push(v),
            Err(_) => bail!("Not an integer: '{}'", token),
        }
    }
    Ok(values)
}

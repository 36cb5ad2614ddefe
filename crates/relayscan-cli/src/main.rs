mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "relayscan",
    version,
    about = "Active-setting extraction from protection relay settings exports"
)]
struct Cli {
    /// Log pipeline progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect checkboxes and resolve active settings of one or more exports
    Scan {
        /// Path(s) to settings export PDFs
        #[arg(required = true)]
        input_files: Vec<PathBuf>,

        /// Predefined profile: auto, dotted, hex, keyvalue
        #[arg(short, long, default_value = "auto")]
        profile: String,

        /// Custom JSON profile (takes precedence over --profile)
        #[arg(long = "profile-file", value_name = "FILE")]
        profile_file: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write the JSON result to a file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Include the per-setting trace in JSON output
        #[arg(long)]
        trace: bool,

        /// Do not paint text out before detection
        #[arg(long)]
        no_mask: bool,

        /// Override the profile's density threshold
        #[arg(long, value_name = "DENSITY")]
        threshold: Option<f32>,

        /// Override the detection strategy: contour or template
        #[arg(long)]
        strategy: Option<String>,

        /// Worker threads (default: one per CPU)
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Parse the text layer into parameter lines (no rendering)
    Parse {
        /// Path to settings export PDF
        input_file: PathBuf,

        /// Grammar: dotted, hex, keyvalue (default: detect)
        #[arg(short, long)]
        family: Option<String>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Derive a density threshold from hand-labelled checkboxes
    Calibrate {
        /// Labelled regions (JSON array of {page, x_px, y_px, width_px, height_px, marked})
        #[arg(long, value_name = "FILE", requires = "pdf", conflicts_with = "densities")]
        samples: Option<PathBuf>,

        /// Export the labelled regions belong to
        #[arg(long, value_name = "FILE")]
        pdf: Option<PathBuf>,

        /// Pre-measured densities (JSON array of {density, marked})
        #[arg(long, value_name = "FILE")]
        densities: Option<PathBuf>,

        /// Profile providing DPI and binarization settings
        #[arg(short, long, default_value = "auto")]
        profile: String,

        /// Custom JSON profile (takes precedence over --profile)
        #[arg(long = "profile-file", value_name = "FILE")]
        profile_file: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Manage and inspect scan profiles
    Profiles {
        #[command(subcommand)]
        action: ProfilesAction,
    },
}

#[derive(Subcommand)]
enum ProfilesAction {
    /// List predefined profiles
    List,
    /// Explain a profile in plain language
    Explain {
        /// Preset name (e.g., "hex")
        preset: String,
    },
    /// Print the JSON schema with field descriptions and example
    Schema,
    /// Validate a custom profile file
    Validate {
        /// Path to JSON profile file
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Scan {
            input_files,
            profile,
            profile_file,
            output,
            out,
            trace,
            no_mask,
            threshold,
            strategy,
            threads,
        } => commands::scan::run(commands::scan::ScanArgs {
            input_files,
            preset: profile,
            profile_file,
            output_format: output,
            out,
            trace,
            no_mask,
            threshold,
            strategy,
            threads,
        }),
        Commands::Parse {
            input_file,
            family,
            output,
        } => commands::parse::run(input_file, family.as_deref(), &output),
        Commands::Calibrate {
            samples,
            pdf,
            densities,
            profile,
            profile_file,
            output,
        } => commands::calibrate::run(
            samples,
            pdf,
            densities,
            &profile,
            profile_file,
            &output,
        ),
        Commands::Profiles { action } => match action {
            ProfilesAction::List => commands::profiles::list(),
            ProfilesAction::Explain { preset } => commands::profiles::explain(&preset),
            ProfilesAction::Schema => commands::profiles::schema(),
            ProfilesAction::Validate { file } => commands::profiles::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

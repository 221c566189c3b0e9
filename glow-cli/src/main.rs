//! Glow CLI - certified clinical photography from the command line.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use glow_core::{CaptureAngle, PhotoSeries};
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success (image certified)
  1   General error
  64  Usage error
  65  Verification failed (image modified, no watermark)
  66  Cannot read input file
  69  Ledger unavailable or no record found
  74  Cannot write output file";

#[derive(Parser)]
#[command(name = "glow")]
#[command(author, version, about = "Certified clinical photography", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,

    /// Use a local JSON ledger journal instead of Hedera
    #[arg(long, global = true, value_name = "PATH")]
    journal: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

/// Certification bundle encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cbor,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the clinic's ledger topic
    Topic {
        #[command(subcommand)]
        action: TopicAction,
    },

    /// Certify a photo: hash, notarize, watermark and encrypt
    Certify {
        /// Path to the captured image
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        #[arg(long)]
        clinic: String,

        #[arg(long)]
        patient: String,

        #[arg(long)]
        photographer: String,

        /// Capture angle, e.g. face_frontal
        #[arg(long)]
        angle: Option<CaptureAngle>,

        /// Procedure type, e.g. rhinoplasty
        #[arg(long)]
        procedure: Option<String>,

        /// Capturing device description
        #[arg(long)]
        device: Option<String>,

        /// Ledger topic to notarize on (defaults to HEDERA_TOPIC_ID)
        #[arg(long)]
        topic: Option<String>,

        /// Write the watermarked image as JPEG at this quality (90-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(90..=100))]
        jpeg_quality: Option<u8>,

        /// Bundle encoding
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Cbor)]
        format: OutputFormat,

        /// Bundle path (defaults to <IMAGE>.glow)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt the watermarked image stored in a bundle
    Decrypt {
        /// Path to the certification bundle (.glow)
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,

        /// Output image path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check an image against its ledger record
    Verify {
        /// Path to the image to check
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Read the proof from a certification bundle
        #[arg(long, conflicts_with_all = ["topic", "sequence"])]
        bundle: Option<PathBuf>,

        /// Ledger topic id
        #[arg(long, requires = "sequence")]
        topic: Option<String>,

        /// Ledger sequence number
        #[arg(long, requires = "topic")]
        sequence: Option<u64>,

        /// Transaction id to report alongside the result
        #[arg(long)]
        transaction_id: Option<String>,
    },

    /// Print the watermark embedded in an image
    Extract {
        /// Path to the image
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Read the spread-spectrum watermark seeded by this hash
        #[arg(long, value_name = "HASH")]
        spread_hash: Option<String>,

        /// Spread-spectrum redundancy
        #[arg(long, default_value_t = 7, requires = "spread_hash")]
        redundancy: usize,
    },

    /// List standard photo series and their capture angles
    Series {
        /// Show a single series
        name: Option<PhotoSeries>,
    },
}

#[derive(Subcommand)]
enum TopicAction {
    /// Create a topic and print its id
    Create {
        /// Topic memo
        #[arg(long)]
        memo: Option<String>,
    },
}

fn init_tracing(verbose: u8, quiet: bool, ansi: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }
    init_tracing(cli.verbose, cli.quiet, cli.color != ColorMode::Never);

    let quiet = cli.quiet;
    let journal = cli.journal;

    let result = match cli.command {
        Commands::Topic {
            action: TopicAction::Create { memo },
        } => commands::topic::execute_create(journal, memo, quiet).await,
        Commands::Certify {
            image,
            clinic,
            patient,
            photographer,
            angle,
            procedure,
            device,
            topic,
            jpeg_quality,
            format,
            output,
        } => {
            let args = commands::certify::CertifyArgs {
                image,
                clinic,
                patient,
                photographer,
                angle,
                procedure,
                device,
                topic,
                jpeg_quality,
                format,
                output,
            };
            commands::certify::execute(journal, args, quiet).await
        }
        Commands::Decrypt { bundle, output } => commands::decrypt::execute(bundle, output, quiet),
        Commands::Verify {
            image,
            bundle,
            topic,
            sequence,
            transaction_id,
        } => {
            let proof = commands::verify::ProofSource {
                bundle,
                topic,
                sequence,
                transaction_id,
            };
            commands::verify::execute(journal, image, proof, quiet).await
        }
        Commands::Extract {
            image,
            spread_hash,
            redundancy,
        } => commands::extract::execute(image, spread_hash, redundancy, quiet),
        Commands::Series { name } => commands::series::execute(name, quiet),
    };

    let exit = match result {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };
    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use textpad_config::AppConfig;

/// Inspect, convert and search text files with the textpad document engine.
#[derive(Parser, Debug)]
#[command(name = "textpad", version, about)]
struct Cli {
    /// Settings file (defaults to the per-user location).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the detected and configured format of a file.
    Info { file: PathBuf },
    /// Print the `.editorconfig` values that apply to a file.
    Cascade { file: PathBuf },
    /// Rewrite a file with another line ending, charset or indentation.
    Convert {
        file: PathBuf,
        /// Line ending: crlf, lf, cr, rs or ls.
        #[arg(long)]
        eol: Option<String>,
        /// Encoding label, e.g. utf-8, utf-16le or windows-1252.
        #[arg(long)]
        charset: Option<String>,
        /// Indentation mode: 0 for tabs, 1 to 8 for spaces.
        #[arg(long)]
        indent: Option<usize>,
        /// Write here instead of overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the matches of a pattern.
    Find {
        file: PathBuf,
        pattern: String,
        #[arg(long)]
        regex: bool,
        #[arg(long)]
        case_sensitive: bool,
    },
    /// Replace every match of a pattern.
    Replace {
        file: PathBuf,
        pattern: String,
        replacement: String,
        #[arg(long)]
        regex: bool,
        #[arg(long)]
        case_sensitive: bool,
        /// Write here instead of overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(AppConfig::config_path);
    let config = AppConfig::load_or_create(&config_path);
    tracing::debug!("using settings from {}", config_path.display());

    let report = match cli.command {
        Command::Info { file } => commands::info(config, file)?,
        Command::Cascade { file } => commands::cascade(&file),
        Command::Convert {
            file,
            eol,
            charset,
            indent,
            output,
        } => commands::convert(
            config,
            file,
            commands::ConvertOptions {
                eol,
                charset,
                indent,
                output,
            },
        )?,
        Command::Find {
            file,
            pattern,
            regex,
            case_sensitive,
        } => commands::find(
            config,
            file,
            pattern,
            commands::find_flags(regex, case_sensitive),
        )?,
        Command::Replace {
            file,
            pattern,
            replacement,
            regex,
            case_sensitive,
            output,
        } => commands::replace(
            config,
            file,
            pattern,
            replacement,
            commands::find_flags(regex, case_sensitive),
            output,
        )?,
    };
    print!("{report}");
    Ok(())
}

//! term-prep command line
//!
//! Profiles delimited tables and loads them into numeric datasets.
//! Diagnostics are written to stderr as JSON lines; the process exits with
//! 0 on success, 1 on bad input or configuration and 2 on internal errors.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use term_prep::analyzers::{ProfileReport, TableProfiler};
use term_prep::diagnostics::{DiagnosticSink, JsonLinesDiagnostics};
use term_prep::encoding::LoadConfig;
use term_prep::error::PrepError;
use term_prep::loader::{load_table, PipelineConfig};
use term_prep::logging::setup::{init_logging, LogFormat, LoggingConfig};
use term_prep::logging::LogConfig;
use term_prep::sink::DelimitedSink;
use term_prep::sources::FileSource;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log debug output from every stage
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Profile a table and print the report as JSON
    Profile {
        /// Delimited input file
        file: PathBuf,

        /// Write the report here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Encode a table into a delimited numeric dataset
    Load {
        /// Delimited input file
        file: PathBuf,

        /// Output file
        out: PathBuf,

        /// Load document; the table is profiled and its last column used as
        /// output when absent
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed for the shuffle stage
        #[arg(long)]
        seed: Option<u64>,

        /// Delimiter of the written dataset
        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
}

fn main() {
    let args = Args::parse();

    let logging = if args.verbose {
        LoggingConfig::debug()
    } else {
        LoggingConfig::quiet()
    };
    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    if let Err(e) = init_logging(&logging.with_format(format)) {
        eprintln!("failed to initialize logging: {e}");
    }

    let diagnostics = Arc::new(JsonLinesDiagnostics::new(io::stderr()));
    let code = match run(args, diagnostics.clone()) {
        Ok(()) => 0,
        Err(err) => {
            let prep = err.downcast_ref::<PrepError>();
            // input errors have already been reported by the profiler or encoder
            if !matches!(prep, Some(PrepError::Input(_))) {
                diagnostics.fatal(&format!("{err:#}"));
            }
            match prep {
                Some(e) if !e.is_user_error() => 2,
                _ => 1,
            }
        }
    };
    process::exit(code);
}

fn run(args: Args, diagnostics: Arc<dyn DiagnosticSink>) -> Result<()> {
    let log = if args.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    match args.command {
        Command::Profile { file, output } => {
            let source = FileSource::new(&file);
            let profile = TableProfiler::builder()
                .diagnostics(diagnostics)
                .build()
                .profile(&source)?;
            let json = ProfileReport::from(&profile).to_json()?;
            match output {
                Some(path) => fs::write(&path, json)
                    .with_context(|| format!("writing report to {}", path.display()))?,
                None => {
                    let mut stdout = io::stdout().lock();
                    writeln!(stdout, "{json}")?;
                }
            }
        }
        Command::Load {
            file,
            out,
            config,
            seed,
            delimiter,
        } => {
            let source = FileSource::new(&file);
            let load_config = match config {
                Some(path) => {
                    let text = fs::read_to_string(&path)
                        .with_context(|| format!("reading load config {}", path.display()))?;
                    LoadConfig::from_json(&text)?
                }
                None => {
                    let profile = TableProfiler::builder()
                        .diagnostics(Arc::clone(&diagnostics))
                        .build()
                        .profile(&source)?;
                    LoadConfig::from_report(&ProfileReport::from(&profile))
                }
            };

            let pipeline = PipelineConfig {
                shuffle_seed: seed,
                log,
                ..PipelineConfig::default()
            };

            let writer = BufWriter::new(
                File::create(&out).with_context(|| format!("creating {}", out.display()))?,
            );
            let mut sink = DelimitedSink::with_delimiter(writer, delimiter);
            let summary = load_table(&source, &load_config, &pipeline, &mut sink, diagnostics)?;
            sink.into_inner()?;
            tracing::info!(
                rows = summary.rows_written,
                input_width = summary.input_width,
                output_width = summary.output_width,
                "Wrote dataset"
            );
        }
    }
    Ok(())
}

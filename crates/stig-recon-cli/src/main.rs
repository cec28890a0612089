mod settings;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use stig_recon_core::{
    report, ChecklistExtractor, FileDocumentSource, OutputFormat, Pipeline, ReportError,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use settings::{Settings, DEFAULT_LOG_FILTER};

#[derive(Parser, Debug)]
#[command(
    name = "stig-recon",
    author,
    version,
    about = "STIG compliance reconciliation CLI"
)]
struct Cli {
    /// Settings file (TOML, YAML or JSON) layered over the built-in defaults
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Encoding of every report written
    #[arg(long, value_enum, global = true)]
    format: Option<FormatArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Join an audit export with a manual checklist on STIG id
    Compare {
        /// Path to the .audit export
        #[arg(long, alias = "audit_file", value_name = "FILE")]
        audit_file: PathBuf,
        /// Path to the manual XCCDF checklist
        #[arg(long, alias = "manual_file", value_name = "FILE")]
        manual_file: PathBuf,
        /// Reconciled report destination (default: output.csv)
        #[arg(long, alias = "output_file", value_name = "FILE")]
        output_file: Option<PathBuf>,
    },
    /// Aggregate per-host scan results by NIST control
    Summarize {
        /// Path to the .nessus scan results
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        /// Summary report destination (default: summary.csv)
        #[arg(long, value_name = "FILE")]
        summary: Option<PathBuf>,
        /// Non-passing checks destination (default: checklist.csv)
        #[arg(long, value_name = "FILE")]
        checklist: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            init_tracing(DEFAULT_LOG_FILTER);
            error!("{err:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings.log_filter);

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    let format = cli.format.map(OutputFormat::from).unwrap_or(settings.format);
    let pipeline = Pipeline::new().with_checklist(ChecklistExtractor::with_namespace(
        settings.checklist_namespace.clone(),
    ));

    match cli.command {
        Commands::Compare {
            audit_file,
            manual_file,
            output_file,
        } => {
            let output_file = output_file.unwrap_or(settings.output_file);
            compare(&pipeline, &audit_file, &manual_file, &output_file, format).await
        }
        Commands::Summarize {
            input,
            summary,
            checklist,
        } => {
            let summary_file = summary.unwrap_or(settings.summary_file);
            let checklist_file = checklist.unwrap_or(settings.checklist_file);
            summarize(&pipeline, &input, &summary_file, &checklist_file, format).await
        }
    }
}

async fn compare(
    pipeline: &Pipeline,
    audit_file: &Path,
    manual_file: &Path,
    output_file: &Path,
    format: OutputFormat,
) -> Result<()> {
    let rows = pipeline
        .compare(
            &FileDocumentSource::new(audit_file),
            &FileDocumentSource::new(manual_file),
        )
        .await
        .context("failed to reconcile audit export with manual checklist")?;

    write_report(output_file, |writer| {
        report::write_reconciled(writer, &rows, format)
    })?;

    info!(rows = rows.len(), path = %output_file.display(), "reconciled report written");
    println!("Report '{}' created successfully.", output_file.display());
    Ok(())
}

async fn summarize(
    pipeline: &Pipeline,
    input: &Path,
    summary_file: &Path,
    checklist_file: &Path,
    format: OutputFormat,
) -> Result<()> {
    let output = pipeline
        .summarize(&FileDocumentSource::new(input))
        .await
        .context("failed to summarize scan results")?;

    // both reports are attempted even when the first one fails
    let summary_written = write_report(summary_file, |writer| {
        report::write_summary(writer, &output.summary, format)
    });
    let checklist_written = write_report(checklist_file, |writer| {
        report::write_checklist(writer, &output.details, format)
    });
    match (summary_written, checklist_written) {
        (Ok(()), Ok(())) => {}
        (Err(err), Ok(())) | (Ok(()), Err(err)) => return Err(err),
        (Err(summary_err), Err(checklist_err)) => {
            error!("{summary_err:#}");
            return Err(checklist_err);
        }
    }

    println!(
        "Reports '{}' and '{}' created successfully.",
        summary_file.display(),
        checklist_file.display()
    );
    Ok(())
}

fn write_report(
    path: &Path,
    write: impl FnOnce(BufWriter<File>) -> Result<(), ReportError>,
) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write(BufWriter::new(file)).with_context(|| format!("failed to write {}", path.display()))
}

fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

//! `arscan verify` - check that every file of a drive is retrievable.

use anyhow::{Context, Result};
use clap::Args;
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;

use arscan::report::{self, OutputFormat, ReportContext};
use arscan::utils::format_duration;
use arscan::verify::{NumericRange, VerificationPipeline, VerifyFilters};

use super::{Session, emit};
use crate::ui;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Drive id to verify
    pub drive_id: String,

    /// Only report files with this extension (e.g. png)
    #[arg(long)]
    pub ext: Option<String>,

    /// Treat filenames as a numbered sequence and report gaps
    #[arg(long)]
    pub numeric: bool,

    /// First number of the sequence (default: smallest found)
    #[arg(long, requires = "numeric")]
    pub min: Option<u64>,

    /// Last number of the sequence (default: largest found)
    #[arg(long, requires = "numeric")]
    pub max: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// List healthy files too (text format)
    #[arg(long)]
    pub all: bool,
}

impl VerifyArgs {
    fn filters(&self) -> VerifyFilters {
        VerifyFilters {
            extension: self.ext.clone(),
            numeric: self.numeric.then_some(NumericRange {
                min: self.min,
                max: self.max,
            }),
        }
    }
}

/// Exit code when the drive has files that are not healthy.
const UNHEALTHY_EXIT_CODE: u8 = 2;

/// Execute the verify command.
///
/// Exits with [`UNHEALTHY_EXIT_CODE`] unless every file is healthy.
pub async fn execute(session: &Session, args: VerifyArgs) -> Result<ExitCode> {
    let started = Instant::now();
    let spinner = ui::spinner(format!("Verifying drive {}", args.drive_id));

    let pipeline = VerificationPipeline::new(
        session.fetcher(),
        session.payloads(),
        session.config.verify_config(),
    )
    .with_progress(spinner.clone());

    let result = pipeline.verify_drive(&args.drive_id, &args.filters()).await;
    spinner.finish_and_clear();
    let report = result.with_context(|| format!("Verification of drive {} failed", args.drive_id))?;

    let output = match args.format {
        OutputFormat::Text => report::render_text(&report, args.all, &mut ReportContext::new()),
        OutputFormat::Csv => report::render_csv(&report),
        OutputFormat::Json => report::render_json(&report).context("Failed to encode report")?,
    };
    emit(&output);

    let elapsed = chrono::Duration::from_std(started.elapsed())
        .map(format_duration)
        .unwrap_or_default();
    info!(
        drive_id = %report.drive_id,
        total = report.summary.total,
        healthy = report.summary.healthy,
        elapsed = %elapsed,
        "Verification finished"
    );

    if report.summary.all_healthy() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(UNHEALTHY_EXIT_CODE))
    }
}

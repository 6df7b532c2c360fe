//! Entry points: run the whole pipeline for one arXiv identifier.
//!
//! Stages run strictly one after another and the first failure aborts the
//! run. Files already written stay on disk; a re-run overwrites them.

use crate::config::SummaryConfig;
use crate::error::PaperSlideError;
use crate::output::{RunStats, SummaryRun, WorkingDirectory};
use crate::paper::{ArxivId, PaperRecord};
use crate::pipeline::extract::{self, ExtractOptions};
use crate::pipeline::fetch::{self, ArxivClient};
use crate::pipeline::{compose, split};
use crate::progress::Stage;
use std::time::Instant;
use tracing::info;

/// Build a slide draft for `identifier` with the default configuration.
///
/// Writes under `./<id>/` and reads templates from `./slide_template/`.
pub async fn make_summary(identifier: impl AsRef<str>) -> Result<SummaryRun, PaperSlideError> {
    make_summary_with_config(identifier, &SummaryConfig::default()).await
}

/// Build a slide draft for `identifier`.
///
/// # Errors
/// Any stage failure is returned as-is; see [`PaperSlideError`]. In
/// particular `NoFiguresFound` when the PDF has no marked figure objects.
pub async fn make_summary_with_config(
    identifier: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<SummaryRun, PaperSlideError> {
    let total_start = Instant::now();
    let id = ArxivId::parse(identifier.as_ref())?;
    info!("Starting summary: {}", id);

    let mut stats = RunStats::default();

    // ── Stage 1: metadata and PDF ────────────────────────────────────────
    let timer = StageTimer::start(config, Stage::Fetch);
    let dirs = WorkingDirectory::create(&config.output_root, &id).await?;
    let client = ArxivClient::new(config)?;
    let record = fetch::fetch_record(&client, &id).await?;
    info!("Title: {}", record.title);
    stats.downloaded_bytes = client.download_pdf(&record.pdf_url, &dirs.source_pdf).await?;
    stats.fetch_duration_ms = timer.finish();

    // ── Stage 2: figure extraction ───────────────────────────────────────
    let timer = StageTimer::start(config, Stage::Extract);
    let report = extract::extract_figures(
        &dirs.source_pdf,
        &dirs.extracted_pdf,
        ExtractOptions::from(config),
    )
    .await?;
    stats.extract_duration_ms = timer.finish();
    info!(
        "Extracted {} figures from {} pages",
        report.figures, report.source_pages
    );

    // ── Stage 3: split into figure files ─────────────────────────────────
    let timer = StageTimer::start(config, Stage::Split);
    let split_options = split::SplitOptions {
        remove_stale: config.remove_stale_figures,
        progress: config.progress_callback.clone(),
    };
    let written = split::split_pages(&dirs.extracted_pdf, &dirs.figures_dir, split_options).await?;
    stats.split_duration_ms = timer.finish();

    // ── Stage 4: slides ──────────────────────────────────────────────────
    let timer = StageTimer::start(config, Stage::Compose);
    let figures = compose::compose_slides(&dirs, &record, config).await?;
    stats.compose_duration_ms = timer.finish();

    stats.figure_count = written.len();
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Summary complete: {} figures, {}ms total, slides in {}",
        stats.figure_count,
        stats.total_duration_ms,
        dirs.slide_dir.display()
    );

    Ok(SummaryRun {
        record,
        dirs,
        figures,
        stats,
    })
}

/// Synchronous wrapper around [`make_summary_with_config`].
///
/// Creates a temporary tokio runtime internally.
pub fn make_summary_sync(
    identifier: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<SummaryRun, PaperSlideError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PaperSlideError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(make_summary_with_config(identifier, config))
}

/// Fetch and normalise a paper's metadata without downloading anything.
pub async fn fetch_paper(
    identifier: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<PaperRecord, PaperSlideError> {
    let id = ArxivId::parse(identifier.as_ref())?;
    let client = ArxivClient::new(config)?;
    fetch::fetch_record(&client, &id).await
}

/// Times one stage and reports its start and end to the progress callback.
struct StageTimer<'a> {
    config: &'a SummaryConfig,
    stage: Stage,
    start: Instant,
}

impl<'a> StageTimer<'a> {
    fn start(config: &'a SummaryConfig, stage: Stage) -> Self {
        info!("Stage {} started", stage);
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage_start(stage);
        }
        Self {
            config,
            stage,
            start: Instant::now(),
        }
    }

    fn finish(self) -> u64 {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        info!("Stage {} finished in {}ms", self.stage, elapsed_ms);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_complete(self.stage, elapsed_ms);
        }
        elapsed_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_identifier_fails_before_touching_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let config = SummaryConfig::builder()
            .output_root(tmp.path())
            .build()
            .unwrap();
        let err = make_summary_with_config("../etc", &config).await.unwrap_err();
        assert!(matches!(err, PaperSlideError::InvalidIdentifier { .. }), "{err}");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn sync_wrapper_reports_errors() {
        let err = make_summary_sync("", &SummaryConfig::default()).unwrap_err();
        assert!(matches!(err, PaperSlideError::InvalidIdentifier { .. }));
    }
}

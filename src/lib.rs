//! # paper2slide
//!
//! Turn an arXiv paper into the first draft of a beamer talk.
//!
//! ## Why this crate?
//!
//! The rote part of preparing a paper talk is always the same: copy the
//! title, the authors and the abstract onto slides, then cut every figure out
//! of the PDF and give it a slide of its own. LaTeX papers make the second
//! part mechanical: pdfTeX stamps each included graphic with a
//! `/PTEX.FileName` key, so the figures can be lifted out of the PDF object
//! graph as vector graphics, without rendering or cropping anything.
//!
//! ## Pipeline Overview
//!
//! ```text
//! arXiv id
//!  │
//!  ├─ 1. Fetch    query the arXiv API, download <id>.pdf
//!  ├─ 2. Extract  wrap each marked form XObject as a page of out_<id>.pdf
//!  ├─ 3. Split    one figures/figure_<n>.pdf per page
//!  └─ 4. Compose  fill main.tex, abs.tex, body.tex from slide templates
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2slide::{make_summary_with_config, SummaryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SummaryConfig::builder()
//!         .output_root("talks")
//!         .template_dir("slide_template")
//!         .build()?;
//!     let run = make_summary_with_config("1706.03762", &config).await?;
//!     println!("{} figures in {}", run.stats.figure_count, run.dirs.slide_dir.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2slide` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! paper2slide = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod paper;
pub mod pipeline;
pub mod progress;
pub mod summary;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FigureOrder, SummaryConfig, SummaryConfigBuilder};
pub use error::PaperSlideError;
pub use output::{RunStats, SummaryRun, WorkingDirectory};
pub use paper::{ArxivId, PaperRecord};
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, SummaryProgressCallback};
pub use summary::{fetch_paper, make_summary, make_summary_sync, make_summary_with_config};

//! CLI binary for paper2slide.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SummaryConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paper2slide::{
    fetch_paper, make_summary_with_config, FigureOrder, ProgressCallback, Stage, SummaryConfig,
    SummaryProgressCallback, SummaryRun,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the running stage, plus one
/// log line per finished stage and per figure file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new(id: &str) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(id.to_string());
        bar.set_message("Starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Fetch => "Fetching metadata and PDF…",
        Stage::Extract => "Extracting figures…",
        Stage::Split => "Writing figure files…",
        Stage::Compose => "Filling slide templates…",
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(stage_label(stage));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<8} {}",
            green("✓"),
            stage,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_figure_written(&self, figure_num: usize, total: usize, path: &Path) {
        self.bar.set_message(format!(
            "figure {figure_num}/{total}  {}",
            dim(&path.display().to_string())
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Slides for one paper in ./1706.03762/slide/
  paper2slide 1706.03762

  # Several papers, written under ./talks/
  paper2slide --output-dir talks 1706.03762 2301.07041

  # Own templates, raster figures too
  paper2slide --templates ~/my_template --include-images 2301.07041

  # Metadata only, as JSON
  paper2slide --metadata-only --json 1706.03762

OUTPUT LAYOUT:
  <output-dir>/<id>/<id>.pdf                  downloaded paper
  <output-dir>/<id>/out_<id>.pdf              extracted figures, one per page
  <output-dir>/<id>/slide/figures/figure_N.pdf
  <output-dir>/<id>/slide/{latexmkrc,main.tex,abs.tex,body.tex}

  Build the deck with:  cd <output-dir>/<id>/slide && latexmk main.tex

TEMPLATE DIRECTORY:
  latexmkrc   copied as-is
  main.tex    PAPERTITLE, PAPERAUTHORS, PAPERURL
  abs.tex     ABSTRACT_TEXT
  body.tex    FIGURENUMBER, FIGUREPATH (repeated once per figure)
"#;

/// Turn arXiv papers into beamer slide drafts.
#[derive(Parser, Debug)]
#[command(
    name = "paper2slide",
    version,
    about = "Turn arXiv papers into beamer slide drafts",
    long_about = "Fetch an arXiv paper's metadata and PDF, lift every figure the authors \
included out of the PDF as a vector graphic, and fill a beamer template with the title, \
authors, abstract and one slide per figure.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// arXiv identifiers, e.g. 1706.03762 or hep-th/9901001.
    #[arg(required = true)]
    ids: Vec<String>,

    /// Directory under which `<id>/` working directories are created.
    #[arg(short, long, env = "PAPER2SLIDE_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Slide template directory (latexmkrc, main.tex, abs.tex, body.tex).
    #[arg(short, long, env = "PAPER2SLIDE_TEMPLATES", default_value = "slide_template")]
    templates: PathBuf,

    /// arXiv API query endpoint.
    #[arg(long, env = "PAPER2SLIDE_API_URL", default_value = paper2slide::config::DEFAULT_API_URL)]
    api_url: String,

    /// Order of figure blocks in body.tex.
    #[arg(long, env = "PAPER2SLIDE_FIGURE_ORDER", value_enum, default_value = "numeric")]
    figure_order: FigureOrderArg,

    /// Also extract raster image XObjects.
    #[arg(long, env = "PAPER2SLIDE_INCLUDE_IMAGES")]
    include_images: bool,

    /// Dictionary key marking a form XObject as a figure.
    #[arg(long, env = "PAPER2SLIDE_MARKER_KEY", default_value = paper2slide::config::DEFAULT_MARKER_KEY)]
    marker_key: String,

    /// Keep figure_N.pdf files left over from an earlier run.
    #[arg(long, env = "PAPER2SLIDE_KEEP_STALE_FIGURES")]
    keep_stale_figures: bool,

    /// HTTP timeout in seconds.
    #[arg(long, env = "PAPER2SLIDE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print paper metadata only; download and write nothing.
    #[arg(long, env = "PAPER2SLIDE_METADATA_ONLY")]
    metadata_only: bool,

    /// Print results as JSON on stdout.
    #[arg(long, env = "PAPER2SLIDE_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PAPER2SLIDE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPER2SLIDE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAPER2SLIDE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FigureOrderArg {
    Numeric,
    Lexicographic,
}

impl From<FigureOrderArg> for FigureOrder {
    fn from(v: FigureOrderArg) -> Self {
        match v {
            FigureOrderArg::Numeric => FigureOrder::Numeric,
            FigureOrderArg::Lexicographic => FigureOrder::Lexicographic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would fight the spinner for the terminal.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.metadata_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Metadata-only mode ───────────────────────────────────────────────
    if cli.metadata_only {
        let config = build_config(&cli, None)?;
        for id in &cli.ids {
            let record = fetch_paper(id, &config)
                .await
                .with_context(|| format!("Failed to fetch metadata for {id}"))?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&record).context("Failed to serialize metadata")?
                );
            } else {
                println!("Id:        {}", record.id);
                println!("Title:     {}", record.title);
                println!("Authors:   {}", record.authors_joined());
                println!("URL:       {}", record.url);
                println!("PDF:       {}", record.pdf_url);
                println!("Abstract:  {}", record.abstract_text);
                println!();
            }
        }
        return Ok(());
    }

    // ── Run each paper in turn ───────────────────────────────────────────
    for id in &cli.ids {
        let spinner = show_progress.then(|| CliProgressCallback::new(id));
        let progress = spinner
            .clone()
            .map(|cb| cb as Arc<dyn SummaryProgressCallback>);
        let config = build_config(&cli, progress)?;

        let result = make_summary_with_config(id, &config).await;
        if let Some(ref s) = spinner {
            s.finish();
        }
        let run = result.with_context(|| format!("Failed to build slides for {id}"))?;

        if cli.json {
            let json = serde_json::to_string_pretty(&run).context("Failed to serialise output")?;
            println!("{json}");
        } else if !cli.quiet {
            print_summary(&run);
        }
    }

    Ok(())
}

fn print_summary(run: &SummaryRun) {
    eprintln!(
        "{} {}  {}",
        green("✔"),
        bold(run.id().as_str()),
        run.record.title
    );
    eprintln!(
        "   {} figures  {}  {}ms  →  {}",
        bold(&run.stats.figure_count.to_string()),
        dim(&format!("{} KB", run.stats.downloaded_bytes / 1024)),
        run.stats.total_duration_ms,
        cyan(&run.dirs.slide_dir.display().to_string()),
    );
}

/// Map CLI args to `SummaryConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SummaryConfig> {
    let mut builder = SummaryConfig::builder()
        .output_root(&cli.output_dir)
        .template_dir(&cli.templates)
        .api_url(&cli.api_url)
        .figure_order(cli.figure_order.into())
        .include_raster_images(cli.include_images)
        .marker_key(&cli.marker_key)
        .remove_stale_figures(!cli.keep_stale_figures)
        .download_timeout_secs(cli.download_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

//! Configuration types for a paper-to-slides run.
//!
//! Every knob lives in [`SummaryConfig`], built via its
//! [`SummaryConfigBuilder`]. The defaults reproduce the plain behaviour of
//! the tool: work in the current directory, read templates from
//! `./slide_template`, query the public arXiv export API, and keep only the
//! form XObjects pdfTeX tags with `/PTEX.FileName`.

use crate::error::PaperSlideError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default arXiv export API endpoint.
pub const DEFAULT_API_URL: &str = "http://export.arxiv.org/api/query";

/// Marker key pdfTeX writes on every included PDF graphic.
pub const DEFAULT_MARKER_KEY: &str = "PTEX.FileName";

/// US Letter width in points.
pub const DEFAULT_PAGE_WIDTH_PT: f32 = 8.5 * 72.0;

/// Half an inch in points.
pub const DEFAULT_MARGIN_PT: f32 = 0.5 * 72.0;

/// Configuration for one summary run.
///
/// Built via [`SummaryConfig::builder()`] or using
/// [`SummaryConfig::default()`].
///
/// # Example
/// ```rust
/// use paper2slide::{FigureOrder, SummaryConfig};
///
/// let config = SummaryConfig::builder()
///     .output_root("talks")
///     .template_dir("my_templates")
///     .figure_order(FigureOrder::Lexicographic)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Directory under which `<id>/` is created. Default: `.`.
    pub output_root: PathBuf,

    /// Directory holding `latexmkrc`, `main.tex`, `abs.tex` and `body.tex`.
    /// Default: `slide_template`.
    pub template_dir: PathBuf,

    /// arXiv query endpoint. Default: [`DEFAULT_API_URL`].
    pub api_url: String,

    /// Timeout for the metadata query and the PDF download, in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Page width used when wrapping raster images. Default: 612 pt.
    ///
    /// Form XObjects keep their own `/BBox` and ignore this value.
    pub page_width_pt: f32,

    /// Margin around wrapped raster images. Default: 36 pt.
    pub margin_pt: f32,

    /// Dictionary key that marks an author-embedded figure. Default: `PTEX.FileName`.
    pub marker_key: String,

    /// Also extract image XObjects (no marker required). Default: false.
    ///
    /// Papers that embed PNG/JPEG figures have no form XObjects to find;
    /// enabling this picks those up at the cost of also catching logos.
    pub include_raster_images: bool,

    /// Order in which figure files become slide blocks. Default: numeric.
    pub figure_order: FigureOrder,

    /// Delete `figure_<n>.pdf` files beyond the current figure count before
    /// splitting. Default: true.
    pub remove_stale_figures: bool,

    /// Stage-level progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            template_dir: PathBuf::from("slide_template"),
            api_url: DEFAULT_API_URL.to_string(),
            download_timeout_secs: 120,
            page_width_pt: DEFAULT_PAGE_WIDTH_PT,
            margin_pt: DEFAULT_MARGIN_PT,
            marker_key: DEFAULT_MARKER_KEY.to_string(),
            include_raster_images: false,
            figure_order: FigureOrder::default(),
            remove_stale_figures: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("output_root", &self.output_root)
            .field("template_dir", &self.template_dir)
            .field("api_url", &self.api_url)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("page_width_pt", &self.page_width_pt)
            .field("margin_pt", &self.margin_pt)
            .field("marker_key", &self.marker_key)
            .field("include_raster_images", &self.include_raster_images)
            .field("figure_order", &self.figure_order)
            .field("remove_stale_figures", &self.remove_stale_figures)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn SummaryProgressCallback>"),
            )
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SummaryConfig`].
#[derive(Debug)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn output_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_root = dir.into();
        self
    }

    pub fn template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.template_dir = dir.into();
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn page_width_pt(mut self, width: f32) -> Self {
        self.config.page_width_pt = width;
        self
    }

    pub fn margin_pt(mut self, margin: f32) -> Self {
        self.config.margin_pt = margin;
        self
    }

    pub fn marker_key(mut self, key: impl Into<String>) -> Self {
        let key: String = key.into();
        // Accept "/PTEX.FileName" as well as the bare name.
        self.config.marker_key = key.trim_start_matches('/').to_string();
        self
    }

    pub fn include_raster_images(mut self, v: bool) -> Self {
        self.config.include_raster_images = v;
        self
    }

    pub fn figure_order(mut self, order: FigureOrder) -> Self {
        self.config.figure_order = order;
        self
    }

    pub fn remove_stale_figures(mut self, v: bool) -> Self {
        self.config.remove_stale_figures = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, PaperSlideError> {
        let c = &self.config;
        if c.download_timeout_secs == 0 {
            return Err(PaperSlideError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if !(c.page_width_pt.is_finite() && c.margin_pt.is_finite())
            || c.margin_pt < 0.0
            || c.page_width_pt <= 2.0 * c.margin_pt
        {
            return Err(PaperSlideError::InvalidConfig(format!(
                "Page width ({}) must exceed twice the margin ({})",
                c.page_width_pt, c.margin_pt
            )));
        }
        if c.marker_key.is_empty() {
            return Err(PaperSlideError::InvalidConfig(
                "Marker key must not be empty".into(),
            ));
        }
        if !(c.api_url.starts_with("http://") || c.api_url.starts_with("https://")) {
            return Err(PaperSlideError::InvalidConfig(format!(
                "API URL must be HTTP or HTTPS, got '{}'",
                c.api_url
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How figure files are ordered when composing `body.tex`.
///
/// Plain filename sort puts `figure_10.pdf` before `figure_2.pdf`, so a
/// paper with ten or more figures gets its slides shuffled. `Numeric`
/// orders by the embedded index instead; `Lexicographic` keeps the plain
/// sort for anyone relying on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FigureOrder {
    /// `figure_<n>.pdf` by n, other names afterwards by name. (default)
    #[default]
    Numeric,
    /// Byte-wise filename order.
    Lexicographic,
}

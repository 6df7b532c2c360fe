//! Result types: the per-paper working directory and the value a run returns.

use crate::error::PaperSlideError;
use crate::paper::{ArxivId, PaperRecord};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Paths of everything a run reads and writes for one paper.
///
/// ```text
/// <root>/<id>/
///  ├─ <id>.pdf              downloaded source
///  ├─ out_<id>.pdf          wrapped figures, one per page
///  └─ slide/
///      ├─ latexmkrc main.tex abs.tex body.tex
///      └─ figures/figure_<n>.pdf
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingDirectory {
    /// `<root>/<id>/`
    pub root: PathBuf,
    /// `<root>/<id>/<id>.pdf`
    pub source_pdf: PathBuf,
    /// `<root>/<id>/out_<id>.pdf`
    pub extracted_pdf: PathBuf,
    /// `<root>/<id>/slide/`
    pub slide_dir: PathBuf,
    /// `<root>/<id>/slide/figures/`
    pub figures_dir: PathBuf,
}

impl WorkingDirectory {
    /// Compute the layout for `id` under `output_root` without touching disk.
    pub fn new(output_root: &Path, id: &ArxivId) -> Self {
        let stem = id.file_stem();
        let root = output_root.join(&stem);
        let slide_dir = root.join("slide");
        Self {
            source_pdf: root.join(format!("{stem}.pdf")),
            extracted_pdf: root.join(format!("out_{stem}.pdf")),
            figures_dir: slide_dir.join("figures"),
            slide_dir,
            root,
        }
    }

    /// Compute the layout and create `slide/figures/` with all parents.
    ///
    /// Safe to call when the directories already exist.
    pub async fn create(output_root: &Path, id: &ArxivId) -> Result<Self, PaperSlideError> {
        let dirs = Self::new(output_root, id);
        tokio::fs::create_dir_all(&dirs.figures_dir)
            .await
            .map_err(|e| PaperSlideError::CreateDir {
                path: dirs.figures_dir.clone(),
                source: e,
            })?;
        debug!("Working directory ready: {}", dirs.root.display());
        Ok(dirs)
    }

    /// `slide/main.tex`
    pub fn main_tex(&self) -> PathBuf {
        self.slide_dir.join("main.tex")
    }

    /// `slide/abs.tex`
    pub fn abs_tex(&self) -> PathBuf {
        self.slide_dir.join("abs.tex")
    }

    /// `slide/body.tex`
    pub fn body_tex(&self) -> PathBuf {
        self.slide_dir.join("body.tex")
    }

    /// `slide/latexmkrc`
    pub fn latexmkrc(&self) -> PathBuf {
        self.slide_dir.join("latexmkrc")
    }
}

/// Timing and size figures for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Figures extracted (== figure files written == blocks in `body.tex`).
    pub figure_count: usize,
    /// Size of the downloaded PDF.
    pub downloaded_bytes: u64,
    pub fetch_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub split_duration_ms: u64,
    pub compose_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRun {
    /// The paper's metadata.
    pub record: PaperRecord,
    /// Where the files went.
    pub dirs: WorkingDirectory,
    /// Figure files in the order they appear in `body.tex`.
    pub figures: Vec<PathBuf>,
    pub stats: RunStats,
}

impl SummaryRun {
    /// The identifier this run was made for.
    pub fn id(&self) -> &ArxivId {
        &self.record.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_identifier() {
        let id = ArxivId::parse("2301.07041").unwrap();
        let d = WorkingDirectory::new(Path::new("talks"), &id);
        assert_eq!(d.root, Path::new("talks/2301.07041"));
        assert_eq!(d.source_pdf, Path::new("talks/2301.07041/2301.07041.pdf"));
        assert_eq!(d.extracted_pdf, Path::new("talks/2301.07041/out_2301.07041.pdf"));
        assert_eq!(d.figures_dir, Path::new("talks/2301.07041/slide/figures"));
        assert_eq!(d.body_tex(), Path::new("talks/2301.07041/slide/body.tex"));
    }

    #[test]
    fn old_style_id_stays_one_level_deep() {
        let id = ArxivId::parse("hep-th/9901001").unwrap();
        let d = WorkingDirectory::new(Path::new("."), &id);
        assert_eq!(d.root, Path::new("./hep-th_9901001"));
        assert_eq!(d.source_pdf, Path::new("./hep-th_9901001/hep-th_9901001.pdf"));
    }

    #[tokio::test]
    async fn create_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let id = ArxivId::parse("2301.07041").unwrap();
        let first = WorkingDirectory::create(tmp.path(), &id).await.unwrap();
        let second = WorkingDirectory::create(tmp.path(), &id).await.unwrap();
        assert_eq!(first, second);
        assert!(first.figures_dir.is_dir());
    }
}

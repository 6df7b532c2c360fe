//! Page splitting: one single-page PDF per page of the intermediate document.
//!
//! Page `i` (0-based) of `out_<id>.pdf` becomes `figures/figure_<i+1>.pdf`.
//! Nothing is filtered or reordered. Attributes a page inherits from its page
//! tree are copied onto it so the lone page renders the same as it did in the
//! multi-page file.

use crate::error::PaperSlideError;
use crate::pipeline::extract::{load_document, save_document};
use crate::pipeline::objects::{inherited, install_page_tree, ObjectCopier};
use crate::progress::ProgressCallback;
use lopdf::{Document, Object, ObjectId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Page attributes inheritable through `/Parent`.
const INHERITABLE: &[&[u8]] = &[b"MediaBox", b"Resources", b"CropBox", b"Rotate"];

static FIGURE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^figure_(\d+)\.pdf$").unwrap());

/// File name of the `n`th figure (1-based).
pub fn figure_file_name(n: usize) -> String {
    format!("figure_{n}.pdf")
}

/// The `n` of a `figure_<n>.pdf` file name.
pub fn figure_index(file_name: &str) -> Option<u64> {
    FIGURE_NAME
        .captures(file_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Options for one split, owned so they can move onto the blocking pool.
#[derive(Clone, Default)]
pub struct SplitOptions {
    /// Delete `figure_<n>.pdf` files with `n` above the new page count.
    pub remove_stale: bool,
    pub progress: Option<ProgressCallback>,
}

/// Build a one-page document holding a copy of `page_id` from `source`.
fn single_page_document(source: &Document, page_id: ObjectId) -> Result<Document, String> {
    let page = source
        .get_dictionary(page_id)
        .map_err(|e| format!("page {page_id:?}: {e}"))?;

    let mut target = Document::with_version("1.5");
    let mut copier = ObjectCopier::new(source);
    let mut copied = copier.copy_dict(&mut target, page);
    for key in INHERITABLE {
        if copied.has(key) {
            continue;
        }
        if let Some(value) = inherited(source, page_id, key) {
            copied.set(key.to_vec(), copier.copy(&mut target, value));
        }
    }

    let new_page = target.add_object(Object::Dictionary(copied));
    install_page_tree(&mut target, vec![new_page]);
    Ok(target)
}

/// Remove `figure_<n>.pdf` files in `dir` with `n > keep`.
fn remove_stale_figures(dir: &Path, keep: usize) -> Result<usize, PaperSlideError> {
    let entries = std::fs::read_dir(dir).map_err(|e| PaperSlideError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(n) = name.to_str().and_then(figure_index) else {
            continue;
        };
        if n > keep as u64 {
            let path = entry.path();
            std::fs::remove_file(&path).map_err(|e| PaperSlideError::Io {
                path: path.clone(),
                source: e,
            })?;
            warn!("Removed stale figure from a previous run: {}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}

/// Split `pdf` into one file per page inside `figures_dir`.
///
/// Returns the written paths in page order.
pub async fn split_pages(
    pdf: &Path,
    figures_dir: &Path,
    options: SplitOptions,
) -> Result<Vec<PathBuf>, PaperSlideError> {
    let pdf = pdf.to_path_buf();
    let dir = figures_dir.to_path_buf();

    tokio::task::spawn_blocking(move || split_pages_blocking(&pdf, &dir, &options))
        .await
        .map_err(|e| PaperSlideError::Internal(format!("Split task panicked: {}", e)))?
}

/// Blocking implementation of [`split_pages`].
pub fn split_pages_blocking(
    pdf: &Path,
    figures_dir: &Path,
    options: &SplitOptions,
) -> Result<Vec<PathBuf>, PaperSlideError> {
    let source = load_document(pdf)?;
    let pages = source.get_pages();
    let total = pages.len();
    debug!("Splitting {} pages from: {}", total, pdf.display());

    if options.remove_stale {
        remove_stale_figures(figures_dir, total)?;
    }

    let mut written = Vec::with_capacity(total);
    for (i, page_id) in pages.values().enumerate() {
        let path = figures_dir.join(figure_file_name(i + 1));
        let mut doc = single_page_document(&source, *page_id).map_err(|detail| {
            PaperSlideError::CorruptPdf {
                path: pdf.to_path_buf(),
                detail,
            }
        })?;
        save_document(&mut doc, &path)?;
        debug!("Wrote {}", path.display());

        if let Some(cb) = &options.progress {
            cb.on_figure_written(i + 1, total, &path);
        }
        written.push(path);
    }

    info!("Split {} figure files into: {}", written.len(), figures_dir.display());
    Ok(written)
}

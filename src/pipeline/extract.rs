//! Figure extraction: find author-embedded graphics and give each its own page.
//!
//! ## What counts as a figure?
//!
//! When pdfTeX includes a PDF graphic (`\includegraphics{plot.pdf}`) it wraps
//! the graphic in a form XObject and stamps it with `/PTEX.FileName`. Headers,
//! logos drawn by the class file and other incidental forms carry no such
//! marker, so "form XObject with the marker" is a cheap and precise figure
//! detector for LaTeX-produced papers.
//!
//! ## Walk order
//!
//! Pages are visited in order. For each page its `/Resources` (inherited from
//! the page tree when absent) are walked depth-first with dictionary keys in
//! sorted order, never following `/Parent`. Each indirect object is visited
//! once for the whole document, so a figure shared between pages is
//! extracted once, at its first appearance.
//!
//! ## Wrapping
//!
//! A form becomes a page whose MediaBox is the form's BBox and whose content
//! stream is the form's own stream (filters untouched), so the figure keeps
//! its intrinsic size and aspect ratio. A raster image (opt-in) is scaled to
//! a fixed page width minus margins.

use crate::config::SummaryConfig;
use crate::error::PaperSlideError;
use crate::pipeline::objects::{
    as_dict, as_number, inherited, install_page_tree, name_of, resolve, ObjectCopier, NO_FOLLOW,
};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Keys pointing at soft masks; masks are images but never figures.
const MASK_KEYS: &[&[u8]] = &[b"SMask", b"Mask"];

/// Resource name the image wrapper draws with.
const WRAPPED_IMAGE_NAME: &str = "MyImage";

/// The kind of graphic a found object is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureKind {
    /// A form XObject carrying the marker key.
    Form,
    /// An image XObject (only with `include_raster_images`).
    Image,
}

/// A figure object located in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundFigure {
    /// Object id in the source document.
    pub id: ObjectId,
    pub kind: FigureKind,
    /// 1-indexed page whose resources led to the object.
    pub page: u32,
}

/// The parameters of extraction, detached from [`SummaryConfig`] so they can
/// move onto the blocking pool.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub marker_key: String,
    pub include_raster_images: bool,
    pub page_width_pt: f32,
    pub margin_pt: f32,
}

impl From<&SummaryConfig> for ExtractOptions {
    fn from(c: &SummaryConfig) -> Self {
        Self {
            marker_key: c.marker_key.clone(),
            include_raster_images: c.include_raster_images,
            page_width_pt: c.page_width_pt,
            margin_pt: c.margin_pt,
        }
    }
}

impl ExtractOptions {
    /// Decide whether a dictionary is a figure, and which kind.
    fn classify(&self, dict: &Dictionary) -> Option<FigureKind> {
        let ty = name_of(dict, b"Type");
        match name_of(dict, b"Subtype") {
            Some(b"Form")
                if ty == Some(b"XObject".as_slice()) && dict.has(self.marker_key.as_bytes()) =>
            {
                Some(FigureKind::Form)
            }
            Some(b"Image")
                if self.include_raster_images
                    && matches!(ty, None | Some(b"XObject"))
                    && !is_image_mask(dict) =>
            {
                Some(FigureKind::Image)
            }
            _ => None,
        }
    }
}

fn is_image_mask(dict: &Dictionary) -> bool {
    matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)))
}

/// Summary of one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractReport {
    /// Pages of the source document.
    pub source_pages: usize,
    /// Figures written to the intermediate PDF.
    pub figures: usize,
    /// Found objects dropped because they could not be wrapped.
    pub skipped: usize,
}

/// Walk every page's resources and collect qualifying figure objects in
/// discovery order.
pub fn find_figures(doc: &Document, options: &ExtractOptions) -> Vec<FoundFigure> {
    let mut found = Vec::new();
    let mut visited: HashSet<ObjectId> = HashSet::new();

    for (page_num, page_id) in doc.get_pages() {
        let Some(resources) = inherited(doc, page_id, b"Resources") else {
            debug!("Page {} has no resources", page_num);
            continue;
        };

        let mut stack: Vec<&Object> = vec![resources];
        while let Some(node) = stack.pop() {
            let (obj, id) = match node {
                Object::Reference(id) => {
                    if !visited.insert(*id) {
                        continue;
                    }
                    match doc.get_object(*id) {
                        Ok(obj) => (obj, Some(*id)),
                        Err(_) => continue,
                    }
                }
                other => (other, None),
            };

            match obj {
                Object::Array(items) => stack.extend(items.iter().rev()),
                Object::Dictionary(_) | Object::Stream(_) => {
                    let Some(dict) = as_dict(obj) else { continue };
                    if let Some(id) = id {
                        if let Some(kind) = options.classify(dict) {
                            debug!("Found {:?} figure {:?} on page {}", kind, id, page_num);
                            found.push(FoundFigure {
                                id,
                                kind,
                                page: page_num,
                            });
                        }
                    }
                    let mut children: Vec<(&Vec<u8>, &Object)> = dict
                        .iter()
                        .filter(|(k, _)| {
                            !NO_FOLLOW.contains(&k.as_slice()) && !MASK_KEYS.contains(&k.as_slice())
                        })
                        .collect();
                    children.sort_by(|a, b| a.0.cmp(b.0));
                    stack.extend(children.into_iter().rev().map(|(_, v)| v));
                }
                _ => {}
            }
        }
    }

    found
}

/// Wrap a form XObject into a new page of `target`. `None` when the form
/// has no usable BBox.
fn wrap_form(
    target: &mut Document,
    copier: &mut ObjectCopier<'_>,
    source: &Document,
    stream: &Stream,
) -> Option<ObjectId> {
    let bbox = stream.dict.get(b"BBox").ok()?;
    let corners = resolve(source, bbox)?.as_array().ok()?;
    if corners.len() != 4
        || corners
            .iter()
            .any(|c| resolve(source, c).and_then(as_number).is_none())
    {
        return None;
    }
    let media_box = copier.copy(target, bbox);

    let mut contents_dict = Dictionary::new();
    for key in [b"Filter".as_slice(), b"DecodeParms".as_slice()] {
        if let Ok(value) = stream.dict.get(key) {
            contents_dict.set(key.to_vec(), copier.copy(target, value));
        }
    }
    let contents_id = target.add_object(Stream::new(contents_dict, stream.content.clone()));

    let mut page = dictionary! {
        "Type" => "Page",
        "MediaBox" => media_box,
        "Contents" => contents_id,
    };
    if let Ok(resources) = stream.dict.get(b"Resources") {
        page.set("Resources", copier.copy(target, resources));
    }
    Some(target.add_object(page))
}

/// Wrap an image XObject into a fixed-width page with margins. `None` when
/// the image has no usable size.
fn wrap_image(
    target: &mut Document,
    copier: &mut ObjectCopier<'_>,
    source: &Document,
    image_id: ObjectId,
    dict: &Dictionary,
    options: &ExtractOptions,
) -> Option<ObjectId> {
    let dim = |key: &[u8]| {
        dict.get(key)
            .ok()
            .and_then(|o| resolve(source, o))
            .and_then(as_number)
            .filter(|v| *v > 0.0)
    };
    let (width_px, height_px) = (dim(b"Width")?, dim(b"Height")?);

    let margin = options.margin_pt;
    let cw = options.page_width_pt - 2.0 * margin;
    let ch = cw * height_px / width_px;

    let image = copier.copy_reference(target, image_id);
    let content = format!("q {cw} 0 0 {ch} {margin} {margin} cm /{WRAPPED_IMAGE_NAME} Do Q");
    let contents_id = target.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let page = dictionary! {
        "Type" => "Page",
        "MediaBox" => vec![
            0.into(),
            0.into(),
            Object::from(options.page_width_pt),
            Object::from(ch + 2.0 * margin),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! { WRAPPED_IMAGE_NAME => image },
        },
        "Contents" => contents_id,
    };
    Some(target.add_object(page))
}

/// Build the intermediate document from the figures found in `source`.
///
/// Returns the document (ready to save) and the number of found objects
/// that could not be wrapped.
pub fn build_figure_document(
    source: &Document,
    figures: &[FoundFigure],
    options: &ExtractOptions,
) -> (Document, usize) {
    let mut target = Document::with_version("1.5");
    let mut copier = ObjectCopier::new(source);
    let mut pages = Vec::with_capacity(figures.len());
    let mut skipped = 0;

    for fig in figures {
        let wrapped = match (fig.kind, source.get_object(fig.id)) {
            (FigureKind::Form, Ok(Object::Stream(stream))) => {
                wrap_form(&mut target, &mut copier, source, stream)
            }
            (FigureKind::Image, Ok(obj)) => match as_dict(obj) {
                Some(dict) => wrap_image(&mut target, &mut copier, source, fig.id, dict, options),
                None => None,
            },
            _ => None,
        };
        match wrapped {
            Some(page_id) => pages.push(page_id),
            None => {
                warn!("Skipping figure {:?} from page {}: cannot wrap it", fig.id, fig.page);
                skipped += 1;
            }
        }
    }

    install_page_tree(&mut target, pages);
    (target, skipped)
}

/// Serialise `doc` to `path`.
pub(crate) fn save_document(doc: &mut Document, path: &Path) -> Result<(), PaperSlideError> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| PaperSlideError::PdfWrite {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    std::fs::write(path, buf).map_err(|e| PaperSlideError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a PDF, mapping any parse failure to `CorruptPdf`.
pub(crate) fn load_document(path: &Path) -> Result<Document, PaperSlideError> {
    Document::load(path).map_err(|e| PaperSlideError::CorruptPdf {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Extract figures from `source_pdf` into `out_pdf`.
///
/// Runs inside `spawn_blocking`; PDF parsing and serialisation are CPU-bound.
///
/// # Errors
/// `NoFiguresFound` when nothing qualifies (or nothing could be wrapped);
/// `out_pdf` is not written in that case.
pub async fn extract_figures(
    source_pdf: &Path,
    out_pdf: &Path,
    options: ExtractOptions,
) -> Result<ExtractReport, PaperSlideError> {
    let src: PathBuf = source_pdf.to_path_buf();
    let out: PathBuf = out_pdf.to_path_buf();

    tokio::task::spawn_blocking(move || extract_figures_blocking(&src, &out, &options))
        .await
        .map_err(|e| PaperSlideError::Internal(format!("Extract task panicked: {}", e)))?
}

/// Blocking implementation of figure extraction.
pub fn extract_figures_blocking(
    source_pdf: &Path,
    out_pdf: &Path,
    options: &ExtractOptions,
) -> Result<ExtractReport, PaperSlideError> {
    let source = load_document(source_pdf)?;
    let source_pages = source.get_pages().len();
    info!("PDF loaded: {} pages", source_pages);

    let figures = find_figures(&source, options);
    debug!("{} candidate figure objects", figures.len());

    let (mut doc, skipped) = build_figure_document(&source, &figures, options);
    let written = figures.len() - skipped;
    if written == 0 {
        return Err(PaperSlideError::NoFiguresFound {
            path: source_pdf.to_path_buf(),
            marker: options.marker_key.clone(),
        });
    }

    save_document(&mut doc, out_pdf)?;
    info!("Wrote {} figures to: {}", written, out_pdf.display());

    Ok(ExtractReport {
        source_pages,
        figures: written,
        skipped,
    })
}

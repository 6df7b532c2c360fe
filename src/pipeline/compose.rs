//! Slide composition: fill the beamer templates for one paper.
//!
//! Templates are plain files with literal placeholder tokens:
//!
//! | file        | tokens                                     |
//! |-------------|--------------------------------------------|
//! | `main.tex`  | `PAPERTITLE`, `PAPERAUTHORS`, `PAPERURL`   |
//! | `abs.tex`   | `ABSTRACT_TEXT`                            |
//! | `body.tex`  | `FIGURENUMBER`, `FIGUREPATH` (per figure)  |
//!
//! Substitution is `str::replace` of every occurrence. Replacement text is
//! inserted as-is, so LaTeX special characters in a title reach the output
//! unescaped.

use crate::config::{FigureOrder, SummaryConfig};
use crate::error::PaperSlideError;
use crate::output::WorkingDirectory;
use crate::paper::PaperRecord;
use crate::pipeline::split::figure_index;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub const TITLE_TOKEN: &str = "PAPERTITLE";
pub const AUTHORS_TOKEN: &str = "PAPERAUTHORS";
pub const URL_TOKEN: &str = "PAPERURL";
pub const ABSTRACT_TOKEN: &str = "ABSTRACT_TEXT";
pub const FIGURE_NUMBER_TOKEN: &str = "FIGURENUMBER";
pub const FIGURE_PATH_TOKEN: &str = "FIGUREPATH";

/// Fill the title slide template.
pub fn render_main(template: &str, record: &PaperRecord) -> String {
    template
        .replace(TITLE_TOKEN, &record.title)
        .replace(AUTHORS_TOKEN, &record.authors_joined())
        .replace(URL_TOKEN, &record.url)
}

/// Fill the abstract slide template.
pub fn render_abstract(template: &str, record: &PaperRecord) -> String {
    template.replace(ABSTRACT_TOKEN, &record.abstract_text)
}

/// Fill one figure block. `number` is 1-based; `file_name` is relative to
/// the figures directory.
pub fn render_figure_block(template: &str, number: usize, file_name: &str) -> String {
    template
        .replace(FIGURE_NUMBER_TOKEN, &number.to_string())
        .replace(FIGURE_PATH_TOKEN, &format!("figures/{file_name}"))
}

/// Sort figure file names for `body.tex`.
///
/// `Numeric` puts `figure_<n>.pdf` in order of `n` and any other name after
/// them; `Lexicographic` is a plain byte-wise sort, under which
/// `figure_10.pdf` precedes `figure_2.pdf`.
pub fn sort_figures(names: &mut [String], order: FigureOrder) {
    match order {
        FigureOrder::Lexicographic => names.sort(),
        FigureOrder::Numeric => names.sort_by(|a, b| {
            let key = |s: &str| (figure_index(s).unwrap_or(u64::MAX), s.to_string());
            key(a).cmp(&key(b))
        }),
    }
}

async fn read_template(dir: &Path, name: &str) -> Result<String, PaperSlideError> {
    let path = dir.join(name);
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| PaperSlideError::TemplateRead { path, source: e })
}

async fn write_output(path: &Path, contents: &str) -> Result<(), PaperSlideError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| PaperSlideError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// List the regular files in `dir`, sorted per `order`.
async fn list_figures(dir: &Path, order: FigureOrder) -> Result<Vec<String>, PaperSlideError> {
    let io_err = |e: std::io::Error| PaperSlideError::Io {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        if !entry.file_type().await.map_err(io_err)?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    sort_figures(&mut names, order);
    Ok(names)
}

/// Write `latexmkrc`, `main.tex`, `abs.tex` and `body.tex` into the slide
/// directory.
///
/// `body.tex` is deleted first and rebuilt with one block per file in the
/// figures directory. The per-figure template is read again for every block.
/// Returns the figure files in the order they were composed.
pub async fn compose_slides(
    dirs: &WorkingDirectory,
    record: &PaperRecord,
    config: &SummaryConfig,
) -> Result<Vec<PathBuf>, PaperSlideError> {
    let templates = &config.template_dir;

    let latexmkrc = templates.join("latexmkrc");
    tokio::fs::copy(&latexmkrc, dirs.latexmkrc())
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PaperSlideError::TemplateRead {
                path: latexmkrc.clone(),
                source: e,
            },
            _ => PaperSlideError::OutputWriteFailed {
                path: dirs.latexmkrc(),
                source: e,
            },
        })?;

    let main = read_template(templates, "main.tex").await?;
    write_output(&dirs.main_tex(), &render_main(&main, record)).await?;

    debug!("Abstract: {}", record.abstract_text);
    let abs = read_template(templates, "abs.tex").await?;
    write_output(&dirs.abs_tex(), &render_abstract(&abs, record)).await?;

    let body_path = dirs.body_tex();
    match tokio::fs::remove_file(&body_path).await {
        Ok(()) => debug!("Removed previous {}", body_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(PaperSlideError::OutputWriteFailed {
                path: body_path,
                source: e,
            })
        }
    }

    let names = list_figures(&dirs.figures_dir, config.figure_order).await?;
    let append_err = |e: std::io::Error| PaperSlideError::OutputWriteFailed {
        path: body_path.clone(),
        source: e,
    };
    let mut body = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&body_path)
        .await
        .map_err(append_err)?;

    let mut figures = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let template = read_template(templates, "body.tex").await?;
        let block = render_figure_block(&template, i + 1, name);
        body.write_all(block.as_bytes()).await.map_err(append_err)?;
        figures.push(dirs.figures_dir.join(name));
    }
    body.flush().await.map_err(append_err)?;

    info!(
        "Composed slides with {} figures in: {}",
        figures.len(),
        dirs.slide_dir.display()
    );
    Ok(figures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::ArxivId;

    fn record() -> PaperRecord {
        PaperRecord::new(
            ArxivId::parse("1234.5678").unwrap(),
            "http://example.org/1",
            "http://example.org/pdf/1",
            "A\nB",
            vec!["X".into(), "Y".into()],
            "Line one\nline two\\ end ",
        )
    }

    #[test]
    fn main_template_is_fully_substituted() {
        let out = render_main(
            "\\title{PAPERTITLE}\n\\author{PAPERAUTHORS}\n\\url{PAPERURL} PAPERTITLE",
            &record(),
        );
        assert!(out.contains("A B"));
        assert!(out.contains("X, Y"));
        assert!(out.contains("http://example.org/1"));
        for token in [TITLE_TOKEN, AUTHORS_TOKEN, URL_TOKEN] {
            assert!(!out.contains(token), "{token} left in {out}");
        }
        assert_eq!(out.matches("A B").count(), 2);
    }

    #[test]
    fn replacement_text_is_literal() {
        let mut r = record();
        r.title = "Costs of $1 & \\$2".into();
        assert_eq!(render_main("PAPERTITLE", &r), "Costs of $1 & \\$2");
    }

    #[test]
    fn abstract_template_gets_normalised_text() {
        let out = render_abstract("\\begin{frame}ABSTRACT_TEXT\\end{frame}", &record());
        assert_eq!(out, "\\begin{frame}Line one line two end\\end{frame}");
    }

    #[test]
    fn figure_block_uses_relative_path() {
        let out = render_figure_block("{FIGURENUMBER}{FIGUREPATH}", 3, "figure_3.pdf");
        assert_eq!(out, "{3}{figures/figure_3.pdf}");
    }

    #[test]
    fn orders_diverge_from_ten_figures() {
        let mut numeric: Vec<String> = (1..=11).map(|n| format!("figure_{n}.pdf")).collect();
        numeric.reverse();
        let mut lexical = numeric.clone();

        sort_figures(&mut numeric, FigureOrder::Numeric);
        sort_figures(&mut lexical, FigureOrder::Lexicographic);

        assert_eq!(numeric[1], "figure_2.pdf");
        assert_eq!(numeric[10], "figure_11.pdf");
        assert_eq!(
            &lexical[..4],
            &["figure_1.pdf", "figure_10.pdf", "figure_11.pdf", "figure_2.pdf"]
        );
    }

    #[test]
    fn numeric_order_puts_other_names_last() {
        let mut names = vec!["z.pdf".to_string(), "figure_2.pdf".into(), "a.pdf".into()];
        sort_figures(&mut names, FigureOrder::Numeric);
        assert_eq!(names, vec!["figure_2.pdf", "a.pdf", "z.pdf"]);
    }

    async fn setup(figures: usize) -> (tempfile::TempDir, WorkingDirectory, SummaryConfig) {
        let tmp = tempfile::tempdir().unwrap();
        let templates = tmp.path().join("templates");
        std::fs::create_dir(&templates).unwrap();
        std::fs::write(templates.join("latexmkrc"), "$pdf_mode = 1;\n").unwrap();
        std::fs::write(templates.join("main.tex"), "PAPERTITLE|PAPERAUTHORS|PAPERURL\n").unwrap();
        std::fs::write(templates.join("abs.tex"), "ABSTRACT_TEXT\n").unwrap();
        std::fs::write(templates.join("body.tex"), "[FIGURENUMBER:FIGUREPATH]\n").unwrap();

        let id = ArxivId::parse("1234.5678").unwrap();
        let dirs = WorkingDirectory::create(&tmp.path().join("out"), &id)
            .await
            .unwrap();
        for n in 1..=figures {
            std::fs::write(dirs.figures_dir.join(format!("figure_{n}.pdf")), b"%PDF").unwrap();
        }
        let config = SummaryConfig::builder()
            .template_dir(templates)
            .build()
            .unwrap();
        (tmp, dirs, config)
    }

    #[tokio::test]
    async fn writes_all_slide_files() {
        let (_tmp, dirs, config) = setup(2).await;
        let figures = compose_slides(&dirs, &record(), &config).await.unwrap();
        assert_eq!(figures.len(), 2);

        assert_eq!(
            std::fs::read_to_string(dirs.latexmkrc()).unwrap(),
            "$pdf_mode = 1;\n"
        );
        assert_eq!(
            std::fs::read_to_string(dirs.main_tex()).unwrap(),
            "A B|X, Y|http://example.org/1\n"
        );
        assert_eq!(
            std::fs::read_to_string(dirs.body_tex()).unwrap(),
            "[1:figures/figure_1.pdf]\n[2:figures/figure_2.pdf]\n"
        );
    }

    #[tokio::test]
    async fn rerun_replaces_body() {
        let (_tmp, dirs, config) = setup(3).await;
        compose_slides(&dirs, &record(), &config).await.unwrap();
        std::fs::remove_file(dirs.figures_dir.join("figure_3.pdf")).unwrap();
        std::fs::remove_file(dirs.figures_dir.join("figure_2.pdf")).unwrap();

        compose_slides(&dirs, &record(), &config).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dirs.body_tex()).unwrap(),
            "[1:figures/figure_1.pdf]\n"
        );
    }

    #[tokio::test]
    async fn missing_template_is_reported() {
        let (_tmp, dirs, config) = setup(1).await;
        std::fs::remove_file(config.template_dir.join("abs.tex")).unwrap();
        let err = compose_slides(&dirs, &record(), &config).await.unwrap_err();
        match err {
            PaperSlideError::TemplateRead { path, .. } => assert!(path.ends_with("abs.tex")),
            other => panic!("unexpected error: {other}"),
        }
    }
}

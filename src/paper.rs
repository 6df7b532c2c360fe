//! Paper identity and metadata.
//!
//! [`ArxivId`] validates what the user typed before it becomes a directory
//! name and a query parameter. [`PaperRecord`] is the normalised metadata a
//! run carries from the fetch stage to the compose stage.

use crate::error::PaperSlideError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated arXiv identifier such as `2301.07041`, `2301.07041v2` or
/// `hep-th/9901001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArxivId(String);

impl ArxivId {
    /// Parse user input into an identifier.
    ///
    /// Surrounding whitespace and an `arXiv:` prefix are dropped.
    pub fn parse(input: &str) -> Result<Self, PaperSlideError> {
        let invalid = |reason: &str| PaperSlideError::InvalidIdentifier {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let mut id = input.trim();
        if id
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("arxiv:"))
        {
            id = &id[6..];
        }

        if id.is_empty() {
            return Err(invalid("identifier is empty"));
        }
        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '/' | '_')))
        {
            return Err(invalid(&format!("unexpected character {bad:?}")));
        }
        if id.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(invalid("identifier must not contain empty or relative path segments"));
        }

        Ok(Self(id.to_string()))
    }

    /// The identifier as sent to the API.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier as used in file and directory names.
    ///
    /// Old-style identifiers carry a `/`; it becomes `_` so the working
    /// directory stays one level deep.
    pub fn file_stem(&self) -> String {
        self.0.replace('/', "_")
    }
}

impl fmt::Display for ArxivId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata of one paper, normalised for substitution into LaTeX templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// The identifier the run was started with.
    pub id: ArxivId,
    /// Canonical abstract-page URL (the Atom entry id).
    pub url: String,
    /// URL the PDF was downloaded from.
    pub pdf_url: String,
    /// Title with line breaks and backslashes turned into spaces.
    pub title: String,
    /// Author names in feed order.
    pub authors: Vec<String>,
    /// Abstract collapsed onto a single line.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

impl PaperRecord {
    /// Build a record from raw feed values, normalising title and abstract.
    pub fn new(
        id: ArxivId,
        url: impl Into<String>,
        pdf_url: impl Into<String>,
        raw_title: &str,
        authors: Vec<String>,
        raw_abstract: &str,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            pdf_url: pdf_url.into(),
            title: normalize_title(raw_title),
            authors,
            abstract_text: normalize_abstract(raw_abstract),
        }
    }

    /// Authors joined the way the title slide shows them.
    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }
}

static RE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Replace every newline and backslash with a space.
///
/// Backslashes would otherwise start LaTeX commands in the template.
pub fn normalize_title(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == '\n' || c == '\\' { ' ' } else { c })
        .collect()
}

/// Title normalisation plus whitespace-run collapsing and trimming.
///
/// Idempotent: `normalize_abstract(normalize_abstract(s)) == normalize_abstract(s)`.
pub fn normalize_abstract(raw: &str) -> String {
    let s = normalize_title(raw);
    RE_WHITESPACE_RUN.replace_all(&s, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_new_and_old_style_ids() {
        assert_eq!(ArxivId::parse("2301.07041").unwrap().as_str(), "2301.07041");
        assert_eq!(ArxivId::parse(" 2301.07041v2 ").unwrap().as_str(), "2301.07041v2");
        let old = ArxivId::parse("hep-th/9901001").unwrap();
        assert_eq!(old.as_str(), "hep-th/9901001");
        assert_eq!(old.file_stem(), "hep-th_9901001");
    }

    #[test]
    fn strips_arxiv_prefix() {
        assert_eq!(ArxivId::parse("arXiv:1706.03762").unwrap().as_str(), "1706.03762");
        assert_eq!(ArxivId::parse("ARXIV:1706.03762").unwrap().as_str(), "1706.03762");
    }

    #[test]
    fn rejects_bad_ids() {
        for bad in ["", "   ", "arXiv:", "1706 03762", "../etc", "a//b", "x?y=1", "/abs"] {
            assert!(
                matches!(
                    ArxivId::parse(bad),
                    Err(PaperSlideError::InvalidIdentifier { .. })
                ),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn title_newlines_and_backslashes_become_spaces() {
        assert_eq!(normalize_title("A\nB"), "A B");
        assert_eq!(normalize_title("On \\LaTeX"), "On  LaTeX");
        // Only the character is replaced; indentation after a break stays.
        assert_eq!(normalize_title("Deep\n  Nets"), "Deep   Nets");
    }

    #[test]
    fn title_keeps_pipes_and_other_specials() {
        assert_eq!(normalize_title("A | B"), "A | B");
        assert_eq!(normalize_title("50% of $x_1$ & more"), "50% of $x_1$ & more");
    }

    #[test]
    fn abstract_collapses_whitespace_runs() {
        let raw = "  We study\n  deep\tnets \\ and\r\nmore.  ";
        assert_eq!(normalize_abstract(raw), "We study deep nets and more.");
    }

    #[test]
    fn abstract_normalisation_is_idempotent() {
        for raw in [
            "  a\n\nb\\c\t d  ",
            "plain",
            "",
            "x\\\\\\y",
            "multi\u{a0}byte\u{2003}spaces",
        ] {
            let once = normalize_abstract(raw);
            assert_eq!(normalize_abstract(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn record_joins_authors_with_comma_space() {
        let rec = PaperRecord::new(
            ArxivId::parse("1").unwrap(),
            "http://example.org/1",
            "http://example.org/pdf/1",
            "A\nB",
            vec!["X".into(), "Y".into()],
            "abs",
        );
        assert_eq!(rec.title, "A B");
        assert_eq!(rec.authors_joined(), "X, Y");
    }
}

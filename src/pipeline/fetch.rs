//! Metadata fetch and PDF download from the arXiv export API.
//!
//! One query per run: `GET <api_url>?id_list=<id>&max_results=1` returns an
//! Atom feed with at most one `<entry>`. The entry yields the canonical
//! abstract URL, title, authors, abstract and the PDF link; the PDF is then
//! streamed into the working directory.
//!
//! ## Why a temp file for the download?
//!
//! The body is streamed into a temp file next to the destination and renamed
//! into place only once it is complete and starts with `%PDF`. An interrupted
//! or HTML-error download therefore never leaves a `<id>.pdf` that the
//! extract stage would choke on.

use crate::config::SummaryConfig;
use crate::error::PaperSlideError;
use crate::paper::{ArxivId, PaperRecord};
use futures::StreamExt;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// One `<entry>` of an arXiv Atom feed, with raw (unnormalised) text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArxivEntry {
    /// `<id>`: the abstract-page URL, e.g. `http://arxiv.org/abs/2301.07041v1`.
    pub entry_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    /// `<link title="pdf" …>` href, when present.
    pub pdf_url: Option<String>,
}

impl ArxivEntry {
    /// The PDF URL, derived from the entry id when the feed has no pdf link.
    pub fn pdf_url(&self) -> String {
        self.pdf_url
            .clone()
            .unwrap_or_else(|| self.entry_id.replacen("/abs/", "/pdf/", 1))
    }

    /// arXiv reports query errors as an entry whose id lives under `/api/errors`.
    fn is_error_entry(&self) -> bool {
        self.entry_id.contains("arxiv.org/api/errors")
    }
}

/// HTTP client for the arXiv export API and PDF host.
pub struct ArxivClient {
    http: reqwest::Client,
    api_url: String,
    timeout_secs: u64,
}

impl ArxivClient {
    /// Build a client with the configured endpoint and timeout.
    pub fn new(config: &SummaryConfig) -> Result<Self, PaperSlideError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .user_agent(concat!("paper2slide/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PaperSlideError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            timeout_secs: config.download_timeout_secs,
        })
    }

    /// Query the API for `id` and return its entry.
    pub async fn fetch_entry(&self, id: &ArxivId) -> Result<ArxivEntry, PaperSlideError> {
        info!("Querying arXiv for {}", id);
        let response = self
            .http
            .get(&self.api_url)
            .query(&[("id_list", id.as_str()), ("max_results", "1")])
            .send()
            .await
            .map_err(|e| PaperSlideError::from_reqwest(&self.api_url, self.timeout_secs, e))?;

        if !response.status().is_success() {
            return Err(PaperSlideError::HttpStatus {
                url: self.api_url.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| PaperSlideError::from_reqwest(&self.api_url, self.timeout_secs, e))?;

        let entry = parse_feed(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| PaperSlideError::PaperNotFound {
                id: id.to_string(),
            })?;

        if entry.is_error_entry() {
            return Err(PaperSlideError::ArxivApi {
                message: entry.summary.trim().to_string(),
            });
        }

        debug!("arXiv entry: {} ({} authors)", entry.entry_id, entry.authors.len());
        Ok(entry)
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    pub async fn download_pdf(&self, url: &str, dest: &Path) -> Result<u64, PaperSlideError> {
        info!("Downloading PDF from: {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PaperSlideError::from_reqwest(url, self.timeout_secs, e))?;

        if !response.status().is_success() {
            return Err(PaperSlideError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let io_err = |e: std::io::Error| PaperSlideError::Io {
            path: dest.to_path_buf(),
            source: e,
        };

        let tmp = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(io_err)?;
        let mut file = tokio::fs::File::from_std(tmp.as_file().try_clone().map_err(io_err)?);

        let mut head: Vec<u8> = Vec::with_capacity(4);
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| PaperSlideError::from_reqwest(url, self.timeout_secs, e))?;
            if head.len() < 4 {
                head.extend(chunk.iter().take(4 - head.len()));
            }
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;
        drop(file);

        if head.as_slice() != b"%PDF" {
            return Err(PaperSlideError::NotAPdf {
                path: dest.to_path_buf(),
                magic: head,
            });
        }

        tmp.persist(dest).map_err(|e| io_err(e.error))?;
        info!("Downloaded {} bytes to: {}", written, dest.display());
        Ok(written)
    }
}

/// Query arXiv and build the normalised record, without downloading.
pub async fn fetch_record(
    client: &ArxivClient,
    id: &ArxivId,
) -> Result<PaperRecord, PaperSlideError> {
    let entry = client.fetch_entry(id).await?;
    let pdf_url = entry.pdf_url();
    Ok(PaperRecord::new(
        id.clone(),
        entry.entry_id,
        pdf_url,
        &entry.title,
        entry.authors,
        &entry.summary,
    ))
}

// ── Atom parsing ─────────────────────────────────────────────────────────

/// Parse an arXiv Atom feed into its entries.
///
/// Entries without a title are skipped: arXiv answers an unknown but
/// well-formed identifier with such an empty shell.
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivEntry>, PaperSlideError> {
    let mut reader = Reader::from_str(xml);

    let mut entries = Vec::new();
    let mut current: Option<ArxivEntry> = None;
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                if name == b"entry" {
                    current = Some(ArxivEntry::default());
                } else if name == b"link" {
                    if let Some(entry) = current.as_mut() {
                        read_link(&e, entry)?;
                    }
                }
                stack.push(name);
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"link" {
                    if let Some(entry) = current.as_mut() {
                        read_link(&e, entry)?;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let t = e
                    .unescape()
                    .map_err(|err| PaperSlideError::FeedParse(err.to_string()))?;
                text.push_str(&t);
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(e)) => {
                let name = e.name().as_ref().to_vec();
                stack.pop();
                let parent = stack.last().map(Vec::as_slice);
                if let Some(entry) = current.as_mut() {
                    match (name.as_slice(), parent) {
                        (b"id", Some(b"entry")) => entry.entry_id = text.trim().to_string(),
                        (b"title", Some(b"entry")) => entry.title = text.trim().to_string(),
                        (b"summary", Some(b"entry")) => entry.summary = text.clone(),
                        (b"name", Some(b"author")) => entry.authors.push(text.trim().to_string()),
                        _ => {}
                    }
                }
                if name == b"entry" {
                    if let Some(entry) = current.take() {
                        if !entry.title.is_empty() {
                            entries.push(entry);
                        }
                    }
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PaperSlideError::FeedParse(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            Ok(_) => {}
        }
    }

    Ok(entries)
}

/// Record the PDF link of an entry from a `<link>` element.
fn read_link(e: &BytesStart<'_>, entry: &mut ArxivEntry) -> Result<(), PaperSlideError> {
    let mut href = None;
    let mut is_pdf = false;
    for attr in e.attributes() {
        let attr = attr.map_err(|err| PaperSlideError::FeedParse(err.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|err| PaperSlideError::FeedParse(err.to_string()))?;
        match attr.key.as_ref() {
            b"href" => href = Some(value.to_string()),
            b"title" if value == "pdf" => is_pdf = true,
            b"type" if value == "application/pdf" => is_pdf = true,
            _ => {}
        }
    }
    if is_pdf && entry.pdf_url.is_none() {
        entry.pdf_url = href;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: id_list=1706.03762</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <title>Attention Is All
  You Need</title>
    <summary>  The dominant sequence transduction models are based on complex
recurrent &amp; convolutional networks.
</summary>
    <author><name>Ashish Vaswani</name></author>
    <author>
      <name>Noam Shazeer</name>
      <arxiv:affiliation>Google</arxiv:affiliation>
    </author>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/1706.03762v7" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.CL"/>
  </entry>
</feed>"#;

    #[test]
    fn parses_single_entry() {
        let entries = parse_feed(FEED).unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.entry_id, "http://arxiv.org/abs/1706.03762v7");
        assert_eq!(e.title, "Attention Is All\n  You Need");
        assert_eq!(e.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert!(e.summary.contains("recurrent & convolutional"));
        assert_eq!(e.pdf_url(), "http://arxiv.org/pdf/1706.03762v7");
    }

    #[test]
    fn feed_title_is_not_mistaken_for_entry_title() {
        let e = &parse_feed(FEED).unwrap()[0];
        assert!(!e.title.contains("ArXiv Query"));
    }

    #[test]
    fn empty_feed_has_no_entries() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query</title>
  <entry><id>http://arxiv.org/abs/2401.99999</id><title></title></entry>
</feed>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn error_entry_is_detected() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_abc</id>
    <title>Error</title>
    <summary>incorrect id format for abc</summary>
  </entry>
</feed>"#;
        let e = &parse_feed(xml).unwrap()[0];
        assert!(e.is_error_entry());
    }

    #[test]
    fn pdf_url_falls_back_to_entry_id() {
        let e = ArxivEntry {
            entry_id: "http://arxiv.org/abs/2301.07041v1".into(),
            ..Default::default()
        };
        assert_eq!(e.pdf_url(), "http://arxiv.org/pdf/2301.07041v1");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = "<feed><entry><title>x</entry></feed>";
        assert!(matches!(parse_feed(xml), Err(PaperSlideError::FeedParse(_))));
    }

    #[tokio::test]
    async fn fetch_record_normalises_entry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("id_list".into(), "1706.03762".into()),
                mockito::Matcher::UrlEncoded("max_results".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/atom+xml")
            .with_body(FEED)
            .create_async()
            .await;

        let config = SummaryConfig::builder()
            .api_url(format!("{}/api/query", server.url()))
            .build()
            .unwrap();
        let client = ArxivClient::new(&config).unwrap();
        let id = ArxivId::parse("1706.03762").unwrap();
        let rec = fetch_record(&client, &id).await.unwrap();

        mock.assert_async().await;
        assert_eq!(rec.title, "Attention Is All   You Need");
        assert_eq!(rec.authors_joined(), "Ashish Vaswani, Noam Shazeer");
        assert!(rec.abstract_text.starts_with("The dominant sequence"));
        assert!(!rec.abstract_text.contains('\n'));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>q</title></feed>"#)
            .create_async()
            .await;

        let config = SummaryConfig::builder()
            .api_url(format!("{}/api/query", server.url()))
            .build()
            .unwrap();
        let client = ArxivClient::new(&config).unwrap();
        let err = client
            .fetch_entry(&ArxivId::parse("2401.99999").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PaperSlideError::PaperNotFound { .. }), "{err}");
    }

    #[tokio::test]
    async fn server_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let config = SummaryConfig::builder()
            .api_url(format!("{}/api/query", server.url()))
            .build()
            .unwrap();
        let client = ArxivClient::new(&config).unwrap();
        let err = client
            .fetch_entry(&ArxivId::parse("1706.03762").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PaperSlideError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn arxiv_error_entry_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_abc</id>
    <title>Error</title>
    <summary>incorrect id format for abc</summary>
  </entry>
</feed>"#,
            )
            .create_async()
            .await;

        let config = SummaryConfig::builder()
            .api_url(format!("{}/api/query", server.url()))
            .build()
            .unwrap();
        let client = ArxivClient::new(&config).unwrap();
        let err = client
            .fetch_entry(&ArxivId::parse("1706.03762").unwrap())
            .await
            .unwrap_err();
        match err {
            PaperSlideError::ArxivApi { message } => {
                assert_eq!(message, "incorrect id format for abc")
            }
            other => panic!("expected ArxivApi, got {other}"),
        }
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold the connection without ever answering.
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        });

        let config = SummaryConfig::builder()
            .api_url(format!("http://{addr}/api/query"))
            .download_timeout_secs(1)
            .build()
            .unwrap();
        let client = ArxivClient::new(&config).unwrap();
        let err = client
            .fetch_entry(&ArxivId::parse("1706.03762").unwrap())
            .await
            .unwrap_err();
        assert!(
            matches!(err, PaperSlideError::DownloadTimeout { secs: 1, .. }),
            "{err}"
        );
    }

    #[tokio::test]
    async fn download_rejects_non_pdf_and_leaves_no_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pdf/1")
            .with_status(200)
            .with_body("<html>rate limited</html>")
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("1.pdf");
        let client = ArxivClient::new(&SummaryConfig::default()).unwrap();
        let err = client
            .download_pdf(&format!("{}/pdf/1", server.url()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, PaperSlideError::NotAPdf { .. }));
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn download_writes_pdf_bytes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pdf/1")
            .with_status(200)
            .with_body(b"%PDF-1.5\n%%EOF\n".to_vec())
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("1.pdf");
        let client = ArxivClient::new(&SummaryConfig::default()).unwrap();
        let n = client
            .download_pdf(&format!("{}/pdf/1", server.url()), &dest)
            .await
            .unwrap();

        assert_eq!(n, 15);
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.5\n%%EOF\n");
    }
}

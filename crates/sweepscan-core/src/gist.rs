//! Best-effort gist search via HTML scraping.
//!
//! GitHub Gist search has no API, so this scrapes the web search page.
//! Grounded on `original_source/src/core/engine.py::GistSearchEngine`.
//! Per the design note in spec.md 9, this is an isolated collaborator:
//! it owns no credential or rate-limiter state and its failures are
//! swallowed here rather than propagated, so a broken scrape can never
//! block or fail the main scan.

use scraper::{Html, Selector};

use crate::sink::Sink;
use crate::transport::Transport;
use crate::types::{ResultKind, ResultRecord};

const GIST_SEARCH_URL: &str = "https://gist.github.com/search";
const MAX_PAGES: u32 = 10;

pub struct GistScraper<'a> {
    transport: &'a Transport,
    sink: &'a Sink,
}

impl<'a> GistScraper<'a> {
    pub fn new(transport: &'a Transport, sink: &'a Sink) -> Self {
        Self { transport, sink }
    }

    /// Search for gists containing `term`. Returns the number of new
    /// gists accepted by the Sink. Never returns an error: any failure
    /// (network, parse) is logged and simply ends the scrape early.
    pub async fn search(&self, term: &str) -> u32 {
        let query = format!("*.\"{term}\"");
        let mut found = 0u32;

        for page in 1..=MAX_PAGES {
            if self.sink.state().interrupted() {
                break;
            }

            let page_str = page.to_string();
            let params = [("q", query.as_str()), ("p", page_str.as_str())];
            let resp = match self.transport.fetch(GIST_SEARCH_URL, None, &params, true).await {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("gist search request failed: {e}");
                    break;
                }
            };
            if !resp.status.is_success() {
                break;
            }

            let hits = parse_gist_page(&resp.text());
            if hits.is_empty() {
                break;
            }

            for (url, name, owner) in hits {
                let record = ResultRecord {
                    kind: ResultKind::Gist,
                    name,
                    canonical_url: url,
                    owner,
                    description: None,
                    language: None,
                    stars: None,
                    created_at: None,
                    updated_at: None,
                };
                if self.sink.add(record) {
                    found += 1;
                }
            }
        }

        log::info!("found {found} gists for {term}");
        found
    }
}

/// Extract `(url, short_id, owner)` triples from gist-search result HTML.
fn parse_gist_page(html: &str) -> Vec<(String, String, String)> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for el in document.select(&selector) {
        let Some(href) = el.value().attr("href") else { continue };
        if let Some((owner, gist_id)) = parse_gist_href(href) {
            let url = format!("https://gist.github.com{href}");
            let short_id = gist_id.chars().take(12).collect::<String>();
            out.push((url, short_id, owner));
        }
    }
    out
}

fn parse_gist_href(href: &str) -> Option<(String, String)> {
    let trimmed = href.trim_start_matches('/');
    let (owner, gist_id) = trimmed.split_once('/')?;
    if gist_id.len() == 32 && gist_id.chars().all(|c| c.is_ascii_hexdigit()) {
        Some((owner.to_string(), gist_id.to_string()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_gist_links() {
        let html = r#"<a href="/octocat/abcdefabcdefabcdefabcdefabcdefab">a gist</a>
                       <a href="/other/page">not a gist</a>"#;
        let hits = parse_gist_page(html);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].2, "octocat");
        assert_eq!(hits[0].0, "https://gist.github.com/octocat/abcdefabcdefabcdefabcdefabcdefab");
    }

    #[test]
    fn ignores_links_with_non_hex_ids() {
        let html = r#"<a href="/octocat/not-a-hex-id-zzzzzzzzzzzzzzzzzzzzzzzzz">x</a>"#;
        assert!(parse_gist_page(html).is_empty());
    }
}

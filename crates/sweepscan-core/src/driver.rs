//! Recursive time-slicing search driver.
//!
//! Grounded on `original_source/src/core/engine.py::SearchEngine`
//! (`_recursive_search`, `_split_time_slice`, `_fetch_all_pages`,
//! `_make_request`). The source retries 403s via direct recursion on
//! `_make_request`; this reimplements that as a bounded iterative loop
//! (cap 5, per the redesign flag in spec.md 9) so a persistently
//! misbehaving credential surfaces an error instead of recursing forever.


use serde_json::Value;

use crate::error::DriverError;
use crate::governor::{Directive, Governor};
use crate::sink::Sink;
use crate::transport::{Response, Transport};
use crate::types::{ResourceKind, ResultKind, ResultRecord, SearchQuery, TimeSlice};

const GITHUB_MAX_RESULTS: u32 = 1000;
const PER_PAGE: u32 = 100;
const MAX_RETRY_ATTEMPTS: u32 = 5;

pub struct SearchDriver {
    transport: Transport,
    governor: Governor,
    sink: Sink,
    api_base: String,
}

/// Outcome of one envelope call: either a usable response, or a signal
/// that the current slice should be abandoned (422) without being an error.
enum Envelope {
    Response(Response),
    SliceHandled,
}

impl SearchDriver {
    pub fn new(transport: Transport, governor: Governor, sink: Sink, api_base: impl Into<String>) -> Self {
        Self {
            transport,
            governor,
            sink,
            api_base: api_base.into(),
        }
    }

    /// Enumerate one `year` slice per year in `[year_from, year_to]` and
    /// descend into each enabled resource kind. Streams records to the
    /// Sink; returns the final scan state once all top-level slices (or
    /// an interrupt) have been processed.
    pub async fn search(
        &self,
        term: &str,
        year_from: i32,
        year_to: i32,
        include_repos: bool,
        include_code: bool,
    ) -> Result<(), DriverError> {
        for year in year_from..=year_to {
            if self.sink.state().interrupted() {
                break;
            }
            let slice = TimeSlice::year(year);
            self.sink.state().set_current_slice(slice.to_string());

            if include_repos {
                self.descend(term, slice.clone(), ResourceKind::Repositories).await?;
            }
            if self.sink.state().interrupted() {
                break;
            }
            if include_code {
                self.descend(term, slice.clone(), ResourceKind::Code).await?;
            }
        }
        Ok(())
    }

    /// Probe the slice's total count; harvest directly if `<= 1000`,
    /// otherwise split and recurse. At `Day` granularity with `> 1000`
    /// results, harvest anyway (truncated at 1000) and log the shortfall.
    fn descend<'a>(
        &'a self,
        term: &'a str,
        slice: TimeSlice,
        kind: ResourceKind,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), DriverError>> + Send + 'a>> {
        Box::pin(async move {
            if self.sink.state().interrupted() {
                return Ok(());
            }

            let query = SearchQuery::new(term, slice.clone(), kind);
            let count = match self.count_probe(&query).await? {
                Some(c) => c,
                None => return Ok(()), // 422: slice considered handled
            };

            if count == 0 {
                log::info!("no results for {slice} ({kind:?})");
                return Ok(());
            }
            log::info!("found {count} results for {slice} ({kind:?})");

            if count <= GITHUB_MAX_RESULTS {
                self.harvest(&query, count).await?;
                return Ok(());
            }

            let children = slice.split();
            if children.is_empty() {
                log::warn!("at day granularity with {count} results; harvesting max {GITHUB_MAX_RESULTS}, truncation diagnostic recorded for {slice}");
                self.harvest(&query, count).await?;
                return Ok(());
            }

            log::warn!("{count} results exceed {GITHUB_MAX_RESULTS} for {slice}, splitting");
            for child in children {
                if self.sink.state().interrupted() {
                    return Ok(());
                }
                self.descend(term, child, kind).await?;
            }
            Ok(())
        })
    }

    async fn count_probe(&self, query: &SearchQuery) -> Result<Option<u32>, DriverError> {
        let endpoint = format!("{}/{}", self.api_base, query.kind.endpoint());
        let q = query.query_string();
        let params = [("q", q.as_str()), ("per_page", "1"), ("page", "1")];

        match self.request(&endpoint, &params).await? {
            Envelope::SliceHandled => Ok(None),
            Envelope::Response(resp) => {
                if !resp.status.is_success() {
                    return Ok(Some(0));
                }
                let value: Value = resp.json().unwrap_or(Value::Null);
                let count = value
                    .get("total_count")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32;
                Ok(Some(count))
            }
        }
    }

    /// Page through results with `per_page=100`, `sort=indexed`,
    /// `order=desc`. Bounded pages: `min(ceil(total_count/100), 10)`.
    async fn harvest(&self, query: &SearchQuery, total_count: u32) -> Result<(), DriverError> {
        let endpoint = format!("{}/{}", self.api_base, query.kind.endpoint());
        let q = query.query_string();
        let max_pages = GITHUB_MAX_RESULTS / PER_PAGE;

        let mut page = 1u32;
        while page <= max_pages {
            if self.sink.state().interrupted() {
                return Ok(());
            }

            let per_page_str = PER_PAGE.to_string();
            let page_str = page.to_string();
            let params = [
                ("q", q.as_str()),
                ("per_page", per_page_str.as_str()),
                ("page", page_str.as_str()),
                ("sort", "indexed"),
                ("order", "desc"),
            ];

            let resp = match self.request(&endpoint, &params).await? {
                Envelope::SliceHandled => return Ok(()),
                Envelope::Response(r) => r,
            };
            if !resp.status.is_success() {
                break;
            }

            let value: Value = match resp.json() {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("failed to parse harvest page body: {e}");
                    break;
                }
            };
            let items = value.get("items").and_then(|v| v.as_array()).cloned().unwrap_or_default();
            if items.is_empty() {
                break;
            }

            for item in &items {
                match parse_result(item, query.kind) {
                    Some(record) => {
                        self.sink.add(record);
                    }
                    None => log::warn!("failed to parse a search item, skipping"),
                }
            }

            let reported_total = value.get("total_count").and_then(|v| v.as_u64()).unwrap_or(total_count as u64) as u32;
            if page * PER_PAGE >= reported_total || page * PER_PAGE >= GITHUB_MAX_RESULTS {
                break;
            }
            page += 1;
        }
        Ok(())
    }

    /// Acquire a credential, send the request, observe the response, and
    /// handle 403/401/422 per the error taxonomy. Retries transparently
    /// (bounded at [`MAX_RETRY_ATTEMPTS`]) on rate-limit/abuse directives.
    async fn request(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Envelope, DriverError> {
        for attempt in 0..MAX_RETRY_ATTEMPTS {
            let cred = self.governor.acquire().await?;
            let resp = self
                .transport
                .fetch(endpoint, Some(cred.secret()), params, attempt == 0)
                .await?;
            self.governor.observe(cred.secret(), &resp);

            match resp.status.as_u16() {
                401 => {
                    let directive = self.governor.report_error(cred.secret(), 401, "").await;
                    if directive == Directive::Abort {
                        return Err(DriverError::Governor(crate::error::GovernorError::PoolExhausted));
                    }
                    continue;
                }
                403 | 429 => {
                    let body = resp.text().to_lowercase();
                    let directive = self.governor.report_error(cred.secret(), resp.status.as_u16(), &body).await;
                    if directive == Directive::Abort {
                        return Err(DriverError::Governor(crate::error::GovernorError::PoolExhausted));
                    }
                    continue;
                }
                422 => {
                    log::error!("validation error (query malformed or too long), abandoning slice");
                    return Ok(Envelope::SliceHandled);
                }
                _ => return Ok(Envelope::Response(resp)),
            }
        }
        Err(DriverError::RetriesExhausted)
    }
}

fn parse_result(item: &Value, kind: ResourceKind) -> Option<ResultRecord> {
    match kind {
        ResourceKind::Repositories => {
            let url = item.get("html_url").and_then(|v| v.as_str())?;
            Some(ResultRecord {
                kind: ResultKind::Repository,
                name: item
                    .get("full_name")
                    .or_else(|| item.get("name"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
                canonical_url: url.to_string(),
                owner: item
                    .get("owner")
                    .and_then(|o| o.get("login"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
                description: item.get("description").and_then(|v| v.as_str()).map(String::from),
                language: item.get("language").and_then(|v| v.as_str()).map(String::from),
                stars: item.get("stargazers_count").and_then(|v| v.as_u64()),
                created_at: item.get("created_at").and_then(|v| v.as_str()).map(String::from),
                updated_at: item.get("updated_at").and_then(|v| v.as_str()).map(String::from),
            })
        }
        ResourceKind::Code => {
            let url = item.get("html_url").and_then(|v| v.as_str())?;
            let repo = item.get("repository");
            Some(ResultRecord {
                kind: ResultKind::Code,
                name: item.get("name").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
                canonical_url: url.to_string(),
                owner: repo
                    .and_then(|r| r.get("owner"))
                    .and_then(|o| o.get("login"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
                description: repo.and_then(|r| r.get("description")).and_then(|v| v.as_str()).map(String::from),
                language: item.get("language").and_then(|v| v.as_str()).map(String::from),
                stars: None,
                created_at: None,
                updated_at: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_repository_item_defaults_missing_optional_fields() {
        let item: Value = serde_json::json!({
            "full_name": "acme/widgets",
            "html_url": "https://github.com/acme/widgets",
            "owner": {"login": "acme"},
        });
        let record = parse_result(&item, ResourceKind::Repositories).unwrap();
        assert_eq!(record.name, "acme/widgets");
        assert_eq!(record.canonical_url, "https://github.com/acme/widgets");
        assert!(record.description.is_none());
        assert_eq!(record.stars, None);
    }

    #[test]
    fn parse_code_item_reads_nested_repository_owner() {
        let item: Value = serde_json::json!({
            "name": "config.py",
            "html_url": "https://github.com/acme/widgets/blob/main/config.py",
            "repository": {"owner": {"login": "acme"}, "description": "widgets"},
        });
        let record = parse_result(&item, ResourceKind::Code).unwrap();
        assert_eq!(record.owner, "acme");
        assert_eq!(record.description.as_deref(), Some("widgets"));
    }

    #[test]
    fn parse_failure_returns_none_without_panicking() {
        let item: Value = serde_json::json!({"no_url_here": true});
        assert!(parse_result(&item, ResourceKind::Repositories).is_none());
    }
}

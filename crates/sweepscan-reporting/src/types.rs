//! Output shape and format selection. Grounded on the teacher's own
//! (stubbed) `hallucinator-reporting::types` module shape: a small
//! serializable record type plus a format enum, filled in here rather
//! than left as a `todo!()`.

use serde::Serialize;
use sweepscan_core::ResultRecord;

/// Output format selector, matching the CLI's `-f/--format` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Json,
    Csv,
    Html,
    All,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::Txt),
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "html" => Some(Self::Html),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// A flattened, serializable view of a [`ResultRecord`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
    pub kind: &'static str,
    pub name: String,
    pub url: String,
    pub owner: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: Option<u64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&ResultRecord> for ReportRecord {
    fn from(r: &ResultRecord) -> Self {
        Self {
            kind: r.kind.as_str(),
            name: r.name.clone(),
            url: r.canonical_url.clone(),
            owner: r.owner.clone(),
            description: r.description.clone(),
            language: r.language.clone(),
            stars: r.stars,
            created_at: r.created_at.clone(),
            updated_at: r.updated_at.clone(),
        }
    }
}

/// Summary statistics written alongside the records in every format.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ReportSummary {
    pub term: String,
    pub total_repos: u64,
    pub total_gists: u64,
    pub duration_secs: f64,
    pub interrupted: bool,
}

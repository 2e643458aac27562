//! Report writers: txt, json, csv, html, plus the plain URL-list export
//! used to feed downstream secret-scanning tools.

use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::types::{ExportFormat, ReportRecord, ReportSummary};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error writing report: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv serialization error: {0}")]
    Csv(#[from] csv::Error),
}

/// Write `records` (plus `summary`) to `base_path` in `format`. When
/// `format == All`, writes one file per concrete format with the
/// matching extension appended to `base_path`.
pub fn export_results(
    base_path: &Path,
    format: ExportFormat,
    records: &[ReportRecord],
    summary: &ReportSummary,
) -> Result<Vec<std::path::PathBuf>, ExportError> {
    match format {
        ExportFormat::All => {
            let mut written = Vec::new();
            for f in [ExportFormat::Txt, ExportFormat::Json, ExportFormat::Csv, ExportFormat::Html] {
                written.extend(export_results(base_path, f, records, summary)?);
            }
            Ok(written)
        }
        ExportFormat::Txt => {
            let path = with_extension(base_path, "txt");
            let mut f = std::fs::File::create(&path)?;
            writeln!(f, "term: {}", summary.term)?;
            writeln!(
                f,
                "repos: {} gists: {} duration: {:.1}s interrupted: {}",
                summary.total_repos, summary.total_gists, summary.duration_secs, summary.interrupted
            )?;
            for r in records {
                writeln!(f, "[{}] {} ({}) - {}", r.kind, r.owner, r.name, r.url)?;
            }
            Ok(vec![path])
        }
        ExportFormat::Json => {
            let path = with_extension(base_path, "json");
            let payload = serde_json::json!({ "summary": summary, "results": records });
            std::fs::write(&path, serde_json::to_vec_pretty(&payload)?)?;
            Ok(vec![path])
        }
        ExportFormat::Csv => {
            let path = with_extension(base_path, "csv");
            let mut writer = csv::Writer::from_path(&path)?;
            for r in records {
                writer.serialize(r)?;
            }
            writer.flush()?;
            Ok(vec![path])
        }
        ExportFormat::Html => {
            let path = with_extension(base_path, "html");
            let mut f = std::fs::File::create(&path)?;
            writeln!(f, "<!doctype html><html><head><meta charset=\"utf-8\"><title>sweepscan: {}</title></head><body>", html_escape(&summary.term))?;
            writeln!(
                f,
                "<p>repos: {} gists: {} duration: {:.1}s interrupted: {}</p>",
                summary.total_repos, summary.total_gists, summary.duration_secs, summary.interrupted
            )?;
            writeln!(f, "<table><tr><th>kind</th><th>owner</th><th>name</th><th>url</th></tr>")?;
            for r in records {
                writeln!(
                    f,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td><a href=\"{}\">{}</a></td></tr>",
                    html_escape(r.kind),
                    html_escape(&r.owner),
                    html_escape(&r.name),
                    html_escape(&r.url),
                    html_escape(&r.url),
                )?;
            }
            writeln!(f, "</table></body></html>")?;
            Ok(vec![path])
        }
    }
}

/// Plain one-URL-per-line export for handing results off to a downstream
/// secret scanner.
pub fn export_url_list(path: &Path, records: &[ReportRecord]) -> Result<(), ExportError> {
    let mut f = std::fs::File::create(path)?;
    for r in records {
        writeln!(f, "{}", r.url)?;
    }
    Ok(())
}

fn with_extension(base_path: &Path, ext: &str) -> std::path::PathBuf {
    let mut p = base_path.to_path_buf();
    p.set_extension(ext);
    p
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<ReportRecord> {
        vec![ReportRecord {
            kind: "repository",
            name: "acme/widgets".into(),
            url: "https://github.com/acme/widgets".into(),
            owner: "acme".into(),
            description: None,
            language: None,
            stars: Some(3),
            created_at: None,
            updated_at: None,
        }]
    }

    #[test]
    fn json_export_round_trips_record_count() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("results");
        let records = sample_records();
        let summary = ReportSummary {
            term: "acme.com".into(),
            total_repos: 1,
            total_gists: 0,
            duration_secs: 1.5,
            interrupted: false,
        };
        let written = export_results(&base, ExportFormat::Json, &records, &summary).unwrap();
        let contents = std::fs::read_to_string(&written[0]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value["results"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn csv_export_writes_header_and_row() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("results");
        let records = sample_records();
        let summary = ReportSummary::default();
        let written = export_results(&base, ExportFormat::Csv, &records, &summary).unwrap();
        let contents = std::fs::read_to_string(&written[0]).unwrap();
        assert!(contents.contains("acme/widgets"));
    }

    #[test]
    fn all_format_writes_four_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("results");
        let records = sample_records();
        let summary = ReportSummary::default();
        let written = export_results(&base, ExportFormat::All, &records, &summary).unwrap();
        assert_eq!(written.len(), 4);
    }

    #[test]
    fn html_export_escapes_untrusted_fields() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("results");
        let mut records = sample_records();
        records[0].name = "<script>evil()</script>".into();
        let summary = ReportSummary::default();
        let written = export_results(&base, ExportFormat::Html, &records, &summary).unwrap();
        let contents = std::fs::read_to_string(&written[0]).unwrap();
        assert!(!contents.contains("<script>evil()"));
        assert!(contents.contains("&lt;script&gt;"));
    }

    #[test]
    fn url_list_export_is_one_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        export_url_list(&path, &sample_records()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert_eq!(contents.lines().next().unwrap(), "https://github.com/acme/widgets");
    }
}

//! Report writers (txt, json, csv, html) for sweepscan result records,
//! plus the plain URL-list export fed to downstream secret scanners.

mod export;
mod types;

pub use export::{export_results, export_url_list, ExportError};
pub use types::{ExportFormat, ReportRecord, ReportSummary};

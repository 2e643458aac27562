//! Command-line surface, matching spec.md 6's command-surface table.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "sweepscan", version, about = "Recursive time-slicing GitHub search with credential-pool rate governance")]
pub struct Args {
    /// Target term to search for.
    #[arg(long, conflicts_with = "term_list")]
    pub term: Option<String>,

    /// File of target terms, one per line; `#` comments and blank lines ignored.
    #[arg(long, value_name = "FILE", conflicts_with = "term")]
    pub term_list: Option<std::path::PathBuf>,

    /// Year window, `"YYYY-YYYY"` or `"YYYY"`. Defaults to 2015..current year.
    #[arg(long, value_name = "RANGE")]
    pub years: Option<String>,

    /// Search repositories only.
    #[arg(long, conflicts_with_all = ["code_only", "gists_only"])]
    pub repos_only: bool,

    /// Search code only.
    #[arg(long, conflicts_with_all = ["repos_only", "gists_only"])]
    pub code_only: bool,

    /// Search gists only.
    #[arg(long, conflicts_with_all = ["repos_only", "code_only"])]
    pub gists_only: bool,

    /// Delay override: fixed seconds ("2.5") or inclusive range ("1.5-3.5").
    #[arg(long, value_name = "SECONDS")]
    pub delay: Option<String>,

    /// A single bearer credential, inline.
    #[arg(long, conflicts_with = "credential_dir")]
    pub credential: Option<String>,

    /// Directory of credential files (created on demand if missing).
    #[arg(long, value_name = "DIR", conflicts_with = "credential")]
    pub credential_dir: Option<std::path::PathBuf>,

    /// Optional TOML config file, layered under these flags.
    #[arg(long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Output base path (extension appended per format).
    #[arg(long, value_name = "PATH", default_value = "sweepscan-results")]
    pub output: std::path::PathBuf,

    /// Output format: txt|json|csv|html|all.
    #[arg(long, default_value = "txt")]
    pub format: String,

    /// Also export a plain one-URL-per-line list, for feeding downstream scanners.
    #[arg(long, value_name = "PATH")]
    pub trufflehog_list: Option<std::path::PathBuf>,

    /// Suppress the startup banner.
    #[arg(long)]
    pub no_banner: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parsed `"YYYY-YYYY"` / `"YYYY"` year window, clamped to the current year.
pub fn parse_year_window(raw: Option<&str>, current_year: i32) -> anyhow::Result<(i32, i32)> {
    let (from, to) = match raw {
        None => (2015, current_year),
        Some(s) => match s.split_once('-') {
            Some((a, b)) => (a.trim().parse()?, b.trim().parse()?),
            None => {
                let y: i32 = s.trim().parse()?;
                (y, y)
            }
        },
    };
    if from > to {
        anyhow::bail!("year window start {from} is after end {to}");
    }
    if to > current_year {
        log::warn!("year window end {to} exceeds current year {current_year}, clamping");
        return Ok((from, current_year));
    }
    Ok((from, to))
}

/// Parsed delay override: fixed seconds, or an inclusive `[min, max]` range.
pub fn parse_delay(raw: &str) -> anyhow::Result<(std::time::Duration, std::time::Duration)> {
    use std::time::Duration;
    if let Some((a, b)) = raw.split_once('-') {
        let min: f64 = a.trim().parse()?;
        let max: f64 = b.trim().parse()?;
        if min > max {
            anyhow::bail!("delay range minimum {min} exceeds maximum {max}");
        }
        Ok((Duration::from_secs_f64(min), Duration::from_secs_f64(max)))
    } else {
        let secs: f64 = raw.trim().parse()?;
        Ok((Duration::from_secs_f64(secs), Duration::from_secs_f64(secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_2015_through_current_year() {
        let (from, to) = parse_year_window(None, 2026).unwrap();
        assert_eq!((from, to), (2015, 2026));
    }

    #[test]
    fn single_year_is_a_one_year_window() {
        let (from, to) = parse_year_window(Some("2023"), 2026).unwrap();
        assert_eq!((from, to), (2023, 2023));
    }

    #[test]
    fn range_beyond_current_year_is_clamped() {
        let (from, to) = parse_year_window(Some("2020-2030"), 2026).unwrap();
        assert_eq!((from, to), (2020, 2026));
    }

    #[test]
    fn fixed_delay_produces_equal_bounds() {
        let (min, max) = parse_delay("2.5").unwrap();
        assert_eq!(min, max);
        assert_eq!(min, std::time::Duration::from_secs_f64(2.5));
    }

    #[test]
    fn ranged_delay_parses_both_bounds() {
        let (min, max) = parse_delay("1.5-3.5").unwrap();
        assert_eq!(min, std::time::Duration::from_secs_f64(1.5));
        assert_eq!(max, std::time::Duration::from_secs_f64(3.5));
    }
}

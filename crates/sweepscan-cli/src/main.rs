//! `sweepscan`: recursive time-slicing GitHub search driven by a
//! credential-pool rate governor. See `SPEC_FULL.md` for the full
//! component design this binary wires together.

mod cli;
mod config_file;
mod credentials;

use std::sync::{Arc, Mutex};

use chrono::Datelike;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use sweepscan_core::{Governor, ScanConfig, ScanState, SearchDriver, Sink, Transport};
use sweepscan_reporting::{export_results, export_url_list, ExportFormat, ReportRecord, ReportSummary};

const BANNER: &str = r"
           ▄▄▄▄ ▄▄ ▄ ▄▄ ▄▄▄▄ ▄▄▄▄ ▄▄▄▄ ▄▄▄ ▄▄▄▄ ▄▄▄▄ ▄▄▄▄
          ▐ ▄▌ ▐ ▐▌▐ ▐ ▐ ▄▌ ▐ ▄▌ ▐ ▄▌ ▐ ▄▌ ▄ ▐ ▄▌ ▐ ▄▌ ▐ ▄▌
           ▀▀▀  ▀ ▀ ▀▀ ▀▀▀  ▀▀▀  ▀▀▀   ▀▀▀   ▀▀▀  ▀▀▀  ▀▀▀
          sweepscan -- GitHub OSINT recon (time-slicing search)
";

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = cli::Args::parse();
    init_logging(args.verbose);

    if !args.no_banner {
        println!("{}", BANNER.cyan());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(format!("sweepscan={level},sweepscan_core={level}")))
        .format_timestamp_secs()
        .init();
}

async fn run(args: cli::Args) -> anyhow::Result<()> {
    let terms = load_terms(&args)?;
    if terms.is_empty() {
        anyhow::bail!("no target terms given (use --term or --term-list)");
    }

    let current_year = chrono::Utc::now().year();
    let (year_from, year_to) = cli::parse_year_window(args.years.as_deref(), current_year)?;

    let (include_repos, include_code) = match (args.repos_only, args.code_only, args.gists_only) {
        (true, _, _) => (true, false),
        (_, true, _) => (false, true),
        (_, _, true) => (false, false),
        (false, false, false) => (true, true),
    };
    let include_gists = args.gists_only || (!args.repos_only && !args.code_only);

    let format = ExportFormat::parse(&args.format)
        .ok_or_else(|| anyhow::anyhow!("unknown output format '{}' (expected txt|json|csv|html|all)", args.format))?;

    let mut config = ScanConfig::default();
    if let Some(path) = &args.config {
        config = config_file::FileConfig::load(path)?.apply(config);
    }
    if let Some(raw) = &args.delay {
        let (min, max) = cli::parse_delay(raw)?;
        config.min_delay = min;
        config.max_delay = max;
    }

    let credentials = if let Some(inline) = &args.credential {
        vec![credentials::single_credential(inline)?]
    } else if let Some(dir) = &args.credential_dir {
        credentials::load_credential_dir(dir)?
    } else {
        anyhow::bail!("no credential given (use --credential or --credential-dir)");
    };
    if credentials.is_empty() {
        anyhow::bail!("no valid credentials available, aborting before any network I/O");
    }
    log::info!("loaded {} credential(s)", credentials.len());

    let state = Arc::new(ScanState::new());
    {
        let state = state.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("interrupt received, finishing in-flight work and stopping");
                state.cancel.cancel();
            }
        });
    }

    let collected: Arc<Mutex<Vec<ReportRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let collected_for_sink = collected.clone();
    let sink = Sink::new(
        state.clone(),
        Arc::new(move |record| {
            collected_for_sink.lock().unwrap().push(ReportRecord::from(record));
        }),
    );

    let transport = Transport::with_user_agents(
        config.request_timeout,
        config.min_delay,
        config.max_delay,
        config.max_transport_retries,
        config.user_agents.clone(),
    );
    let governor = Governor::new(credentials, config.min_remaining_threshold);
    let driver = SearchDriver::new(transport, governor, sink, config.api_base.clone());

    for term in &terms {
        if state.interrupted() {
            break;
        }
        log::info!("scanning for {term:?} across {year_from}..{year_to}");
        let spinner = term_spinner(term, "repos/code");
        driver.search(term, year_from, year_to, include_repos, include_code).await?;
        spinner.finish_with_message(format!("{term}: {} found so far", state.total_repos() + state.total_gists()));
    }

    if include_gists && !state.interrupted() {
        for term in &terms {
            if state.interrupted() {
                break;
            }
            let gist_transport = Transport::new(
                config.request_timeout,
                config.min_delay,
                config.max_delay,
                config.max_transport_retries,
            );
            let gist_sink_records = collected.clone();
            let gist_sink = Sink::new(
                state.clone(),
                Arc::new(move |record| {
                    gist_sink_records.lock().unwrap().push(ReportRecord::from(record));
                }),
            );
            let spinner = term_spinner(term, "gists");
            let scraper = sweepscan_core::GistScraper::new(&gist_transport, &gist_sink);
            scraper.search(term).await;
            spinner.finish_with_message(format!("{term}: gist scrape done"));
        }
    }

    let summary = ReportSummary {
        term: terms.join(","),
        total_repos: state.total_repos(),
        total_gists: state.total_gists(),
        duration_secs: state.duration().as_secs_f64(),
        interrupted: state.interrupted(),
    };

    let records = collected.lock().unwrap().clone();
    let written = export_results(&args.output, format, &records, &summary)?;
    for path in &written {
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &args.trufflehog_list {
        export_url_list(path, &records)?;
        log::info!("wrote url list {}", path.display());
    }

    println!(
        "{} repos={} gists={} duration={:.1}s interrupted={}",
        "done.".green(),
        summary.total_repos,
        summary.total_gists,
        summary.duration_secs,
        summary.interrupted
    );

    if summary.interrupted {
        std::process::exit(130);
    }
    Ok(())
}

fn term_spinner(term: &str, phase: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    spinner.set_message(format!("scanning {term:?} ({phase})"));
    spinner
}

fn load_terms(args: &cli::Args) -> anyhow::Result<Vec<String>> {
    if let Some(term) = &args.term {
        return Ok(vec![term.clone()]);
    }
    if let Some(path) = &args.term_list {
        let contents = std::fs::read_to_string(path)?;
        let terms = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        return Ok(terms);
    }
    anyhow::bail!("no target term given (use --term or --term-list)")
}

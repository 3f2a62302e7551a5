use anyhow::{Context, Result};
use clap::Parser;
use core_logic::{
    parse_concurrency, setup_logger, FileSink, ProxyManager, ProxyRotator, ReqwestTransport,
    RetryPolicy, RetryingClient, WorkerRunner,
};
use dialoguer::{theme::ColorfulTheme, Input};
use dotenv::dotenv;
use jupuary_checker::config::{
    read_identifier_lines, CheckerConfig, ACCOUNTS_FILE, CONFIG_FILE, PROXIES_FILE,
};
use jupuary_checker::{resolve_all, AllocationChecker};
use std::io::BufRead;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

const LOG_FILE: &str = "log.log";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding config.json, accounts.txt and proxies.txt
    #[arg(short, long, default_value = "config")]
    config_dir: String,
    /// Concurrent checks; prompted for when not given
    #[arg(short, long, env = "THREADS")]
    threads: Option<String>,
    /// Exit without waiting for Enter
    #[arg(long)]
    no_pause: bool,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let args = Args::parse();

    let log_guard = match setup_logger(LOG_FILE) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logger: {:#}", e);
            None
        }
    };

    let exit_code = match run(&args).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };

    if !args.no_pause {
        wait_for_enter();
    }

    // Flush the file writer before exiting.
    drop(log_guard);
    std::process::exit(exit_code);
}

async fn run(args: &Args) -> Result<()> {
    let config_dir = Path::new(&args.config_dir);

    let config = CheckerConfig::load(config_dir.join(CONFIG_FILE))?;
    info!("Using RPC: {}", config.rpc_url);

    let proxies = ProxyManager::load_proxies(config_dir.join(PROXIES_FILE))?;
    if proxies.is_empty() {
        warn!("No proxies loaded, requests go out directly.");
    } else {
        info!("Loaded {} proxies for rotation.", proxies.len());
    }

    let lines = read_identifier_lines(config_dir.join(ACCOUNTS_FILE))?;
    let accounts = resolve_all(&lines);
    info!("Successfully Loaded {} Accounts", accounts.len());

    let threads = match args.threads.as_deref() {
        Some(raw) => parse_concurrency(raw)?,
        None => prompt_threads()?,
    };

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output dir {}", config.output_dir.display())
    })?;

    let policy = RetryPolicy::new(config.retry_delay_ms).with_jitter(config.retry_delay_ms > 0);
    let client = RetryingClient::new(
        ReqwestTransport::new(config.request_timeout()),
        Arc::new(ProxyRotator::new(proxies)),
        policy,
    );

    let checker = Arc::new(AllocationChecker::new(
        client,
        config.allocation_url.as_str(),
        config.rpc_url.as_str(),
        Arc::new(FileSink::new(config.retained_path())),
        Arc::new(FileSink::new(config.changed_path())),
    ));

    let stats = WorkerRunner::run_with_shutdown(Arc::clone(&checker), accounts, threads).await;

    let summary = checker.summary();
    info!(
        "Retained: {} | Changed: {} | Not Eligible: {} | Failed Requests: {}",
        summary.retained,
        summary.changed,
        summary.not_eligible,
        checker.client().failed_attempts()
    );

    if stats.skipped == 0 && stats.panicked == 0 {
        info!("The Work Has Been Successfully Finished");
    }
    Ok(())
}

fn prompt_threads() -> Result<NonZeroUsize> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Threads")
        .interact_text()
        .context("Cannot prompt for threads (not a terminal), pass --threads")?;

    Ok(parse_concurrency(&input)?)
}

fn wait_for_enter() {
    info!("Press Enter to Exit..");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}

use anyhow::Result;
use clap::Parser;
use market_intel::analyzer::GeminiClient;
use market_intel::config::Config;
use market_intel::locale::{Language, Market};
use market_intel::{GenerationError, ReportService};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "marketintel", about = "Generate a server market intelligence brief with Gemini + Google Search")]
struct Cli {
    /// Report language: zh-tw, ja or en (defaults to DEFAULT_LANGUAGE)
    #[arg(long, short)]
    language: Option<Language>,

    /// Market to cover; repeat for several (global, japan, taiwan)
    #[arg(long = "market", short)]
    markets: Vec<Market>,

    /// Load config from a specific .env file
    #[arg(long)]
    config_file: Option<String>,

    /// Do not print the mail link
    #[arg(long)]
    no_mail: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    market_intel::init_tracing();

    let cli = Cli::parse();
    let cfg = Config::from_env_file(cli.config_file.as_deref())?;

    let language = cli.language.unwrap_or(cfg.default_language);
    let markets = if cli.markets.is_empty() {
        Market::DEFAULT_SELECTION.to_vec()
    } else {
        Market::normalize_selection(&cli.markets)
    };

    let profile = language.profile();
    info!("══════════════════════════════════════════════════════");
    info!("  {}", profile.page_title);
    info!("  Model: {} + Google Search", cfg.gemini_model);
    info!(
        "  Markets: {}",
        markets.iter().map(|m| m.label(language)).collect::<Vec<_>>().join(", ")
    );
    info!("  Retry: {} attempts, {}s backoff", cfg.max_attempts, cfg.retry_delay_secs);
    info!("══════════════════════════════════════════════════════");

    let gemini = GeminiClient::new(
        &cfg.gemini_api_key,
        &cfg.gemini_model,
        Duration::from_secs(cfg.request_timeout_secs),
    )?;
    let service = ReportService::from_config(gemini, &cfg);

    info!("{}", profile.busy_text);
    let result = service
        .generate(language, &markets, |notice| {
            warn!(
                "{} ({}s, {}/{})",
                profile.retrying_text,
                notice.delay.as_secs(),
                notice.attempt,
                notice.max_attempts
            );
        })
        .await;

    let report = match result {
        Ok(report) => report,
        Err(e @ GenerationError::Exhausted { .. }) => {
            error!("{} ({e})", profile.exhausted_text);
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}: {e}", profile.failure_text);
            std::process::exit(1);
        }
    };

    info!("{}", profile.success_text);
    println!("# {} ({})", profile.page_title, report.generated_on);
    for section in report.rendered_sections() {
        println!("\n## {}\n\n{}", section.heading, section.text);
    }

    if !cli.no_mail {
        match &report.mail_link {
            Some(link) => println!("\n{}: {link}", profile.mail_button),
            None => info!("MAIL_RECIPIENT not set, skipping mail link"),
        }
    }

    Ok(())
}

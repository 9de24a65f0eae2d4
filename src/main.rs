//! Strategy Agent CLI
//!
//! Submits one strategy idea to the strategy agent service, printing
//! progress as it streams in and the result once the run settles.

use clap::Parser;
use std::process::ExitCode;
use strategy_agent_client::{
    Action, ClientConfig, ConversationThread, Outcome, OutcomeFailure, OutcomeSuccess,
    ProgressSummary, SessionObserver, StrategyClient, StrategyParams, TimeRange, Timeframe,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "strategy-agent", version, about = "Generate and backtest a trading strategy")]
struct Cli {
    /// Natural-language description of the strategy
    idea: String,

    /// Trading pairs to backtest on
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = ["BTC/USDT".to_string(), "ETH/USDT".to_string()]
    )]
    pairs: Vec<String>,

    /// Candle timeframe (1m, 5m, 15m, 30m, 1h, 4h, 1d)
    #[arg(long, default_value_t = Timeframe::default())]
    timeframe: Timeframe,

    /// Backtest range as YYYYMMDD-YYYYMMDD
    #[arg(long, default_value_t = TimeRange::default())]
    timerange: TimeRange,

    #[arg(long, default_value_t = 3)]
    max_iterations: u32,

    /// Use the blocking endpoint instead of streaming
    #[arg(long)]
    no_stream: bool,

    /// Continue an earlier conversation
    #[arg(long)]
    thread_id: Option<String>,

    /// Service base URL (overrides STRATEGY_AGENT_URL)
    #[arg(long)]
    url: Option<String>,
}

/// Prints each summary line once, as it first appears
#[derive(Default)]
struct ConsoleObserver {
    printed: usize,
}

impl SessionObserver for ConsoleObserver {
    fn on_progress(&mut self, summary: &ProgressSummary) {
        for entry in summary.entries().iter().skip(self.printed) {
            println!("{entry}");
        }
        self.printed = summary.len();
    }

    fn on_done(&mut self, result: &OutcomeSuccess) {
        let action = match result.action() {
            Action::Generated => "generated",
            Action::Optimized => "optimized",
        };
        println!();
        println!("Strategy {action}");
        println!("  iterations:   {}", result.iteration_count);
        println!(
            "  satisfactory: {}",
            if result.is_satisfactory { "yes" } else { "no" }
        );
        if !result.thread_id.is_empty() {
            println!("  thread id:    {}", result.thread_id);
        }
        if let Some(report) = &result.strategy_report {
            println!("\n{report}");
        }
        if let Some(code) = &result.final_code {
            println!("\n{code}");
        }
    }

    fn on_fail(&mut self, failure: &OutcomeFailure) {
        eprintln!("Strategy request failed: {}", failure.message);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strategy_agent_client=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.url {
        config = config.with_base_url(url);
    }

    let client = match StrategyClient::from_config(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let client = match cli.thread_id {
        Some(thread_id) => client.with_conversation(ConversationThread::continuing(thread_id)),
        None => client,
    };

    let params = StrategyParams::new(cli.idea)
        .with_pairs(cli.pairs)
        .with_timeframe(cli.timeframe)
        .with_time_range(cli.timerange)
        .with_max_iterations(cli.max_iterations);

    let mut observer = ConsoleObserver::default();
    let submitted = if cli.no_stream {
        client.submit_blocking(params, &mut observer).await
    } else {
        client.submit(params, &mut observer).await
    };

    match submitted {
        Ok(report) => match report.outcome {
            Outcome::Success(_) => ExitCode::SUCCESS,
            Outcome::Failure(_) => ExitCode::FAILURE,
        },
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

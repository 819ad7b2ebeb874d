use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cse_chart_core::analysis::{self, SetupInputs, Verdict, DEFAULT_CAPITAL};
use cse_chart_core::chart::{self, ChartPoint};
use cse_chart_core::cse::client::HttpCseClient;

#[derive(Debug, Parser)]
#[command(name = "cse_chart_cli")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Pretty-print the JSON output.
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print daily chart rows and a moving average over closes.
    Chart {
        /// CSE symbol, e.g. LOLC.N0000.
        #[arg(default_value = "LOLC.N0000")]
        symbol: String,

        /// Window for the simple moving average over closes.
        #[arg(long, default_value_t = 50)]
        ma_window: usize,
    },
    /// Check the MA50 + breakout setup and size the position. Exits 1 unless the trade is valid.
    Analyze(AnalyzeArgs),
}

/// Flags override what is derived from the chart.
#[derive(Debug, clap::Args)]
struct AnalyzeArgs {
    symbol: String,

    #[arg(long, default_value_t = DEFAULT_CAPITAL)]
    capital: f64,

    #[arg(long)]
    current_price: Option<f64>,

    #[arg(long)]
    ma50: Option<f64>,

    #[arg(long, value_enum)]
    ma50_uptrend: Option<YesNo>,

    #[arg(long)]
    resistance: Option<f64>,

    #[arg(long)]
    swing_low: Option<f64>,

    #[arg(long, value_enum)]
    breakout: Option<YesNo>,
}

impl AnalyzeArgs {
    fn overrides(&self) -> SetupInputs {
        SetupInputs {
            current_price: self.current_price,
            ma50: self.ma50,
            ma50_uptrend: self.ma50_uptrend.map(YesNo::into_bool),
            resistance: self.resistance,
            breakout_confirmed: self.breakout.map(YesNo::into_bool),
            swing_low: self.swing_low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum YesNo {
    Yes,
    No,
}

impl YesNo {
    fn into_bool(self) -> bool {
        self == YesNo::Yes
    }
}

#[derive(Debug, Serialize)]
struct ChartOutput {
    symbol: String,
    data: Vec<ChartPoint>,
    ma_window: usize,
    ma: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = cse_chart_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let client = HttpCseClient::from_settings(&settings)?;

    match args.command {
        Command::Chart { symbol, ma_window } => {
            let data = match cse_chart_core::cse::fetch_chart_data(&client, &symbol).await {
                Ok(data) => data,
                Err(err) => {
                    sentry_anyhow::capture_anyhow(&err);
                    tracing::error!(%symbol, error = %format!("{err:#}"), "chart fetch failed");
                    return Err(err);
                }
            };

            let ma = chart::simple_moving_average(&chart::closes(&data), ma_window);
            tracing::info!(%symbol, rows = data.len(), ?ma, "fetched chart");

            print_json(
                &ChartOutput {
                    symbol,
                    data,
                    ma_window,
                    ma,
                },
                args.pretty,
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Analyze(analyze) => {
            let overrides = analyze.overrides();
            let inputs = if overrides.is_complete() {
                overrides
            } else {
                // A failed fetch still lets flag-supplied inputs through; gaps end in SKIP.
                match cse_chart_core::cse::fetch_chart_data(&client, &analyze.symbol).await {
                    Ok(data) => overrides.or(SetupInputs::from_chart(&data)),
                    Err(err) => {
                        sentry_anyhow::capture_anyhow(&err);
                        tracing::warn!(
                            symbol = %analyze.symbol,
                            error = %format!("{err:#}"),
                            "could not fetch chart; using flags only"
                        );
                        overrides
                    }
                }
            };

            let result = analysis::analyze_setup(&analyze.symbol, &inputs, analyze.capital);
            tracing::info!(
                symbol = %analyze.symbol,
                verdict = ?result.verdict,
                reason = %result.reason,
                "analyzed setup"
            );

            print_json(&result, args.pretty)?;
            Ok(match result.verdict {
                Verdict::ValidTrade => ExitCode::SUCCESS,
                Verdict::Skip => ExitCode::from(1),
            })
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

fn init_sentry(settings: &cse_chart_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

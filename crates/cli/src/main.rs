use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use market_morning_core::derive::{self, classify_vix, price_series, vix_series};
use market_morning_core::domain::report::{StockItem, TrendBias};
use market_morning_core::domain::schedule::{DayToken, ScheduleConfig};
use market_morning_core::llm::gemini::GeminiClient;
use market_morning_core::llm::{analyze_trend, MarketAnalyst};
use market_morning_core::render;
use market_morning_core::storage::preferences::{load_schedule, save_schedule, PreferenceStore};
use market_morning_core::time::kr_market;

#[derive(Debug, Parser)]
#[command(name = "market_morning")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate today's briefing and print it as markdown.
    Report {
        /// Print the raw report JSON instead.
        #[arg(long)]
        json: bool,
    },
    /// Grounded one-paragraph trend analysis for a single stock.
    Analyze {
        #[arg(long)]
        ticker: String,
        #[arg(long)]
        name: String,
        /// Display price; when given, a simulated month of closes is printed too.
        #[arg(long)]
        price: Option<String>,
        #[arg(long, value_enum, default_value_t = Trend::Neutral)]
        trend: Trend,
    },
    /// Simulated one-year VIX chart and the stance it implies.
    Vix {
        /// Anchor the last point to this reading.
        #[arg(long)]
        real: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
        /// Print the whole series as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show or change the stored briefing schedule.
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },
}

#[derive(Debug, Subcommand)]
enum ScheduleAction {
    Show,
    Set {
        /// Zero-padded 24h time, e.g. 08:30.
        #[arg(long)]
        time: String,
        /// Comma separated day tokens, e.g. Mon,Wed,Fri.
        #[arg(long, value_delimiter = ',', required = true)]
        days: Vec<DayToken>,
    },
    Disable,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Trend {
    Gainer,
    Loser,
    Neutral,
}

impl From<Trend> for TrendBias {
    fn from(t: Trend) -> Self {
        match t {
            Trend::Gainer => TrendBias::Gainer,
            Trend::Loser => TrendBias::Loser,
            Trend::Neutral => TrendBias::Neutral,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = market_morning_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let result = run(args.command, &settings).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "command failed");
    }
    result
}

async fn run(command: Command, settings: &market_morning_core::config::Settings) -> anyhow::Result<()> {
    let now = chrono::Utc::now();
    let today = kr_market::seoul_date(now);

    match command {
        Command::Report { json } => {
            settings.require_gemini_api_key()?;
            let client = GeminiClient::from_settings(settings)?;
            let report = client
                .generate_report(now)
                .await
                .context("report generation failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render::report_markdown(&report));
            }
        }
        Command::Analyze {
            ticker,
            name,
            price,
            trend,
        } => {
            let client = GeminiClient::from_settings(settings)?;
            let analysis = analyze_trend(&client, &ticker, &name).await;

            if let Some(price) = price {
                let item = StockItem {
                    ticker: ticker.clone(),
                    name: name.clone(),
                    price,
                    change: String::new(),
                };
                let mut rng = StdRng::from_entropy();
                let series =
                    price_series(&mut rng, today, derive::current_price_of(&item), trend.into());
                for point in &series {
                    println!("{}\t{}", point.label, point.price);
                }
                println!();
            }

            println!("{name} ({ticker})\n\n{}", analysis.text);
            let sources = render::citations(Some(analysis.grounding_chunks.as_slice()));
            if !sources.is_empty() {
                println!();
                for c in sources {
                    println!("- {} <{}>", c.title, c.uri);
                }
            }
        }
        Command::Vix { real, seed, json } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let series = vix_series(&mut rng, today, real);
            let latest = series.last().map_or(0.0, |p| p.value);
            let insight = classify_vix(latest);

            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
            } else {
                println!("VIX {latest:.2} ({})", kr_market::format_seoul(now));
                println!("{}: {}", insight.sentiment, insight.description);
                println!("{}: {}", insight.stance_label, insight.stance_description);
            }
        }
        Command::Schedule { action } => {
            let store = PreferenceStore::new(settings.preferences_path.clone());
            let cfg = match action {
                ScheduleAction::Show => load_schedule(&store),
                ScheduleAction::Set { time, days } => {
                    let cfg = ScheduleConfig::enabled(&time, days)?;
                    save_schedule(&store, &cfg)?;
                    cfg
                }
                ScheduleAction::Disable => {
                    let cfg = load_schedule(&store).disabled();
                    save_schedule(&store, &cfg)?;
                    cfg
                }
            };
            print_schedule(&cfg);
        }
    }

    Ok(())
}

fn print_schedule(cfg: &ScheduleConfig) {
    let days: Vec<&str> = cfg.days.iter().map(|d| d.label_ko()).collect();
    println!(
        "{} {} [{}]",
        if cfg.is_enabled { "ON " } else { "OFF" },
        cfg.time,
        days.join(", ")
    );
}

fn init_sentry(settings: &market_morning_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_schedule_days() {
        let args = Args::try_parse_from([
            "market_morning",
            "schedule",
            "set",
            "--time",
            "08:30",
            "--days",
            "Mon,Wed,Fri",
        ])
        .unwrap();
        match args.command {
            Command::Schedule {
                action: ScheduleAction::Set { time, days },
            } => {
                assert_eq!(time, "08:30");
                assert_eq!(days, vec![DayToken::Mon, DayToken::Wed, DayToken::Fri]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_day() {
        assert!(Args::try_parse_from([
            "market_morning",
            "schedule",
            "set",
            "--time",
            "08:30",
            "--days",
            "Monday",
        ])
        .is_err());
    }

    #[test]
    fn trend_defaults_to_neutral() {
        let args = Args::try_parse_from([
            "market_morning",
            "analyze",
            "--ticker",
            "005930",
            "--name",
            "삼성전자",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Command::Analyze {
                trend: Trend::Neutral,
                ..
            }
        ));
    }
}

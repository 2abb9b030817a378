use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rustedge::application::ml::feature_provider::BasicFeatureProvider;
use rustedge::application::ml::hyperparameter_search::RandomSearch;
use rustedge::application::ml::model_registry::{ModelRegistry, save_model};
use rustedge::application::ml::smartcore_trainer::{DecisionTreeTrainer, RandomForestTrainer};
use rustedge::application::signals::signal_router::SignalRouter;
use rustedge::application::walkforward::orchestrator::{
    WalkForwardOrchestrator, WalkForwardReport,
};
use rustedge::application::walkforward::parallel_runner::ParallelWalkForwardRunner;
use rustedge::config::Config;
use rustedge::domain::ml::dataset::Dataset;
use rustedge::domain::ml::labels::LabelGenerator;
use rustedge::domain::ports::{FeatureProvider, ModelTrainer, PriceSeriesLoader};
use rustedge::infrastructure::csv_loader::CsvPriceLoader;
use rustedge::infrastructure::results_store::JsonResultsStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML settings file; environment variables override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding `<SYMBOL>.csv` bar files
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk-forward evaluation of one series
    Run {
        #[arg(short, long)]
        symbol: String,

        /// Output directory for the JSON report
        #[arg(short, long, default_value = "walkforward_results")]
        out: PathBuf,

        /// Evaluate windows concurrently
        #[arg(long)]
        parallel: bool,

        /// Also train a decision tree and blend both models per window
        #[arg(long)]
        ensemble: bool,
    },
    /// Walk-forward evaluation of several series with a portfolio rollup
    Batch {
        /// Comma-separated symbols (e.g. "BTCUSDT,ETHUSDT")
        #[arg(short, long)]
        symbols: String,

        #[arg(short, long, default_value = "walkforward_results")]
        out: PathBuf,

        #[arg(long)]
        ensemble: bool,
    },
    /// Fit a random forest on a whole series and save it for live routing
    Train {
        #[arg(short, long)]
        symbol: String,

        #[arg(long, default_value = "models")]
        model_dir: PathBuf,
    },
    /// Regime-aware BUY/SELL/HOLD decision on the latest bars of a series
    Signal {
        #[arg(short, long)]
        symbol: String,

        #[arg(long, default_value = "models")]
        model_dir: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_toml_file(path),
        None => Config::from_env(),
    }
}

fn parse_symbols(s: &str) -> anyhow::Result<Vec<String>> {
    let symbols: Vec<String> = s
        .split(',')
        .map(|x| x.trim().to_uppercase())
        .filter(|x| !x.is_empty())
        .collect();
    if symbols.is_empty() {
        anyhow::bail!("symbols must be a non-empty comma-separated list");
    }
    Ok(symbols)
}

fn build_orchestrator(config: &Config, ensemble: bool) -> anyhow::Result<WalkForwardOrchestrator> {
    let settings = config.walk_forward.clone();
    let seed = settings.seed;
    let mut orchestrator =
        WalkForwardOrchestrator::new(settings, Arc::new(BasicFeatureProvider::default()))
            .context("Invalid walk-forward settings")?
            .with_trainer(Arc::new(RandomForestTrainer))
            .with_search(Arc::new(RandomSearch::new(seed)));
    if ensemble {
        orchestrator = orchestrator.with_trainer(Arc::new(DecisionTreeTrainer));
    }
    Ok(orchestrator)
}

fn print_report(report: &WalkForwardReport) {
    println!("\n=== Walk-forward: {} ===", report.symbol);
    println!(
        "{:<8} {:>8} {:>8} {:>10} {:>8} {:>8} {:>10}",
        "Window", "Start", "End", "Threshold", "Trades", "Wins", "Win rate"
    );
    for w in &report.windows {
        println!(
            "{:<8} {:>8} {:>8} {:>10.2} {:>8} {:>8} {:>9.2}%",
            w.window_index,
            w.start,
            w.end,
            w.threshold,
            w.trades,
            w.wins,
            w.win_rate * 100.0
        );
    }
    for s in &report.skipped {
        println!("{:<8} skipped: {}", s.window_index, s.reason);
    }
    let agg = &report.aggregate;
    println!(
        "Total: {} windows, {} trades, {} wins, win rate {:.2}%{}",
        agg.windows_completed,
        agg.total_trades,
        agg.total_wins,
        agg.overall_win_rate * 100.0,
        if agg.windows_share_rows {
            " (windows overlap; bars counted more than once)"
        } else {
            ""
        }
    );
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Setup logging
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let loader = CsvPriceLoader::new(&cli.data_dir);

    match cli.command {
        Commands::Run {
            symbol,
            out,
            parallel,
            ensemble,
        } => {
            let series = loader.load(&symbol)?;
            let orchestrator = build_orchestrator(&config, ensemble)?;
            let report = if parallel {
                orchestrator.run_parallel(&series)
            } else {
                orchestrator.run(&series)
            }
            .with_context(|| format!("Walk-forward failed for {}", symbol))?;

            print_report(&report);
            let path = JsonResultsStore::new(out)?.save_report(&report, Utc::now())?;
            println!("Report written to {:?}", path);
        }
        Commands::Batch {
            symbols,
            out,
            ensemble,
        } => {
            let symbols = parse_symbols(&symbols)?;
            let series = symbols
                .iter()
                .map(|s| loader.load(s))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let runner = ParallelWalkForwardRunner::new(Arc::new(build_orchestrator(
                &config, ensemble,
            )?));
            let batch = runner.run_batch(&series)?;

            for report in batch.completed() {
                print_report(report);
            }
            for (symbol, error) in batch.failed() {
                println!("\n{} failed: {}", symbol, error);
            }
            println!(
                "\nPortfolio: {} windows, {} trades, win rate {:.2}%",
                batch.portfolio.windows_completed,
                batch.portfolio.total_trades,
                batch.portfolio.overall_win_rate * 100.0
            );

            let path = JsonResultsStore::new(out)?.save_batch(&batch, Utc::now())?;
            println!("Batch report written to {:?}", path);
        }
        Commands::Train { symbol, model_dir } => {
            let series = loader.load(&symbol)?;
            let settings = &config.walk_forward;
            let features = BasicFeatureProvider::default().compute(series.bars())?;
            let labels = LabelGenerator::new(
                settings.label_horizon,
                settings.label_return_threshold,
                settings.tail_label_policy,
            )?
            .generate(&series.closes());
            let dataset = Dataset::from_complete_rows(features, &labels)?;

            info!(
                "Training {} on {} rows ({} positive)",
                symbol,
                dataset.len(),
                dataset.positive_count()
            );
            let trainer = RandomForestTrainer;
            let model = trainer.train(&dataset, &trainer.default_hyperparameters())?;
            let path = save_model(&model_dir, &symbol, &model)?;
            println!("Model written to {:?}", path);
        }
        Commands::Signal { symbol, model_dir } => {
            let series = loader.load(&symbol)?;
            let registry = ModelRegistry::builder().load_dir(&model_dir)?.build();
            let router = SignalRouter::new(
                Arc::new(registry),
                Arc::new(BasicFeatureProvider::default()),
                config.signals.clone(),
            );
            let decision = router.route(&symbol, series.bars());
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
    }

    Ok(())
}

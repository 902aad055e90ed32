use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use tyre_strategy::{
    CoefficientProvider, CoefficientTable, DataProcessor, DegradationModel, StrategyConfig,
    StrategySolver,
};

/// Find the fastest tyre strategy for a race.
#[derive(Parser, Debug)]
#[command(name = "strategy")]
struct Args {
    /// Race config (TOML).
    #[arg(short, long)]
    config: PathBuf,

    /// Compound coefficients as CSV (compound,a,b,c).
    #[arg(long, conflicts_with = "telemetry")]
    coefficients: Option<PathBuf>,

    /// Lap telemetry CSV to fit degradation curves from.
    #[arg(long)]
    telemetry: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let config = StrategyConfig::from_file(&args.config)?;

    // telemetry fit wins over a coefficient CSV, which wins over inline tables
    let provider: Box<dyn CoefficientProvider> = if let Some(path) = &args.telemetry {
        let processor = DataProcessor::new(path)?;
        if processor.driver_data.is_empty() {
            return Err("No data found.".into());
        }
        let samples = processor.fitting_samples();
        let model = DegradationModel::fit(&samples);
        if model.is_empty() {
            return Err("Failed to build any models.".into());
        }
        for compound in model.compounds() {
            let observed = samples.get(compound).map(Vec::as_slice).unwrap_or_default();
            if let Some(mae) = model.mean_absolute_error(compound, observed) {
                info!(compound, mae, "fit quality (mean absolute error, s/lap)");
            }
        }
        Box::new(model)
    } else if let Some(path) = &args.coefficients {
        Box::new(CoefficientTable::from_csv_path(path)?)
    } else {
        Box::new(config.inline_coefficients()?)
    };

    let race = config.build_race(provider.as_ref())?;
    let result = StrategySolver::new(&race).solve();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "\n--- Strategy (Laps: {}, Pit Loss: {}s) ---",
        race.total_laps(),
        race.pit_loss()
    );
    if !result.is_feasible() {
        println!("{result}");
        return Ok(());
    }
    for stint in &result.strategy {
        println!("- {:8} : {:3} laps {:10.3}s", stint.compound, stint.length, stint.stint_time);
    }
    println!("Total: {:.3}s (stops: {})", result.best_time, result.pit_stops());
    Ok(())
}

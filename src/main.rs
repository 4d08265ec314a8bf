//! lslmsr - Command line entry point
//!
//! Evaluates the market cost function for a quantity vector and inspects
//! market configuration files.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args as ClapArgs, Parser, Subcommand};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use lslmsr_market::config::load_config;
use lslmsr_market::math::{alpha_from_max_loss, CostFunction};
use lslmsr_market::market::state::outcome_vector;
use lslmsr_market::market::Curve;
use lslmsr_market::OptionKind;

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "LSLMSR_LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the cost of holding a quantity vector
    Cost(CurveArgs),
    /// Print the marginal price of every outcome bucket
    Prices(CurveArgs),
    /// Validate a market configuration file and print the resolved parameters
    Inspect {
        /// Path to configuration file
        #[arg(short, long, default_value = "market.toml")]
        config: String,
    },
}

#[derive(ClapArgs, Debug)]
struct CurveArgs {
    /// Comma-separated outcome quantities, e.g. 0,2,2,2,2
    #[arg(long, value_delimiter = ',', required = true)]
    quantities: Vec<Decimal>,

    /// Fixed liquidity depth b (LMSR)
    #[arg(long, conflicts_with_all = ["alpha", "max_loss"])]
    depth: Option<Decimal>,

    /// LS-LMSR alpha
    #[arg(long, conflicts_with = "max_loss")]
    alpha: Option<Decimal>,

    /// LS-LMSR worst-case loss per unit, alpha = max_loss / (2 ln 2)
    #[arg(long)]
    max_loss: Option<Decimal>,
}

impl CurveArgs {
    fn cost_function(&self) -> Result<CostFunction> {
        match (self.depth, self.alpha, self.max_loss) {
            (Some(depth), None, None) => Ok(CostFunction::Lmsr { depth }),
            (None, Some(alpha), None) => Ok(CostFunction::LsLmsr { alpha }),
            (None, None, Some(max_loss)) => Ok(CostFunction::LsLmsr {
                alpha: alpha_from_max_loss(max_loss)?,
            }),
            _ => bail!("pass exactly one of --depth, --alpha or --max-loss"),
        }
    }
}

fn init_logging(log_level: &str, json_logs: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.with_file(true).with_line_number(true).finish())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    init_logging(&args.log_level, args.json_logs)?;

    match args.command {
        Command::Cost(curve) => {
            let f = curve.cost_function()?;
            let cost = f.evaluate(&curve.quantities)?;
            debug!(?f, quantities = ?curve.quantities, "Evaluated cost");
            println!("{}", cost);
        }
        Command::Prices(curve) => {
            let f = curve.cost_function()?;
            for (bucket, price) in f.prices(&curve.quantities)?.iter().enumerate() {
                println!("{}\t{}", bucket, price);
            }
        }
        Command::Inspect { config } => {
            info!("Configuration file: {}", config);
            let app = load_config(Some(&config)).context("loading market configuration")?;
            let params = app.market.to_params(Utc::now())?;

            let n = params.strike_prices.len();
            let empty = vec![Decimal::ZERO; n];
            let buckets = outcome_vector(params.kind, &empty, &empty)?;
            // Collateral for the first unit of depth on an empty market
            let first_share_cost = match params.curve {
                Curve::Depth => {
                    let raw = CostFunction::Lmsr { depth: Decimal::ONE }.evaluate(&buckets)?;
                    let scale = match params.kind {
                        OptionKind::Call => Decimal::ONE,
                        OptionKind::Put => params.strike_prices[n - 1],
                    };
                    Some(raw.checked_mul(scale).context("share cost overflow")?)
                }
                Curve::LiquiditySensitive { .. } => None,
            };
            let summary = json!({
                "params": params,
                "buckets": buckets.len(),
                "first_share_cost": first_share_cost,
                "settings": app.settings,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use super::report::render_text;
use super::{ServerState, build_estimate_response, run_http_server};
use crate::config::AppConfig;
use crate::core::{
    ConfigVersion, EstimatorConfig, ProjectInputs, SharedState, decode_query, encode_query,
    evaluate,
};
use crate::error::AppError;
use crate::telemetry;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliConfigVersion {
    Initial,
    Latest,
}

impl From<CliConfigVersion> for ConfigVersion {
    fn from(value: CliConfigVersion) -> Self {
        match value {
            CliConfigVersion::Initial => ConfigVersion::Initial,
            CliConfigVersion::Latest => ConfigVersion::Latest,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "flip-estimator",
    about = "Investor return estimator for co-invested flipping projects (fixed income vs. profit share)",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate both payout schemes for one project
    Estimate(EstimateArgs),
    /// Start the HTTP API
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct EstimateArgs {
    #[arg(long, help = "Own capital in millions; defaults to the preset default")]
    own_capital: Option<f64>,
    #[arg(long, help = "Mortgage loan in millions; defaults to the preset default")]
    loan_amount: Option<f64>,
    #[arg(long, help = "Project duration in months")]
    duration_months: Option<u32>,
    #[arg(long, help = "Expected sale price; defaults to 1.5x purchase price")]
    sale_price: Option<f64>,
    #[arg(long, help = "Repair cost; defaults to the preset share of the purchase price")]
    repair_cost: Option<f64>,
    #[arg(long, value_enum, help = "Business rule revision; overrides FLIP_CONFIG_VERSION")]
    config_version: Option<CliConfigVersion>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    #[arg(
        long,
        help = "Shared query string (own=..&loan=..&duration=..&sale=..) to restore inputs from; flags win"
    )]
    query: Option<String>,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override FLIP_HOST
    #[arg(long)]
    host: Option<String>,
    /// Override FLIP_PORT
    #[arg(long)]
    port: Option<u16>,
    /// Preset used when a request does not name one
    #[arg(long, value_enum)]
    config_version: Option<CliConfigVersion>,
}

pub async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Estimate(args) => {
            let version = args
                .config_version
                .map(ConfigVersion::from)
                .unwrap_or(config.config_version);
            let estimator = EstimatorConfig::for_version(version)?;
            let output = run_estimate(args, &estimator)?;
            println!("{output}");
            Ok(())
        }
        Command::Serve(args) => {
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            if let Some(version) = args.config_version {
                config.config_version = version.into();
            }

            let state = ServerState::new(config.config_version)?;
            let addr = config.server.socket_addr()?;
            info!(%addr, "starting HTTP server");
            run_http_server(addr, state).await?;
            Ok(())
        }
    }
}

fn run_estimate(args: EstimateArgs, config: &EstimatorConfig) -> Result<String, AppError> {
    let (inputs, warning) = build_inputs(&args, config);
    if let Some(msg) = &warning {
        warn!(warning = %msg, "shared query ignored");
    }

    let estimate = evaluate(&inputs, config)?;
    match args.format {
        OutputFormat::Json => {
            let response = build_estimate_response(config, &inputs, estimate, warning)?;
            Ok(serde_json::to_string_pretty(&response)?)
        }
        OutputFormat::Text => {
            let share_query = encode_query(&SharedState::from(&inputs))?;
            let text = render_text(&estimate, &inputs, &share_query);
            Ok(match warning {
                Some(msg) => format!("Warning: {msg}\n\n{text}"),
                None => text,
            })
        }
    }
}

/// Query-string values first (falling back to defaults), then explicit flags.
fn build_inputs(args: &EstimateArgs, config: &EstimatorConfig) -> (ProjectInputs, Option<String>) {
    let restored = decode_query(args.query.as_deref().unwrap_or_default(), config);
    let mut inputs = restored.state.into_inputs();

    if let Some(v) = args.own_capital {
        inputs.own_capital = v;
    }
    if let Some(v) = args.loan_amount {
        inputs.loan_amount = v;
    }
    if let Some(v) = args.duration_months {
        inputs.duration_months = v;
    }
    if let Some(v) = args.sale_price {
        inputs.sale_price = Some(v);
    }
    if let Some(v) = args.repair_cost {
        inputs.repair_cost = Some(v);
    }

    (inputs, restored.warning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EstimatorError;

    fn latest() -> EstimatorConfig {
        EstimatorConfig::for_version(ConfigVersion::Latest).expect("valid preset")
    }

    #[test]
    fn cli_parses_estimate_flags() {
        let cli = Cli::try_parse_from([
            "flip-estimator",
            "estimate",
            "--own-capital",
            "2",
            "--loan-amount",
            "10",
            "--duration-months",
            "5",
            "--config-version",
            "initial",
            "--format",
            "json",
        ])
        .expect("flags should parse");

        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate subcommand");
        };
        assert_eq!(args.own_capital, Some(2.0));
        assert_eq!(args.duration_months, Some(5));
        assert_eq!(args.config_version, Some(CliConfigVersion::Initial));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn estimate_defaults_to_text_output() {
        let cli = Cli::try_parse_from(["flip-estimator", "estimate"]).expect("no flags needed");
        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate subcommand");
        };
        assert_eq!(args.format, OutputFormat::Text);
        assert_eq!(EstimateArgs::default().format, args.format);
        assert_eq!(args.query, None);
    }

    #[test]
    fn cli_parses_serve_overrides() {
        let cli = Cli::try_parse_from(["flip-estimator", "serve", "--port", "9090"])
            .expect("flags should parse");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(args.port, Some(9090));
        assert_eq!(args.host, None);
    }

    #[test]
    fn build_inputs_applies_flags_over_shared_query() {
        let config = latest();
        let args = EstimateArgs {
            query: Some("own=3.5&loan=8.2&duration=6&sale=20".to_string()),
            duration_months: Some(9),
            ..EstimateArgs::default()
        };

        let (inputs, warning) = build_inputs(&args, &config);
        assert_eq!(warning, None);
        assert_eq!(inputs.own_capital, 3.5);
        assert_eq!(inputs.loan_amount, 8.2);
        assert_eq!(inputs.duration_months, 9);
        assert_eq!(inputs.sale_price, Some(20.0));
    }

    #[test]
    fn build_inputs_decodes_percent_encoded_query() {
        let config = latest();
        let args = EstimateArgs {
            query: Some("?own=3%2E5&loan=8%2E2&duration=6".to_string()),
            ..EstimateArgs::default()
        };

        let (inputs, warning) = build_inputs(&args, &config);
        assert_eq!(warning, None);
        assert_eq!(inputs.own_capital, 3.5);
        assert_eq!(inputs.loan_amount, 8.2);
    }

    #[test]
    fn build_inputs_reports_discarded_query() {
        let config = latest();
        let args = EstimateArgs {
            query: Some("own=0.1&loan=1&duration=6".to_string()),
            ..EstimateArgs::default()
        };

        let (inputs, warning) = build_inputs(&args, &config);
        assert_eq!(inputs.own_capital, config.defaults.own_capital);
        assert!(warning.expect("warning expected").contains("own"));
    }

    #[test]
    fn run_estimate_renders_text_report() {
        let config = latest();
        let args = EstimateArgs {
            own_capital: Some(2.0),
            loan_amount: Some(10.0),
            duration_months: Some(5),
            ..EstimateArgs::default()
        };

        let output = run_estimate(args, &config).expect("valid inputs");
        assert!(output.contains("Rate on own capital (2.0): 30%"));
        assert!(output.contains("Income for the project: 0.25"));
        assert!(output.contains("Share: ?own=2&loan=10&duration=5"));
    }

    #[test]
    fn run_estimate_surfaces_downpayment_rejection() {
        let config = latest();
        let args = EstimateArgs {
            own_capital: Some(1.0),
            loan_amount: Some(100.0),
            ..EstimateArgs::default()
        };

        let err = run_estimate(args, &config).expect_err("downpayment too low");
        assert!(matches!(
            err,
            AppError::Estimator(EstimatorError::DownpaymentTooLow { .. })
        ));
    }
}

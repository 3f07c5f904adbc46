//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{validate_dashboard_config, validate_forecast_config};
use crate::domain::dashboard::{
    self, DashboardRequest, DashboardSnapshot, ForecastSettings, View,
};
use crate::domain::error::DashboardError;
use crate::domain::forecast::{ForecastConfig, ForecastResult};
use crate::domain::lookback::Lookback;
use crate::domain::returns;
use crate::domain::universe::{self, parse_symbol, parse_symbols};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;

#[derive(Parser, Debug)]
#[command(name = "stockdash", about = "Equity dashboard: returns analytics and price forecasts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print cumulative return, volatility, movers and the selected view
    Summary {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Comma-separated subset of the universe
        #[arg(long)]
        symbols: Option<String>,
        /// stock_prices, daily_returns or monthly_returns
        #[arg(long)]
        view: Option<String>,
        /// Window such as 30d, 3mo or 1y
        #[arg(long)]
        lookback: Option<String>,
        #[arg(long)]
        annualize: bool,
        /// Last date of the window (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Fit the forecast model for one symbol and write it as CSV
    Forecast {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        symbol: String,
        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// List the symbols the configured data source can serve
    Symbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Summary {
            config,
            symbols,
            view,
            lookback,
            annualize,
            end,
        } => run_summary(
            config.as_deref(),
            &SummaryOverrides {
                symbols,
                view,
                lookback,
                annualize,
            },
            end,
        ),
        Command::Forecast {
            config,
            symbol,
            output,
            end,
        } => run_forecast(config.as_deref(), &symbol, output.as_deref(), end),
        Command::Symbols { config } => run_symbols(config.as_deref()),
        Command::Serve { config } => run_serve(config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Command-line values that take precedence over the `[dashboard]` section.
#[derive(Debug, Default, Clone)]
pub struct SummaryOverrides {
    pub symbols: Option<String>,
    pub view: Option<String>,
    pub lookback: Option<String>,
    pub annualize: bool,
}

/// The config file at `path`, or an empty one (all defaults) when no path is
/// given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, DashboardError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path).map_err(|e| DashboardError::ConfigParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            })
        }
        None => FileConfigAdapter::from_string("").map_err(|reason| DashboardError::ConfigParse {
            file: "<defaults>".to_string(),
            reason,
        }),
    }
}

fn invalid_argument(key: &str, reason: String) -> DashboardError {
    DashboardError::ConfigInvalid {
        section: "command line".to_string(),
        key: key.to_string(),
        reason,
    }
}

pub fn build_dashboard_request(
    config: &dyn ConfigPort,
    overrides: &SummaryOverrides,
) -> Result<DashboardRequest, DashboardError> {
    validate_dashboard_config(config)?;
    let defaults = DashboardRequest::default();

    let symbols = match overrides
        .symbols
        .clone()
        .or_else(|| config.get_string("dashboard", "symbols"))
    {
        Some(raw) => parse_symbols(&raw)?,
        None => defaults.symbols,
    };

    let view = match &overrides.view {
        Some(raw) => raw
            .parse::<View>()
            .map_err(|e| invalid_argument("view", e.to_string()))?,
        None => config
            .get_string("dashboard", "view")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.view),
    };

    let lookback = match &overrides.lookback {
        Some(raw) => raw
            .parse::<Lookback>()
            .map_err(|e| invalid_argument("lookback", e.to_string()))?,
        None => config
            .get_string("dashboard", "lookback")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.lookback),
    };

    Ok(DashboardRequest {
        symbols,
        view,
        lookback,
        annualize_volatility: overrides.annualize
            || config.get_bool("dashboard", "annualize_volatility", defaults.annualize_volatility),
    })
}

pub fn build_forecast_settings(config: &dyn ConfigPort) -> Result<ForecastSettings, DashboardError> {
    validate_forecast_config(config)?;
    let defaults = ForecastSettings::default();
    let model = ForecastConfig::default();

    let history = config
        .get_string("forecast", "history")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.history);

    Ok(ForecastSettings {
        history,
        model: ForecastConfig {
            horizon_days: config.get_int("forecast", "horizon_days", i64::from(model.horizon_days))
                as u32,
            changepoint_prior_scale: config.get_double(
                "forecast",
                "changepoint_prior_scale",
                model.changepoint_prior_scale,
            ),
            seasonality_prior_scale: config.get_double(
                "forecast",
                "seasonality_prior_scale",
                model.seasonality_prior_scale,
            ),
            n_changepoints: config.get_int("forecast", "n_changepoints", model.n_changepoints as i64)
                as usize,
            changepoint_range: config.get_double(
                "forecast",
                "changepoint_range",
                model.changepoint_range,
            ),
            interval_width: config.get_double("forecast", "interval_width", model.interval_width),
            seasonalities: model.seasonalities,
        },
    })
}

pub fn build_data_port(
    config: &dyn ConfigPort,
) -> Result<Box<dyn MarketDataPort + Send + Sync>, DashboardError> {
    let source = config.get_string_or("data", "source", "yahoo").to_lowercase();
    match source.as_str() {
        "csv" => {
            let dir = config.get_string_or("data", "csv_dir", "data");
            info!(dir = %dir, "using CSV market data");
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        #[cfg(feature = "yahoo")]
        "yahoo" => {
            info!("using Yahoo Finance market data");
            Ok(Box::new(crate::adapters::yahoo_adapter::YahooAdapter::new()?))
        }
        #[cfg(not(feature = "yahoo"))]
        "yahoo" => Err(DashboardError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: "built without the yahoo feature".into(),
        }),
        other => Err(DashboardError::ConfigInvalid {
            section: "data".into(),
            key: "source".into(),
            reason: format!("unknown source '{other}'"),
        }),
    }
}

fn today_or(end: Option<NaiveDate>) -> NaiveDate {
    end.unwrap_or_else(|| Local::now().date_naive())
}

fn run_summary(
    config_path: Option<&Path>,
    overrides: &SummaryOverrides,
    end: Option<NaiveDate>,
) -> Result<(), DashboardError> {
    let config = load_config(config_path)?;
    let request = build_dashboard_request(&config, overrides)?;
    let port = build_data_port(&config)?;

    let snapshot = dashboard::build_snapshot(port.as_ref(), &request, today_or(end))?;
    let vs_open = returns::intraday_perf_vs_open(&snapshot.prices)?;

    let mut text = format_summary(&snapshot);
    text.push_str("\nIntraday change vs open\n");
    for (symbol, value) in vs_open.iter() {
        let _ = writeln!(text, "  {:<6} {:>+9.2}%", symbol, value * 100.0);
    }
    print!("{text}");
    Ok(())
}

/// Plain-text rendering of a snapshot for the terminal.
pub fn format_summary(snapshot: &DashboardSnapshot) -> String {
    let request = &snapshot.request;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Dashboard as of {} (lookback {}, view {})",
        snapshot.as_of, request.lookback, request.view
    );

    out.push_str("\nCumulative return\n");
    for (symbol, value) in snapshot.cumulative.iter() {
        let _ = writeln!(out, "  {:<6} {:>+9.2}%", symbol, value);
    }

    let _ = writeln!(
        out,
        "\nVolatility ({})",
        if request.annualize_volatility { "annualized" } else { "daily" }
    );
    for (symbol, value) in snapshot.volatility.iter() {
        let _ = writeln!(out, "  {:<6} {:>9.2}%", symbol, value * 100.0);
    }

    out.push_str("\nToday's movers (change relative to close)\n");
    let _ = writeln!(
        out,
        "  best:  {} {:+.2}%",
        snapshot.movers.best.symbol,
        snapshot.movers.best.value * 100.0
    );
    let _ = writeln!(
        out,
        "  worst: {} {:+.2}%",
        snapshot.movers.worst.symbol,
        snapshot.movers.worst.value * 100.0
    );

    let table = &snapshot.table;
    let _ = write!(out, "\n{}\n{:<10}", table.view.label(), "date");
    for symbol in &table.symbols {
        let _ = write!(out, " {:>10}", symbol);
    }
    out.push('\n');
    for row in &table.rows {
        let _ = write!(out, "{:<10}", row.date.to_string());
        for value in &row.values {
            let cell = match value {
                Some(v) if table.view.is_returns() => format!("{:+.2}%", v * 100.0),
                Some(v) => format!("{:.2}", v),
                None => "-".to_string(),
            };
            let _ = write!(out, " {:>10}", cell);
        }
        out.push('\n');
    }
    out
}

fn run_forecast(
    config_path: Option<&Path>,
    symbol: &str,
    output: Option<&Path>,
    end: Option<NaiveDate>,
) -> Result<(), DashboardError> {
    let symbol = parse_symbol(symbol)?;
    let config = load_config(config_path)?;
    let settings = build_forecast_settings(&config)?;
    let port = build_data_port(&config)?;

    let result = dashboard::forecast_symbol(port.as_ref(), &symbol, &settings, today_or(end))?;

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            write_forecast_csv(&result, file)?;
            eprintln!(
                "Forecast for {} written to {} ({} rows)",
                symbol,
                path.display(),
                result.points.len()
            );
        }
        None => write_forecast_csv(&result, io::stdout().lock())?,
    }
    Ok(())
}

/// `date,yhat,yhat_lower,yhat_upper`, one row per fitted and projected day.
pub fn write_forecast_csv<W: Write>(result: &ForecastResult, writer: W) -> Result<(), DashboardError> {
    let to_io = |e: csv::Error| DashboardError::Io(io::Error::other(e));
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["date", "yhat", "yhat_lower", "yhat_upper"])
        .map_err(to_io)?;
    for p in &result.points {
        wtr.write_record([
            p.date.to_string(),
            format!("{:.4}", p.yhat),
            format!("{:.4}", p.lower),
            format!("{:.4}", p.upper),
        ])
        .map_err(to_io)?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_symbols(config_path: Option<&Path>) -> Result<(), DashboardError> {
    let config = load_config(config_path)?;
    let port = build_data_port(&config)?;
    let available = port.list_symbols()?;

    for symbol in universe::UNIVERSE {
        let marker = if available.iter().any(|s| s == symbol) {
            ""
        } else {
            "  (no data)"
        };
        println!("{symbol}{marker}");
    }
    Ok(())
}

fn run_serve(config_path: Option<&Path>) -> Result<(), DashboardError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, build_router};
        use std::net::SocketAddr;
        use std::sync::Arc;

        let config = load_config(config_path)?;
        let defaults = build_dashboard_request(&config, &SummaryOverrides::default())?;
        let forecast = build_forecast_settings(&config)?;
        let data_port: Arc<dyn MarketDataPort + Send + Sync> = Arc::from(build_data_port(&config)?);

        let listen = config.get_string_or("web", "listen", "127.0.0.1:3000");
        let addr: SocketAddr = listen.parse().map_err(|_| DashboardError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: format!("'{listen}' is not a socket address"),
        })?;

        let router = build_router(AppState {
            data_port,
            defaults,
            forecast,
        });

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "web server listening");
            axum::serve(listener, router).await
        })?;
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(DashboardError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: "built without the web feature".into(),
        })
    }
}

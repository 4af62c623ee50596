use std::{error::Error, fs, io, path::Path};

use clap::Parser;
use price_action::{
    analysis::{format_analysis, AnalysisService, AnalysisTable},
    args::{Args, Command},
    chart::{build_average_bar_chart, build_heatmap, ChartSpec},
    config::PriceActionConfig,
    data::{metadata::StockCatalog, price_series::PriceSeries, yahoo::YahooSource},
    error::PriceActionError,
    export::{export_csv, export_tickers, export_xlsx, write_csv},
    logging::setup_tracing,
};
use tracing::{info, warn};

type Service = AnalysisService<YahooSource>;

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let (_, _guard) = setup_tracing(Some(args.log_dir.as_str()))?;
    let config = PriceActionConfig::read_config(args.config.as_ref())?;
    let mut service = AnalysisService::from_config(
        YahooSource::with_base_url(config.yahoo_base_url.clone()),
        &config,
    );

    match args.command {
        Command::Analyze {
            ticker,
            prices,
            csv,
            xlsx,
        } => {
            let table = load_analysis(&mut service, &ticker, prices.as_deref())?;
            if table.is_empty() {
                warn!("No monthly data for {}", ticker);
            }
            let display = format_analysis(&table);
            write_csv(&display, io::stdout())?;
            if let Some(path) = csv {
                export_csv(&display, path)?;
            }
            if let Some(path) = xlsx {
                export_xlsx(&display, path)?;
            }
        }
        Command::Heatmap { ticker, prices, out } => {
            let table = load_analysis(&mut service, &ticker, prices.as_deref())?;
            let chart: ChartSpec = build_heatmap(&ticker, &table.return_grid()).into();
            emit_chart(&chart, out.as_deref())?;
        }
        Command::BarChart { ticker, prices, out } => {
            let table = load_analysis(&mut service, &ticker, prices.as_deref())?;
            let chart: ChartSpec = build_average_bar_chart(&table).into();
            emit_chart(&chart, out.as_deref())?;
        }
        Command::Export { tickers, dir } => {
            let tickers = if tickers.is_empty() {
                config.tickers.clone()
            } else {
                tickers
            };
            let dir = dir.unwrap_or_else(|| config.output_dir.clone());
            let written = export_tickers(&mut service, &tickers, &dir)?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Command::Sectors => {
            for sector in load_catalog(&config)?.sectors() {
                println!("{}", sector);
            }
        }
        Command::Stocks { sector } => {
            let catalog = load_catalog(&config)?;
            let companies = catalog.companies_in(&sector);
            if companies.is_empty() {
                warn!("No companies listed under sector {}", sector);
            }
            for stock in companies {
                println!("{}\t{}", stock.symbol, stock.company_name);
            }
        }
    }
    Ok(())
}

/// Analysis from a local price file when given, otherwise through the
/// cached service.
fn load_analysis(
    service: &mut Service,
    ticker: &str,
    prices: Option<&Path>,
) -> Result<AnalysisTable, PriceActionError> {
    match prices {
        Some(path) => {
            info!("Reading closes for {} from {}", ticker, path.display());
            let series = PriceSeries::from_csv_path(ticker, path)?;
            Ok(service.analysis_for_series(&series))
        }
        None => service.monthly_analysis(ticker),
    }
}

fn load_catalog(config: &PriceActionConfig) -> Result<StockCatalog, PriceActionError> {
    let dir = config.metadata_dir.as_ref().ok_or_else(|| {
        PriceActionError::ConfigError("metadata-dir is not configured".to_string())
    })?;
    StockCatalog::load(dir, &config.symbol_suffix)
}

fn emit_chart(chart: &ChartSpec, out: Option<&Path>) -> Result<(), PriceActionError> {
    let json = chart.to_json()?;
    match out {
        Some(path) => {
            fs::write(path, json)?;
            info!("Chart written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "price-action", about = "Monthly return analysis of daily closing prices")]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory for log files
    #[arg(long, global = true, default_value = "logs")]
    pub log_dir: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the formatted monthly analysis table as CSV
    Analyze {
        ticker: String,
        /// Read closes from a Date,Close CSV instead of fetching
        #[arg(long)]
        prices: Option<PathBuf>,
        /// Also write the table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Also write the table to this single-sheet workbook
        #[arg(long)]
        xlsx: Option<PathBuf>,
    },
    /// Emit the monthly return heatmap as JSON
    Heatmap {
        ticker: String,
        #[arg(long)]
        prices: Option<PathBuf>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Emit the average monthly return bar chart as JSON
    BarChart {
        ticker: String,
        #[arg(long)]
        prices: Option<PathBuf>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Export `<ticker>_analysis.csv` for each ticker (defaults to the configured list)
    Export {
        tickers: Vec<String>,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// List the sectors in the stock catalog
    Sectors,
    /// List the companies of a sector with their tickers
    Stocks { sector: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze() {
        let args = Args::parse_from([
            "price-action",
            "analyze",
            "DLF.NS",
            "--prices",
            "dlf.csv",
            "--xlsx",
            "dlf.xlsx",
        ]);
        match args.command {
            Command::Analyze {
                ticker,
                prices,
                csv,
                xlsx,
            } => {
                assert_eq!(ticker, "DLF.NS");
                assert_eq!(prices, Some(PathBuf::from("dlf.csv")));
                assert!(csv.is_none());
                assert_eq!(xlsx, Some(PathBuf::from("dlf.xlsx")));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.log_dir, "logs");
    }

    #[test]
    fn test_parse_export_with_global_config() {
        let args = Args::parse_from([
            "price-action",
            "export",
            "DLF.NS",
            "SOBHA.NS",
            "--config",
            "custom.yml",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("custom.yml")));
        match args.command {
            Command::Export { tickers, dir } => {
                assert_eq!(tickers, vec!["DLF.NS", "SOBHA.NS"]);
                assert!(dir.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}

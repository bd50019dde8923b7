use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use rust_decimal::Decimal;

use std::path::PathBuf;

use invoices::{convert, date::parse_date, tax::parse_rate, IngestFilter, TaxConfig};

/// Converts an order sheet into tax-inclusive invoices.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Order sheet CSV file
    source: PathBuf,

    /// Convert only invoices with this id or above
    #[arg(long = "min_id", alias = "min-id")]
    min_id: Option<u64>,

    /// Convert only invoices with this id or below
    #[arg(long = "max_id", alias = "max-id")]
    max_id: Option<u64>,

    /// Convert only rows dated this day (yyyy-mm-dd or yyyy/M/d)
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// Shipping fee table CSV file [default: shipping.csv beside SOURCE]
    #[arg(long)]
    shipping: Option<PathBuf>,

    /// Where to write the converted invoices
    #[arg(short, long, default_value = "processed.csv")]
    output: PathBuf,

    /// Standard consumption tax rate, from 0 to 1
    #[arg(long, default_value = "0.1", value_parser = parse_rate)]
    standard_rate: Decimal,

    /// Reduced consumption tax rate, from 0 to 1
    #[arg(long, default_value = "0.08", value_parser = parse_rate)]
    reduced_rate: Decimal,
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();
    let config = TaxConfig::new(args.standard_rate, args.reduced_rate)?;
    let filter = IngestFilter {
        min_id: args.min_id,
        max_id: args.max_id,
        date: args.date,
    };
    let shipping = args
        .shipping
        .unwrap_or_else(|| args.source.with_file_name("shipping.csv"));
    let report = convert(&args.source, &shipping, &config, &filter).with_context(|| {
        format!(
            "converting {} with shipping fees from {}",
            args.source.display(),
            shipping.display()
        )
    })?;
    report
        .save(&args.output)
        .with_context(|| format!("{}", args.output.display()))?;
    print!("{report}");
    Ok(())
}

#![doc = include_str!("../README.md")]
use std::path::Path;

pub mod date;
pub mod error;
pub mod ingest;
pub mod invoice;
pub mod item;
pub mod report;
pub mod shipping;
pub mod tax;
pub mod yen;

pub use error::{Error, Result};
pub use ingest::{IngestFilter, Ingester, Invoices, Row};
pub use invoice::{Invoice, Totals};
pub use item::{Category, LineItem};
pub use report::{Report, ReportRow};
pub use shipping::ShippingRateTable;
pub use tax::TaxConfig;
pub use yen::Yen;

/// Reads the order sheet at `orders` and the shipping table at `shipping`,
/// and returns the invoice report for the rows that `filter` admits.
///
/// # Errors
///
/// Returns any errors from reading either file, or from building the
/// invoices. Nothing is written on error.
pub fn convert(
    orders: impl AsRef<Path>,
    shipping: impl AsRef<Path>,
    config: &TaxConfig,
    filter: &IngestFilter,
) -> Result<Report> {
    let table = ShippingRateTable::from_path(shipping)?;
    let rows = ingest::read_rows(orders)?;
    let invoices = Ingester::new(config, &table).ingest(rows, filter)?;
    Report::emit(&invoices)
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use std::{borrow::Borrow, collections::HashMap, io::Read, path::Path};

use crate::{
    date::parse_row_date,
    error::{Error, Result},
    invoice::Invoice,
    item::{Category, LineItem},
    shipping::ShippingRateTable,
    tax::TaxConfig,
    yen::Yen,
};

/// One line of the order sheet.
///
/// Columns are read by position, in this order:
///
/// ```txt
/// 請求書ID,日付,被請求者,商品品目,軽減,単価,個数,送り先地域,送り先〒,送り先住所,サイズ,送料単価,送料個数
/// ```
///
/// The header row is skipped. Any non-empty value in the `軽減` column marks
/// the product as reduced-rate. Empty strings count as absent throughout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Row {
    pub invoice_id: Option<u64>,
    pub date: Option<String>,
    pub bill_to: Option<String>,
    pub product: Option<String>,
    pub reduced: Option<String>,
    pub unit_price: Option<Yen>,
    pub quantity: Option<Decimal>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub address: Option<String>,
    pub size: Option<String>,
    pub shipping_price: Option<Yen>,
    pub shipping_quantity: Option<Decimal>,
    /// Line of the source file this row came from.
    #[serde(skip)]
    pub line: Option<u64>,
}

impl Row {
    /// Reports whether every column of the row is empty.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.invoice_id.is_none()
            && self.date.is_none()
            && self.bill_to.is_none()
            && self.product.is_none()
            && self.reduced.is_none()
            && self.unit_price.is_none()
            && self.quantity.is_none()
            && self.region.is_none()
            && self.postal_code.is_none()
            && self.address.is_none()
            && self.size.is_none()
            && self.shipping_price.is_none()
            && self.shipping_quantity.is_none()
    }

    fn id(&self) -> Result<u64> {
        self.invoice_id
            .ok_or_else(|| Error::validation("row has no invoice id").at_line(self.line))
    }

    fn parsed_date(&self) -> Result<NaiveDate> {
        let text = self
            .date
            .as_deref()
            .ok_or_else(|| Error::validation("row has no date").at_line(self.line))?;
        parse_row_date(text).map_err(|e| e.at_line(self.line))
    }
}

/// Reads order rows from the CSV file at `path`.
///
/// # Errors
///
/// Returns any errors from opening or parsing the file. A cell that can't be
/// read as its column's type (a price that isn't a number, say) is a
/// validation error naming the line.
pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<Row>> {
    let file = std::fs::File::open(path)?;
    rows_from_reader(file)
}

/// Reads order rows from CSV data, as [`read_rows`] does.
///
/// # Errors
///
/// As for [`read_rows`].
pub fn rows_from_reader(reader: impl Read) -> Result<Vec<Row>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(csv::Position::line);
        let mut row: Row = record.deserialize(None).map_err(|e| {
            if let csv::ErrorKind::Deserialize { err, .. } = e.kind() {
                return Error::Validation {
                    line,
                    message: err.to_string(),
                };
            }
            Error::Csv(e)
        })?;
        row.line = line;
        rows.push(row);
    }
    log::info!("Read {} order rows", rows.len());
    Ok(rows)
}

/// Which rows of the order sheet to turn into invoices.
///
/// Every bound is inclusive, and an absent bound admits everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestFilter {
    pub min_id: Option<u64>,
    pub max_id: Option<u64>,
    pub date: Option<NaiveDate>,
}

impl IngestFilter {
    #[must_use]
    pub fn admits_id(&self, id: u64) -> bool {
        self.min_id.map_or(true, |min| id >= min) && self.max_id.map_or(true, |max| id <= max)
    }
}

/// Invoices keyed by id, in the order each id first appeared.
#[derive(Debug, Default)]
pub struct Invoices {
    invoices: Vec<Invoice>,
    index: HashMap<u64, usize>,
}

impl Invoices {
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Invoice> {
        self.index.get(&id).map(|&i| &self.invoices[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Invoice> {
        self.invoices.iter()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<u64> {
        self.invoices.iter().map(Invoice::id).collect()
    }

    fn insert(&mut self, invoice: Invoice) {
        self.index.insert(invoice.id(), self.invoices.len());
        self.invoices.push(invoice);
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut Invoice> {
        self.index.get(&id).map(|&i| &mut self.invoices[i])
    }
}

impl IntoIterator for Invoices {
    type Item = Invoice;
    type IntoIter = std::vec::IntoIter<Invoice>;

    fn into_iter(self) -> Self::IntoIter {
        self.invoices.into_iter()
    }
}

impl<'a> IntoIterator for &'a Invoices {
    type Item = &'a Invoice;
    type IntoIter = std::slice::Iter<'a, Invoice>;

    fn into_iter(self) -> Self::IntoIter {
        self.invoices.iter()
    }
}

fn non_empty(field: Option<&str>) -> Option<&str> {
    field.filter(|s| !s.is_empty())
}

/// Turns order rows into invoices.
#[derive(Debug, Clone, Copy)]
pub struct Ingester<'a> {
    config: &'a TaxConfig,
    shipping: &'a ShippingRateTable,
}

impl<'a> Ingester<'a> {
    #[must_use]
    pub fn new(config: &'a TaxConfig, shipping: &'a ShippingRateTable) -> Self {
        Self { config, shipping }
    }

    /// Returns the items billed by `row`.
    ///
    /// A row bills a product if it names one, and shipping if it names a
    /// destination region and a shipping quantity above zero. So a row can
    /// yield no items, either one, or both.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The row has no invoice id
    /// * The row names a product but has no unit price or quantity
    /// * A subtotal is too large to represent
    /// * The shipping table has no fee for the row's region and size
    pub fn line_items_from_row(&self, row: &Row) -> Result<Vec<LineItem>> {
        row.id()?;
        let mut items = Vec::with_capacity(2);
        if let Some(name) = non_empty(row.product.as_deref()) {
            let missing = |what: &str| {
                Error::validation(format!("product {name:?} has no {what}")).at_line(row.line)
            };
            let unit_price = row.unit_price.ok_or_else(|| missing("unit price"))?;
            let quantity = row.quantity.ok_or_else(|| missing("quantity"))?;
            let item = LineItem::new(
                Category::Merchandise,
                non_empty(row.reduced.as_deref()).is_some(),
                name,
                unit_price,
                quantity,
            )
            .map_err(|e| e.at_line(row.line))?;
            items.push(item);
        }
        let region = non_empty(row.region.as_deref());
        if let (Some(region), Some(quantity)) = (region, row.shipping_quantity) {
            if quantity > Decimal::ZERO {
                let size = row.size.as_deref().unwrap_or_default();
                let item = self
                    .shipping
                    .shipping_item(region, size, row.shipping_price, quantity)
                    .map_err(|e| e.at_line(row.line))?;
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Starts a new invoice from `row`.
    ///
    /// # Errors
    ///
    /// Returns an error if the row has no invoice id, no valid date, or any
    /// error from [`Self::line_items_from_row`].
    pub fn invoice_from_row(&self, row: &Row) -> Result<Invoice> {
        let id = row.id()?;
        let date = row.parsed_date()?;
        let items = self.line_items_from_row(row)?;
        Invoice::new(
            self.config,
            id,
            row.bill_to.as_deref().unwrap_or_default(),
            date,
            items,
        )
        .map_err(|e| e.at_line(row.line))
    }

    /// Groups `rows` into invoices by invoice id.
    ///
    /// Blank rows are skipped, as are rows that `filter` excludes. The first
    /// row for an id starts its invoice; later rows add their items to it.
    ///
    /// # Errors
    ///
    /// Returns the first error from any row. Nothing is skipped on error:
    /// one bad row fails the whole run.
    pub fn ingest<I>(&self, rows: I, filter: &IngestFilter) -> Result<Invoices>
    where
        I: IntoIterator,
        I::Item: Borrow<Row>,
    {
        let mut invoices = Invoices::default();
        for row in rows {
            let row: &Row = row.borrow();
            if row.is_blank() {
                continue;
            }
            let id = row.id()?;
            if !filter.admits_id(id) {
                log::debug!("skipping invoice {id}: outside id range");
                continue;
            }
            if let Some(wanted) = filter.date {
                if row.parsed_date()? != wanted {
                    log::debug!("skipping row for invoice {id}: not dated {wanted}");
                    continue;
                }
            }
            match invoices.get_mut(id) {
                Some(invoice) => {
                    let items = self.line_items_from_row(row)?;
                    invoice.add_items(items).map_err(|e| e.at_line(row.line))?;
                }
                None => invoices.insert(self.invoice_from_row(row)?),
            }
        }
        log::info!("Built {} invoices", invoices.len());
        Ok(invoices)
    }
}

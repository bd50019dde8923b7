use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use std::{
    fmt::Display,
    fs::File,
    io::Write,
    path::Path,
};

use crate::{
    error::{Error, Result},
    invoice::{Invoice, Totals},
    yen::Yen,
};

/// Column names of the report, in order.
pub const HEADER: [&str; 15] = [
    "請求書ID",
    "年",
    "月",
    "日",
    "被請求者",
    "品目",
    "単価",
    "個数",
    "品目小計",
    "代金計",
    "標準税率対象",
    "軽減税率対象",
    "標準税",
    "軽減税",
    "消費税計",
];

/// One line of the report.
///
/// Item lines fill every column. The summary line that closes each invoice
/// leaves everything but the invoice totals empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "請求書ID")]
    pub invoice_id: Option<u64>,
    #[serde(rename = "年")]
    pub year: Option<i32>,
    #[serde(rename = "月")]
    pub month: Option<u32>,
    #[serde(rename = "日")]
    pub day: Option<u32>,
    #[serde(rename = "被請求者")]
    pub bill_to: Option<String>,
    #[serde(rename = "品目")]
    pub item: Option<String>,
    #[serde(rename = "単価")]
    pub unit_price: Option<Yen>,
    #[serde(rename = "個数")]
    pub quantity: Option<Decimal>,
    #[serde(rename = "品目小計")]
    pub subtotal: Option<Yen>,
    #[serde(rename = "代金計")]
    pub total: Yen,
    #[serde(rename = "標準税率対象")]
    pub standard_taxable: Yen,
    #[serde(rename = "軽減税率対象")]
    pub reduced_taxable: Yen,
    #[serde(rename = "標準税")]
    pub standard_tax: Yen,
    #[serde(rename = "軽減税")]
    pub reduced_tax: Yen,
    #[serde(rename = "消費税計")]
    pub tax_total: Yen,
}

impl ReportRow {
    fn summary(totals: &Totals) -> Self {
        Self {
            invoice_id: None,
            year: None,
            month: None,
            day: None,
            bill_to: None,
            item: None,
            unit_price: None,
            quantity: None,
            subtotal: None,
            total: totals.total,
            standard_taxable: totals.standard_taxable,
            reduced_taxable: totals.reduced_taxable,
            standard_tax: totals.standard_tax,
            reduced_tax: totals.reduced_tax,
            tax_total: totals.tax_total,
        }
    }

    /// Reports whether this is an invoice's closing summary line.
    #[must_use]
    pub fn is_summary(&self) -> bool {
        self.item.is_none()
    }

    /// Returns the invoice totals carried by this line.
    #[must_use]
    pub fn totals(&self) -> Totals {
        Totals {
            total: self.total,
            standard_taxable: self.standard_taxable,
            reduced_taxable: self.reduced_taxable,
            standard_tax: self.standard_tax,
            reduced_tax: self.reduced_tax,
            tax_total: self.tax_total,
        }
    }
}

#[derive(Debug)]
struct Summary {
    id: u64,
    bill_to: String,
    totals: Totals,
}

/// The converted invoices, flattened into report lines.
///
/// To build a `Report`, use [`Report::emit`].
///
/// To write it out, use [`Report::save`] or [`Report::write_csv`].
///
/// To get a printable overview, use its [`Display`] implementation.
#[derive(Debug, Default)]
pub struct Report {
    rows: Vec<ReportRow>,
    summaries: Vec<Summary>,
    total: Yen,
    tax_total: Yen,
}

impl Report {
    /// Flattens `invoices`, in the order given, into report lines.
    ///
    /// Each invoice contributes one line per item, in display order, each
    /// repeating the invoice totals, and then one summary line.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the grand total across all invoices is
    /// too large to represent.
    pub fn emit<'a>(invoices: impl IntoIterator<Item = &'a Invoice>) -> Result<Self> {
        let overflow = || Error::validation("grand total of all invoices is too large");
        let mut report = Self::default();
        for invoice in invoices {
            let totals = invoice.totals();
            let date = invoice.date();
            for item in invoice.sorted_items() {
                report.rows.push(ReportRow {
                    invoice_id: Some(invoice.id()),
                    year: Some(date.year()),
                    month: Some(date.month()),
                    day: Some(date.day()),
                    bill_to: Some(invoice.bill_to().to_string()),
                    item: Some(item.display_name(invoice.config())),
                    unit_price: Some(item.unit_price()),
                    quantity: Some(item.quantity().normalize()),
                    subtotal: Some(item.subtotal()),
                    ..ReportRow::summary(totals)
                });
            }
            report.rows.push(ReportRow::summary(totals));
            report.summaries.push(Summary {
                id: invoice.id(),
                bill_to: invoice.bill_to().to_string(),
                totals: *totals,
            });
            report.total = report.total.checked_add(totals.total).ok_or_else(overflow)?;
            report.tax_total = report
                .tax_total
                .checked_add(totals.tax_total)
                .ok_or_else(overflow)?;
        }
        Ok(report)
    }

    #[must_use]
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Writes the report as CSV, header first.
    ///
    /// # Errors
    ///
    /// Returns any errors from serializing or writing the data.
    pub fn write_csv(&self, writer: impl Write) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(HEADER)?;
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes the report as CSV to the file at `path`, replacing it.
    ///
    /// # Errors
    ///
    /// Returns any errors from creating or writing the file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(&path)?;
        self.write_csv(file)?;
        log::info!(
            "Wrote {} lines for {} invoices to {}",
            self.rows.len(),
            self.summaries.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self
            .summaries
            .iter()
            .map(|s| display_width(&s.bill_to))
            .max()
            .unwrap_or_default()
            .max("Bill to".len());
        writeln!(
            f,
            "{:>8} {:width$} {:>12} {:>10}",
            "Invoice", "Bill to", "Total", "Tax"
        )?;
        let length = width + 33;
        writeln!(f, "{:-<length$}", "")?;
        for s in &self.summaries {
            let padding = width - display_width(&s.bill_to);
            writeln!(
                f,
                "{:>8} {}{:padding$} {:>12} {:>10}",
                s.id,
                s.bill_to,
                "",
                s.totals.total.to_string(),
                s.totals.tax_total.to_string()
            )?;
        }
        writeln!(f, "{:-<length$}", "")?;
        writeln!(
            f,
            "{:>8} {:width$} {:>12} {:>10}",
            "Total",
            "",
            self.total.to_string(),
            self.tax_total.to_string()
        )?;
        Ok(())
    }
}

/// Returns the number of terminal columns `s` takes up.
///
/// CJK ideographs, kana, Hangul and full-width forms take two columns, and
/// everything else one. Half-width katakana is narrow.
fn display_width(s: &str) -> usize {
    s.chars()
        .map(|c| match c {
            '\u{1100}'..='\u{115F}'
            | '\u{2E80}'..='\u{303E}'
            | '\u{3041}'..='\u{33FF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{A000}'..='\u{A4CF}'
            | '\u{AC00}'..='\u{D7A3}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{FE30}'..='\u{FE4F}'
            | '\u{FF00}'..='\u{FF60}'
            | '\u{FFE0}'..='\u{FFE6}'
            | '\u{1F300}'..='\u{1F64F}'
            | '\u{1F900}'..='\u{1F9FF}'
            | '\u{20000}'..='\u{2FFFD}'
            | '\u{30000}'..='\u{3FFFD}' => 2,
            _ => 1,
        })
        .sum()
}

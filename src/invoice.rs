use chrono::NaiveDate;

use std::fmt::Display;

use crate::{
    error::{Error, Result},
    item::LineItem,
    tax::{embedded_tax, TaxConfig},
    yen::Yen,
};

/// An invoice's money figures.
///
/// Amounts are exact sums of item subtotals. Only the two tax figures are
/// rounded, each to whole yen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub total: Yen,
    pub standard_taxable: Yen,
    pub reduced_taxable: Yen,
    pub standard_tax: Yen,
    pub reduced_tax: Yen,
    pub tax_total: Yen,
}

impl Totals {
    fn compute(items: &[LineItem], config: &TaxConfig) -> Result<Self> {
        let overflow = || Error::validation("invoice total is too large");
        let mut totals = Self::default();
        for item in items {
            let bucket = if item.reduced_rate() {
                &mut totals.reduced_taxable
            } else {
                &mut totals.standard_taxable
            };
            *bucket = bucket.checked_add(item.subtotal()).ok_or_else(overflow)?;
            totals.total = totals
                .total
                .checked_add(item.subtotal())
                .ok_or_else(overflow)?;
        }
        totals.standard_tax = embedded_tax(totals.standard_taxable, config.standard_rate)?;
        totals.reduced_tax = embedded_tax(totals.reduced_taxable, config.reduced_rate)?;
        totals.tax_total = totals
            .standard_tax
            .checked_add(totals.reduced_tax)
            .ok_or_else(overflow)?;
        Ok(totals)
    }
}

/// A tax-inclusive bill to one customer, with its items.
///
/// Adding an item that matches one already on the invoice (by
/// [`LineItem::equals_for_merge`]) adds to that item's quantity instead of
/// listing it twice. Totals are recomputed after every change.
#[derive(Debug, Clone)]
pub struct Invoice {
    id: u64,
    bill_to: String,
    date: NaiveDate,
    items: Vec<LineItem>,
    config: TaxConfig,
    totals: Totals,
}

impl Invoice {
    /// Creates an invoice holding `items`, merging any duplicates among them.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::add_items`].
    pub fn new(
        config: &TaxConfig,
        id: u64,
        bill_to: impl Into<String>,
        date: NaiveDate,
        items: Vec<LineItem>,
    ) -> Result<Self> {
        let mut invoice = Self {
            id,
            bill_to: bill_to.into(),
            date,
            items: Vec::with_capacity(items.len()),
            config: config.clone(),
            totals: Totals::default(),
        };
        invoice.add_items(items)?;
        Ok(invoice)
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn bill_to(&self) -> &str {
        &self.bill_to
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn config(&self) -> &TaxConfig {
        &self.config
    }

    /// Returns the items in the order they were first added.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Returns the items in report order.
    #[must_use]
    pub fn sorted_items(&self) -> Vec<&LineItem> {
        let mut items: Vec<_> = self.items.iter().collect();
        items.sort_by(|a, b| a.compare_for_display(b));
        items
    }

    #[must_use]
    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    /// Adds `item`, or merges its quantity into a matching item.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a merge would add a fractional quantity,
    /// or if a subtotal or total grows too large to represent. The invoice
    /// is left unchanged on error.
    pub fn add_item(&mut self, item: LineItem) -> Result<()> {
        let mut items = self.items.clone();
        match items.iter_mut().find(|i| i.equals_for_merge(&item)) {
            Some(existing) => {
                existing.merge(item.quantity())?;
                log::debug!("invoice {}: merged into {existing}", self.id);
            }
            None => items.push(item),
        }
        self.totals = Totals::compute(&items, &self.config)?;
        self.items = items;
        Ok(())
    }

    /// Adds each of `items` in turn, as [`Self::add_item`] does.
    ///
    /// # Errors
    ///
    /// Stops at, and returns, the first error from [`Self::add_item`].
    pub fn add_items(&mut self, items: impl IntoIterator<Item = LineItem>) -> Result<()> {
        for item in items {
            self.add_item(item)?;
        }
        Ok(())
    }
}

impl Display for Invoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = &self.totals;
        write!(
            f,
            "請求書({}, {}, {}, 合計{}, 標準対象{}, 標準税{}, 軽減対象{}, 軽減税{}, 税計{}, [",
            self.id,
            self.bill_to,
            self.date,
            t.total,
            t.standard_taxable,
            t.standard_tax,
            t.reduced_taxable,
            t.reduced_tax,
            t.tax_total,
        )?;
        for (n, item) in self.items.iter().enumerate() {
            if n > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("])")
    }
}

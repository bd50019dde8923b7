use rust_decimal::Decimal;

use std::{collections::HashMap, io::Read, path::Path};

use crate::{
    error::{Error, Result},
    item::{Category, LineItem},
    yen::Yen,
};

#[derive(Debug, Clone)]
struct Rate {
    fee: Yen,
    label: String,
}

/// Shipping fees by destination region and package size.
///
/// The source table has one row per region and one column per package size:
///
/// ```txt
/// 都道府県,地域,60,80,100
/// 青森県,東北,1000,1100,1330
/// 東京都,関東,1000,1100,1330
/// 沖縄県,沖縄,1200,1500,1900
/// ```
///
/// The second column names the region's group. Wherever several groups
/// charge the same fee for a size, they share a label built from all their
/// names, so `青森県` at size 80 is labelled `東北・関東 80サイズ`.
#[derive(Debug, Default)]
pub struct ShippingRateTable {
    sizes: Vec<String>,
    rates: HashMap<(String, String), Rate>,
}

impl ShippingRateTable {
    /// Builds the table from its rows, header first.
    ///
    /// Blank fee cells mean the size isn't offered to that region. If a
    /// region appears more than once, its last row wins.
    ///
    /// # Errors
    ///
    /// Returns a validation error if:
    /// * There is no header row, or it names no package sizes
    /// * A row is shorter than the header
    /// * A fee is not a number
    pub fn build<I, R>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let mut rows = rows.into_iter();
        let header = rows
            .next()
            .map(trimmed)
            .ok_or_else(|| Error::validation("shipping table is empty"))?;
        if header.len() < 3 {
            return Err(Error::validation("shipping table header names no package sizes"));
        }
        let sizes = header[2..].to_vec();

        let mut fees: HashMap<(String, String), Yen> = HashMap::new();
        let mut groups: HashMap<(String, Yen), Vec<String>> = HashMap::new();
        for (n, row) in rows.enumerate() {
            let line = Some(n as u64 + 2);
            let row = trimmed(row);
            if row.iter().all(String::is_empty) {
                continue;
            }
            if row.len() < header.len() {
                return Err(Error::validation(format!(
                    "shipping table row has {} columns, expected {}",
                    row.len(),
                    header.len()
                ))
                .at_line(line));
            }
            let (region, group) = (&row[0], &row[1]);
            for (size, cell) in sizes.iter().zip(&row[2..]) {
                if cell.is_empty() {
                    continue;
                }
                let fee: Yen = cell.parse().map_err(|_| {
                    Error::validation(format!("fee {cell:?} for {region} size {size} is not a number"))
                        .at_line(line)
                })?;
                let members = groups.entry((size.clone(), fee)).or_default();
                if !members.contains(group) {
                    members.push(group.clone());
                }
                if fees.insert((region.clone(), size.clone()), fee).is_some() {
                    log::debug!("shipping fee for {region} size {size} redefined, keeping {fee}");
                }
            }
        }

        let rates = fees
            .into_iter()
            .map(|((region, size), fee)| {
                let names = groups
                    .get(&(size.clone(), fee))
                    .map(|g| g.join("・"))
                    .unwrap_or_default();
                let label = format!("{names} {size}サイズ");
                ((region, size), Rate { fee, label })
            })
            .collect();
        Ok(Self { sizes, rates })
    }

    /// Reads the table from the CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns any errors from opening or parsing the file, or from
    /// [`Self::build`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads the table from CSV data.
    ///
    /// # Errors
    ///
    /// Returns any errors from parsing the CSV, or from [`Self::build`].
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let records = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
        let table = Self::build(records.iter())?;
        log::info!(
            "Read shipping fees for {} region/size pairs across {} sizes",
            table.rates.len(),
            table.sizes.len()
        );
        Ok(table)
    }

    /// Returns the package sizes named in the table header, in order.
    #[must_use]
    pub fn sizes(&self) -> &[String] {
        &self.sizes
    }

    /// Returns the fee and display label for shipping to `region` at `size`.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the table has no fee for that pair.
    pub fn lookup(&self, region: &str, size: &str) -> Result<(Yen, &str)> {
        self.rates
            .get(&(region.trim().to_string(), size.trim().to_string()))
            .map(|r| (r.fee, r.label.as_str()))
            .ok_or_else(|| Error::Lookup {
                line: None,
                region: region.to_string(),
                size: size.to_string(),
            })
    }

    /// Builds the shipping line for `quantity` packages of `size` to `region`.
    ///
    /// The line is charged at `unit_price` when given, and at the table's
    /// fee otherwise.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the table has no fee for that pair, or any
    /// error from [`LineItem::new`].
    pub fn shipping_item(
        &self,
        region: &str,
        size: &str,
        unit_price: Option<Yen>,
        quantity: Decimal,
    ) -> Result<LineItem> {
        let (fee, label) = self.lookup(region, size)?;
        LineItem::new(
            Category::Shipping,
            false,
            format!("送料 {label}"),
            unit_price.unwrap_or(fee),
            quantity,
        )
    }
}

fn trimmed<R>(row: R) -> Vec<String>
where
    R: IntoIterator,
    R::Item: AsRef<str>,
{
    row.into_iter().map(|s| s.as_ref().trim().to_string()).collect()
}

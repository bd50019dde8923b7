use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use std::str::FromStr;

use crate::{
    error::{Error, Result},
    yen::Yen,
};

/// Marker appended to the names of reduced-rate items on the report.
pub const REDUCED_RATE_MARKER: &str = "（※）";

/// Consumption tax regime used to compute an invoice's tax split.
///
/// Prices are tax-inclusive, so the rates here are used to extract the tax
/// already embedded in an amount, never to add tax on top of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxConfig {
    /// Rate for ordinary goods and shipping, as a fraction (`0.1` is 10%).
    pub standard_rate: Decimal,
    /// Rate for qualifying goods such as food, as a fraction.
    pub reduced_rate: Decimal,
    pub reduced_rate_marker: String,
}

impl TaxConfig {
    /// Creates a regime with the given rates and the default marker.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either rate is below 0 or above 1.
    pub fn new(standard_rate: Decimal, reduced_rate: Decimal) -> Result<Self> {
        Ok(Self {
            standard_rate: validate_rate(standard_rate)?,
            reduced_rate: validate_rate(reduced_rate)?,
            ..Self::default()
        })
    }

    /// Returns the rate that applies to an item with the given flag.
    #[must_use]
    pub fn rate(&self, reduced: bool) -> Decimal {
        if reduced {
            self.reduced_rate
        } else {
            self.standard_rate
        }
    }
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            standard_rate: dec!(0.1),
            reduced_rate: dec!(0.08),
            reduced_rate_marker: REDUCED_RATE_MARKER.to_string(),
        }
    }
}

/// Checks that `rate` is a fraction from 0 to 1 inclusive.
///
/// # Errors
///
/// Returns a validation error for a rate outside that range.
pub fn validate_rate(rate: Decimal) -> Result<Decimal> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(Error::validation(format!(
            "tax rate {rate} is not between 0 and 1"
        )));
    }
    Ok(rate)
}

/// Parses a tax rate given on the command line, such as `0.1`.
///
/// # Errors
///
/// Returns a validation error if `s` is not a number from 0 to 1.
pub fn parse_rate(s: &str) -> Result<Decimal> {
    let rate = Decimal::from_str(s.trim())
        .map_err(|e| Error::validation(format!("bad tax rate {s:?}: {e}")))?;
    validate_rate(rate)
}

/// Returns the tax embedded in the tax-inclusive `amount` at `rate`.
///
/// This is `amount - amount / (1 + rate)`, rounded to whole yen with ties
/// going away from zero, as invoices require.
///
/// # Errors
///
/// Returns a validation error if the arithmetic overflows or `rate` is -1.
///
/// # Examples
///
/// ```
/// # use invoices::{tax::embedded_tax, Yen};
/// # use rust_decimal_macros::dec;
/// assert_eq!(embedded_tax(Yen::from(10_000), dec!(0.1)).unwrap(), Yen::from(909));
/// assert_eq!(embedded_tax(Yen::from(10_000), dec!(0.08)).unwrap(), Yen::from(741));
/// ```
pub fn embedded_tax(amount: Yen, rate: Decimal) -> Result<Yen> {
    Decimal::ONE
        .checked_add(rate)
        .and_then(|divisor| amount.amount().checked_div(divisor))
        .and_then(|net| amount.checked_sub(Yen::from(net)))
        .map(Yen::round_half_up)
        .ok_or_else(|| {
            Error::validation(format!("cannot extract tax at rate {rate} from {amount}"))
        })
}

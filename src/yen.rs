use rust_decimal::{Decimal, RoundingStrategy};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

/// Represents an amount of money in Japanese yen.
///
/// The amount is stored as an exact [`Decimal`], so sums and products never
/// lose precision on their way through a report. Only tax figures are ever
/// rounded, and only by [`Yen::round_half_up`].
///
/// Arithmetic is checked: each operation returns `None` instead of
/// overflowing, and callers turn that into an error.
///
/// Parsing accepts thousands separators and a leading yen sign, so
/// `"¥1,100"`, `"1,100"` and `"1100"` are all the same amount.
#[derive(
    Clone, Copy, Default, DeserializeFromStr, SerializeDisplay, Eq, PartialEq, Ord, PartialOrd, Hash,
)]
pub struct Yen(Decimal);

impl Yen {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    #[must_use]
    pub fn amount(self) -> Decimal {
        self.0
    }

    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Multiplies by a quantity, as for a line subtotal.
    ///
    /// # Examples
    ///
    /// ```
    /// # use invoices::Yen;
    /// # use rust_decimal_macros::dec;
    /// assert_eq!(Yen::from(1590).checked_mul(dec!(2)), Some(Yen::from(3180)));
    /// assert_eq!(Yen::new(rust_decimal::Decimal::MAX).checked_mul(dec!(2)), None);
    /// ```
    #[must_use]
    pub fn checked_mul(self, quantity: Decimal) -> Option<Self> {
        self.0.checked_mul(quantity).map(Self)
    }

    /// Rounds to whole yen, ties away from zero.
    ///
    /// # Examples
    ///
    /// ```
    /// # use invoices::Yen;
    /// # use std::str::FromStr;
    /// let yen = Yen::from_str("740.5").unwrap();
    /// assert_eq!(yen.round_half_up(), Yen::from_str("741").unwrap());
    /// ```
    #[must_use]
    pub fn round_half_up(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

impl From<Decimal> for Yen {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<i64> for Yen {
    fn from(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }
}

impl Debug for Yen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "¥{}", self.0.normalize())
    }
}

impl Display for Yen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0.normalize(), f)
    }
}

impl FromStr for Yen {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches(['¥', '￥']).replace(',', "");
        Ok(Self(Decimal::from_str(&digits)?))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn from_str_fn_accepts_separators_and_yen_sign() {
        assert_eq!(Yen::from_str("¥1,100").unwrap(), Yen::from(1100));
        assert_eq!(Yen::from_str("￥1,100").unwrap(), Yen::from(1100));
        assert_eq!(Yen::from_str(" 1100 ").unwrap(), Yen::from(1100));
        assert!(Yen::from_str("tomato").is_err());
    }

    #[test]
    fn display_fn_keeps_full_precision_without_trailing_zeros() {
        assert_eq!(Yen::from(dec!(3000.00)).to_string(), "3000");
        assert_eq!(Yen::from(dec!(909.0909)).to_string(), "909.0909");
    }

    #[test]
    fn round_half_up_fn_rounds_ties_away_from_zero() {
        assert_eq!(Yen::from(dec!(0.5)).round_half_up(), Yen::from(1));
        assert_eq!(Yen::from(dec!(2.5)).round_half_up(), Yen::from(3));
        assert_eq!(Yen::from(dec!(-2.5)).round_half_up(), Yen::from(-3));
        assert_eq!(Yen::from(dec!(2.49)).round_half_up(), Yen::from(2));
    }

    #[test]
    fn checked_mul_fn_multiplies_by_quantity() {
        assert_eq!(Yen::from(1590).checked_mul(dec!(2)), Some(Yen::from(3180)));
    }

    #[test]
    fn checked_mul_fn_returns_none_on_overflow() {
        let max = Yen::from_str("79228162514264337593543950335").unwrap();
        assert_eq!(max.checked_mul(dec!(2)), None);
        assert_eq!(max.checked_mul(dec!(1)), Some(max));
    }
}

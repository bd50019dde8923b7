use regex::Regex;
use rust_decimal::Decimal;

use std::{
    cmp::Ordering,
    fmt::Display,
    str::FromStr,
    sync::LazyLock,
};

use crate::{
    error::{Error, Result},
    tax::TaxConfig,
    yen::Yen,
};

/// What a line on an invoice is charging for.
///
/// The declaration order is the display order: merchandise lines come
/// before shipping lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Merchandise,
    Shipping,
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Merchandise => "商品",
            Self::Shipping => "送料",
        })
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "商品" => Ok(Self::Merchandise),
            "送料" => Ok(Self::Shipping),
            other if other.eq_ignore_ascii_case("merchandise") => Ok(Self::Merchandise),
            other if other.eq_ignore_ascii_case("shipping") => Ok(Self::Shipping),
            other => Err(Error::validation(format!("unknown item category {other:?}"))),
        }
    }
}

/// A single billed line: some quantity of one thing at one price.
///
/// The subtotal is derived from price and quantity, and is recomputed
/// whenever the quantity changes.
#[derive(Debug, Clone)]
pub struct LineItem {
    category: Category,
    reduced_rate: bool,
    name: String,
    unit_price: Yen,
    quantity: Decimal,
    subtotal: Yen,
}

impl LineItem {
    /// Creates an item and computes its subtotal.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the subtotal is too large to represent.
    pub fn new(
        category: Category,
        reduced_rate: bool,
        name: impl Into<String>,
        unit_price: Yen,
        quantity: Decimal,
    ) -> Result<Self> {
        let name = name.into();
        let subtotal = subtotal(&name, unit_price, quantity)?;
        Ok(Self {
            category,
            reduced_rate,
            name,
            unit_price,
            quantity,
            subtotal,
        })
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn reduced_rate(&self) -> bool {
        self.reduced_rate
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn unit_price(&self) -> Yen {
        self.unit_price
    }

    #[must_use]
    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    #[must_use]
    pub fn subtotal(&self) -> Yen {
        self.subtotal
    }

    /// Adds `delta` to the quantity of this item.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `delta` is not a whole number, or if the
    /// new quantity or subtotal is too large to represent. The item is left
    /// unchanged on error.
    pub fn merge(&mut self, delta: Decimal) -> Result<()> {
        if !delta.fract().is_zero() {
            return Err(Error::validation(format!(
                "cannot add fractional quantity {delta} to {:?}",
                self.name
            )));
        }
        let quantity = self.quantity.checked_add(delta).ok_or_else(|| {
            Error::validation(format!("quantity of {:?} is too large", self.name))
        })?;
        self.subtotal = subtotal(&self.name, self.unit_price, quantity)?;
        self.quantity = quantity;
        Ok(())
    }

    /// Returns the name as printed on the report, marked if reduced-rate.
    #[must_use]
    pub fn display_name(&self, config: &TaxConfig) -> String {
        if self.reduced_rate {
            format!("{}{}", self.name, config.reduced_rate_marker)
        } else {
            self.name.clone()
        }
    }

    /// Reports whether `other` is the same billed thing as this item, so that
    /// its quantity should be added here rather than listed separately.
    ///
    /// Quantity plays no part in this.
    #[must_use]
    pub fn equals_for_merge(&self, other: &Self) -> bool {
        self.category == other.category
            && self.name == other.name
            && self.reduced_rate == other.reduced_rate
            && self.unit_price == other.unit_price
    }

    /// Orders items for presentation on the report.
    ///
    /// Merchandise comes before shipping. Within a category, names are
    /// compared with hiragana folded to katakana, and names carrying numbers
    /// compare those numbers by value, so `箱 80` comes before `箱 120`.
    /// Ties fall back to the raw name. Price plays no part in this.
    #[must_use]
    pub fn compare_for_display(&self, other: &Self) -> Ordering {
        self.category
            .cmp(&other.category)
            .then_with(|| compare_names(&self.name, &other.name))
    }
}

impl Display for LineItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}, {}, {}円 x {})",
            self.category,
            if self.reduced_rate { "軽減" } else { "標準" },
            self.name,
            self.unit_price,
            self.quantity.normalize(),
        )
    }
}

fn subtotal(name: &str, unit_price: Yen, quantity: Decimal) -> Result<Yen> {
    unit_price.checked_mul(quantity).ok_or_else(|| {
        Error::validation(format!(
            "subtotal of {name:?} at {unit_price}円 x {quantity} is too large"
        ))
    })
}

static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^0-9]*)([0-9]+)").expect("segment pattern is valid"));

const KANA_OFFSET: u32 = 'ァ' as u32 - 'ぁ' as u32;

/// Folds hiragana to katakana and full-width digits to ASCII.
fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'ぁ'..='ゕ' => char::from_u32(c as u32 + KANA_OFFSET).unwrap_or(c),
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            _ => c,
        })
        .collect()
}

fn segments(name: &str) -> Vec<(&str, &str)> {
    SEGMENT
        .captures_iter(name)
        .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
        .collect()
}

/// Compares two runs of ASCII digits by numeric value, at any length.
fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_names(a: &str, b: &str) -> Ordering {
    let (norm_a, norm_b) = (normalize(a), normalize(b));
    let (segs_a, segs_b) = (segments(&norm_a), segments(&norm_b));
    for ((text_a, num_a), (text_b, num_b)) in segs_a.iter().zip(&segs_b) {
        if text_a != text_b {
            return text_a.cmp(text_b);
        }
        match compare_numbers(num_a, num_b) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
    }
    norm_a.cmp(&norm_b).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn goods(name: &str) -> LineItem {
        line(Category::Merchandise, false, name, Yen::from(100), dec!(1))
    }

    fn line(category: Category, reduced: bool, name: &str, price: Yen, qty: Decimal) -> LineItem {
        LineItem::new(category, reduced, name, price, qty).unwrap()
    }

    fn sorted_names(mut items: Vec<LineItem>) -> Vec<String> {
        items.sort_by(LineItem::compare_for_display);
        items.into_iter().map(|i| i.name).collect()
    }

    #[test]
    fn new_fn_computes_subtotal() {
        let item = line(Category::Merchandise, true, "りんご 10kg箱", Yen::from(7000), dec!(2));
        assert_eq!(item.subtotal(), Yen::from(14_000));
    }

    #[test]
    fn merge_fn_adds_quantity_and_recomputes_subtotal() {
        let mut item = line(Category::Shipping, false, "送料", Yen::from(1590), dec!(2));
        item.merge(dec!(3)).unwrap();
        assert_eq!(item.quantity(), dec!(5));
        assert_eq!(item.subtotal(), Yen::from(7950));
    }

    #[test]
    fn new_fn_rejects_subtotal_too_large_to_represent() {
        let price = Yen::new(Decimal::MAX);
        assert!(matches!(
            LineItem::new(Category::Merchandise, false, "金塊", price, dec!(2)),
            Err(Error::Validation { line: None, .. })
        ));
        assert!(LineItem::new(Category::Merchandise, false, "金塊", price, dec!(1)).is_ok());
    }

    #[test]
    fn merge_fn_rejects_overflow_and_keeps_item_unchanged() {
        let price = Yen::new(Decimal::MAX);
        let mut item = line(Category::Merchandise, false, "金塊", price, dec!(1));
        assert!(matches!(item.merge(dec!(1)), Err(Error::Validation { .. })));
        assert_eq!(item.quantity(), dec!(1));
        assert_eq!(item.subtotal(), price);
    }

    #[test]
    fn merge_fn_rejects_fractional_quantity() {
        let mut item = goods("トマト");
        assert!(matches!(item.merge(dec!(0.5)), Err(Error::Validation { .. })));
        assert_eq!(item.quantity(), dec!(1));
    }

    #[test]
    fn category_from_str_fn_rejects_unknown_category() {
        assert_eq!("送料".parse::<Category>().unwrap(), Category::Shipping);
        assert_eq!("Merchandise".parse::<Category>().unwrap(), Category::Merchandise);
        assert!(matches!("値引き".parse::<Category>(), Err(Error::Validation { .. })));
    }

    #[test]
    fn display_name_fn_marks_reduced_rate_items() {
        let config = TaxConfig::default();
        let food = line(Category::Merchandise, true, "トマト 2kg箱", Yen::from(3000), dec!(1));
        assert_eq!(food.display_name(&config), "トマト 2kg箱（※）");
        assert_eq!(goods("皿").display_name(&config), "皿");
    }

    #[test]
    fn equals_for_merge_fn_ignores_quantity_only() {
        let a = goods("トマト");
        let mut b = goods("トマト");
        b.merge(dec!(4)).unwrap();
        assert!(a.equals_for_merge(&b));

        let dearer = line(Category::Merchandise, false, "トマト", Yen::from(200), dec!(1));
        let reduced = line(Category::Merchandise, true, "トマト", Yen::from(100), dec!(1));
        let shipping = line(Category::Shipping, false, "トマト", Yen::from(100), dec!(1));
        assert!(!a.equals_for_merge(&dearer));
        assert!(!a.equals_for_merge(&reduced));
        assert!(!a.equals_for_merge(&shipping));
    }

    #[test]
    fn compare_for_display_fn_sorts_embedded_numbers_by_value() {
        let items = vec![goods("Box 120size"), goods("Box 80size"), goods("Box 100size")];
        assert_eq!(
            sorted_names(items),
            vec!["Box 80size", "Box 100size", "Box 120size"]
        );
    }

    #[test]
    fn compare_for_display_fn_puts_shipping_after_merchandise() {
        let ship = line(Category::Shipping, false, "あ", Yen::from(1), dec!(1));
        let items = vec![ship, goods("ん")];
        assert_eq!(sorted_names(items), vec!["ん", "あ"]);
    }

    #[test]
    fn compare_for_display_fn_folds_hiragana_into_katakana() {
        // ぶどう folds to ブドウ, which sorts between バナナ and リンゴ
        let items = vec![goods("リンゴ"), goods("ぶどう"), goods("バナナ")];
        assert_eq!(sorted_names(items), vec!["バナナ", "ぶどう", "リンゴ"]);
    }

    #[test]
    fn compare_for_display_fn_breaks_folded_ties_by_raw_name() {
        let items = vec![goods("りんご"), goods("リンゴ")];
        assert_eq!(sorted_names(items), vec!["りんご", "リンゴ"]);
        let items = vec![goods("リンゴ"), goods("りんご")];
        assert_eq!(sorted_names(items), vec!["りんご", "リンゴ"]);
    }

    #[test]
    fn compare_for_display_fn_compares_differing_prefixes_as_text() {
        let items = vec![goods("送料 九州 80サイズ"), goods("送料 関東 120サイズ")];
        assert_eq!(
            sorted_names(items),
            vec!["送料 九州 80サイズ", "送料 関東 120サイズ"]
        );
    }

    #[test]
    fn compare_for_display_fn_handles_full_width_and_long_numbers() {
        let items = vec![goods("箱１２０"), goods("箱80")];
        assert_eq!(sorted_names(items), vec!["箱80", "箱１２０"]);
        let items = vec![
            goods("lot 100000000000000000000000"),
            goods("lot 99999999999999999999999"),
        ];
        assert_eq!(
            sorted_names(items),
            vec!["lot 99999999999999999999999", "lot 100000000000000000000000"]
        );
    }
}

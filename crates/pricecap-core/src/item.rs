//! Structured price records and the validation that guards them.
//!
//! A [`CaptureItem`] can only come into existence through [`CaptureItem::new`]
//! (used by the sentence parser and by deserialization) or by applying an
//! [`ItemPatch`] to an existing item. Both paths run the same checks.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One brand/product/specification/price record captured in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CaptureItemFields")]
pub struct CaptureItem {
    brand: String,
    product_name: String,
    /// Size or weight with all whitespace removed, e.g. `"340g"`.
    specifications: String,
    price: Decimal,
}

#[derive(Deserialize)]
struct CaptureItemFields {
    brand: String,
    product_name: String,
    specifications: String,
    price: Decimal,
}

impl TryFrom<CaptureItemFields> for CaptureItem {
    type Error = ValidationError;

    fn try_from(fields: CaptureItemFields) -> Result<Self, Self::Error> {
        CaptureItem::new(
            fields.brand,
            fields.product_name,
            fields.specifications,
            fields.price,
        )
    }
}

impl CaptureItem {
    /// Builds a validated item.
    ///
    /// `brand` and `product_name` are trimmed, `specifications` has every
    /// whitespace character removed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if a text field is empty after
    /// normalization or the price is negative.
    pub fn new(
        brand: impl Into<String>,
        product_name: impl Into<String>,
        specifications: impl Into<String>,
        price: Decimal,
    ) -> Result<Self, ValidationError> {
        let brand = non_empty("brand", brand.into().trim())?;
        let product_name = non_empty("product_name", product_name.into().trim())?;
        let specifications =
            non_empty("specifications", &normalize_specifications(&specifications.into()))?;

        if price.is_sign_negative() && !price.is_zero() {
            return Err(ValidationError::NegativePrice(price.to_string()));
        }

        Ok(Self {
            brand,
            product_name,
            specifications,
            price,
        })
    }

    #[must_use]
    pub fn brand(&self) -> &str {
        &self.brand
    }

    #[must_use]
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    #[must_use]
    pub fn specifications(&self) -> &str {
        &self.specifications
    }

    #[must_use]
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Price rendered with exactly two decimal places, e.g. `"19.90"`.
    #[must_use]
    pub fn display_price(&self) -> String {
        let mut rounded = self.price.round_dp(2);
        rounded.rescale(2);
        rounded.to_string()
    }

    /// Returns `true` when this item has the given product name and
    /// specifications.
    #[must_use]
    pub fn matches(&self, identity: &ItemIdentity) -> bool {
        self.product_name == identity.product_name
            && self.specifications == normalize_specifications(&identity.specifications)
    }

    /// Returns a copy of this item with the patch's provided fields applied.
    ///
    /// `self` is never modified, so a failed patch leaves the original intact.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if any patched field fails validation.
    pub fn patched(&self, patch: &ItemPatch) -> Result<Self, ValidationError> {
        let price = match patch.price.as_deref() {
            Some(raw) => parse_price(raw)?,
            None => self.price,
        };

        Self::new(
            patch.brand.as_deref().unwrap_or(&self.brand),
            patch.product_name.as_deref().unwrap_or(&self.product_name),
            patch
                .specifications
                .as_deref()
                .unwrap_or(&self.specifications),
            price,
        )
    }
}

/// A partial update supplied by an editor. Absent fields are left unchanged.
///
/// `price` is carried as text because it comes from untrusted input; it is
/// validated by [`parse_price`] when the patch is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub specifications: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
}

impl ItemPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.brand.is_none()
            && self.product_name.is_none()
            && self.specifications.is_none()
            && self.price.is_none()
    }
}

/// The `(product_name, specifications)` pair used to look up a draft item by
/// content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIdentity {
    pub product_name: String,
    pub specifications: String,
}

impl ItemIdentity {
    #[must_use]
    pub fn new(product_name: impl Into<String>, specifications: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            specifications: specifications.into(),
        }
    }

    #[must_use]
    pub fn of(item: &CaptureItem) -> Self {
        Self::new(item.product_name(), item.specifications())
    }
}

/// A capture site name. Only non-emptiness is checked here; membership in
/// the configured site list is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location(String);

impl Location {
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyLocation`] if `name` is blank.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyLocation);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Location {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.0
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses untrusted price text into a non-negative decimal.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidPrice`] for non-numeric input and
/// [`ValidationError::NegativePrice`] for values below zero.
pub fn parse_price(raw: &str) -> Result<Decimal, ValidationError> {
    let trimmed = raw.trim();
    let price =
        Decimal::from_str(trimmed).map_err(|_| ValidationError::InvalidPrice(raw.to_owned()))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::NegativePrice(trimmed.to_owned()));
    }
    Ok(price)
}

/// Removes every whitespace character, e.g. `"340 g"` → `"340g"`.
#[must_use]
pub fn normalize_specifications(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

fn non_empty(field: &'static str, value: &str) -> Result<String, ValidationError> {
    if value.is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ham() -> CaptureItem {
        CaptureItem::new("喜旺", "手掰肉老火腿", "340g", Decimal::new(1990, 2)).unwrap()
    }

    #[test]
    fn new_trims_text_and_strips_spec_whitespace() {
        let item = CaptureItem::new(" 喜旺 ", " 手掰肉老火腿", "340 g", Decimal::ONE).unwrap();
        assert_eq!(item.brand(), "喜旺");
        assert_eq!(item.product_name(), "手掰肉老火腿");
        assert_eq!(item.specifications(), "340g");
    }

    #[test]
    fn new_rejects_empty_brand() {
        let err = CaptureItem::new("  ", "火腿", "340g", Decimal::ONE).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "brand" });
    }

    #[test]
    fn new_rejects_negative_price() {
        let err = CaptureItem::new("喜旺", "火腿", "340g", Decimal::new(-1, 0)).unwrap_err();
        assert!(matches!(err, ValidationError::NegativePrice(_)));
    }

    #[test]
    fn new_accepts_zero_price() {
        assert!(CaptureItem::new("喜旺", "火腿", "340g", Decimal::ZERO).is_ok());
    }

    #[test]
    fn display_price_pads_to_two_places() {
        let item = CaptureItem::new("喜旺", "火腿", "340g", Decimal::new(199, 1)).unwrap();
        assert_eq!(item.display_price(), "19.90");
    }

    #[test]
    fn display_price_rounds_extra_precision() {
        let item = CaptureItem::new("喜旺", "火腿", "340g", Decimal::new(19_999, 3)).unwrap();
        assert_eq!(item.display_price(), "20.00");
    }

    #[test]
    fn patched_changes_only_provided_fields() {
        let item = ham();
        let patch = ItemPatch {
            price: Some("21.50".to_owned()),
            ..ItemPatch::default()
        };
        let updated = item.patched(&patch).unwrap();
        assert_eq!(updated.price(), Decimal::new(2150, 2));
        assert_eq!(updated.brand(), item.brand());
        assert_eq!(updated.product_name(), item.product_name());
        assert_eq!(updated.specifications(), item.specifications());
    }

    #[test]
    fn patched_rejects_non_numeric_price() {
        let patch = ItemPatch {
            price: Some("abc".to_owned()),
            ..ItemPatch::default()
        };
        assert_eq!(
            ham().patched(&patch).unwrap_err(),
            ValidationError::InvalidPrice("abc".to_owned())
        );
    }

    #[test]
    fn patched_normalizes_specifications() {
        let patch = ItemPatch {
            specifications: Some(" 500 g ".to_owned()),
            ..ItemPatch::default()
        };
        assert_eq!(ham().patched(&patch).unwrap().specifications(), "500g");
    }

    #[test]
    fn matches_normalizes_identity_specifications() {
        assert!(ham().matches(&ItemIdentity::new("手掰肉老火腿", "340 g")));
        assert!(!ham().matches(&ItemIdentity::new("手掰肉老火腿", "500g")));
    }

    #[test]
    fn deserialize_runs_validation() {
        let bad = r#"{"brand":"","product_name":"x","specifications":"1g","price":"1.00"}"#;
        assert!(serde_json::from_str::<CaptureItem>(bad).is_err());

        let good = r#"{"brand":"喜旺","product_name":"火腿","specifications":"340 g","price":"19.90"}"#;
        let item: CaptureItem = serde_json::from_str(good).unwrap();
        assert_eq!(item.specifications(), "340g");
        assert_eq!(item.price(), Decimal::new(1990, 2));
    }

    #[test]
    fn serialize_emits_price_as_string() {
        let json = serde_json::to_string(&ham()).unwrap();
        assert!(json.contains("\"price\":\"19.90\""), "got {json}");
    }

    #[test]
    fn location_rejects_blank() {
        assert_eq!(Location::new("   "), Err(ValidationError::EmptyLocation));
        assert_eq!(Location::new(" 青岛办事处 ").unwrap().as_str(), "青岛办事处");
    }

    #[test]
    fn parse_price_handles_whitespace_and_rejects_garbage() {
        assert_eq!(parse_price(" 19.90 ").unwrap(), Decimal::new(1990, 2));
        assert!(matches!(
            parse_price("-3"),
            Err(ValidationError::NegativePrice(_))
        ));
        assert!(matches!(
            parse_price("12元"),
            Err(ValidationError::InvalidPrice(_))
        ));
    }
}

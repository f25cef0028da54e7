//! Product Model
//!
//! The backend keeps one spreadsheet row per product. Image URLs live in a
//! single `image_url` column as a comma-joined list, and prices may come back
//! either as numbers or as numeric text depending on how the cell was typed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity (point-in-time snapshot from the backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Backend-assigned identifier; empty before creation
    #[serde(default, deserialize_with = "serde_helpers::lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "serde_helpers::lenient_string")]
    pub name: String,
    /// Free-text category (not a closed set)
    #[serde(default, deserialize_with = "serde_helpers::lenient_string")]
    pub category: String,
    #[serde(
        serialize_with = "serde_helpers::serialize_price",
        deserialize_with = "serde_helpers::deserialize_price"
    )]
    pub price: Decimal,
    /// Ordered image URLs, index 0 is the cover image
    #[serde(
        rename = "image_url",
        default,
        serialize_with = "serde_helpers::serialize_image_urls",
        deserialize_with = "serde_helpers::deserialize_image_urls"
    )]
    pub image_urls: Vec<String>,
    /// External storefront listing; absence hides the buy button
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "serde_helpers::non_empty_string"
    )]
    pub shopee_url: Option<String>,
}

impl Product {
    /// Cover image (first URL), if the product has any image
    pub fn cover_url(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }

    /// Price formatted with two fractional digits
    pub fn display_price(&self) -> String {
        format!("{:.2}", self.price.round_dp(2))
    }

    pub fn has_buy_link(&self) -> bool {
        self.shopee_url.is_some()
    }

    /// True when the product has not been saved to the backend yet
    pub fn is_new(&self) -> bool {
        self.id.trim().is_empty()
    }
}

/// Full-record payload for `secureAddProduct` / `secureUpdateProduct`.
///
/// Updates always replace every field; there is no partial patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPayload {
    /// Empty on create
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(
        serialize_with = "serde_helpers::serialize_price",
        deserialize_with = "serde_helpers::deserialize_price"
    )]
    pub price: Decimal,
    /// Always sent, empty string when there is no link
    #[serde(default)]
    pub shopee_url: String,
    #[serde(
        rename = "image_url",
        default,
        serialize_with = "serde_helpers::serialize_image_urls",
        deserialize_with = "serde_helpers::deserialize_image_urls"
    )]
    pub image_urls: Vec<String>,
}

impl ProductPayload {
    pub fn is_update(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Convert into the product the backend will hold once the write lands
    pub fn into_product(self, id: String) -> Product {
        Product {
            id,
            name: self.name,
            category: self.category,
            price: self.price,
            image_urls: self.image_urls,
            shopee_url: (!self.shopee_url.trim().is_empty()).then_some(self.shopee_url),
        }
    }
}

impl From<&Product> for ProductPayload {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            shopee_url: product.shopee_url.clone().unwrap_or_default(),
            image_urls: product.image_urls.clone(),
        }
    }
}

/// Delete request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDelete {
    pub id: String,
}

pub mod serde_helpers {
    //! Lenient codecs for spreadsheet-typed cells.

    use rust_decimal::Decimal;
    use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cell {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
        Null,
    }

    impl Cell {
        fn into_text(self) -> String {
            match self {
                Cell::Text(s) => s,
                Cell::Int(i) => i.to_string(),
                Cell::Float(f) => f.to_string(),
                Cell::Bool(b) => b.to_string(),
                Cell::Null => String::new(),
            }
        }
    }

    /// Accept a string, number, bool or null and keep its text form
    pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Cell::deserialize(deserializer)?.into_text())
    }

    /// A list of cells, each kept in its text form; null reads as absent
    pub fn lenient_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let cells = Option::<Vec<Cell>>::deserialize(deserializer)?;
        Ok(cells.map(|cells| cells.into_iter().map(Cell::into_text).collect()))
    }

    /// Empty or whitespace-only text becomes `None`
    pub fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = Cell::deserialize(deserializer)?.into_text();
        let trimmed = text.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }

    pub fn serialize_price<S>(price: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match price.to_f64() {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str(&price.to_string()),
        }
    }

    pub fn deserialize_price<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Cell::deserialize(deserializer)? {
            Cell::Int(i) => Ok(Decimal::from(i)),
            Cell::Float(f) => Decimal::from_f64(f)
                .ok_or_else(|| D::Error::custom(format!("price out of range: {f}"))),
            Cell::Text(s) if s.trim().is_empty() => Ok(Decimal::ZERO),
            Cell::Text(s) => Decimal::from_str(s.trim())
                .map_err(|e| D::Error::custom(format!("invalid price '{s}': {e}"))),
            Cell::Null => Ok(Decimal::ZERO),
            Cell::Bool(_) => Err(D::Error::custom("price must be a number")),
        }
    }

    #[allow(clippy::ptr_arg)]
    pub fn serialize_image_urls<S>(urls: &Vec<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&urls.join(","))
    }

    /// Accept either the comma-joined column or a JSON array
    pub fn deserialize_image_urls<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Urls {
            List(Vec<String>),
            Joined(String),
            Null,
        }

        let raw = match Urls::deserialize(deserializer)? {
            Urls::List(list) => list,
            Urls::Joined(joined) => joined.split(',').map(str::to_string).collect(),
            Urls::Null => Vec::new(),
        };
        Ok(raw
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect())
    }
}

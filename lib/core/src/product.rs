use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::vector::Vector;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    // untagged variants are tried in order; strings that parse as UUIDs stay UUIDs
    Uuid(Uuid),
    Integer(u64),
    String(String),
}

impl ProductId {
    /// Fresh random identifier for a newly created product
    #[must_use]
    pub fn new_v4() -> Self {
        ProductId::Uuid(Uuid::new_v4())
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductId::String(s) => write!(f, "{}", s),
            ProductId::Uuid(u) => write!(f, "{}", u),
            ProductId::Integer(i) => write!(f, "{}", i),
        }
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        ProductId::String(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        ProductId::String(s.to_string())
    }
}

impl From<u64> for ProductId {
    fn from(i: u64) -> Self {
        ProductId::Integer(i)
    }
}

impl From<Uuid> for ProductId {
    fn from(u: Uuid) -> Self {
        ProductId::Uuid(u)
    }
}

/// Descriptive fields of a product, as supplied by whoever writes the catalog.
///
/// Everything the feature encoder reads lives here, so any change to these
/// fields means the stored vector is stale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFields {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    /// Display order is preserved; matching ignores order and case.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProductFields {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    #[must_use]
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// A catalog record together with its feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    /// Version number - incremented on each update
    #[serde(default)]
    pub version: u64,
    #[serde(flatten)]
    pub fields: ProductFields,
    /// Feature vector computed from `fields` at write time
    #[serde(default, alias = "imageFeatures")]
    pub vector: Vector,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    #[must_use]
    pub fn new(id: ProductId, fields: ProductFields, vector: Vector) -> Self {
        let now = Utc::now();
        Self {
            id,
            version: 0,
            fields,
            vector,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn id_string(&self) -> String {
        self.id.to_string()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.fields.name
    }

    #[inline]
    pub fn category(&self) -> &str {
        &self.fields.category
    }

    #[inline]
    pub fn brand(&self) -> &str {
        &self.fields.brand
    }

    #[inline]
    pub fn price(&self) -> f64 {
        self.fields.price
    }

    #[inline]
    #[must_use]
    pub fn with_vector(mut self, vector: Vector) -> Self {
        self.vector = vector;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_display() {
        assert_eq!(ProductId::from("sku-1").to_string(), "sku-1");
        assert_eq!(ProductId::from(42u64).to_string(), "42");
    }

    #[test]
    fn test_product_id_keeps_variant_through_json() {
        for id in [ProductId::new_v4(), ProductId::from(7u64), ProductId::from("sku-1")] {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(serde_json::from_str::<ProductId>(&json).unwrap(), id);
        }
    }

    #[test]
    fn test_fields_from_camel_case_json() {
        let fields: ProductFields = serde_json::from_value(serde_json::json!({
            "name": "Nike Air Max 270",
            "category": "Shoes",
            "brand": "Nike",
            "price": 150,
            "imageUrl": "https://example.com/a.jpg",
            "tags": ["running", "casual"]
        }))
        .unwrap();

        assert_eq!(fields.image_url, "https://example.com/a.jpg");
        assert_eq!(fields.tags, vec!["running", "casual"]);
        assert_eq!(fields.description, "");
    }

    #[test]
    fn test_product_json_is_flat() {
        let product = Product::new(
            ProductId::from("p1"),
            ProductFields::new("Book", "Books").with_price(9.5),
            Vector::new(vec![0.1, 0.2]),
        );
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["name"], "Book");
        assert_eq!(json["vector"].as_array().map(Vec::len), Some(2));

        let back: Product = serde_json::from_value(json).unwrap();
        assert_eq!(back.fields, product.fields);
        assert_eq!(back.vector, product.vector);
    }
}

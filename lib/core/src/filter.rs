// Coarse catalog filters applied before candidates reach the ranker
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use crate::Product;

pub trait Filter {
    fn matches(&self, product: &Product) -> bool;
}

/// Price, category and brand restrictions on catalog candidates.
///
/// Text conditions are case-insensitive regular expressions searched
/// anywhere in the field; a pattern that fails to compile is matched as a
/// literal. A category of `"all"` disables the category condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub brands: Vec<String>,
}

impl CatalogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_price_range(mut self, min: f64, max: f64) -> Self {
        self.price_min = Some(min);
        self.price_max = Some(max);
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        self.category = if category.eq_ignore_ascii_case("all") || category.is_empty() {
            None
        } else {
            Some(category)
        };
        self
    }

    #[must_use]
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        let brand = brand.into();
        self.brand = if brand.eq_ignore_ascii_case("all") || brand.is_empty() {
            None
        } else {
            Some(brand)
        };
        self
    }

    #[must_use]
    pub fn with_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.brands = brands.into_iter().map(Into::into).collect();
        self
    }

    /// Compile the text patterns once, for matching many products
    pub fn compile(&self) -> CompiledFilter {
        CompiledFilter {
            price_min: self.price_min,
            price_max: self.price_max,
            category: self.category.as_deref().map(TextPattern::new),
            brand: self.brand.as_deref().map(TextPattern::new),
            brands: self.brands.iter().map(|b| TextPattern::new(b)).collect(),
        }
    }
}

impl Filter for CatalogFilter {
    fn matches(&self, product: &Product) -> bool {
        self.compile().matches(product)
    }
}

/// A [`CatalogFilter`] with its patterns compiled
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    price_min: Option<f64>,
    price_max: Option<f64>,
    category: Option<TextPattern>,
    brand: Option<TextPattern>,
    brands: Vec<TextPattern>,
}

impl CompiledFilter {
    fn matches_price(&self, price: f64) -> bool {
        self.price_min.map_or(true, |min| price >= min)
            && self.price_max.map_or(true, |max| price <= max)
    }
}

impl Filter for CompiledFilter {
    fn matches(&self, product: &Product) -> bool {
        if !self.matches_price(product.price()) {
            return false;
        }

        if let Some(category) = &self.category {
            if !category.is_match(product.category()) {
                return false;
            }
        }

        if let Some(brand) = &self.brand {
            if !brand.is_match(product.brand()) {
                return false;
            }
        }

        if !self.brands.is_empty() && !self.brands.iter().any(|b| b.is_match(product.brand())) {
            return false;
        }

        true
    }
}

#[derive(Debug, Clone)]
enum TextPattern {
    Regex(Regex),
    Literal(String),
}

impl TextPattern {
    fn new(pattern: &str) -> Self {
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(re) => TextPattern::Regex(re),
            Err(_) => TextPattern::Literal(pattern.to_lowercase()),
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            TextPattern::Regex(re) => re.is_match(text),
            TextPattern::Literal(needle) => text.to_lowercase().contains(needle.as_str()),
        }
    }
}

//! Lookup tables behind the feature encoder
//!
//! Every keyword the encoder recognises lives here, in one serde structure.
//! The built-in tables are the [`Default`]; a JSON file with the same shape
//! can replace them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Longest template head accepted for the tag table
pub const TAG_TEMPLATE_LEN: usize = 300;
/// Brand and category templates are 100 wide; only a prefix is written
pub const LOOKUP_TEMPLATE_LEN: usize = 100;

/// Errors raised while loading or validating tables
#[derive(Error, Debug)]
pub enum TableError {
    #[error("failed to read tables: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse tables: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{table} entry '{key}' has {len} leading weights, at most {max} allowed")]
    TemplateTooLong {
        table: &'static str,
        key: String,
        len: usize,
        max: usize,
    },

    #[error("{table} key '{key}' must be non-empty lowercase")]
    InvalidKey { table: &'static str, key: String },

    #[error("{table} entry '{key}' contains a non-finite weight")]
    NonFinite { table: &'static str, key: String },
}

/// A weight template: explicit leading weights, then a constant fill
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    #[serde(default)]
    pub head: Vec<f32>,
    pub fill: f32,
}

impl Template {
    pub fn new(head: &[f32], fill: f32) -> Self {
        Self {
            head: head.to_vec(),
            fill,
        }
    }

    /// Template with no leading weights
    pub fn flat(fill: f32) -> Self {
        Self {
            head: Vec::new(),
            fill,
        }
    }

    #[inline]
    pub fn value(&self, index: usize) -> f32 {
        self.head.get(index).copied().unwrap_or(self.fill)
    }

    fn is_finite(&self) -> bool {
        self.fill.is_finite() && self.head.iter().all(|w| w.is_finite())
    }
}

/// Keywords that point a free-text query at a category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryKeywords {
    pub category: String,
    pub keywords: Vec<String>,
}

/// All lookup tables used by [`crate::FeatureEncoder`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureTables {
    /// Tag keyword -> 300-wide template, summed into the tag band
    pub tags: HashMap<String, Template>,
    /// Text keyword -> weight, added into a hashed text bucket
    pub keywords: HashMap<String, f32>,
    pub brands: HashMap<String, Template>,
    pub categories: HashMap<String, Template>,
    pub unknown_brand: Template,
    pub unknown_category: Template,
    /// Checked in order; the first group with a matching keyword wins
    pub category_keywords: Vec<CategoryKeywords>,
}

const TAG_TEMPLATES: &[(&str, &[f32], f32)] = &[
    // audio
    ("headphones", &[1.0, 0.95, 0.9, 0.85, 0.8], 0.1),
    ("earbuds", &[0.9, 1.0, 0.85, 0.8, 0.75], 0.1),
    ("wireless", &[0.85, 0.9, 1.0, 0.7, 0.6], 0.1),
    ("noise-canceling", &[0.8, 0.85, 0.9, 1.0, 0.75], 0.1),
    // phones and computers
    ("smartphone", &[0.1, 0.1, 0.1, 0.1, 1.0], 0.15),
    ("laptop", &[0.15, 0.1, 0.1, 0.1, 0.9], 0.15),
    ("tablet", &[0.1, 0.15, 0.1, 0.1, 0.85], 0.15),
    // clothing
    ("t-shirt", &[0.1, 0.1, 0.1, 0.1, 0.1, 1.0, 0.9, 0.8], 0.2),
    ("shirt", &[0.1, 0.1, 0.1, 0.1, 0.1, 0.9, 1.0, 0.85], 0.2),
    ("hoodie", &[0.1, 0.1, 0.1, 0.1, 0.1, 0.8, 0.85, 1.0], 0.2),
    // footwear
    ("shoes", &[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 1.0, 0.9], 0.25),
    ("sneakers", &[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.9, 1.0], 0.25),
    ("running", &[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.85, 0.95], 0.25),
    // books
    ("book", &[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 1.0], 0.3),
    ("fiction", &[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.9], 0.3),
    // beauty
    ("skincare", &[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 1.0, 0.9], 0.35),
    ("moisturizer", &[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.9, 1.0], 0.35),
    ("foundation", &[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.85, 0.95], 0.35),
    ("makeup", &[0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.8, 0.9], 0.35),
];

const TEXT_KEYWORDS: &[(&str, f32)] = &[
    ("headphones", 1.0), ("headset", 1.0), ("sony", 0.8), ("wh-1000xm4", 1.0),
    ("airpods", 1.0), ("earbuds", 1.0),
    ("iphone", 0.9), ("samsung", 0.9), ("phone", 0.8), ("smartphone", 0.9),
    ("laptop", 0.9), ("macbook", 1.0), ("dell", 0.8), ("hp", 0.8), ("lenovo", 0.8),
    ("book", 1.0), ("novel", 0.9), ("psychology", 0.8), ("money", 0.7),
    ("shirt", 1.0), ("clothing", 0.8), ("uniqlo", 0.8),
    ("moisturizer", 1.0), ("foundation", 1.0), ("skincare", 0.9), ("cream", 0.8),
    ("shoes", 1.0), ("sneakers", 1.0), ("nike", 0.8), ("adidas", 0.8), ("running", 0.9),
];

const BRAND_TEMPLATES: &[(&str, &[f32], f32)] = &[
    ("apple", &[1.0, 0.9, 0.8], 0.1),
    ("samsung", &[0.9, 1.0, 0.7], 0.2),
    ("nike", &[0.8, 0.7, 1.0], 0.3),
    ("adidas", &[0.7, 0.8, 0.9], 0.4),
    ("sony", &[0.9, 0.6, 0.8], 0.5),
];

const CATEGORY_TEMPLATES: &[(&str, &[f32], f32)] = &[
    ("electronics", &[1.0, 0.8, 0.6, 0.9, 0.7], 0.1),
    ("shoes", &[0.2, 1.0, 0.8, 0.3, 0.9], 0.2),
    ("clothing", &[0.3, 0.7, 1.0, 0.5, 0.8], 0.3),
    ("books", &[0.9, 0.2, 0.4, 1.0, 0.3], 0.4),
    ("home", &[0.5, 0.4, 0.6, 0.7, 1.0], 0.5),
    ("beauty", &[0.8, 0.6, 0.9, 0.4, 0.5], 0.6),
    ("sports", &[0.7, 0.9, 0.5, 0.8, 0.6], 0.7),
];

const QUERY_CATEGORIES: &[(&str, &[&str])] = &[
    ("Electronics", &[
        "phone", "iphone", "samsung", "laptop", "computer", "tablet", "headphones", "headset",
        "earbuds", "smartphone", "android", "macbook", "dell", "hp", "lenovo", "sony", "apple",
    ]),
    ("Shoes", &[
        "shoes", "sneakers", "running", "nike", "adidas", "converse", "vans", "boots",
        "sandals", "heels", "flats",
    ]),
    ("Clothing", &[
        "shirt", "t-shirt", "jeans", "pants", "dress", "jacket", "hoodie", "sweater", "shorts",
        "skirt", "blouse",
    ]),
    ("Books", &[
        "book", "novel", "fiction", "non-fiction", "biography", "textbook", "guide", "manual",
        "story",
    ]),
    ("Home", &[
        "kitchen", "appliance", "blender", "mixer", "vacuum", "thermostat", "grill", "mattress",
        "furniture",
    ]),
    ("Beauty", &[
        "makeup", "skincare", "foundation", "moisturizer", "cream", "sunscreen", "cosmetics",
        "beauty", "lotion",
    ]),
    ("Sports", &[
        "fitness", "exercise", "gym", "workout", "sports", "athletic", "bike", "dumbbells",
        "equipment",
    ]),
];

fn template_map(entries: &[(&str, &[f32], f32)]) -> HashMap<String, Template> {
    entries
        .iter()
        .map(|(key, head, fill)| (key.to_string(), Template::new(head, *fill)))
        .collect()
}

impl Default for FeatureTables {
    fn default() -> Self {
        Self {
            tags: template_map(TAG_TEMPLATES),
            keywords: TEXT_KEYWORDS
                .iter()
                .map(|(word, weight)| (word.to_string(), *weight))
                .collect(),
            brands: template_map(BRAND_TEMPLATES),
            categories: template_map(CATEGORY_TEMPLATES),
            unknown_brand: Template::flat(0.1),
            unknown_category: Template::flat(0.1),
            category_keywords: QUERY_CATEGORIES
                .iter()
                .map(|(category, keywords)| CategoryKeywords {
                    category: category.to_string(),
                    keywords: keywords.iter().map(|k| k.to_string()).collect(),
                })
                .collect(),
        }
    }
}

impl FeatureTables {
    /// Parse tables from JSON; missing sections keep their built-in values
    pub fn from_json_str(json: &str) -> Result<Self, TableError> {
        let tables: FeatureTables = serde_json::from_str(json)?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check keys are lowercase and templates fit their bands
    pub fn validate(&self) -> Result<(), TableError> {
        check_templates("tags", &self.tags, TAG_TEMPLATE_LEN)?;
        check_templates("brands", &self.brands, LOOKUP_TEMPLATE_LEN)?;
        check_templates("categories", &self.categories, LOOKUP_TEMPLATE_LEN)?;

        for (word, weight) in &self.keywords {
            check_key("keywords", word)?;
            if !weight.is_finite() {
                return Err(TableError::NonFinite {
                    table: "keywords",
                    key: word.clone(),
                });
            }
        }

        for (table, fallback) in [
            ("unknown_brand", &self.unknown_brand),
            ("unknown_category", &self.unknown_category),
        ] {
            if !fallback.is_finite() {
                return Err(TableError::NonFinite {
                    table,
                    key: String::new(),
                });
            }
        }

        Ok(())
    }

    /// Template for a lowercased tag, if the tag is known
    #[inline]
    pub fn tag(&self, tag: &str) -> Option<&Template> {
        self.tags.get(tag)
    }

    /// Weight of a lowercased text keyword; zero weights count as unknown
    #[inline]
    pub fn keyword_weight(&self, word: &str) -> Option<f32> {
        self.keywords.get(word).copied().filter(|w| *w > 0.0)
    }

    #[inline]
    pub fn brand(&self, brand: &str) -> &Template {
        self.brands.get(brand).unwrap_or(&self.unknown_brand)
    }

    #[inline]
    pub fn category(&self, category: &str) -> &Template {
        self.categories.get(category).unwrap_or(&self.unknown_category)
    }

    /// First category whose keywords occur (as substrings) in the query
    pub fn infer_category(&self, query: &str) -> Option<&str> {
        let query = query.to_lowercase();
        self.category_keywords
            .iter()
            .find(|group| group.keywords.iter().any(|k| query.contains(k.as_str())))
            .map(|group| group.category.as_str())
    }

    /// First query word that names a known brand
    pub fn infer_brand(&self, query: &str) -> Option<&str> {
        query
            .split_whitespace()
            .find_map(|word| self.brands.get_key_value(word.to_lowercase().as_str()))
            .map(|(brand, _)| brand.as_str())
    }
}

fn check_key(table: &'static str, key: &str) -> Result<(), TableError> {
    if key.is_empty() || key.to_lowercase() != key {
        return Err(TableError::InvalidKey {
            table,
            key: key.to_string(),
        });
    }
    Ok(())
}

fn check_templates(
    table: &'static str,
    templates: &HashMap<String, Template>,
    max: usize,
) -> Result<(), TableError> {
    for (key, template) in templates {
        check_key(table, key)?;
        if template.head.len() > max {
            return Err(TableError::TemplateTooLong {
                table,
                key: key.clone(),
                len: template.head.len(),
                max,
            });
        }
        if !template.is_finite() {
            return Err(TableError::NonFinite {
                table,
                key: key.clone(),
            });
        }
    }
    Ok(())
}

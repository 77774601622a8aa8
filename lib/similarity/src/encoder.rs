//! Feature Encoder
//!
//! Turns product metadata, or a free-text query, into a 512-wide feature
//! vector. The vector is split into four bands that are computed
//! independently:
//!
//! | band     | indices     | source                                     |
//! |----------|-------------|--------------------------------------------|
//! | tag      | `0..300`    | sum of the templates of every known tag    |
//! | text     | `300..450`  | keyword weights and hashed filler from text|
//! | brand    | `450..500`  | brand template (flat 0.1 when unknown)     |
//! | category | `500..512`  | category template scaled by 0.3            |
//!
//! Encoding is a pure function of its input: no I/O, no randomness.

use crate::hash::{hash_bucket, rolling_hash, seeded_fraction};
use crate::tables::FeatureTables;
use std::ops::Range;
use std::sync::Arc;
use vismatch_core::{ProductFields, Vector};

/// Length of every catalog and query vector
pub const FEATURE_DIM: usize = 512;

pub const TAG_BAND: Range<usize> = 0..300;
pub const TEXT_BAND: Range<usize> = 300..450;
pub const BRAND_BAND: Range<usize> = 450..500;
pub const CATEGORY_BAND: Range<usize> = 500..512;

/// Damping applied to the category band
pub const CATEGORY_WEIGHT: f32 = 0.3;

/// Amplitude of the hashed filler for words without a keyword weight
const FILLER_AMPLITUDE: f64 = 0.1;

/// The metadata fields the encoder reads
#[derive(Debug, Clone, Copy)]
pub struct Metadata<'a> {
    pub category: &'a str,
    pub brand: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub tags: &'a [String],
}

impl<'a> From<&'a ProductFields> for Metadata<'a> {
    fn from(fields: &'a ProductFields) -> Self {
        Self {
            category: &fields.category,
            brand: &fields.brand,
            name: &fields.name,
            description: &fields.description,
            tags: &fields.tags,
        }
    }
}

/// Deterministic encoder from metadata to feature vectors
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    tables: Arc<FeatureTables>,
}

impl FeatureEncoder {
    pub fn new(tables: FeatureTables) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    pub fn tables(&self) -> &FeatureTables {
        &self.tables
    }

    #[inline]
    pub fn dim(&self) -> usize {
        FEATURE_DIM
    }

    /// Encode a catalog record's descriptive fields
    pub fn encode_product(&self, fields: &ProductFields) -> Vector {
        self.encode_metadata(&Metadata::from(fields))
    }

    /// Encode metadata into the four bands of one vector
    pub fn encode_metadata(&self, meta: &Metadata<'_>) -> Vector {
        let mut vector = Vector::zeros(FEATURE_DIM);
        let data = vector.as_mut_slice();

        let category = meta.category.to_lowercase();
        let brand = meta.brand.to_lowercase();
        let text = format!("{} {}", meta.name.to_lowercase(), meta.description.to_lowercase());

        self.tag_band(meta.tags, &mut data[TAG_BAND]);
        self.text_band(&text, &mut data[TEXT_BAND]);
        self.brand_band(&brand, &mut data[BRAND_BAND]);
        self.category_band(&category, &mut data[CATEGORY_BAND]);

        vector
    }

    /// Encode a free-text query the same way a product would be encoded.
    ///
    /// The lowercased term doubles as name, description and (split on
    /// single spaces) tags. The category is inferred from keywords and the
    /// brand from the first word naming a known brand; with no such word
    /// the brand band gets the unknown-brand fill.
    pub fn encode_query_term(&self, term: &str) -> Vector {
        let term = term.to_lowercase();
        let category = self.tables.infer_category(&term).unwrap_or("all");
        let brand = self.tables.infer_brand(&term).unwrap_or("");
        let tags: Vec<String> = term.split(' ').map(str::to_string).collect();

        self.encode_metadata(&Metadata {
            category,
            brand,
            name: &term,
            description: &term,
            tags: &tags,
        })
    }

    /// Pseudo-random vector seeded by an identifier such as an image URL.
    ///
    /// Stable for a given identifier but unrelated to the metadata bands;
    /// it only correlates with catalog vectors by chance.
    pub fn encode_opaque(&self, identifier: &str) -> Vector {
        let seed = i64::from(rolling_hash(identifier));
        let data = (0..FEATURE_DIM as i64)
            .map(|i| (seeded_fraction(seed + i) * 2.0 - 1.0) as f32)
            .collect();
        Vector::new(data)
    }

    /// Vector for raw image bytes.
    ///
    /// There is no visual model; uploaded bytes map to the zero vector, which
    /// scores 0 against every product.
    pub fn encode_image_bytes(&self, _bytes: &[u8]) -> Vector {
        Vector::zeros(FEATURE_DIM)
    }

    /// Additive sum of every known tag's template
    fn tag_band(&self, tags: &[String], band: &mut [f32]) {
        for tag in tags {
            if let Some(template) = self.tables.tag(&tag.to_lowercase()) {
                for (i, slot) in band.iter_mut().enumerate() {
                    *slot += template.value(i);
                }
            }
        }
    }

    fn text_band(&self, text: &str, band: &mut [f32]) {
        let words = split_words(text);
        let buckets = band.len();

        for word in &words {
            if let Some(weight) = self.tables.keyword_weight(word) {
                band[hash_bucket(rolling_hash(word), buckets)] += weight;
            }
        }

        // low-amplitude filler keyed by position, first `buckets` words only
        for (i, word) in words.iter().enumerate().take(buckets) {
            if !word.is_empty() && self.tables.keyword_weight(word).is_none() {
                let hash = f64::from(rolling_hash(word));
                band[i % buckets] += (hash.sin() * FILLER_AMPLITUDE) as f32;
            }
        }
    }

    fn brand_band(&self, brand: &str, band: &mut [f32]) {
        let template = self.tables.brand(brand);
        for (i, slot) in band.iter_mut().enumerate() {
            *slot = template.value(i);
        }
    }

    fn category_band(&self, category: &str, band: &mut [f32]) {
        let template = self.tables.category(category);
        for (i, slot) in band.iter_mut().enumerate() {
            *slot = template.value(i) * CATEGORY_WEIGHT;
        }
    }
}

/// Split on runs of whitespace, keeping empty leading/trailing words.
///
/// Word positions feed the filler buckets, so `" a"` must yield `["", "a"]`.
fn split_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !c.is_whitespace() {
            continue;
        }
        words.push(&text[start..i]);
        let mut end = i + c.len_utf8();
        while let Some(&(j, d)) = chars.peek() {
            if !d.is_whitespace() {
                break;
            }
            end = j + d.len_utf8();
            chars.next();
        }
        start = end;
    }
    words.push(&text[start..]);
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Template;

    fn shoe() -> ProductFields {
        ProductFields::new("Nike Air Max 270", "Shoes")
            .with_brand("Nike")
            .with_price(150.0)
            .with_description("Comfortable running shoes with visible Air Max unit")
            .with_tags(["running", "athletic", "comfortable", "casual"])
    }

    fn tags_only(tags: &[&str]) -> Vector {
        let encoder = FeatureEncoder::default();
        encoder.encode_product(&ProductFields::new("", "").with_tags(tags.iter().copied()))
    }

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("a b"), vec!["a", "b"]);
        assert_eq!(split_words("a  \t b"), vec!["a", "b"]);
        assert_eq!(split_words(" a"), vec!["", "a"]);
        assert_eq!(split_words("a "), vec!["a", ""]);
        assert_eq!(split_words(""), vec![""]);
        assert_eq!(split_words("   "), vec!["", ""]);
    }

    #[test]
    fn test_dimension_and_determinism() {
        let encoder = FeatureEncoder::default();
        let v1 = encoder.encode_product(&shoe());
        let v2 = encoder.encode_product(&shoe());
        assert_eq!(v1.dim(), FEATURE_DIM);
        assert_eq!(v1.as_slice(), v2.as_slice());
    }

    #[test]
    fn test_tags_accumulate_additively() {
        let running = tags_only(&["running"]);
        let shoes = tags_only(&["shoes"]);
        let both = tags_only(&["running", "shoes"]);

        for i in TAG_BAND {
            assert_eq!(both.as_slice()[i], running.as_slice()[i] + shoes.as_slice()[i]);
        }
        // index 8: running 0.85 + shoes 1.0
        assert!((both.as_slice()[8] - 1.85).abs() < 1e-6);
    }

    #[test]
    fn test_tag_lookup_ignores_case_and_unknown_tags() {
        assert_eq!(tags_only(&["RUNNING"]).as_slice(), tags_only(&["running"]).as_slice());
        let unknown = tags_only(&["iOS", "premium"]);
        assert!(unknown.as_slice()[TAG_BAND].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_known_keyword_lands_in_hashed_bucket() {
        let encoder = FeatureEncoder::default();
        let v = encoder.encode_product(&ProductFields::new("running", ""));
        let text = &v.as_slice()[TEXT_BAND];
        // "running" hashes to bucket 85 with weight 0.9; the trailing empty
        // description word contributes nothing
        assert!((text[85] - 0.9).abs() < 1e-6);
        assert_eq!(text.iter().filter(|&&x| x != 0.0).count(), 1);
    }

    #[test]
    fn test_unknown_word_adds_positional_filler() {
        let encoder = FeatureEncoder::default();
        let v = encoder.encode_product(&ProductFields::new("hello", ""));
        let text = &v.as_slice()[TEXT_BAND];
        let expected = ((99162322f64).sin() * 0.1) as f32;
        assert_eq!(text[0], expected);
        assert!(text[0].abs() <= 0.1);
    }

    #[test]
    fn test_brand_band() {
        let encoder = FeatureEncoder::default();
        let nike = encoder.encode_product(&ProductFields::new("", "").with_brand("NIKE"));
        let band = &nike.as_slice()[BRAND_BAND];
        assert_eq!(&band[..4], &[0.8, 0.7, 1.0, 0.3]);
        assert!(band[3..].iter().all(|&x| x == 0.3));

        let unknown = encoder.encode_product(&ProductFields::new("", "").with_brand("Penguin"));
        assert!(unknown.as_slice()[BRAND_BAND].iter().all(|&x| x == 0.1));
    }

    #[test]
    fn test_category_band_is_damped() {
        let encoder = FeatureEncoder::default();
        let v = encoder.encode_product(&ProductFields::new("", "Shoes"));
        let band = &v.as_slice()[CATEGORY_BAND];
        assert_eq!(band.len(), 12);
        assert_eq!(band[1], 1.0 * CATEGORY_WEIGHT);
        assert_eq!(band[11], 0.2 * CATEGORY_WEIGHT);
    }

    #[test]
    fn test_bands_are_isolated() {
        let encoder = FeatureEncoder::default();
        let base = encoder.encode_product(&shoe());

        let mut retagged = shoe();
        retagged.tags = vec!["book".to_string()];
        let v = encoder.encode_product(&retagged);
        assert_ne!(&v.as_slice()[TAG_BAND], &base.as_slice()[TAG_BAND]);
        assert_eq!(&v.as_slice()[TAG_BAND.end..], &base.as_slice()[TAG_BAND.end..]);

        let mut rebranded = shoe();
        rebranded.brand = "Adidas".to_string();
        let v = encoder.encode_product(&rebranded);
        assert_eq!(&v.as_slice()[..BRAND_BAND.start], &base.as_slice()[..BRAND_BAND.start]);
        assert_eq!(&v.as_slice()[BRAND_BAND.end..], &base.as_slice()[BRAND_BAND.end..]);
        assert_ne!(&v.as_slice()[BRAND_BAND], &base.as_slice()[BRAND_BAND]);

        let mut recategorised = shoe();
        recategorised.category = "Sports".to_string();
        let v = encoder.encode_product(&recategorised);
        assert_eq!(&v.as_slice()[..CATEGORY_BAND.start], &base.as_slice()[..CATEGORY_BAND.start]);
    }

    #[test]
    fn test_price_does_not_affect_vector() {
        let encoder = FeatureEncoder::default();
        let cheap = encoder.encode_product(&shoe().with_price(1.0));
        let pricey = encoder.encode_product(&shoe().with_price(1000.0));
        assert_eq!(cheap, pricey);
    }

    #[test]
    fn test_query_term_matches_shoe_over_book() {
        let encoder = FeatureEncoder::default();
        let query = encoder.encode_query_term("Running Shoes Nike");
        let shoe = encoder.encode_product(&shoe());
        let book = encoder.encode_product(
            &ProductFields::new("The Midnight Library", "Books")
                .with_brand("Penguin")
                .with_description("A novel about all the choices that go into a life well lived")
                .with_tags(["fiction"]),
        );
        assert!(query.cosine_similarity(&shoe) > query.cosine_similarity(&book));
    }

    #[test]
    fn test_query_term_uses_inferred_category() {
        let encoder = FeatureEncoder::default();
        let query = encoder.encode_query_term("running shoes");
        let expected = encoder.encode_product(&ProductFields::new("", "Shoes"));
        assert_eq!(
            &query.as_slice()[CATEGORY_BAND],
            &expected.as_slice()[CATEGORY_BAND]
        );
        // no brand in a query: flat fallback
        assert!(query.as_slice()[BRAND_BAND].iter().all(|&x| x == 0.1));
    }

    #[test]
    fn test_query_term_uses_named_brand() {
        let encoder = FeatureEncoder::default();
        let query = encoder.encode_query_term("Running Shoes NIKE");
        let nike = encoder.encode_product(&ProductFields::new("", "").with_brand("Nike"));
        assert_eq!(&query.as_slice()[BRAND_BAND], &nike.as_slice()[BRAND_BAND]);
    }

    #[test]
    fn test_bare_shoe_record_beats_bare_book_record() {
        let encoder = FeatureEncoder::default();
        let query = encoder.encode_query_term("running shoes nike");
        let shoe = encoder.encode_product(
            &ProductFields::new("", "Shoes").with_brand("Nike").with_tags(["running"]),
        );
        let book = encoder.encode_product(
            &ProductFields::new("", "Books").with_brand("Penguin").with_tags(["fiction"]),
        );
        // 0.920 vs 0.894
        assert!(query.cosine_similarity(&shoe) > query.cosine_similarity(&book));
    }

    #[test]
    fn test_opaque_vector_is_seeded() {
        let encoder = FeatureEncoder::default();
        let a = encoder.encode_opaque("https://example.com/shoe.jpg");
        let b = encoder.encode_opaque("https://example.com/shoe.jpg");
        let c = encoder.encode_opaque("https://example.com/book.jpg");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.dim(), FEATURE_DIM);
        assert!(a.as_slice().iter().all(|x| (-1.0..=1.0).contains(x)));
    }

    #[test]
    fn test_image_bytes_encode_to_zero() {
        let encoder = FeatureEncoder::default();
        let v = encoder.encode_image_bytes(&[0xff, 0xd8, 0xff]);
        assert_eq!(v.dim(), FEATURE_DIM);
        assert!(v.is_zero());
    }

    #[test]
    fn test_custom_tables() {
        let mut tables = FeatureTables::default();
        tables.brands.insert("penguin".to_string(), Template::new(&[0.9], 0.05));
        let encoder = FeatureEncoder::new(tables);
        let v = encoder.encode_product(&ProductFields::new("", "").with_brand("Penguin"));
        assert_eq!(v.as_slice()[BRAND_BAND.start], 0.9);
        assert_eq!(v.as_slice()[BRAND_BAND.start + 1], 0.05);
    }
}

// Performance benchmarks for encoding, ranking and end-to-end search
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use std::sync::Arc;
use vismatch::prelude::*;
use vismatch::{Ranker, RankingConfig, FEATURE_DIM};

const TAGS: &[&str] = &["running", "shoes", "book", "fiction", "laptop", "wireless", "shirt", "decor"];
const CATEGORIES: &[&str] = &["Shoes", "Books", "Electronics", "Clothing", "Home"];
const BRANDS: &[&str] = &["Nike", "Adidas", "Apple", "Sony", "Penguin", "IKEA"];

fn generate_random_vector(dim: usize) -> Vector {
    let mut rng = rand::rng();
    let data: Vec<f32> = (0..dim).map(|_| rng.random_range(-1.0f32..1.0f32)).collect();
    Vector::new(data)
}

fn generate_random_fields(id: usize) -> ProductFields {
    let mut rng = rand::rng();
    let tags: Vec<&str> = (0..3).map(|_| TAGS[rng.random_range(0..TAGS.len())]).collect();
    ProductFields::new(
        format!("product number {}", id),
        CATEGORIES[rng.random_range(0..CATEGORIES.len())],
    )
    .with_brand(BRANDS[rng.random_range(0..BRANDS.len())])
    .with_price(rng.random_range(1.0..500.0))
    .with_description(format!("{} item with comfortable design and premium finish", tags[0]))
    .with_tags(tags)
}

fn build_catalog(size: usize, encoder: &FeatureEncoder) -> Catalog {
    let catalog = Catalog::new(CatalogConfig::default());
    for i in 0..size {
        let fields = generate_random_fields(i);
        let vector = encoder.encode_product(&fields);
        catalog
            .insert(Product::new(ProductId::from(i as u64), fields, vector))
            .unwrap();
    }
    catalog
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let encoder = FeatureEncoder::default();
    let fields = generate_random_fields(0);

    group.bench_function("product", |b| {
        b.iter(|| black_box(encoder.encode_product(black_box(&fields))));
    });
    group.bench_function("query_term", |b| {
        b.iter(|| black_box(encoder.encode_query_term(black_box("wireless running shoes nike"))));
    });
    group.bench_function("opaque_url", |b| {
        b.iter(|| black_box(encoder.encode_opaque(black_box("https://cdn.example.com/item.jpg"))));
    });

    group.finish();
}

fn benchmark_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");

    for size in [100, 1000, 10000].iter() {
        let candidates: Vec<Product> = (0..*size)
            .map(|i| {
                Product::new(
                    ProductId::from(i as u64),
                    ProductFields::default(),
                    generate_random_vector(FEATURE_DIM),
                )
            })
            .collect();
        let query = generate_random_vector(FEATURE_DIM);
        let ranker = Ranker::new(RankingConfig::default());

        group.bench_with_input(BenchmarkId::new("cosine", size), size, |b, _| {
            b.iter(|| black_box(ranker.rank(black_box(&query), candidates.clone())));
        });
    }

    group.finish();
}

fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    // Setup: 10k encoded products
    let encoder = FeatureEncoder::default();
    let catalog = Arc::new(build_catalog(10000, &encoder));
    let engine = SearchEngine::new(catalog, encoder);

    group.bench_function("text_all_categories", |b| {
        let query = SearchQuery::text("running shoes nike");
        let filters = SearchFilters::default();
        b.iter(|| black_box(engine.search(black_box(&query), &filters).unwrap()));
    });

    group.bench_function("text_filtered", |b| {
        let query = SearchQuery::text("wireless headphones");
        let filters = SearchFilters::default()
            .with_category("electronics")
            .with_price_range(50.0, 300.0);
        b.iter(|| black_box(engine.search(black_box(&query), &filters).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_rank, benchmark_search);
criterion_main!(benches);

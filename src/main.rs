use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use vismatch::prelude::*;
use vismatch::ProductView;

/// Catalog shipped with the binary, used by `seed` when no file is given
const SAMPLE_PRODUCTS: &str = include_str!("../data/sample_products.json");

/// Product catalog with visually-similar search
#[derive(Parser, Debug)]
#[command(name = "vismatch")]
#[command(about = "Product catalog with visually-similar search", long_about = None)]
struct Args {
    /// Path to the data directory
    #[arg(short, long, global = true, default_value = "./data")]
    data_dir: PathBuf,

    /// JSON file replacing the built-in encoder tables
    #[arg(long, global = true)]
    tables: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the sample catalog, or a file of products
    Seed {
        #[arg(long)]
        file: Option<PathBuf>,
        /// Remove existing products first
        #[arg(long)]
        reset: bool,
    },
    /// Add one product, or an array of products, from a JSON file
    Add {
        #[arg(long)]
        file: PathBuf,
    },
    /// Replace a product's fields and recompute its vector
    Update {
        id: String,
        #[arg(long)]
        file: PathBuf,
    },
    Delete {
        id: String,
    },
    /// Find products similar to a query term, image URL or image file
    Search(SearchArgs),
    /// List products, newest first
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print catalog statistics
    Check,
    /// Recompute every product vector from its metadata
    Reindex,
}

#[derive(ClapArgs, Debug)]
struct SearchArgs {
    #[arg(long)]
    query: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
    /// Image file to upload as the query
    #[arg(long)]
    image: Option<PathBuf>,
    #[arg(long, default_value = "all")]
    category: String,
    #[arg(long, default_value_t = 0.1)]
    min_similarity: f32,
    #[arg(long, default_value_t = 20)]
    max_results: usize,
    #[arg(long, default_value_t = 0.0)]
    min_price: f64,
    #[arg(long)]
    max_price: Option<f64>,
    /// Allowed brand; repeat for several
    #[arg(long = "brand")]
    brands: Vec<String>,
    /// Return nothing instead of the best match when all fall below the threshold
    #[arg(long)]
    no_fallback: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<ProductFields>),
    One(ProductFields),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<ProductFields> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(p) => vec![p],
        }
    }
}

fn read_products(path: &Path) -> anyhow::Result<Vec<ProductFields>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let products: OneOrMany = serde_json::from_str(&json)
        .with_context(|| format!("parsing products from {}", path.display()))?;
    Ok(products.into_vec())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn search(storage: &StorageManager, args: SearchArgs) -> anyhow::Result<()> {
    let image_bytes = match &args.image {
        Some(path) => Some(
            std::fs::read(path).with_context(|| format!("reading image {}", path.display()))?,
        ),
        None => None,
    };
    let query = SearchQuery {
        image_bytes,
        image_url: args.image_url,
        query_term: args.query,
    };

    let filters = SearchFilters {
        category: args.category,
        min_similarity: args.min_similarity,
        max_results: args.max_results,
        price_range: [args.min_price, args.max_price.unwrap_or(f64::MAX)],
        brands: args.brands,
    };

    let engine = SearchEngine::new(storage, storage.encoder().clone())
        .with_best_effort_fallback(!args.no_fallback);
    let response = engine.search(&query, &filters)?;
    info!(
        results = response.total_found,
        query_time_ms = response.query_time_ms,
        "search finished"
    );
    print_json(&response)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries JSON output only
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let tables = match &args.tables {
        Some(path) => FeatureTables::from_json_file(path)
            .with_context(|| format!("loading tables from {}", path.display()))?,
        None => FeatureTables::default(),
    };
    let storage = StorageManager::open(&args.data_dir, FeatureEncoder::new(tables))
        .with_context(|| format!("opening catalog in {}", args.data_dir.display()))?;

    let mutated = match args.command {
        Command::Seed { file, reset } => {
            let records = match file {
                Some(path) => read_products(&path)?,
                None => serde_json::from_str(SAMPLE_PRODUCTS)
                    .context("parsing built-in sample products")?,
            };
            let created = storage.seed(records, reset)?;
            print_json(&created.into_iter().map(ProductView::from).collect::<Vec<_>>())?;
            true
        }
        Command::Add { file } => {
            let mut created = Vec::new();
            for fields in read_products(&file)? {
                created.push(ProductView::from(storage.create_product(fields)?));
            }
            print_json(&created)?;
            true
        }
        Command::Update { id, file } => {
            let mut records = read_products(&file)?;
            if records.len() != 1 {
                bail!("{} must hold exactly one product", file.display());
            }
            let fields = records.remove(0);
            print_json(&ProductView::from(storage.update_product(&id, fields)?))?;
            true
        }
        Command::Delete { id } => {
            if !storage.delete_product(&id)? {
                bail!("product {} not found", id);
            }
            info!(id = %id, "product deleted");
            true
        }
        Command::Search(search_args) => {
            search(&storage, search_args)?;
            false
        }
        Command::List {
            category,
            brand,
            min_price,
            max_price,
            page,
            limit,
        } => {
            let mut filter = CatalogFilter::new();
            if let Some(category) = category {
                filter = filter.with_category(category);
            }
            if let Some(brand) = brand {
                filter = filter.with_brand(brand);
            }
            filter.price_min = min_price;
            filter.price_max = max_price;
            print_json(&storage.list_products(&filter, page, limit))?;
            false
        }
        Command::Check => {
            print_json(&storage.stats())?;
            if let Some(snapshot) = storage.snapshot_info()? {
                info!(
                    name = %snapshot.name,
                    size = snapshot.size,
                    products = snapshot.product_count,
                    "last snapshot"
                );
            }
            false
        }
        Command::Reindex => {
            let changed = storage.reindex()?;
            print_json(&serde_json::json!({ "reindexed": changed }))?;
            true
        }
    };

    if mutated {
        storage.close()?;
    }
    Ok(())
}

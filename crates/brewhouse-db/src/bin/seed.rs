//! # Seed Data Generator
//!
//! Populates a SQLite store with a coffeehouse catalog for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p brewhouse-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p brewhouse-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p brewhouse-db --bin seed -- --db ./data/brewhouse.db
//!
//! # Also create the administrator account
//! cargo run -p brewhouse-db --bin seed -- --admin-email admin@example.com --admin-hash '$argon2id$...'
//! ```
//!
//! Each product has:
//! - Unique SKU: `{CATEGORY}-{PREFIX}-{INDEX}`
//! - Name with size variant
//! - Price: $2.50 - $10.45 plus size addon
//! - Stock: 0 - 100

use std::env;

use anyhow::{bail, Context};
use brewhouse_core::{ProductDraft, ProductQuery, ProductSort};
use brewhouse_db::{Database, DbConfig, SqlStore, Store};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_COUNT: usize = 200;
const DEFAULT_DB: &str = "./brewhouse_dev.db";

/// Category code, display category, product names.
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "COF",
        "coffee",
        &[
            "Espresso",
            "Americano",
            "Cappuccino",
            "Flat White",
            "Latte",
            "Mocha",
            "Cortado",
            "Macchiato",
            "Cold Brew",
            "Affogato",
        ],
    ),
    (
        "TEA",
        "tea",
        &[
            "Earl Grey",
            "English Breakfast",
            "Sencha",
            "Jasmine Green",
            "Chamomile",
            "Peppermint",
            "Chai Latte",
            "Matcha Latte",
            "Rooibos",
            "Oolong",
        ],
    ),
    (
        "PST",
        "pastry",
        &[
            "Croissant",
            "Pain au Chocolat",
            "Cinnamon Roll",
            "Blueberry Muffin",
            "Banana Bread",
            "Almond Croissant",
            "Scone",
            "Brownie",
            "Carrot Cake",
            "Cheesecake",
        ],
    ),
    (
        "BEA",
        "beans",
        &[
            "Ethiopia Yirgacheffe",
            "Colombia Huila",
            "Brazil Cerrado",
            "Kenya AA",
            "Guatemala Antigua",
            "Sumatra Mandheling",
            "House Blend",
            "Decaf Blend",
            "Espresso Blend",
            "Costa Rica Tarrazu",
        ],
    ),
];

/// Size variants with their price addon in cents.
const SIZES: &[(&str, i64)] = &[
    ("Small", 0),
    ("Regular", 50),
    ("Large", 100),
    ("250g", 800),
    ("1kg", 2400),
];

struct Args {
    count: usize,
    db_path: String,
    admin_email: Option<String>,
    admin_hash: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(args) = parse_args()? else {
        return Ok(());
    };

    println!("Brewhouse Seed Data Generator");
    println!("=============================");
    println!("Database: {}", args.db_path);
    println!("Products: {}", args.count);
    println!();

    let db = Database::new(DbConfig::new(&args.db_path))
        .await
        .with_context(|| format!("opening database at {}", args.db_path))?;
    let existing = db.products().count().await?;
    let store = SqlStore::new(db);

    info!("Connected to database, migrations applied");

    if let (Some(email), Some(hash)) = (&args.admin_email, &args.admin_hash) {
        store.seed_admin_user(email, hash).await?;
        println!("✓ Administrator account ensured for {}", email);
    }

    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category_idx, (code, category, names)) in CATEGORIES.iter().enumerate() {
        for (product_idx, name) in names.iter().enumerate() {
            for (size_idx, (size, price_addon)) in SIZES.iter().enumerate() {
                if generated >= args.count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + product_idx * 10 + size_idx;
                let draft = generate_product(code, category, name, size, *price_addon, seed);
                let sku = draft.sku.clone();

                if let Err(e) = store.create_product(draft).await {
                    warn!(sku = %sku, error = %e, "Failed to insert product");
                    continue;
                }

                generated += 1;

                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);
    println!(
        "  Rate: {:.0} products/second",
        generated as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );

    println!();
    println!("Verifying search...");
    let results = store.list_products(&ProductQuery::search("latte")).await?;
    println!("  Search 'latte': {} results", results.len());

    let results = store.list_products(&ProductQuery::search("cof-")).await?;
    println!("  Search 'cof-': {} results", results.len());

    let best = store
        .list_products(&ProductQuery::all().sorted_by(ProductSort::BestSeller))
        .await?;
    println!("  Best-seller listing: {} products", best.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Returns `None` when only help was requested.
fn parse_args() -> anyhow::Result<Option<Args>> {
    let argv: Vec<String> = env::args().collect();

    let mut args = Args {
        count: DEFAULT_COUNT,
        db_path: DEFAULT_DB.to_string(),
        admin_email: None,
        admin_hash: None,
    };

    let mut i = 1;
    while i < argv.len() {
        let value = argv.get(i + 1);
        match argv[i].as_str() {
            "--count" | "-c" => {
                if let Some(v) = value {
                    args.count = v
                        .parse()
                        .with_context(|| format!("invalid --count value: {}", v))?;
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if let Some(v) = value {
                    args.db_path = v.clone();
                    i += 1;
                }
            }
            "--admin-email" => {
                if let Some(v) = value {
                    args.admin_email = Some(v.clone());
                    i += 1;
                }
            }
            "--admin-hash" => {
                if let Some(v) = value {
                    args.admin_hash = Some(v.clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Brewhouse Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!(
                    "  -c, --count <N>          Number of products to generate (default: {})",
                    DEFAULT_COUNT
                );
                println!(
                    "  -d, --db <PATH>          Database file path (default: {})",
                    DEFAULT_DB
                );
                println!("      --admin-email <E>    Administrator email");
                println!("      --admin-hash <H>     Administrator password hash");
                println!("  -h, --help               Show this help message");
                return Ok(None);
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    if args.admin_email.is_some() != args.admin_hash.is_some() {
        bail!("--admin-email and --admin-hash must be given together");
    }

    Ok(Some(args))
}

/// Builds one catalog entry from its position in the grid.
fn generate_product(
    code: &str,
    category: &str,
    name: &str,
    size: &str,
    price_addon: i64,
    seed: usize,
) -> ProductDraft {
    let prefix: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    let sku = format!("{}-{}-{:04}", code, prefix, seed);

    // $2.50 - $10.45 before the size addon
    let price_cents = 250 + ((seed * 37) % 800) as i64 + price_addon;

    ProductDraft {
        name: format!("{} {}", name, size),
        description: format!("{} from the {} menu", name, category),
        category: category.to_string(),
        price_cents,
        sku,
        stock: (seed % 101) as i64,
        thumbnail: String::new(),
    }
}

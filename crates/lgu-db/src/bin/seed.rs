//! # Seed Data Loader
//!
//! Populates a portal database with rate tables and regulatory fees.
//!
//! ## Usage
//! ```bash
//! # Built-in development rates and fees
//! cargo run -p lgu-db --bin seed
//!
//! # Specify database path
//! cargo run -p lgu-db --bin seed -- --db ./data/portal.db
//!
//! # Load rates and fees from a JSON fixture instead
//! cargo run -p lgu-db --bin seed -- --fixtures ./rates-2026.json
//! ```
//!
//! ## Fixture Format
//! ```json
//! {
//!   "configurations": [
//!     { "scope": { "kind": "gross_sales", "business_type": "Retail" },
//!       "rate": 200, "effective_date": "2026-01-01", "expiration_date": null }
//!   ],
//!   "fees": [
//!     { "name": "Mayor's permit", "amount": 49998, "expiration_date": "0000-00-00" }
//!   ]
//! }
//! ```
//! Amounts are centavos and rates are basis points, as stored.

use chrono::NaiveDate;
use lgu_core::{Money, RateScope, TaxRate};
use lgu_db::{Database, DbConfig, NewRegulatoryFee, NewTaxConfiguration};
use serde::Deserialize;
use std::env;

#[derive(Debug, Default, Deserialize)]
struct Fixtures {
    #[serde(default)]
    configurations: Vec<NewTaxConfiguration>,
    #[serde(default)]
    fees: Vec<NewRegulatoryFee>,
}

/// Gross-sales rates per business type, in basis points.
const GROSS_SALES_RATES: &[(&str, u32)] = &[
    ("Retail", 200),
    ("Wholesale", 150),
    ("Manufacturing", 175),
    ("Services", 300),
    ("Restaurant", 250),
];

/// Capital-investment brackets: (min pesos, max pesos, bps).
const CAPITAL_BRACKETS: &[(i64, i64, u32)] = &[
    (0, 50_000, 100),
    (50_001, 500_000, 150),
    (500_001, 5_000_000, 200),
];

/// Regulatory fees in centavos.
const FEES: &[(&str, i64)] = &[
    ("Mayor's permit", 49_998),
    ("Sanitary permit", 50_000),
    ("Garbage fee", 30_000),
];

fn builtin_fixtures(effective: NaiveDate) -> Fixtures {
    let mut configurations: Vec<NewTaxConfiguration> = GROSS_SALES_RATES
        .iter()
        .map(|(business_type, bps)| NewTaxConfiguration {
            scope: RateScope::GrossSales {
                business_type: business_type.to_string(),
            },
            rate: TaxRate::from_bps(*bps),
            effective_date: effective,
            expiration_date: None,
        })
        .collect();

    configurations.extend(CAPITAL_BRACKETS.iter().map(|(min, max, bps)| {
        NewTaxConfiguration {
            scope: RateScope::CapitalInvestment {
                min_amount: Money::from_major_minor(*min, 0),
                max_amount: Money::from_major_minor(*max, 0),
            },
            rate: TaxRate::from_bps(*bps),
            effective_date: effective,
            expiration_date: Some("0000-00-00".to_string()),
        }
    }));

    let fees = FEES
        .iter()
        .map(|(name, cents)| NewRegulatoryFee {
            name: name.to_string(),
            amount: Money::from_cents(*cents),
            expiration_date: None,
        })
        .collect();

    Fixtures {
        configurations,
        fees,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./portal_dev.db");
    let mut fixtures_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--fixtures" | "-f" => {
                if i + 1 < args.len() {
                    fixtures_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("LGU Portal Seed Loader");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>         Database file path (default: ./portal_dev.db)");
                println!("  -f, --fixtures <PATH>   JSON file with configurations and fees");
                println!("  -h, --help              Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let fixtures = match &fixtures_path {
        Some(path) => serde_json::from_str::<Fixtures>(&std::fs::read_to_string(path)?)?,
        None => {
            let effective = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid effective date")?;
            builtin_fixtures(effective)
        }
    };

    println!("🌱 LGU Portal Seed Loader");
    println!("=========================");
    println!("Database: {}", db_path);
    println!(
        "Source:   {}",
        fixtures_path.as_deref().unwrap_or("built-in development rates")
    );
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.tax_config().count_configurations().await?;
    if existing > 0 {
        println!("⚠ Database already has {} rate rows", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to reload.");
        return Ok(());
    }

    let repo = db.tax_config();
    let mut rates = 0;
    for config in &fixtures.configurations {
        match repo.insert_configuration(config).await {
            Ok(_) => rates += 1,
            Err(e) => eprintln!("Failed to insert rate {:?}: {}", config.scope, e),
        }
    }

    let mut fees = 0;
    for fee in &fixtures.fees {
        match repo.insert_fee(fee).await {
            Ok(_) => fees += 1,
            Err(e) => eprintln!("Failed to insert fee {}: {}", fee.name, e),
        }
    }

    println!();
    println!("✓ Inserted {} rate rows", rates);
    println!("✓ Inserted {} regulatory fees", fees);
    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

//! Relational input: reading and writing dataset files, and generating
//! synthetic sample data.
//!
//! A dataset file is a single JSON object with `customers`, `products` and
//! `orders` arrays; dates are `YYYY-MM-DD` strings.

use std::fs;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use relgraph_core::{Customer, CustomerId, Dataset, Order, OrderId, Product, ProductId};

use crate::error::{EtlError, Result};

const CITIES: &[&str] = &["New York", "London", "Tokyo", "Sydney"];
const COUNTRIES: &[&str] = &["USA", "UK", "Japan", "Australia"];
const SEGMENTS: &[&str] = &["Enterprise", "SMB", "Consumer"];
const CATEGORIES: &[&str] = &["Electronics", "Clothing", "Books", "Home"];

/// Read a dataset file.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let raw = fs::read_to_string(path)?;
    let dataset: Dataset = serde_json::from_str(&raw).map_err(|e| EtlError::Dataset {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    tracing::info!(
        path = %path.display(),
        customers = dataset.customers.len(),
        products = dataset.products.len(),
        orders = dataset.orders.len(),
        "Dataset read"
    );
    Ok(dataset)
}

/// Write a dataset file (pretty-printed), creating parent directories.
pub fn save_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(dataset)?)?;
    Ok(())
}

/// Size of a generated sample.
#[derive(Debug, Clone, Copy)]
pub struct SampleSpec {
    pub customers: usize,
    pub products: usize,
    pub orders: usize,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            customers: 100,
            products: 20,
            orders: 200,
        }
    }
}

/// Generate a synthetic retail dataset. The same seed always yields the
/// same dataset.
///
/// Customers register one per day from 2020-01-01, products launch at
/// successive month ends from 2019-01-31, and orders fall on a random day
/// of 2023.
pub fn generate_sample(spec: &SampleSpec, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);

    let registration_start = ymd(2020, 1, 1);
    let customers = (1..=spec.customers as i64)
        .map(|i| Customer {
            id: CustomerId(i),
            name: format!("Customer {i}"),
            email: format!("customer{i}@example.com"),
            city: pick(&mut rng, CITIES),
            country: pick(&mut rng, COUNTRIES),
            segment: pick(&mut rng, SEGMENTS),
            registration_date: registration_start + Duration::days(i - 1),
            lifetime_value: money(rng.gen_range(100.0..10_000.0)),
        })
        .collect();

    let products = (1..=spec.products as i64)
        .map(|i| Product {
            id: ProductId(i),
            name: format!("Product {i}"),
            category: pick(&mut rng, CATEGORIES),
            price: money(rng.gen_range(10.0..1_000.0)),
            cost: money(rng.gen_range(5.0..500.0)),
            margin: (rng.gen_range(0.1..0.5_f64) * 1000.0).round() / 1000.0,
            launch_date: month_end_after(ymd(2019, 1, 31), (i - 1) as u32),
        })
        .collect();

    let order_start = ymd(2023, 1, 1);
    let orders = if spec.customers == 0 || spec.products == 0 {
        Vec::new()
    } else {
        (1..=spec.orders as i64)
            .map(|i| Order {
                id: OrderId(i),
                customer_id: CustomerId(rng.gen_range(1..=spec.customers as i64)),
                product_id: ProductId(rng.gen_range(1..=spec.products as i64)),
                order_date: order_start + Duration::days(rng.gen_range(0..365)),
                quantity: rng.gen_range(1..5),
                unit_price: money(rng.gen_range(10.0..1_000.0)),
                total_amount: money(rng.gen_range(10.0..5_000.0)),
                discount: (rng.gen_range(0.0..0.3_f64) * 100.0).round() / 100.0,
            })
            .collect()
    };

    Dataset {
        customers,
        products,
        orders,
    }
}

fn pick(rng: &mut StdRng, choices: &[&str]) -> String {
    choices[rng.gen_range(0..choices.len())].to_string()
}

fn money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// The last day of the month `months` months after `start`'s month.
fn month_end_after(start: NaiveDate, months: u32) -> NaiveDate {
    let index = start.month0() + months;
    let year = start.year() + (index / 12) as i32;
    let month = index % 12 + 1;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    ymd(next_year, next_month, 1) - Duration::days(1)
}

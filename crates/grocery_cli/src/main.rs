//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `grocery_core` linkage without the mobile shell.
//! - Seed and refresh a local catalog cache from the environment config.

use grocery_core::{ClientConfig, GroceryApp};
use std::process::ExitCode;

const USAGE: &str = "usage: grocery_cli [ping|sync|orders <email>]";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("ping") => {
            println!("grocery_core ping={}", grocery_core::ping());
            println!("grocery_core version={}", grocery_core::core_version());
            ExitCode::SUCCESS
        }
        Some("sync") => run(sync().await),
        Some("orders") => match args.get(1) {
            Some(email) => run(orders(email)),
            None => {
                eprintln!("{USAGE}");
                ExitCode::FAILURE
            }
        },
        Some(_) => {
            eprintln!("{USAGE}");
            ExitCode::FAILURE
        }
    }
}

fn run(result: Result<(), String>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn open_app() -> Result<GroceryApp, String> {
    let config = ClientConfig::from_env().map_err(|err| err.to_string())?;
    grocery_core::init_logging(&config.log_level, &config.log_dir.to_string_lossy())
        .map_err(|err| err.to_string())?;
    GroceryApp::open(&config, None).map_err(|err| err.to_string())
}

async fn sync() -> Result<(), String> {
    let app = open_app()?;
    let report = app.start().await.map_err(|err| err.to_string())?;
    let products = app.catalog().list_all().map_err(|err| err.to_string())?;
    println!(
        "seeded={} refreshed={} products={}",
        report.seeded,
        report.refreshed,
        products.len()
    );
    Ok(())
}

fn orders(email: &str) -> Result<(), String> {
    let app = open_app()?;
    let orders = app
        .orders()
        .list_by_user(email)
        .map_err(|err| err.to_string())?;
    for order in &orders {
        println!(
            "{}\t{}\t{}\t{}",
            order.id, order.status, order.total, order.delivery_address
        );
    }
    println!("orders={}", orders.len());
    Ok(())
}

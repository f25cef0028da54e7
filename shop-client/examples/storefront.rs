//! Terminal storefront
//!
//! Loads the catalog from `SHOP_BACKEND_URL` and prints the products matching
//! an optional search term and category.
//!
//! ```text
//! cargo run -p shop-client --example storefront -- mug ทั้งหมด
//! ```

use shop_client::logger::init_logger;
use shop_client::{ALL_CATEGORIES, ClientConfig, ShopApp};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = ClientConfig::from_env();
    init_logger(&config.log_level, false)?;

    let mut args = std::env::args().skip(1);
    let search = args.next().unwrap_or_default();
    let category = args.next().unwrap_or_else(|| ALL_CATEGORIES.to_string());

    let app = ShopApp::new(config)?;
    app.start().await?;

    println!("Categories: {}", app.catalog().list_categories().join(", "));
    let products = app.catalog().filter(&search, &category);
    println!("{} of {} products match", products.len(), app.catalog().len());
    for product in products {
        println!(
            "  [{}] {} ({}) {}{}",
            product.id,
            product.name,
            product.category,
            product.display_price(),
            if product.has_buy_link() { "  [buy]" } else { "" }
        );
    }

    if let Some(user) = app.session().user() {
        tracing::info!(user = %user.username, "Logged in from a previous run");
    }
    Ok(())
}

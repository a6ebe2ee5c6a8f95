//! Seed the catalog from a YAML file.
//!
//! Categories and products are upserted by name, so re-running the command
//! updates prices and descriptions in place.
//!
//! ```yaml
//! categories:
//!   - name: Drama
//!     products:
//!       - name: Casablanca
//!         price: "9.99"
//!         description: Rick's Café Américain, 1941.
//! ```

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use dvd_shop_core::Price;
use dvd_shop_storefront::db::{self, PgStore};

/// Top-level catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub categories: Vec<CategorySeed>,
}

/// One category and its products.
#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

/// One product.
#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

/// Check names and prices before touching the database.
///
/// Returns one message per problem found.
pub fn validate_catalog(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut categories = HashSet::new();
    let mut products = HashSet::new();

    for category in &catalog.categories {
        if category.name.trim().is_empty() {
            errors.push("category with empty name".to_string());
        } else if !categories.insert(category.name.as_str()) {
            errors.push(format!("duplicate category '{}'", category.name));
        }

        for product in &category.products {
            if product.name.trim().is_empty() {
                errors.push(format!("product with empty name in '{}'", category.name));
            } else if !products.insert(product.name.as_str()) {
                errors.push(format!("duplicate product '{}'", product.name));
            }
            if let Err(e) = Price::new(product.price) {
                errors.push(format!("product '{}': {e}", product.name));
            }
        }
    }

    errors
}

/// Upsert every category and product in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database operation fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let store = PgStore::new(db::create_pool(&database_url).await?);
    info!("Connected to database");

    let mut product_count = 0usize;
    for seed in &catalog.categories {
        let category = store.upsert_category(seed.name.trim()).await?;
        for product in &seed.products {
            store
                .upsert_product(
                    product.name.trim(),
                    Price::new(product.price)?,
                    category.id,
                    product.description.as_deref(),
                )
                .await?;
            product_count += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Categories: {}", catalog.categories.len());
    info!("  Products: {product_count}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_validate_sample() {
        let catalog: CatalogFile =
            serde_yaml::from_str(include_str!("../../seed/catalog.yaml")).unwrap();
        assert!(validate_catalog(&catalog).is_empty());
        assert!(catalog.categories.iter().any(|c| !c.products.is_empty()));
    }

    #[test]
    fn test_validation_reports_problems() {
        let catalog: CatalogFile = serde_yaml::from_str(
            r#"
categories:
  - name: Drama
    products:
      - name: Casablanca
        price: "9.99"
      - name: Casablanca
        price: "-1.00"
  - name: Drama
"#,
        )
        .unwrap();

        let errors = validate_catalog(&catalog);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("duplicate product")));
        assert!(errors.iter().any(|e| e.contains("negative")));
        assert!(errors.iter().any(|e| e.contains("duplicate category")));
    }
}

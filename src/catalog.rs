//! Append-only product catalog over the `products` table.
//!
//! Every product records the email of the session that added it. There is
//! no update or delete path.

use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, SessionContext};
use crate::store::Database;

/// Column width of `products.name`.
pub const MAX_PRODUCT_NAME_CHARS: usize = 100;

/// Column width of `products.category`.
pub const MAX_CATEGORY_CHARS: usize = 50;

/// Largest price representable as DECIMAL(10,2).
pub const MAX_PRICE: f64 = 99_999_999.99;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub price: f64,
    pub added_by_email: Option<String>,
}

/// Input to `add_product`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
}

pub struct ProductCatalog {
    db: Database,
}

impl ProductCatalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add a product on behalf of the logged-in session.
    pub fn add_product(
        &self,
        session: &SessionContext,
        product: &NewProduct,
    ) -> Result<Product, AuthError> {
        let email = session.email().ok_or(AuthError::NotAuthenticated)?;

        let name = product.name.trim();
        let category = product.category.trim();
        let price = validate_product(name, category, product.price)?;
        let category = (!category.is_empty()).then(|| category.to_string());

        let mut conn = self.db.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO products (name, category, price, added_by_email) VALUES (?1, ?2, ?3, ?4)",
            params![name, category, price, email],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Product {
            id,
            name: name.to_string(),
            category,
            price,
            added_by_email: Some(email.to_string()),
        })
    }

    /// All products, newest first.
    pub fn list(&self) -> Result<Vec<Product>, AuthError> {
        self.query(
            "SELECT id, name, category, price, added_by_email FROM products ORDER BY id DESC",
            None,
        )
    }

    /// Products added by one user, newest first.
    pub fn list_by(&self, email: &str) -> Result<Vec<Product>, AuthError> {
        self.query(
            "SELECT id, name, category, price, added_by_email FROM products
             WHERE added_by_email = ?1 ORDER BY id DESC",
            Some(email.trim()),
        )
    }

    fn query(&self, sql: &str, email: Option<&str>) -> Result<Vec<Product>, AuthError> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(Product {
                id: row.get(0)?,
                name: row.get(1)?,
                category: row.get(2)?,
                price: row.get(3)?,
                added_by_email: row.get(4)?,
            })
        };
        let rows = match email {
            Some(email) => stmt.query_map(params![email], map_row)?,
            None => stmt.query_map([], map_row)?,
        };
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Parse a price typed into a text field. Accepts an optional leading `$`.
pub fn parse_price(raw: &str) -> Result<f64, AuthError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    digits
        .parse::<f64>()
        .map_err(|_| AuthError::validation(format!("'{trimmed}' is not a valid price")))
}

/// Round to cents, the precision of the `price` column. `-0` becomes `0`.
fn round_to_cents(price: f64) -> f64 {
    let rounded = (price * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn validate_product(name: &str, category: &str, price: f64) -> Result<f64, AuthError> {
    if name.is_empty() {
        return Err(AuthError::validation("Product name is required"));
    }
    if name.chars().count() > MAX_PRODUCT_NAME_CHARS {
        return Err(AuthError::validation(format!(
            "Product name too long (max {MAX_PRODUCT_NAME_CHARS} characters)"
        )));
    }
    if category.chars().count() > MAX_CATEGORY_CHARS {
        return Err(AuthError::validation(format!(
            "Category too long (max {MAX_CATEGORY_CHARS} characters)"
        )));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(AuthError::validation("Price must be a non-negative number"));
    }
    let price = round_to_cents(price);
    if price > MAX_PRICE {
        return Err(AuthError::validation(format!(
            "Price too large (max {MAX_PRICE:.2})"
        )));
    }
    Ok(price)
}

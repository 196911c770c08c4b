//! Inventory products, always scoped to their owner.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::errors::{Result, StoreError, classify};
use crate::price::Price;

/// A stored product as returned by the inventory API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Product {
    /// Row id.
    pub id: i64,
    /// Display name, unique per owner.
    pub name: String,
    /// URL key, unique per owner.
    pub slug: String,
    /// Owning user id.
    #[serde(rename = "owner")]
    pub owner_id: i64,
    /// Free-form category (≤ 20 chars).
    pub category: String,
    /// Unit price.
    pub price: Price,
    /// Units on hand.
    pub stock: u32,
    /// Growing region (≤ 100 chars).
    pub region: String,
    /// Optional long description.
    pub description: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// Fields for a new product. Validation happens before this is built.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub category: String,
    pub price: Price,
    pub stock: u32,
    pub region: String,
    pub description: Option<String>,
}

/// A partial update; `None` leaves the column untouched.
#[derive(Clone, Debug, Default)]
#[allow(missing_docs)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub category: Option<String>,
    pub price: Option<Price>,
    pub stock: Option<u32>,
    pub region: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

/// Product repository. Stateless; every method takes a `&Connection`.
pub struct ProductRepo;

const COLUMNS: &str =
    "id, name, slug, owner_id, category, price_cents, stock, region, description, created_at";

impl ProductRepo {
    /// Insert a product for `owner_id`.
    pub fn create(conn: &Connection, owner_id: i64, new: &NewProduct) -> Result<Product> {
        let now = chrono::Utc::now().to_rfc3339();
        let _ = conn
            .execute(
                "INSERT INTO products
                   (name, slug, owner_id, category, price_cents, stock, region, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    new.name,
                    new.slug,
                    owner_id,
                    new.category,
                    new.price.cents(),
                    new.stock,
                    new.region,
                    new.description,
                    now
                ],
            )
            .map_err(classify)?;
        Ok(Product {
            id: conn.last_insert_rowid(),
            name: new.name.clone(),
            slug: new.slug.clone(),
            owner_id,
            category: new.category.clone(),
            price: new.price,
            stock: new.stock,
            region: new.region.clone(),
            description: new.description.clone(),
            created_at: now,
        })
    }

    /// The owner's products in insertion order, optionally truncated.
    pub fn list_for_owner(
        conn: &Connection,
        owner_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<Product>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM products WHERE owner_id = ?1 ORDER BY id ASC LIMIT ?2"
        ))?;
        let rows = stmt
            .query_map(params![owner_id, limit], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Fetch one of the owner's products by slug.
    pub fn get_by_slug(conn: &Connection, owner_id: i64, slug: &str) -> Result<Product> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM products WHERE owner_id = ?1 AND slug = ?2"),
            params![owner_id, slug],
            Self::map_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("product {slug}")))
    }

    /// Apply `changes` to the owner's product and return the new row.
    pub fn update(
        conn: &Connection,
        owner_id: i64,
        slug: &str,
        changes: &ProductChanges,
    ) -> Result<Product> {
        let mut product = Self::get_by_slug(conn, owner_id, slug)?;
        if let Some(name) = &changes.name {
            product.name.clone_from(name);
        }
        if let Some(new_slug) = &changes.slug {
            product.slug.clone_from(new_slug);
        }
        if let Some(category) = &changes.category {
            product.category.clone_from(category);
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(stock) = changes.stock {
            product.stock = stock;
        }
        if let Some(region) = &changes.region {
            product.region.clone_from(region);
        }
        if let Some(description) = &changes.description {
            product.description.clone_from(description);
        }

        let _ = conn
            .execute(
                "UPDATE products
                 SET name = ?1, slug = ?2, category = ?3, price_cents = ?4,
                     stock = ?5, region = ?6, description = ?7
                 WHERE id = ?8",
                params![
                    product.name,
                    product.slug,
                    product.category,
                    product.price.cents(),
                    product.stock,
                    product.region,
                    product.description,
                    product.id
                ],
            )
            .map_err(classify)?;
        Ok(product)
    }

    /// Delete the owner's product.
    pub fn delete(conn: &Connection, owner_id: i64, slug: &str) -> Result<()> {
        let removed = conn.execute(
            "DELETE FROM products WHERE owner_id = ?1 AND slug = ?2",
            params![owner_id, slug],
        )?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("product {slug}")));
        }
        Ok(())
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
        let cents: i64 = row.get(5)?;
        Ok(Product {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
            owner_id: row.get(3)?,
            category: row.get(4)?,
            price: Price::from_cents(cents).unwrap_or_default(),
            stock: row.get(6)?,
            region: row.get(7)?,
            description: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;

use super::Database;
use crate::error::{Error, Result};
use crate::models::Owner;
use crate::search::slugify;

fn owner_from_row(row: &SqliteRow) -> Result<Owner> {
    Ok(Owner {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        url: row.try_get("url")?,
        image_url: row.try_get("image_url")?,
    })
}

impl Database {
    /// Owners are keyed by the slug of their name
    pub async fn get_or_create_owner(&self, name: &str, url: Option<&str>) -> Result<Owner> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(Error::validation("owner name is empty"));
        }

        let mut tx = self.pool().begin().await?;
        let existing = sqlx::query("SELECT id, name, slug, url, image_url FROM owners WHERE slug = ?")
            .bind(&slug)
            .fetch_optional(&mut *tx)
            .await?;
        if let Some(row) = existing {
            return owner_from_row(&row);
        }

        let row = sqlx::query(
            "INSERT INTO owners (name, slug, url) VALUES (?, ?, ?) RETURNING id, name, slug, url, image_url",
        )
        .bind(name.trim())
        .bind(&slug)
        .bind(url)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("Created owner '{slug}'");
        owner_from_row(&row)
    }

    pub async fn get_owner_by_slug(&self, slug: &str) -> Result<Owner> {
        let row = sqlx::query("SELECT id, name, slug, url, image_url FROM owners WHERE slug = ?")
            .bind(slug)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| Error::not_found("Owner", slug))?;
        owner_from_row(&row)
    }

    pub async fn list_owners(&self) -> Result<Vec<Owner>> {
        let rows = sqlx::query("SELECT id, name, slug, url, image_url FROM owners ORDER BY name")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(owner_from_row).collect()
    }
}

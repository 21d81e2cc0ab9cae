use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;

use super::{from_json, opt_u32, point_from_row, to_json, Database};
use crate::error::{map_unique, Error, Result};
use crate::models::{
    Accommodation, AccommodationPatch, ExternalSource, NewAccommodation, ResidenceType, Source,
};
use crate::search::slugify;

const SELECT_ACCOMMODATION: &str = r#"
    SELECT id, slug, name, description, lon, lat, address, city, postal_code,
           residence_type, owner_id, units, nb_total_apartments,
           nb_accessible_apartments, nb_coliving_apartments, amenities,
           images_urls, external_url, published, created_at, updated_at
    FROM accommodations
"#;

fn accommodation_from_row(row: &SqliteRow) -> Result<Accommodation> {
    let residence_type: String = row.try_get("residence_type")?;
    let units: String = row.try_get("units")?;
    let amenities: String = row.try_get("amenities")?;
    let images_urls: String = row.try_get("images_urls")?;

    Ok(Accommodation {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        point: point_from_row(row)?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        postal_code: row.try_get("postal_code")?,
        residence_type: ResidenceType::from_label(&residence_type),
        owner_id: row.try_get("owner_id")?,
        units: from_json(&units)?,
        nb_total_apartments: opt_u32(row, "nb_total_apartments")?,
        nb_accessible_apartments: opt_u32(row, "nb_accessible_apartments")?,
        nb_coliving_apartments: opt_u32(row, "nb_coliving_apartments")?,
        amenities: from_json(&amenities)?,
        images_urls: from_json(&images_urls)?,
        external_url: row.try_get("external_url")?,
        published: row.try_get("published")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// First free slug among `base`, `base-2`, `base-3`, ...
async fn unique_slug(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<String> {
    let base = match slugify(name) {
        s if s.is_empty() => "logement".to_string(),
        s => s,
    };

    let taken: Vec<String> =
        sqlx::query_scalar("SELECT slug FROM accommodations WHERE slug = ? OR slug LIKE ?")
            .bind(&base)
            .bind(format!("{base}-%"))
            .fetch_all(&mut **tx)
            .await?;

    if !taken.contains(&base) {
        return Ok(base);
    }

    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Inserts the row under a fresh slug and returns its id
async fn insert_row(
    tx: &mut Transaction<'_, Sqlite>,
    new: &NewAccommodation,
) -> Result<(i64, String)> {
    let slug = unique_slug(tx, &new.name).await?;
    let now = Utc::now();

    let id = sqlx::query(
        r#"
        INSERT INTO accommodations (
            slug, name, description, lon, lat, address, city, postal_code,
            residence_type, owner_id, units, nb_total_apartments,
            nb_accessible_apartments, nb_coliving_apartments, amenities,
            images_urls, external_url, published, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&slug)
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.point.map(|p| p.lon))
    .bind(new.point.map(|p| p.lat))
    .bind(&new.address)
    .bind(&new.city)
    .bind(&new.postal_code)
    .bind(new.residence_type.as_str())
    .bind(new.owner_id)
    .bind(to_json(&new.units)?)
    .bind(new.nb_total_apartments.map(i64::from))
    .bind(new.nb_accessible_apartments.map(i64::from))
    .bind(new.nb_coliving_apartments.map(i64::from))
    .bind(to_json(&new.amenities)?)
    .bind(to_json(&new.images_urls)?)
    .bind(&new.external_url)
    .bind(new.published)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_unique(e, "Accommodation slug"))?
    .last_insert_rowid();

    Ok((id, slug))
}

impl Database {
    pub async fn insert_accommodation(&self, new: NewAccommodation) -> Result<Accommodation> {
        let mut tx = self.pool().begin().await?;
        let (id, slug) = insert_row(&mut tx, &new).await?;
        tx.commit().await?;
        debug!("Inserted accommodation {id} as '{slug}'");

        self.get_accommodation(id).await
    }

    /// Inserts an imported listing together with its external source key.
    /// Either both rows land or neither does.
    pub async fn insert_imported(
        &self,
        new: NewAccommodation,
        source: Source,
        source_id: &str,
    ) -> Result<Accommodation> {
        let mut tx = self.pool().begin().await?;
        let (id, slug) = insert_row(&mut tx, &new).await?;

        sqlx::query(
            "INSERT INTO external_sources (accommodation_id, source, source_id) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(source.as_str())
        .bind(source_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique(e, "External source"))?;

        tx.commit().await?;
        debug!("Inserted accommodation {id} as '{slug}' from {source}:{source_id}");

        self.get_accommodation(id).await
    }

    pub async fn get_accommodation(&self, id: i64) -> Result<Accommodation> {
        let row = sqlx::query(&format!("{SELECT_ACCOMMODATION} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| Error::not_found("Accommodation", id))?;
        accommodation_from_row(&row)
    }

    pub async fn get_accommodation_by_slug(&self, slug: &str) -> Result<Accommodation> {
        let row = sqlx::query(&format!("{SELECT_ACCOMMODATION} WHERE slug = ?"))
            .bind(slug)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| Error::not_found("Accommodation", slug))?;
        accommodation_from_row(&row)
    }

    pub async fn list_published_accommodations(&self) -> Result<Vec<Accommodation>> {
        let rows = sqlx::query(&format!("{SELECT_ACCOMMODATION} WHERE published = 1 ORDER BY id"))
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(accommodation_from_row).collect()
    }

    pub async fn list_owner_accommodations(&self, owner_id: i64) -> Result<Vec<Accommodation>> {
        let rows = sqlx::query(&format!("{SELECT_ACCOMMODATION} WHERE owner_id = ? ORDER BY id"))
            .bind(owner_id)
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(accommodation_from_row).collect()
    }

    /// Applies a partial update inside a single transaction
    pub async fn update_accommodation(
        &self,
        id: i64,
        patch: AccommodationPatch,
    ) -> Result<Accommodation> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query(&format!("{SELECT_ACCOMMODATION} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::not_found("Accommodation", id))?;
        let mut accommodation = accommodation_from_row(&row)?;

        patch.apply(&mut accommodation);
        accommodation.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE accommodations SET
                name = ?, description = ?, lon = ?, lat = ?, address = ?, city = ?,
                postal_code = ?, residence_type = ?, owner_id = ?, units = ?,
                nb_total_apartments = ?, nb_accessible_apartments = ?,
                nb_coliving_apartments = ?, amenities = ?, images_urls = ?,
                external_url = ?, published = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&accommodation.name)
        .bind(&accommodation.description)
        .bind(accommodation.point.map(|p| p.lon))
        .bind(accommodation.point.map(|p| p.lat))
        .bind(&accommodation.address)
        .bind(&accommodation.city)
        .bind(&accommodation.postal_code)
        .bind(accommodation.residence_type.as_str())
        .bind(accommodation.owner_id)
        .bind(to_json(&accommodation.units)?)
        .bind(accommodation.nb_total_apartments.map(i64::from))
        .bind(accommodation.nb_accessible_apartments.map(i64::from))
        .bind(accommodation.nb_coliving_apartments.map(i64::from))
        .bind(to_json(&accommodation.amenities)?)
        .bind(to_json(&accommodation.images_urls)?)
        .bind(&accommodation.external_url)
        .bind(accommodation.published)
        .bind(accommodation.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(accommodation)
    }

    pub async fn delete_accommodation(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM accommodations WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Accommodation", id));
        }
        Ok(())
    }

    /// Listing previously imported from `source` under `source_id`, if any
    pub async fn find_by_external_source(
        &self,
        source: Source,
        source_id: &str,
    ) -> Result<Option<Accommodation>> {
        let id: Option<i64> = sqlx::query_scalar(
            "SELECT accommodation_id FROM external_sources WHERE source = ? AND source_id = ?",
        )
        .bind(source.as_str())
        .bind(source_id)
        .fetch_optional(self.pool())
        .await?;

        match id {
            Some(id) => Ok(Some(self.get_accommodation(id).await?)),
            None => Ok(None),
        }
    }

    pub async fn link_external_source(&self, link: &ExternalSource) -> Result<()> {
        sqlx::query(
            "INSERT INTO external_sources (accommodation_id, source, source_id) VALUES (?, ?, ?)",
        )
        .bind(link.accommodation_id)
        .bind(link.source.as_str())
        .bind(&link.source_id)
        .execute(self.pool())
        .await
        .map_err(|e| map_unique(e, "External source"))?;
        Ok(())
    }

    pub async fn external_sources(&self, accommodation_id: i64) -> Result<Vec<ExternalSource>> {
        let rows = sqlx::query(
            "SELECT source, source_id FROM external_sources WHERE accommodation_id = ? ORDER BY id",
        )
        .bind(accommodation_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| -> Result<ExternalSource> {
                let source: String = row.try_get("source")?;
                Ok(ExternalSource {
                    accommodation_id,
                    source: source.parse()?,
                    source_id: row.try_get("source_id")?,
                })
            })
            .collect()
    }
}

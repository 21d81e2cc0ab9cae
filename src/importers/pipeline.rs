use tracing::{debug, info, warn};

use super::geocoder::Geocoder;
use super::traits::ImporterTrait;
use super::types::{ImportSummary, ImportedAccommodation};
use crate::error::Result;
use crate::models::{AccommodationPatch, Source};
use crate::storage::Database;

enum Outcome {
    Created,
    Updated,
    Skipped(String),
}

/// Runs an importer to completion, one record at a time
pub struct ImportPipeline<G> {
    db: Database,
    geocoder: G,
}

impl<G: Geocoder> ImportPipeline<G> {
    pub fn new(db: Database, geocoder: G) -> Self {
        Self { db, geocoder }
    }

    /// A failing fetch aborts the run; failing records only count as skipped or errors
    pub async fn run(&self, importer: &dyn ImporterTrait) -> Result<ImportSummary> {
        let source = importer.source();
        let records = importer.fetch().await?;
        info!("Importing {} records from {source}", records.len());

        let mut summary = ImportSummary::default();
        for record in records {
            let source_id = record.source_id.clone();
            match self.import_one(source, record).await {
                Ok(Outcome::Created) => summary.created += 1,
                Ok(Outcome::Updated) => summary.updated += 1,
                Ok(Outcome::Skipped(reason)) => {
                    warn!("Skipping {source}:{source_id}: {reason}");
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to import {source}:{source_id}: {e}");
                    summary.errors += 1;
                }
            }
        }

        info!(
            "Import from {source} done: {} created, {} updated, {} skipped, {} errors",
            summary.created, summary.updated, summary.skipped, summary.errors
        );
        Ok(summary)
    }

    async fn import_one(&self, source: Source, record: ImportedAccommodation) -> Result<Outcome> {
        if record.accommodation.name.trim().is_empty() {
            return Ok(Outcome::Skipped("empty name".into()));
        }

        // already imported: refresh the listing in place
        if let Some(existing) = self.db.find_by_external_source(source, &record.source_id).await? {
            let patch = AccommodationPatch::from(record.accommodation);
            self.db.update_accommodation(existing.id, patch).await?;
            debug!("Updated '{}' from {source}", existing.slug);
            return Ok(Outcome::Updated);
        }

        let address = record.full_address();
        let mut new = record.accommodation;
        if new.point.is_none() {
            match self.geocoder.geocode(&address).await {
                Ok(point) => new.point = Some(point),
                Err(e) => return Ok(Outcome::Skipped(e.to_string())),
            }
        }

        if let Some(owner_name) = record.owner_name.as_deref() {
            let owner = self
                .db
                .get_or_create_owner(owner_name, record.owner_url.as_deref())
                .await?;
            new.owner_id = Some(owner.id);
        }

        let accommodation = self
            .db
            .insert_imported(new, source, &record.source_id)
            .await?;
        debug!("Created '{}' from {source}", accommodation.slug);
        Ok(Outcome::Created)
    }
}

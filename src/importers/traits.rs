use async_trait::async_trait;

use super::types::ImportedAccommodation;
use crate::error::Result;
use crate::models::Source;

/// Common trait for every listing source
/// A new partner only needs to implement this to plug into the pipeline
#[async_trait]
pub trait ImporterTrait: Send + Sync {
    /// Fetch every record the source currently publishes
    async fn fetch(&self) -> Result<Vec<ImportedAccommodation>>;

    /// Partner the records are deduplicated against
    fn source(&self) -> Source;
}

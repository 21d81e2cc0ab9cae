//! Listing importers
//!
//! Every source implements [`ImporterTrait`]; the [`ImportPipeline`] dedups
//! records through their external source key, geocodes the ones without a
//! point and stores the rest. Runs are single-threaded and run to completion.
//!
//! Sources:
//! - `CsvImporter` - local CSV file, `;` or `,` separated
//! - `PartnerFeedImporter` - JSON feed of a partner (CROUS, CLEF, ARPEJ, iBAIL)

pub mod csv_file;
pub mod export;
pub mod geocoder;
pub mod partner;
pub mod pipeline;
pub mod traits;
pub mod types;

pub use csv_file::CsvImporter;
pub use export::export_csv;
pub use geocoder::{BanGeocoder, Geocoder};
pub use partner::PartnerFeedImporter;
pub use pipeline::ImportPipeline;
pub use traits::ImporterTrait;
pub use types::{ImportSummary, ImportedAccommodation};

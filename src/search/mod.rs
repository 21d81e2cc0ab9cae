//! Territory search
//!
//! Free-text lookup over academies, departments and cities.
//!
//! ## Overview
//! Queries and names go through the same [`normalize`] pass (accents, case,
//! separators, `st`/`ste` abbreviations) before any comparison. Cities are
//! ranked by the greater of a token rank (with a trigram fallback for typos)
//! and an exact/prefix/substring boost; departments and academies are plain
//! accent-insensitive substring matches.
//!
//! ## Submodules
//! - **`normalize`**: text folding, slugs and trigram similarity.
//! - **`territory`**: the index and the ranking rules.

pub mod normalize;
pub mod territory;

pub use normalize::{normalize, slugify, trigram_similarity};
pub use territory::{city_rank, CityHit, TerritoryIndex, TerritorySearchResult, DEFAULT_LIMIT};

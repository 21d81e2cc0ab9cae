use std::collections::HashMap;
use std::path::Path;

use csv::Writer;
use tracing::info;

use super::csv_file::{columns, LIST_SEPARATOR};
use crate::error::Result;
use crate::models::{Accommodation, ApartmentType};
use crate::storage::Database;

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn flag(value: bool) -> String {
    let raw = if value { "1" } else { "0" };
    raw.to_string()
}

/// Row in the same column order as [`columns`]; the slug stands in for `source_id`
fn row(acc: &Accommodation, owners: &HashMap<i64, (String, Option<String>)>) -> Vec<String> {
    let owner = acc.owner_id.and_then(|id| owners.get(&id));
    let amenities = &acc.amenities;

    let mut row = vec![
        acc.slug.clone(),
        acc.name.clone(),
        acc.description.clone().unwrap_or_default(),
        acc.address.clone(),
        acc.city.clone(),
        acc.postal_code.clone(),
        cell(acc.point.map(|p| p.lon)),
        cell(acc.point.map(|p| p.lat)),
        acc.residence_type.as_str().to_string(),
        cell(owner.map(|(name, _)| name)),
        cell(owner.and_then(|(_, url)| url.as_ref())),
        cell(acc.nb_total_apartments),
        cell(acc.nb_accessible_apartments),
        cell(acc.nb_coliving_apartments),
        acc.external_url.clone().unwrap_or_default(),
        acc.images_urls.join(&LIST_SEPARATOR.to_string()),
    ];

    row.extend(
        [
            amenities.laundry_room,
            amenities.common_areas,
            amenities.bike_storage,
            amenities.parking,
            amenities.secure_access,
            amenities.residence_manager,
            amenities.desk,
            amenities.cooking_plates,
            amenities.microwave,
            amenities.refrigerator,
        ]
        .map(flag),
    );
    row.push(amenities.kitchen_type.clone().unwrap_or_default());
    row.push(amenities.bathroom.clone().unwrap_or_default());

    for kind in ApartmentType::ALL {
        let stock = acc.units.get(&kind).copied().unwrap_or_default();
        row.extend([
            cell(stock.total),
            cell(stock.available),
            cell(stock.price_min),
            cell(stock.price_max),
        ]);
    }
    row
}

/// Writes every published listing to `path`, returns the number of rows
pub async fn export_csv(db: &Database, path: &Path) -> Result<usize> {
    let accommodations = db.list_published_accommodations().await?;
    let owners: HashMap<i64, (String, Option<String>)> = db
        .list_owners()
        .await?
        .into_iter()
        .map(|owner| (owner.id, (owner.name, owner.url)))
        .collect();

    let mut writer = Writer::from_path(path)?;
    writer.write_record(columns())?;
    for acc in &accommodations {
        writer.write_record(row(acc, &owners))?;
    }
    writer.flush()?;

    info!("Exported {} accommodations to {}", accommodations.len(), path.display());
    Ok(accommodations.len())
}

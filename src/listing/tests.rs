//! Listing tests
//!
//! ## Test Scopes
//! - **Filters**: bbox, radius, accessibility, coliving, price ceiling, territory.
//! - **Prices**: all-null, all-zero and mixed price fields.
//! - **Ordering**: availability buckets and tie-breakers.
//! - **Service**: the same pipeline against an in-memory database.

use std::collections::BTreeMap;

use chrono::Utc;

use super::*;
use crate::geo::{BoundingBox, GeoPoint, Polygon};
use crate::models::{
    Amenities, ApartmentType, City, NewAccommodation, ResidenceType, UnitStock,
};
use crate::storage::{Database, TerritoryFile};

fn listing(id: i64, name: &str) -> Accommodation {
    Accommodation {
        id,
        slug: format!("listing-{id}"),
        name: name.to_string(),
        description: None,
        point: None,
        address: String::new(),
        city: "Lyon".into(),
        postal_code: "69007".into(),
        residence_type: ResidenceType::UniversityResidence,
        owner_id: None,
        units: BTreeMap::new(),
        nb_total_apartments: None,
        nb_accessible_apartments: None,
        nb_coliving_apartments: None,
        amenities: Amenities::default(),
        images_urls: vec![],
        external_url: None,
        published: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn with_prices(mut acc: Accommodation, kind: ApartmentType, min: Option<u32>, max: Option<u32>) -> Accommodation {
    let stock = acc.units.entry(kind).or_default();
    stock.price_min = min;
    stock.price_max = max;
    acc
}

fn with_available(mut acc: Accommodation, kind: ApartmentType, available: u32) -> Accommodation {
    acc.units.entry(kind).or_default().available = Some(available);
    acc
}

fn at(mut acc: Accommodation, lon: f64, lat: f64) -> Accommodation {
    acc.point = Some(GeoPoint { lon, lat });
    acc
}

fn query() -> ListingQuery {
    ListingQuery::default()
}

// ============================================================
// PRICES
// ============================================================

#[test]
fn test_prices_all_null() {
    let acc = listing(1, "A");
    assert_eq!(min_price(&acc), None);
    assert_eq!(max_price(&acc), None);
    assert_eq!(price_bounds([&acc]), PriceBounds::default());
}

#[test]
fn test_prices_all_zero_are_absent() {
    let acc = with_prices(listing(1, "A"), ApartmentType::T1, Some(0), Some(0));
    assert_eq!(min_price(&acc), None);
    assert_eq!(max_price(&acc), None);
    assert_eq!(price_bounds([&acc]), PriceBounds { min_price: None, max_price: None });
}

#[test]
fn test_prices_mixed_fields() {
    let acc = listing(1, "A");
    let acc = with_prices(acc, ApartmentType::T1, Some(310), None);
    let acc = with_prices(acc, ApartmentType::T2, Some(0), Some(540));
    let acc = with_prices(acc, ApartmentType::T7More, None, Some(980));
    assert_eq!(min_price(&acc), Some(310));
    assert_eq!(max_price(&acc), Some(980));
}

#[test]
fn test_price_from_max_field_only() {
    let acc = with_prices(listing(1, "A"), ApartmentType::T3, None, Some(700));
    assert_eq!(min_price(&acc), Some(700));
    assert_eq!(max_price(&acc), Some(700));
}

#[test]
fn test_price_bounds_across_listings_skip_unpriced() {
    let cheap = with_prices(listing(1, "A"), ApartmentType::T1, Some(250), Some(300));
    let dear = with_prices(listing(2, "B"), ApartmentType::T2, Some(600), Some(900));
    let unpriced = listing(3, "C");
    let bounds = price_bounds([&cheap, &dear, &unpriced]);
    assert_eq!(bounds.min_price, Some(250));
    assert_eq!(bounds.max_price, Some(900));
}

// ============================================================
// FILTERS
// ============================================================

#[test]
fn test_bbox_filter_requires_point() {
    let filter = AccommodationFilter {
        bbox: Some(BoundingBox::parse("4.7,45.7,4.9,45.8").unwrap()),
        ..Default::default()
    };
    assert!(filter.matches(&at(listing(1, "A"), 4.84, 45.75)));
    assert!(!filter.matches(&at(listing(2, "B"), 2.35, 48.85)));
    assert!(!filter.matches(&listing(3, "C")));
}

#[test]
fn test_radius_filter() {
    let (filter, _) = AccommodationFilter::parse(&ListingQuery {
        center: Some("4.8357,45.7640".into()),
        radius: Some("5".into()),
        ..query()
    })
    .unwrap();
    assert!(filter.matches(&at(listing(1, "Bellecour"), 4.832, 45.757)));
    // Villefranche-sur-Saône is about 30 km away
    assert!(!filter.matches(&at(listing(2, "Villefranche"), 4.718, 45.989)));
}

#[test]
fn test_center_defaults_radius() {
    let (filter, _) = AccommodationFilter::parse(&ListingQuery {
        center: Some("4.8357,45.7640".into()),
        ..query()
    })
    .unwrap();
    assert_eq!(filter.radius.map(|(_, km)| km), Some(filters::DEFAULT_RADIUS_KM));
}

#[test]
fn test_accessibility_and_coliving_filters() {
    let filter = AccommodationFilter {
        is_accessible: true,
        has_coliving: true,
        ..Default::default()
    };
    let mut acc = listing(1, "A");
    acc.nb_accessible_apartments = Some(2);
    assert!(!filter.matches(&acc));
    acc.nb_coliving_apartments = Some(0);
    assert!(!filter.matches(&acc));
    acc.nb_coliving_apartments = Some(1);
    assert!(filter.matches(&acc));
}

#[test]
fn test_price_ceiling_requires_a_price() {
    let filter = AccommodationFilter {
        price_max: Some(400),
        ..Default::default()
    };
    assert!(filter.matches(&with_prices(listing(1, "A"), ApartmentType::T1, Some(380), Some(450))));
    assert!(!filter.matches(&with_prices(listing(2, "B"), ApartmentType::T1, Some(410), None)));
    assert!(!filter.matches(&listing(3, "C")));
}

#[test]
fn test_unpublished_never_match() {
    let mut acc = listing(1, "A");
    acc.published = false;
    assert!(!AccommodationFilter::default().matches(&acc));
}

#[test]
fn test_territory_scope_by_department_and_city() {
    let scope = TerritoryScope::from_department_codes(["69", "2A"]);
    let filter = AccommodationFilter {
        territory: Some(scope),
        ..Default::default()
    };
    assert!(filter.matches(&listing(1, "A")));
    let mut ajaccio = listing(2, "B");
    ajaccio.postal_code = "20000".into();
    assert!(filter.matches(&ajaccio));
    let mut paris = listing(3, "C");
    paris.postal_code = "75005".into();
    assert!(!filter.matches(&paris));

    let city = City {
        id: 1,
        name: "Lyon".into(),
        slug: "lyon".into(),
        postal_codes: vec!["69007".into()],
        department_id: 1,
        center: None,
        boundary: Some(Polygon::new(vec![
            GeoPoint { lon: 4.77, lat: 45.70 },
            GeoPoint { lon: 4.90, lat: 45.70 },
            GeoPoint { lon: 4.90, lat: 45.81 },
            GeoPoint { lon: 4.77, lat: 45.81 },
        ])),
        population: None,
        popular: true,
    };
    let filter = AccommodationFilter {
        territory: Some(TerritoryScope::City(city)),
        ..Default::default()
    };
    assert!(filter.matches(&at(listing(4, "D"), 4.84, 45.75)));
    assert!(!filter.matches(&at(listing(5, "E"), 4.95, 45.77)));
    // no point: postal code fallback
    assert!(filter.matches(&listing(6, "F")));
}

#[test]
fn test_parse_rejects_malformed_query() {
    let bad = [
        ListingQuery { bbox: Some("1,2,3".into()), ..query() },
        ListingQuery { center: Some("abc".into()), ..query() },
        ListingQuery { center: Some("4.8,45.7".into()), radius: Some("-1".into()), ..query() },
        ListingQuery { radius: Some("3".into()), ..query() },
        ListingQuery { price_max: Some("-20".into()), ..query() },
        ListingQuery { is_accessible: Some("maybe".into()), ..query() },
    ];
    for q in bad {
        let err = AccommodationFilter::parse(&q).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{q:?} gave {err:?}");
    }
}

#[test]
fn test_parse_flags_and_territory() {
    let (filter, territory) = AccommodationFilter::parse(&ListingQuery {
        is_accessible: Some("true".into()),
        has_coliving: Some("0".into()),
        price_max: Some("500".into()),
        department: Some("69".into()),
        ..query()
    })
    .unwrap();
    assert!(filter.is_accessible);
    assert!(!filter.has_coliving);
    assert_eq!(filter.price_max, Some(500));
    assert_eq!(territory, Some(TerritoryRequest::Department("69".into())));
    assert_eq!(filter.without_price().price_max, None);
}

// ============================================================
// ORDERING & PAGINATION
// ============================================================

#[test]
fn test_availability_first_ordering() {
    let full = with_available(listing(1, "Alpha"), ApartmentType::T1, 0);
    let unknown = listing(2, "Beta");
    let available = with_available(listing(3, "Gamma"), ApartmentType::T1, 4);
    let available_cheap = with_prices(
        with_available(listing(4, "Zeta"), ApartmentType::T2, 1),
        ApartmentType::T2,
        Some(300),
        None,
    );

    let mut all = vec![full, unknown, available, available_cheap];
    sort_availability_first(&mut all);
    let names: Vec<&str> = all.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Zeta", "Gamma", "Beta", "Alpha"]);
}

#[test]
fn test_ordering_ties_broken_by_name_then_id() {
    let mut all = vec![listing(3, "Same"), listing(1, "Same"), listing(2, "Other")];
    sort_availability_first(&mut all);
    let ids: Vec<i64> = all.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![2, 1, 3]);
}

#[test]
fn test_paginate() {
    let request = PageRequest::new(Some(2), Some(2), 30).unwrap();
    let page = paginate((1..=5).collect::<Vec<_>>(), request);
    assert_eq!(page.count, 5);
    assert_eq!(page.results, vec![3, 4]);

    let past_end = paginate(vec![1, 2], PageRequest::new(Some(9), Some(10), 30).unwrap());
    assert!(past_end.results.is_empty());
    assert_eq!(past_end.count, 2);

    assert!(PageRequest::new(Some(0), None, 30).is_err());
    assert!(PageRequest::new(None, Some(1000), 30).is_err());
}

// ============================================================
// SERVICE
// ============================================================

fn new_listing(name: &str, postal_code: &str, lon: f64, lat: f64) -> NewAccommodation {
    NewAccommodation {
        name: name.to_string(),
        address: "1 place Bellecour".into(),
        city: "Lyon".into(),
        postal_code: postal_code.to_string(),
        point: Some(GeoPoint { lon, lat }),
        published: true,
        ..Default::default()
    }
}

async fn seeded() -> (Database, ListingService) {
    let db = Database::in_memory().await.unwrap();
    let territories: TerritoryFile = serde_json::from_value(serde_json::json!({
        "academies": [{
            "name": "Lyon",
            "departments": [
                {"code": "69", "name": "Rhône", "cities": [
                    {"name": "Lyon", "postal_codes": ["69001", "69002", "69007"]}
                ]},
                {"code": "42", "name": "Loire", "cities": [
                    {"name": "Saint-Étienne", "postal_codes": ["42000"]}
                ]}
            ]
        }, {
            "name": "Paris",
            "departments": [{"code": "75", "name": "Paris", "cities": []}]
        }]
    }))
    .unwrap();
    db.load_territories(&territories).await.unwrap();

    let mut units = BTreeMap::new();
    units.insert(
        ApartmentType::T1,
        UnitStock { total: Some(80), available: Some(3), price_min: Some(320), price_max: Some(410) },
    );
    db.insert_accommodation(NewAccommodation {
        units,
        nb_accessible_apartments: Some(4),
        ..new_listing("Résidence Jean Jaurès", "69007", 4.842, 45.745)
    })
    .await
    .unwrap();

    let mut units = BTreeMap::new();
    units.insert(
        ApartmentType::T2,
        UnitStock { total: Some(20), available: Some(0), price_min: Some(520), price_max: Some(690) },
    );
    db.insert_accommodation(NewAccommodation { units, ..new_listing("Résidence Carnot", "42000", 4.387, 45.434) })
        .await
        .unwrap();

    db.insert_accommodation(new_listing("Studios Marais", "75003", 2.360, 48.861))
        .await
        .unwrap();

    db.insert_accommodation(NewAccommodation {
        published: false,
        ..new_listing("Brouillon", "69002", 4.83, 45.76)
    })
    .await
    .unwrap();

    let service = ListingService::new(db.clone(), 30);
    (db, service)
}

#[tokio::test]
async fn test_service_lists_published_in_availability_order() {
    let (_db, service) = seeded().await;
    let page = service.search(&query()).await.unwrap();
    let names: Vec<&str> = page.results.iter().map(|v| v.accommodation.name.as_str()).collect();
    assert_eq!(page.count, 3);
    assert_eq!(names, vec!["Résidence Jean Jaurès", "Studios Marais", "Résidence Carnot"]);
    assert_eq!(page.results[0].min_price, Some(320));
    assert_eq!(page.results[0].availability, Availability::Available);
}

#[tokio::test]
async fn test_service_filters_by_academy_and_city() {
    let (db, service) = seeded().await;
    let academy = db
        .list_academies()
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.name == "Lyon")
        .unwrap();

    let page = service
        .search(&ListingQuery { academy: Some(academy.id), ..query() })
        .await
        .unwrap();
    assert_eq!(page.count, 2);

    let page = service
        .search(&ListingQuery { city: Some("saint-etienne".into()), ..query() })
        .await
        .unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.results[0].accommodation.name, "Résidence Carnot");

    let err = service
        .search(&ListingQuery { city: Some("atlantis".into()), ..query() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[tokio::test]
async fn test_service_price_bounds_ignore_ceiling() {
    let (_db, service) = seeded().await;
    let bounds = service
        .price_bounds(&ListingQuery { price_max: Some("350".into()), ..query() })
        .await
        .unwrap();
    assert_eq!(bounds, PriceBounds { min_price: Some(320), max_price: Some(690) });

    let page = service
        .search(&ListingQuery { price_max: Some("350".into()), ..query() })
        .await
        .unwrap();
    assert_eq!(page.count, 1);
}

#[tokio::test]
async fn test_service_get_hides_drafts() {
    let (_db, service) = seeded().await;
    assert!(service.get("residence-jean-jaures").await.is_ok());
    assert!(matches!(
        service.get("brouillon").await.unwrap_err(),
        Error::NotFound { .. }
    ));
}

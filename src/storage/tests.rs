//! Storage tests against an in-memory SQLite database

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::*;
use crate::error::Error;
use crate::models::{
    AccommodationPatch, ApartmentType, EventStats, ExternalSource, NewAccommodation, NewAlert,
    NewQuestionAnswer, NewStudent, Source, Stats, StatsPeriod, TerritoryKind, TerritoryRef,
    UnitStock,
};

async fn db() -> Database {
    Database::in_memory().await.unwrap()
}

fn residence(name: &str) -> NewAccommodation {
    NewAccommodation {
        name: name.to_string(),
        address: "12 rue Pasteur".into(),
        city: "Lyon".into(),
        postal_code: "69007".into(),
        published: true,
        ..Default::default()
    }
}

fn territories() -> TerritoryFile {
    serde_json::from_value(serde_json::json!({
        "academies": [{
            "name": "Normandie",
            "departments": [{
                "code": "76", "name": "Seine-Maritime",
                "cities": [{"name": "Saint-Aubin", "postal_codes": ["76410"], "popular": true}]
            }]
        }, {
            "name": "Nantes",
            "departments": [{
                "code": "49", "name": "Maine-et-Loire",
                "cities": [
                    {"name": "Saint-Aubin", "postal_codes": ["49190"]},
                    {"name": "Angers", "postal_codes": ["49000", "49100"],
                     "center": {"lon": -0.5515, "lat": 47.4784},
                     "boundary": [[-0.62, 47.44], [-0.50, 47.44], [-0.50, 47.52], [-0.62, 47.52]]}
                ]
            }]
        }]
    }))
    .unwrap()
}

// ============================================================
// ACCOMMODATIONS
// ============================================================

#[tokio::test]
async fn test_insert_assigns_unique_slugs() {
    let db = db().await;
    let first = db.insert_accommodation(residence("Résidence Les Tilleuls")).await.unwrap();
    let second = db.insert_accommodation(residence("Residence les tilleuls")).await.unwrap();
    let third = db.insert_accommodation(residence("Résidence Les Tilleuls")).await.unwrap();
    let blank = db.insert_accommodation(residence("  ")).await.unwrap();

    assert_eq!(first.slug, "residence-les-tilleuls");
    assert_eq!(second.slug, "residence-les-tilleuls-2");
    assert_eq!(third.slug, "residence-les-tilleuls-3");
    assert_eq!(blank.slug, "logement");
}

#[tokio::test]
async fn test_insert_round_trips_nested_values() {
    let db = db().await;
    let mut units = BTreeMap::new();
    units.insert(
        ApartmentType::T1Bis,
        UnitStock { total: Some(12), available: Some(2), price_min: Some(390), price_max: None },
    );
    let mut new = residence("Le Campus");
    new.units = units.clone();
    new.amenities.laundry_room = true;
    new.images_urls = vec!["https://img.example.org/1.jpg".into()];

    let saved = db.insert_accommodation(new).await.unwrap();
    let loaded = db.get_accommodation_by_slug("le-campus").await.unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.units, units);
    assert!(loaded.amenities.laundry_room);
    assert_eq!(loaded.images_urls.len(), 1);
}

#[tokio::test]
async fn test_update_and_delete() {
    let db = db().await;
    let saved = db.insert_accommodation(residence("Le Campus")).await.unwrap();

    let updated = db
        .update_accommodation(
            saved.id,
            AccommodationPatch {
                nb_coliving_apartments: Some(6),
                published: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.nb_coliving_apartments, Some(6));
    assert_eq!(updated.name, "Le Campus");
    assert!(updated.updated_at >= saved.updated_at);
    assert!(db.list_published_accommodations().await.unwrap().is_empty());

    db.delete_accommodation(saved.id).await.unwrap();
    assert!(matches!(
        db.get_accommodation(saved.id).await.unwrap_err(),
        Error::NotFound { .. }
    ));
    assert!(matches!(
        db.delete_accommodation(saved.id).await.unwrap_err(),
        Error::NotFound { .. }
    ));
}

#[tokio::test]
async fn test_external_source_links() {
    let db = db().await;
    let a = db.insert_accommodation(residence("A")).await.unwrap();
    let b = db.insert_accommodation(residence("B")).await.unwrap();

    let link = ExternalSource { accommodation_id: a.id, source: Source::Crous, source_id: "R-42".into() };
    db.link_external_source(&link).await.unwrap();

    let found = db.find_by_external_source(Source::Crous, "R-42").await.unwrap();
    assert_eq!(found.map(|acc| acc.id), Some(a.id));
    assert!(db.find_by_external_source(Source::Clef, "R-42").await.unwrap().is_none());

    // same source id on another listing
    let err = db
        .link_external_source(&ExternalSource { accommodation_id: b.id, ..link.clone() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    // second id from the same source on the same listing
    let err = db
        .link_external_source(&ExternalSource { source_id: "R-43".into(), ..link.clone() })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    assert_eq!(db.external_sources(a.id).await.unwrap(), vec![link]);
}

#[tokio::test]
async fn test_insert_imported_is_atomic() {
    let db = db().await;
    let saved = db
        .insert_imported(residence("Résidence Allix"), Source::Crous, "R-1")
        .await
        .unwrap();
    let found = db.find_by_external_source(Source::Crous, "R-1").await.unwrap();
    assert_eq!(found.map(|acc| acc.id), Some(saved.id));

    // taken source id: the listing row is rolled back with the link
    let err = db
        .insert_imported(residence("Résidence Gerland"), Source::Crous, "R-1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert!(db.get_accommodation_by_slug("residence-gerland").await.is_err());
    assert_eq!(db.list_published_accommodations().await.unwrap().len(), 1);
}

// ============================================================
// OWNERS
// ============================================================

#[tokio::test]
async fn test_get_or_create_owner_is_idempotent() {
    let db = db().await;
    let first = db.get_or_create_owner("Studéa", Some("https://studea.example")).await.unwrap();
    let again = db.get_or_create_owner("studea", None).await.unwrap();
    assert_eq!(first, again);
    assert_eq!(db.list_owners().await.unwrap().len(), 1);
    assert_eq!(db.get_owner_by_slug("studea").await.unwrap().id, first.id);

    assert!(matches!(
        db.get_or_create_owner(" ", None).await.unwrap_err(),
        Error::Validation(_)
    ));

    let mut new = residence("Studéa Gerland");
    new.owner_id = Some(first.id);
    db.insert_accommodation(new).await.unwrap();
    db.insert_accommodation(residence("Sans bailleur")).await.unwrap();
    assert_eq!(db.list_owner_accommodations(first.id).await.unwrap().len(), 1);
}

// ============================================================
// TERRITORIES
// ============================================================

#[tokio::test]
async fn test_load_territories_and_homonyms() {
    let db = db().await;
    let summary = db.load_territories(&territories()).await.unwrap();
    assert_eq!(summary, TerritoryLoadSummary { academies: 2, departments: 2, cities: 3 });

    let normandie = db.get_city_by_slug("saint-aubin").await.unwrap();
    let anjou = db.get_city_by_slug("saint-aubin-49").await.unwrap();
    assert_ne!(normandie.department_id, anjou.department_id);
    assert!(normandie.popular);

    let angers = db.get_city_by_slug("angers").await.unwrap();
    assert_eq!(angers.postal_codes, vec!["49000", "49100"]);
    assert!(angers.center.is_some());
    assert_eq!(angers.boundary.map(|b| b.ring.len()), Some(4));

    // reloading updates in place
    let again = db.load_territories(&territories()).await.unwrap();
    assert_eq!(again, summary);
    assert_eq!(db.list_cities(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_territory_lookups() {
    let db = db().await;
    db.load_territories(&territories()).await.unwrap();

    let academies = db.list_academies().await.unwrap();
    let names: Vec<&str> = academies.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Nantes", "Normandie"]);

    let nantes = &academies[0];
    let departments = db.list_departments(Some(nantes.id)).await.unwrap();
    assert_eq!(departments.len(), 1);
    assert_eq!(departments[0].code, "49");
    assert_eq!(db.get_department(departments[0].id).await.unwrap(), departments[0]);
    assert_eq!(db.list_cities(Some(departments[0].id)).await.unwrap().len(), 2);

    assert!(matches!(
        db.get_department_by_code("2a").await.unwrap_err(),
        Error::NotFound { .. }
    ));
    assert!(db
        .territory_exists(TerritoryRef { kind: TerritoryKind::Academy, id: nantes.id })
        .await
        .unwrap());
    assert!(!db
        .territory_exists(TerritoryRef { kind: TerritoryKind::City, id: 999 })
        .await
        .unwrap());
}

// ============================================================
// STUDENTS & ALERTS
// ============================================================

fn student(email: &str) -> NewStudent {
    NewStudent { email: email.to_string(), first_name: "Camille".into(), last_name: "Martin".into() }
}

#[tokio::test]
async fn test_students_are_unique_by_email() {
    let db = db().await;
    let created = db.create_student(student("Camille@Example.org ")).await.unwrap();
    assert_eq!(created.email, "camille@example.org");
    assert_eq!(db.get_student(created.id).await.unwrap(), created);

    assert!(matches!(
        db.create_student(student("camille@example.org")).await.unwrap_err(),
        Error::Conflict(_)
    ));
    assert!(matches!(
        db.create_student(student("not-an-email")).await.unwrap_err(),
        Error::Validation(_)
    ));
}

#[tokio::test]
async fn test_alerts_are_scoped_to_their_student() {
    let db = db().await;
    db.load_territories(&territories()).await.unwrap();
    let angers = db.get_city_by_slug("angers").await.unwrap();
    let territory = TerritoryRef { kind: TerritoryKind::City, id: angers.id };

    let camille = db.create_student(student("camille@example.org")).await.unwrap();
    let lou = db.create_student(student("lou@example.org")).await.unwrap();

    let alert = db
        .create_alert(
            camille.id,
            NewAlert {
                name: "Angers pas cher".into(),
                territory,
                is_accessible: false,
                has_coliving: false,
                price_max: Some(450),
                receive_notifications: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(alert.territory, territory);
    assert_eq!(alert.price_max, Some(450));

    let muted = db
        .create_alert(
            camille.id,
            NewAlert {
                name: "Angers coloc".into(),
                territory,
                is_accessible: false,
                has_coliving: true,
                price_max: None,
                receive_notifications: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(db.list_alerts(camille.id).await.unwrap().len(), 2);
    assert!(db.list_alerts(lou.id).await.unwrap().is_empty());
    assert_eq!(db.list_notifiable_alerts().await.unwrap(), vec![alert.clone()]);

    // another student cannot delete it
    assert!(matches!(
        db.delete_alert(lou.id, alert.id).await.unwrap_err(),
        Error::NotFound { .. }
    ));
    db.delete_alert(camille.id, alert.id).await.unwrap();
    assert_eq!(db.list_alerts(camille.id).await.unwrap(), vec![muted]);
}

#[tokio::test]
async fn test_alert_validation() {
    let db = db().await;
    let camille = db.create_student(student("camille@example.org")).await.unwrap();
    let unknown = TerritoryRef { kind: TerritoryKind::Department, id: 404 };
    let new = |name: &str| NewAlert {
        name: name.to_string(),
        territory: unknown,
        is_accessible: false,
        has_coliving: false,
        price_max: None,
        receive_notifications: true,
    };

    assert!(matches!(db.create_alert(camille.id, new("")).await.unwrap_err(), Error::Validation(_)));
    assert!(matches!(
        db.create_alert(camille.id, new("Partout")).await.unwrap_err(),
        Error::NotFound { kind: "Territory", .. }
    ));
    assert!(matches!(
        db.create_alert(999, new("Partout")).await.unwrap_err(),
        Error::NotFound { kind: "Student", .. }
    ));
}

// ============================================================
// FAQ & STATS
// ============================================================

#[tokio::test]
async fn test_question_answers_global_and_by_territory() {
    let db = db().await;
    db.load_territories(&territories()).await.unwrap();
    let academy = db.list_academies().await.unwrap().remove(0);
    let territory = TerritoryRef { kind: TerritoryKind::Academy, id: academy.id };

    for (title, order) in [("Comment candidater ?", 2), ("Qu'est-ce que le Crous ?", 1)] {
        db.create_question_answer(NewQuestionAnswer {
            title: title.into(),
            content: "…".into(),
            territory: None,
            order,
        })
        .await
        .unwrap();
    }
    db.create_question_answer(NewQuestionAnswer {
        title: "Logements à Angers".into(),
        content: "…".into(),
        territory: Some(territory),
        order: 0,
    })
    .await
    .unwrap();

    let global = db.list_question_answers(None).await.unwrap();
    let titles: Vec<&str> = global.iter().map(|q| q.title.as_str()).collect();
    assert_eq!(titles, vec!["Qu'est-ce que le Crous ?", "Comment candidater ?"]);

    let local = db.list_question_answers(Some(territory)).await.unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].territory, Some(territory));

    let err = db
        .create_question_answer(NewQuestionAnswer {
            title: " ".into(),
            content: String::new(),
            territory: None,
            order: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_stats_upsert_replaces_snapshot() {
    let db = db().await;
    let from = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
    let to = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
    let mut stats = Stats {
        period: StatsPeriod::Month,
        date_from: from,
        date_to: to,
        unique_visitors: 1200,
        visits: 1500,
        average_duration_secs: 95,
        bounce_rate: 0.42,
        page_views: 5100,
    };
    db.upsert_stats(&stats).await.unwrap();
    stats.visits = 1600;
    db.upsert_stats(&stats).await.unwrap();

    assert_eq!(db.get_stats(StatsPeriod::Month, from, to).await.unwrap(), Some(stats));
    assert_eq!(db.get_stats(StatsPeriod::Day, from, from).await.unwrap(), None);

    let events = EventStats {
        period: StatsPeriod::Month,
        date_from: from,
        date_to: to,
        events: BTreeMap::from([("alert_created".to_string(), 14), ("search".to_string(), 820)]),
    };
    db.upsert_event_stats(&events).await.unwrap();
    assert_eq!(db.get_event_stats(StatsPeriod::Month, from, to).await.unwrap(), Some(events));
}

#[tokio::test]
async fn test_migrations_are_recorded() {
    let db = db().await;
    db.migrate().await.unwrap();
    let status = db.migration_status().await.unwrap();
    assert_eq!(status.current_version, CURRENT_VERSION);
    db.health_check().await.unwrap();
}

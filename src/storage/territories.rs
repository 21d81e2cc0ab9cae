use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::info;

use super::{from_json, opt_u32, point_from_row, to_json, Database};
use crate::error::{Error, Result};
use crate::geo::{GeoPoint, Polygon};
use crate::models::{Academy, City, Department, TerritoryKind, TerritoryRef};
use crate::search::slugify;

const SELECT_CITY: &str = r#"
    SELECT id, name, slug, postal_codes, department_id, lon, lat, boundary, population, popular
    FROM cities
"#;

/// Territory referential as loaded from a JSON document:
/// academies → departments → cities
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TerritoryFile {
    pub academies: Vec<AcademyEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcademyEntry {
    pub name: String,
    #[serde(default)]
    pub departments: Vec<DepartmentEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DepartmentEntry {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub cities: Vec<CityEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CityEntry {
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub postal_codes: Vec<String>,
    pub center: Option<GeoPoint>,
    /// Outer ring as `[lon, lat]` pairs
    pub boundary: Option<Vec<[f64; 2]>>,
    pub population: Option<u32>,
    #[serde(default)]
    pub popular: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TerritoryLoadSummary {
    pub academies: usize,
    pub departments: usize,
    pub cities: usize,
}

fn department_from_row(row: &SqliteRow) -> Result<Department> {
    Ok(Department {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        academy_id: row.try_get("academy_id")?,
    })
}

fn city_from_row(row: &SqliteRow) -> Result<City> {
    let postal_codes: String = row.try_get("postal_codes")?;
    let boundary: Option<String> = row.try_get("boundary")?;

    Ok(City {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        postal_codes: from_json(&postal_codes)?,
        department_id: row.try_get("department_id")?,
        center: point_from_row(row)?,
        boundary: boundary.as_deref().map(from_json).transpose()?,
        population: opt_u32(row, "population")?,
        popular: row.try_get("popular")?,
    })
}

async fn upsert_academy(conn: &mut SqliteConnection, name: &str) -> Result<Academy> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO academies (name) VALUES (?) ON CONFLICT(name) DO UPDATE SET name = excluded.name RETURNING id",
    )
    .bind(name.trim())
    .fetch_one(conn)
    .await?;

    Ok(Academy {
        id,
        name: name.trim().to_string(),
    })
}

async fn upsert_department(
    conn: &mut SqliteConnection,
    code: &str,
    name: &str,
    academy_id: i64,
) -> Result<Department> {
    let code = code.trim().to_uppercase();
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO departments (code, name, academy_id) VALUES (?, ?, ?)
        ON CONFLICT(code) DO UPDATE SET name = excluded.name, academy_id = excluded.academy_id
        RETURNING id
        "#,
    )
    .bind(&code)
    .bind(name.trim())
    .bind(academy_id)
    .fetch_one(conn)
    .await?;

    Ok(Department {
        id,
        code,
        name: name.trim().to_string(),
        academy_id,
    })
}

async fn upsert_city(
    conn: &mut SqliteConnection,
    entry: &CityEntry,
    department: &Department,
) -> Result<City> {
    let mut slug = entry.slug.clone().unwrap_or_else(|| slugify(&entry.name));
    if slug.is_empty() {
        return Err(Error::validation("city name is empty"));
    }

    // homonyms in another department get the department code appended
    let owner: Option<i64> = sqlx::query_scalar("SELECT department_id FROM cities WHERE slug = ?")
        .bind(&slug)
        .fetch_optional(&mut *conn)
        .await?;
    if owner.is_some_and(|id| id != department.id) {
        slug = format!("{slug}-{}", department.code.to_lowercase());
    }

    let boundary = entry
        .boundary
        .as_ref()
        .map(|ring| Polygon::new(ring.iter().map(|[lon, lat]| GeoPoint { lon: *lon, lat: *lat }).collect()));

    let row = sqlx::query(
        r#"
        INSERT INTO cities (name, slug, postal_codes, department_id, lon, lat, boundary, population, popular)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(slug) DO UPDATE SET
            name = excluded.name,
            postal_codes = excluded.postal_codes,
            department_id = excluded.department_id,
            lon = excluded.lon,
            lat = excluded.lat,
            boundary = excluded.boundary,
            population = excluded.population,
            popular = excluded.popular
        RETURNING id, name, slug, postal_codes, department_id, lon, lat, boundary, population, popular
        "#,
    )
    .bind(entry.name.trim())
    .bind(&slug)
    .bind(to_json(&entry.postal_codes)?)
    .bind(department.id)
    .bind(entry.center.map(|p| p.lon))
    .bind(entry.center.map(|p| p.lat))
    .bind(boundary.as_ref().map(to_json).transpose()?)
    .bind(entry.population.map(i64::from))
    .bind(entry.popular)
    .fetch_one(conn)
    .await?;

    city_from_row(&row)
}

impl Database {
    /// Upserts the whole referential in one transaction
    pub async fn load_territories(&self, file: &TerritoryFile) -> Result<TerritoryLoadSummary> {
        let mut tx = self.pool().begin().await?;
        let mut summary = TerritoryLoadSummary::default();

        for academy_entry in &file.academies {
            let academy = upsert_academy(&mut tx, &academy_entry.name).await?;
            summary.academies += 1;

            for department_entry in &academy_entry.departments {
                let department = upsert_department(
                    &mut tx,
                    &department_entry.code,
                    &department_entry.name,
                    academy.id,
                )
                .await?;
                summary.departments += 1;

                for city_entry in &department_entry.cities {
                    upsert_city(&mut tx, city_entry, &department).await?;
                    summary.cities += 1;
                }
            }
        }

        tx.commit().await?;
        info!(
            "Loaded {} academies, {} departments, {} cities",
            summary.academies, summary.departments, summary.cities
        );
        Ok(summary)
    }

    pub async fn list_academies(&self) -> Result<Vec<Academy>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM academies ORDER BY name")
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(|(id, name)| Academy { id, name }).collect())
    }

    pub async fn get_academy(&self, id: i64) -> Result<Academy> {
        let row: Option<(i64, String)> = sqlx::query_as("SELECT id, name FROM academies WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(|(id, name)| Academy { id, name })
            .ok_or_else(|| Error::not_found("Academy", id))
    }

    /// All departments, or only those of one academy
    pub async fn list_departments(&self, academy_id: Option<i64>) -> Result<Vec<Department>> {
        let rows = match academy_id {
            Some(academy_id) => {
                sqlx::query("SELECT id, code, name, academy_id FROM departments WHERE academy_id = ? ORDER BY code")
                    .bind(academy_id)
                    .fetch_all(self.pool())
                    .await?
            }
            None => {
                sqlx::query("SELECT id, code, name, academy_id FROM departments ORDER BY code")
                    .fetch_all(self.pool())
                    .await?
            }
        };
        rows.iter().map(department_from_row).collect()
    }

    pub async fn get_department(&self, id: i64) -> Result<Department> {
        let row = sqlx::query("SELECT id, code, name, academy_id FROM departments WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| Error::not_found("Department", id))?;
        department_from_row(&row)
    }

    pub async fn get_department_by_code(&self, code: &str) -> Result<Department> {
        let code = code.trim().to_uppercase();
        let row = sqlx::query("SELECT id, code, name, academy_id FROM departments WHERE code = ?")
            .bind(&code)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| Error::not_found("Department", &code))?;
        department_from_row(&row)
    }

    /// All cities, or only those of one department
    pub async fn list_cities(&self, department_id: Option<i64>) -> Result<Vec<City>> {
        let rows = match department_id {
            Some(department_id) => {
                sqlx::query(&format!("{SELECT_CITY} WHERE department_id = ? ORDER BY name"))
                    .bind(department_id)
                    .fetch_all(self.pool())
                    .await?
            }
            None => {
                sqlx::query(&format!("{SELECT_CITY} ORDER BY name"))
                    .fetch_all(self.pool())
                    .await?
            }
        };
        rows.iter().map(city_from_row).collect()
    }

    pub async fn get_city_by_slug(&self, slug: &str) -> Result<City> {
        let row = sqlx::query(&format!("{SELECT_CITY} WHERE slug = ?"))
            .bind(slug)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| Error::not_found("City", slug))?;
        city_from_row(&row)
    }

    pub async fn territory_exists(&self, territory: TerritoryRef) -> Result<bool> {
        let table = match territory.kind {
            TerritoryKind::Academy => "academies",
            TerritoryKind::Department => "departments",
            TerritoryKind::City => "cities",
        };
        let found: Option<i64> = sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE id = ?"))
            .bind(territory.id)
            .fetch_optional(self.pool())
            .await?;
        Ok(found.is_some())
    }
}

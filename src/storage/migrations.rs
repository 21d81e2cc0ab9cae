//! Database migrations
//!
//! Versioned SQLite schema, applied in order on connection.

use sqlx::SqlitePool;

use crate::error::Result;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: territories, owners and listings
const MIGRATION_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS academies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS departments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        code TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        academy_id INTEGER NOT NULL REFERENCES academies(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_departments_academy_id ON departments(academy_id);

    CREATE TABLE IF NOT EXISTS cities (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        postal_codes TEXT NOT NULL DEFAULT '[]',
        department_id INTEGER NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
        lon REAL,
        lat REAL,
        boundary TEXT,
        population INTEGER,
        popular INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_cities_department_id ON cities(department_id);

    CREATE TABLE IF NOT EXISTS owners (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        url TEXT,
        image_url TEXT
    );

    CREATE TABLE IF NOT EXISTS accommodations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        slug TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        description TEXT,
        lon REAL,
        lat REAL,
        address TEXT NOT NULL DEFAULT '',
        city TEXT NOT NULL DEFAULT '',
        postal_code TEXT NOT NULL DEFAULT '',
        residence_type TEXT NOT NULL DEFAULT 'other',
        owner_id INTEGER REFERENCES owners(id) ON DELETE SET NULL,
        units TEXT NOT NULL DEFAULT '{}',
        nb_total_apartments INTEGER,
        nb_accessible_apartments INTEGER,
        nb_coliving_apartments INTEGER,
        amenities TEXT NOT NULL DEFAULT '{}',
        images_urls TEXT NOT NULL DEFAULT '[]',
        external_url TEXT,
        published INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_accommodations_published ON accommodations(published);
    CREATE INDEX IF NOT EXISTS idx_accommodations_postal_code ON accommodations(postal_code);
    CREATE INDEX IF NOT EXISTS idx_accommodations_owner_id ON accommodations(owner_id);

    CREATE TABLE IF NOT EXISTS external_sources (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        accommodation_id INTEGER NOT NULL REFERENCES accommodations(id) ON DELETE CASCADE,
        source TEXT NOT NULL,
        source_id TEXT NOT NULL,
        UNIQUE (source, accommodation_id),
        UNIQUE (source, source_id)
    );
"#;

/// Migration 2: students, alerts, FAQ and audience stats
const MIGRATION_V2: &str = r#"
    CREATE TABLE IF NOT EXISTS students (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL DEFAULT '',
        last_name TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS accommodation_alerts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        territory_kind TEXT NOT NULL CHECK (territory_kind IN ('academy', 'department', 'city')),
        territory_id INTEGER NOT NULL,
        is_accessible INTEGER NOT NULL DEFAULT 0,
        has_coliving INTEGER NOT NULL DEFAULT 0,
        price_max INTEGER,
        receive_notifications INTEGER NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_alerts_student_id ON accommodation_alerts(student_id);

    CREATE TABLE IF NOT EXISTS question_answers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        territory_kind TEXT CHECK (territory_kind IN ('academy', 'department', 'city')),
        territory_id INTEGER,
        position INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_question_answers_territory
        ON question_answers(territory_kind, territory_id);

    CREATE TABLE IF NOT EXISTS stats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        period TEXT NOT NULL,
        date_from TEXT NOT NULL,
        date_to TEXT NOT NULL,
        unique_visitors INTEGER NOT NULL DEFAULT 0,
        visits INTEGER NOT NULL DEFAULT 0,
        average_duration_secs INTEGER NOT NULL DEFAULT 0,
        bounce_rate REAL NOT NULL DEFAULT 0.0,
        page_views INTEGER NOT NULL DEFAULT 0,
        UNIQUE (period, date_from, date_to)
    );

    CREATE TABLE IF NOT EXISTS event_stats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        period TEXT NOT NULL,
        date_from TEXT NOT NULL,
        date_to TEXT NOT NULL,
        events TEXT NOT NULL DEFAULT '{}',
        UNIQUE (period, date_from, date_to)
    );
"#;

const MIGRATIONS: [(i32, &str, &str); 2] = [
    (1, "Territories, owners and listings", MIGRATION_V1),
    (2, "Students, alerts, FAQ and stats", MIGRATION_V2),
];

async fn get_current_version(pool: &SqlitePool) -> Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let row: (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_one(pool)
        .await?;

    Ok(row.0.unwrap_or(0))
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    for (version, label, sql) in MIGRATIONS {
        if current_version >= version {
            continue;
        }

        tracing::info!("Applying migration v{version}: {label}");
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
            .bind(version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    Ok(())
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub current_version: i32,
    pub target_version: i32,
    pub needs_migration: bool,
}

pub async fn migration_status(pool: &SqlitePool) -> Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{opt_u32, Database};
use crate::error::{map_unique, Error, Result};
use crate::models::{AccommodationAlert, NewAlert, NewStudent, Student, TerritoryRef};

const SELECT_ALERT: &str = r#"
    SELECT id, student_id, name, territory_kind, territory_id, is_accessible,
           has_coliving, price_max, receive_notifications, created_at
    FROM accommodation_alerts
"#;

fn student_from_row(row: &SqliteRow) -> Result<Student> {
    Ok(Student {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
    })
}

fn alert_from_row(row: &SqliteRow) -> Result<AccommodationAlert> {
    let kind: String = row.try_get("territory_kind")?;
    Ok(AccommodationAlert {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        name: row.try_get("name")?,
        territory: TerritoryRef {
            kind: kind.parse()?,
            id: row.try_get("territory_id")?,
        },
        is_accessible: row.try_get("is_accessible")?,
        has_coliving: row.try_get("has_coliving")?,
        price_max: opt_u32(row, "price_max")?,
        receive_notifications: row.try_get("receive_notifications")?,
        created_at: row.try_get("created_at")?,
    })
}

impl Database {
    pub async fn create_student(&self, new: NewStudent) -> Result<Student> {
        let email = new.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(Error::validation(format!("invalid email '{email}'")));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO students (email, first_name, last_name, created_at) VALUES (?, ?, ?, ?)
            RETURNING id, email, first_name, last_name
            "#,
        )
        .bind(&email)
        .bind(new.first_name.trim())
        .bind(new.last_name.trim())
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_unique(e, "Student"))?;
        student_from_row(&row)
    }

    pub async fn get_student(&self, id: i64) -> Result<Student> {
        let row = sqlx::query("SELECT id, email, first_name, last_name FROM students WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| Error::not_found("Student", id))?;
        student_from_row(&row)
    }

    pub async fn create_alert(&self, student_id: i64, new: NewAlert) -> Result<AccommodationAlert> {
        if new.name.trim().is_empty() {
            return Err(Error::validation("alert name is empty"));
        }
        self.get_student(student_id).await?;
        if !self.territory_exists(new.territory).await? {
            return Err(Error::not_found(
                "Territory",
                format!("{}:{}", new.territory.kind, new.territory.id),
            ));
        }

        let id = sqlx::query(
            r#"
            INSERT INTO accommodation_alerts (
                student_id, name, territory_kind, territory_id, is_accessible,
                has_coliving, price_max, receive_notifications, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(student_id)
        .bind(new.name.trim())
        .bind(new.territory.kind.as_str())
        .bind(new.territory.id)
        .bind(new.is_accessible)
        .bind(new.has_coliving)
        .bind(new.price_max.map(i64::from))
        .bind(new.receive_notifications)
        .bind(Utc::now())
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        let row = sqlx::query(&format!("{SELECT_ALERT} WHERE id = ?"))
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        alert_from_row(&row)
    }

    pub async fn list_alerts(&self, student_id: i64) -> Result<Vec<AccommodationAlert>> {
        self.get_student(student_id).await?;
        let rows = sqlx::query(&format!("{SELECT_ALERT} WHERE student_id = ? ORDER BY created_at, id"))
            .bind(student_id)
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(alert_from_row).collect()
    }

    /// Alerts that should be notified, across all students
    pub async fn list_notifiable_alerts(&self) -> Result<Vec<AccommodationAlert>> {
        let rows = sqlx::query(&format!("{SELECT_ALERT} WHERE receive_notifications = 1 ORDER BY id"))
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(alert_from_row).collect()
    }

    /// Deletes an alert only when it belongs to `student_id`
    pub async fn delete_alert(&self, student_id: i64, alert_id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM accommodation_alerts WHERE id = ? AND student_id = ?")
            .bind(alert_id)
            .bind(student_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("Alert", alert_id));
        }
        Ok(())
    }
}

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{from_json, to_json, Database};
use crate::error::{Error, Result};
use crate::models::{
    EventStats, NewQuestionAnswer, QuestionAnswer, Stats, StatsPeriod, TerritoryKind, TerritoryRef,
};

fn question_from_row(row: &SqliteRow) -> Result<QuestionAnswer> {
    let kind: Option<String> = row.try_get("territory_kind")?;
    let territory_id: Option<i64> = row.try_get("territory_id")?;
    let territory = match (kind, territory_id) {
        (Some(kind), Some(id)) => Some(TerritoryRef {
            kind: kind.parse::<TerritoryKind>()?,
            id,
        }),
        _ => None,
    };

    Ok(QuestionAnswer {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        territory,
        order: row.try_get("position")?,
    })
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl Database {
    pub async fn create_question_answer(&self, new: NewQuestionAnswer) -> Result<QuestionAnswer> {
        if new.title.trim().is_empty() {
            return Err(Error::validation("question title is empty"));
        }
        if let Some(territory) = new.territory {
            if !self.territory_exists(territory).await? {
                return Err(Error::not_found(
                    "Territory",
                    format!("{}:{}", territory.kind, territory.id),
                ));
            }
        }

        let row = sqlx::query(
            r#"
            INSERT INTO question_answers (title, content, territory_kind, territory_id, position)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, title, content, territory_kind, territory_id, position
            "#,
        )
        .bind(new.title.trim())
        .bind(&new.content)
        .bind(new.territory.map(|t| t.kind.as_str()))
        .bind(new.territory.map(|t| t.id))
        .bind(new.order)
        .fetch_one(self.pool())
        .await?;
        question_from_row(&row)
    }

    /// FAQ of one territory, or the global FAQ when `territory` is `None`
    pub async fn list_question_answers(
        &self,
        territory: Option<TerritoryRef>,
    ) -> Result<Vec<QuestionAnswer>> {
        let rows = match territory {
            Some(territory) => {
                sqlx::query(
                    r#"
                    SELECT id, title, content, territory_kind, territory_id, position
                    FROM question_answers
                    WHERE territory_kind = ? AND territory_id = ?
                    ORDER BY position, id
                    "#,
                )
                .bind(territory.kind.as_str())
                .bind(territory.id)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, title, content, territory_kind, territory_id, position
                    FROM question_answers
                    WHERE territory_kind IS NULL
                    ORDER BY position, id
                    "#,
                )
                .fetch_all(self.pool())
                .await?
            }
        };
        rows.iter().map(question_from_row).collect()
    }

    /// Inserts or replaces the snapshot for `(period, date_from, date_to)`
    pub async fn upsert_stats(&self, stats: &Stats) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stats (
                period, date_from, date_to, unique_visitors, visits,
                average_duration_secs, bounce_rate, page_views
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(period, date_from, date_to) DO UPDATE SET
                unique_visitors = excluded.unique_visitors,
                visits = excluded.visits,
                average_duration_secs = excluded.average_duration_secs,
                bounce_rate = excluded.bounce_rate,
                page_views = excluded.page_views
            "#,
        )
        .bind(stats.period.as_str())
        .bind(stats.date_from)
        .bind(stats.date_to)
        .bind(to_i64(stats.unique_visitors))
        .bind(to_i64(stats.visits))
        .bind(to_i64(stats.average_duration_secs))
        .bind(stats.bounce_rate)
        .bind(to_i64(stats.page_views))
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_stats(
        &self,
        period: StatsPeriod,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Option<Stats>> {
        let row = sqlx::query(
            r#"
            SELECT unique_visitors, visits, average_duration_secs, bounce_rate, page_views
            FROM stats WHERE period = ? AND date_from = ? AND date_to = ?
            "#,
        )
        .bind(period.as_str())
        .bind(date_from)
        .bind(date_to)
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| -> Result<Stats> {
            Ok(Stats {
                period,
                date_from,
                date_to,
                unique_visitors: to_u64(row.try_get("unique_visitors")?),
                visits: to_u64(row.try_get("visits")?),
                average_duration_secs: to_u64(row.try_get("average_duration_secs")?),
                bounce_rate: row.try_get("bounce_rate")?,
                page_views: to_u64(row.try_get("page_views")?),
            })
        })
        .transpose()
    }

    pub async fn upsert_event_stats(&self, stats: &EventStats) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO event_stats (period, date_from, date_to, events) VALUES (?, ?, ?, ?)
            ON CONFLICT(period, date_from, date_to) DO UPDATE SET events = excluded.events
            "#,
        )
        .bind(stats.period.as_str())
        .bind(stats.date_from)
        .bind(stats.date_to)
        .bind(to_json(&stats.events)?)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn get_event_stats(
        &self,
        period: StatsPeriod,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Option<EventStats>> {
        let events: Option<String> = sqlx::query_scalar(
            "SELECT events FROM event_stats WHERE period = ? AND date_from = ? AND date_to = ?",
        )
        .bind(period.as_str())
        .bind(date_from)
        .bind(date_to)
        .fetch_optional(self.pool())
        .await?;

        events
            .map(|raw| -> Result<EventStats> {
                Ok(EventStats {
                    period,
                    date_from,
                    date_to,
                    events: from_json(&raw)?,
                })
            })
            .transpose()
    }
}

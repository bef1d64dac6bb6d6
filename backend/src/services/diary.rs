//! Diary service: dated notes kept by each user

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::DiaryEntry;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct DiaryService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct DiaryRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    body: String,
    entry_date: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DiaryRow> for DiaryEntry {
    fn from(row: DiaryRow) -> Self {
        DiaryEntry {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            body: row.body,
            entry_date: row.entry_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const DIARY_COLUMNS: &str = "id, owner_id, title, body, entry_date, created_at, updated_at";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDiaryInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(length(max = 10000, message = "Entry must be at most 10000 characters"))]
    #[serde(default)]
    pub body: String,
    /// Defaults to today
    pub entry_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDiaryInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 10000, message = "Entry must be at most 10000 characters"))]
    pub body: Option<String>,
    pub entry_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DiaryListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DiaryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_entry(&self, owner_id: Uuid, input: CreateDiaryInput) -> AppResult<DiaryEntry> {
        input.validate()?;
        let entry_date = input.entry_date.unwrap_or_else(|| Utc::now().date_naive());

        let entry = sqlx::query_as::<_, DiaryRow>(&format!(
            r#"
            INSERT INTO diary_entries (owner_id, title, body, entry_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            DIARY_COLUMNS
        ))
        .bind(owner_id)
        .bind(input.title.trim())
        .bind(&input.body)
        .bind(entry_date)
        .fetch_one(&self.db)
        .await?;

        Ok(entry.into())
    }

    /// Entries in an optional date range, most recent first
    pub async fn list_entries(&self, owner_id: Uuid, query: DiaryListQuery) -> AppResult<Vec<DiaryEntry>> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(AppError::validation("from", "Start date must not be after end date"));
            }
        }

        let rows = sqlx::query_as::<_, DiaryRow>(&format!(
            r#"
            SELECT {} FROM diary_entries
            WHERE owner_id = $1
              AND ($2::date IS NULL OR entry_date >= $2)
              AND ($3::date IS NULL OR entry_date <= $3)
            ORDER BY entry_date DESC, created_at DESC
            "#,
            DIARY_COLUMNS
        ))
        .bind(owner_id)
        .bind(query.from)
        .bind(query.to)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(DiaryEntry::from).collect())
    }

    pub async fn get_entry(&self, owner_id: Uuid, entry_id: Uuid) -> AppResult<DiaryEntry> {
        sqlx::query_as::<_, DiaryRow>(&format!(
            "SELECT {} FROM diary_entries WHERE id = $1 AND owner_id = $2",
            DIARY_COLUMNS
        ))
        .bind(entry_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .map(DiaryEntry::from)
        .ok_or_else(|| AppError::NotFound("Diary entry".to_string()))
    }

    pub async fn update_entry(
        &self,
        owner_id: Uuid,
        entry_id: Uuid,
        input: UpdateDiaryInput,
    ) -> AppResult<DiaryEntry> {
        input.validate()?;

        sqlx::query_as::<_, DiaryRow>(&format!(
            r#"
            UPDATE diary_entries SET
                title = COALESCE($3, title),
                body = COALESCE($4, body),
                entry_date = COALESCE($5, entry_date),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            DIARY_COLUMNS
        ))
        .bind(entry_id)
        .bind(owner_id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(&input.body)
        .bind(input.entry_date)
        .fetch_optional(&self.db)
        .await?
        .map(DiaryEntry::from)
        .ok_or_else(|| AppError::NotFound("Diary entry".to_string()))
    }

    pub async fn delete_entry(&self, owner_id: Uuid, entry_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM diary_entries WHERE id = $1 AND owner_id = $2")
            .bind(entry_id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Diary entry".to_string()));
        }
        Ok(())
    }
}

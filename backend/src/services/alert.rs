//! Alert service: generated and event-driven notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Alert, AlertRequest, EventAlert, GeneratedAlert, PaginatedResponse, Pagination};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::TextGenerationClient;

/// Alert service
#[derive(Clone)]
pub struct AlertService {
    db: PgPool,
    generator: Option<TextGenerationClient>,
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    user_id: Uuid,
    event_type: String,
    title: String,
    message: String,
    priority: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl AlertRow {
    fn into_model(self) -> AppResult<Alert> {
        Ok(Alert {
            id: self.id,
            user_id: self.user_id,
            event_type: self.event_type,
            title: self.title,
            message: self.message,
            priority: self.priority.parse()?,
            is_read: self.is_read,
            created_at: self.created_at,
        })
    }
}

const ALERT_COLUMNS: &str = "id, user_id, event_type, title, message, priority, is_read, created_at";

/// Listing filters
#[derive(Debug, Deserialize, Default)]
pub struct AlertListQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Alerts plus the unread badge count
#[derive(Debug, Serialize)]
pub struct AlertList {
    #[serde(flatten)]
    pub alerts: PaginatedResponse<Alert>,
    pub unread_count: i64,
}

impl AlertService {
    /// Create a new AlertService instance
    pub fn new(db: PgPool, generator: Option<TextGenerationClient>) -> Self {
        Self { db, generator }
    }

    /// Write alert copy, preferring the external generator and falling back
    /// to the local template when it is absent or fails
    pub async fn compose(&self, request: &AlertRequest) -> GeneratedAlert {
        let Some(generator) = &self.generator else {
            return request.fallback();
        };

        match generator.generate_alert(request).await {
            Ok(alert) => alert,
            Err(e) => {
                tracing::warn!(event_type = %request.event_type, error = %e, "alert generation failed, using template");
                request.fallback()
            }
        }
    }

    /// Generate an alert for the caller and store it
    pub async fn generate_alert(&self, user_id: Uuid, request: AlertRequest) -> AppResult<Alert> {
        if request.event_type.trim().is_empty() {
            return Err(AppError::validation("event_type", "Event type is required"));
        }
        if request.details.trim().is_empty() {
            return Err(AppError::validation("details", "Details are required"));
        }

        let generated = self.compose(&request).await;
        Self::insert(&self.db, user_id, request.event_type.trim(), &generated).await
    }

    /// Store an event alert. Runs on whatever executor the caller is using so
    /// the alert commits with the event that raised it.
    pub async fn record<'e, E>(executor: E, user_id: Uuid, event: &EventAlert) -> AppResult<Alert>
    where
        E: PgExecutor<'e>,
    {
        let generated = event.render();
        let alert = Self::insert(executor, user_id, event.event_type(), &generated).await?;
        tracing::debug!(user_id = %user_id, event_type = event.event_type(), "event alert raised");
        Ok(alert)
    }

    async fn insert<'e, E>(
        executor: E,
        user_id: Uuid,
        event_type: &str,
        alert: &GeneratedAlert,
    ) -> AppResult<Alert>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            INSERT INTO alerts (user_id, event_type, title, message, priority)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            ALERT_COLUMNS
        ))
        .bind(user_id)
        .bind(event_type)
        .bind(&alert.title)
        .bind(&alert.message)
        .bind(alert.priority.as_str())
        .fetch_one(executor)
        .await?
        .into_model()
    }

    /// List the caller's alerts, newest first
    pub async fn list_alerts(&self, user_id: Uuid, query: AlertListQuery) -> AppResult<AlertList> {
        let pagination = Pagination::from_query(query.page, query.per_page);

        let (total, unread_count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE NOT $2 OR NOT is_read),
                   COUNT(*) FILTER (WHERE NOT is_read)
            FROM alerts WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(query.unread_only)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            SELECT {} FROM alerts
            WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            ALERT_COLUMNS
        ))
        .bind(user_id)
        .bind(query.unread_only)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(AlertRow::into_model)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(AlertList {
            alerts: PaginatedResponse::new(data, &pagination, total.max(0) as u64),
            unread_count,
        })
    }

    /// Mark one of the caller's alerts as read
    pub async fn mark_read(&self, user_id: Uuid, alert_id: Uuid) -> AppResult<Alert> {
        sqlx::query_as::<_, AlertRow>(&format!(
            "UPDATE alerts SET is_read = TRUE WHERE id = $1 AND user_id = $2 RETURNING {}",
            ALERT_COLUMNS
        ))
        .bind(alert_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert".to_string()))?
        .into_model()
    }

    /// Mark every alert of the caller as read, returning how many changed
    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("UPDATE alerts SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::AlertPriority;

    fn service() -> AlertService {
        let pool = PgPool::connect_lazy("postgres://localhost/tradeflow_test").unwrap();
        AlertService::new(pool, None)
    }

    #[tokio::test]
    async fn compose_without_generator_uses_template() {
        let request = AlertRequest {
            event_type: "low_stock".to_string(),
            details: "Maize stock is down to 20 kg".to_string(),
            user_behavior: "checks stock daily".to_string(),
            urgency: "urgent".to_string(),
        };
        let alert = service().compose(&request).await;
        assert_eq!(alert.title, "Low stock");
        assert_eq!(alert.message, "Maize stock is down to 20 kg");
        assert_eq!(alert.priority, AlertPriority::High);
    }

    #[tokio::test]
    async fn generate_rejects_blank_event_type() {
        let request = AlertRequest {
            event_type: "  ".to_string(),
            details: "x".to_string(),
            user_behavior: String::new(),
            urgency: String::new(),
        };
        let err = service()
            .generate_alert(Uuid::new_v4(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}

//! PostgreSQL-backed notification store.
//!
//! State transitions rely on a conditional `UPDATE ... WHERE status IN
//! ('draft','scheduled')` so the draft/scheduled → sent/cancelled edges are
//! compare-and-set at the database, surviving concurrent callers and service
//! restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::store::NotificationStore;
use super::types::{
    CreateNotificationRequest, ListFilter, Notification, NotificationPage, NotificationStatus,
    NotificationType, Page, StoreError, StoreResult, TargetAudience,
};

const COLUMNS: &str = "id, title, content, kind, target_audience, target_ids, status, \
                       sent_count, scheduled_for, created_by, created_at, sent_at";

pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table and indexes if they do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                kind TEXT NOT NULL,
                target_audience TEXT NOT NULL,
                target_ids JSONB,
                status TEXT NOT NULL,
                sent_count BIGINT NOT NULL DEFAULT 0,
                scheduled_for TIMESTAMPTZ,
                created_by TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                sent_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS notifications_status_idx ON notifications (status)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS notifications_kind_idx ON notifications (kind)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS notifications_scheduled_idx \
             ON notifications (scheduled_for) WHERE status = 'scheduled'",
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Notification store schema ready");
        Ok(())
    }

    /// Resolve the outcome of a conditional transition. A missing row means
    /// either an unknown id or a terminal status; tell them apart here.
    async fn finish_transition(
        &self,
        id: Uuid,
        row: Option<PgRow>,
    ) -> StoreResult<Notification> {
        match row {
            Some(row) => decode_row(&row),
            None => {
                let status: Option<String> =
                    sqlx::query_scalar("SELECT status FROM notifications WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;

                match status {
                    Some(status) => Err(StoreError::InvalidState {
                        id,
                        status: NotificationStatus::parse(&status)
                            .ok_or_else(|| corrupt("status", &status))?,
                    }),
                    None => Err(StoreError::NotFound(id)),
                }
            }
        }
    }
}

fn corrupt(column: &str, value: &str) -> StoreError {
    StoreError::Database(sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unknown value {:?}", value).into(),
    })
}

fn decode_row(row: &PgRow) -> StoreResult<Notification> {
    let kind: String = row.try_get("kind")?;
    let target_audience: String = row.try_get("target_audience")?;
    let status: String = row.try_get("status")?;
    let target_ids: Option<serde_json::Value> = row.try_get("target_ids")?;
    let sent_count: i64 = row.try_get("sent_count")?;

    let target_ids = match target_ids {
        Some(value) => Some(
            serde_json::from_value::<Vec<String>>(value)
                .map_err(|e| corrupt("target_ids", &e.to_string()))?,
        ),
        None => None,
    };

    Ok(Notification {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        kind: NotificationType::parse(&kind).ok_or_else(|| corrupt("kind", &kind))?,
        target_audience: TargetAudience::parse(&target_audience)
            .ok_or_else(|| corrupt("target_audience", &target_audience))?,
        target_ids,
        status: NotificationStatus::parse(&status).ok_or_else(|| corrupt("status", &status))?,
        sent_count: sent_count.max(0) as u64,
        scheduled_for: row.try_get("scheduled_for")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        sent_at: row.try_get("sent_at")?,
    })
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn create(
        &self,
        request: CreateNotificationRequest,
        created_by: &str,
    ) -> StoreResult<Notification> {
        let notification = Notification::from_request(request, created_by)?;

        let target_ids = notification
            .target_ids
            .as_ref()
            .map(|ids| serde_json::json!(ids));

        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, title, content, kind, target_audience, target_ids, status,
                 sent_count, scheduled_for, created_by, created_at, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(notification.id)
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(notification.kind.as_str())
        .bind(notification.target_audience.as_str())
        .bind(target_ids)
        .bind(notification.status.as_str())
        .bind(notification.sent_count as i64)
        .bind(notification.scheduled_for)
        .bind(&notification.created_by)
        .bind(notification.created_at)
        .bind(notification.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Notification> {
        let sql = format!("SELECT {} FROM notifications WHERE id = $1", COLUMNS);

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        decode_row(&row)
    }

    async fn list(&self, filter: &ListFilter, page: &Page) -> StoreResult<NotificationPage> {
        let kind = filter.kind.map(|k| k.as_str());
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications \
             WHERE ($1::text IS NULL OR kind = $1) AND ($2::text IS NULL OR status = $2)",
        )
        .bind(kind)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {} FROM notifications \
             WHERE ($1::text IS NULL OR kind = $1) AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
            COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(kind)
            .bind(status)
            .bind(page.limit as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(decode_row)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(NotificationPage {
            items,
            total: total.max(0) as u64,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }

    async fn mark_sent(&self, id: Uuid, sent_count: u64) -> StoreResult<Notification> {
        let sql = format!(
            "UPDATE notifications SET status = 'sent', sent_count = $2, sent_at = NOW() \
             WHERE id = $1 AND status IN ('draft', 'scheduled') RETURNING {}",
            COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(sent_count as i64)
            .fetch_optional(&self.pool)
            .await?;

        self.finish_transition(id, row).await
    }

    async fn schedule(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Notification> {
        let sql = format!(
            "UPDATE notifications SET status = 'scheduled', scheduled_for = $2 \
             WHERE id = $1 AND status IN ('draft', 'scheduled') RETURNING {}",
            COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;

        self.finish_transition(id, row).await
    }

    async fn cancel(&self, id: Uuid) -> StoreResult<Notification> {
        let sql = format!(
            "UPDATE notifications SET status = 'cancelled' \
             WHERE id = $1 AND status IN ('draft', 'scheduled') RETURNING {}",
            COLUMNS
        );

        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        self.finish_transition(id, row).await
    }

    async fn due_scheduled(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications \
             WHERE status = 'scheduled' AND scheduled_for <= $1 \
             ORDER BY scheduled_for ASC LIMIT $2",
            COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(now)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(decode_row).collect()
    }

    async fn count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

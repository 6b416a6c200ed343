//! PostgreSQL-backed task store for the `tasks` table.
//!
//! Kind and status are stored as their wire strings (`TEXT_TO_IMAGE`,
//! `PENDING`, ...); the table's CHECK constraints mirror the
//! result/error invariants so a bad write fails loudly.

use aigc_core::state_machine::TaskStatus;
use aigc_core::task::{NewTask, StoredTask, Task, TaskKind};
use aigc_core::types::{DbId, Timestamp};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::error::StoreError;
use crate::store::TaskStore;

/// Column list for `tasks` queries.
const COLUMNS: &str = "\
    id, owner_id, kind, prompt, input_asset, provider, \
    status, result_asset, error_detail, created_at, updated_at";

/// A raw row from the `tasks` table.
#[derive(Debug, Clone, FromRow)]
struct TaskRow {
    id: DbId,
    owner_id: String,
    kind: String,
    prompt: Option<String>,
    input_asset: Option<String>,
    provider: Option<String>,
    status: String,
    result_asset: Option<String>,
    error_detail: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let kind: TaskKind = row.kind.parse()?;
        let status: TaskStatus = row.status.parse()?;
        let task = Task::from_stored(StoredTask {
            id: row.id,
            owner_id: row.owner_id,
            kind,
            prompt: row.prompt,
            input_asset: row.input_asset,
            provider: row.provider,
            status,
            result_asset: row.result_asset,
            error_detail: row.error_detail,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })?;
        Ok(task)
    }
}

/// Task store over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_tasks(rows: Vec<TaskRow>) -> Result<Vec<Task>, StoreError> {
    rows.into_iter().map(Task::try_from).collect()
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn insert(&self, new: &NewTask) -> Result<Task, StoreError> {
        let query = format!(
            "INSERT INTO tasks (owner_id, kind, prompt, input_asset, provider, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, TaskRow>(&query)
            .bind(&new.owner_id)
            .bind(new.kind.as_str())
            .bind(&new.prompt)
            .bind(&new.input_asset)
            .bind(&new.provider)
            .bind(TaskStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await?;
        Task::try_from(row)
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        // Kind, owner and inputs are immutable; only lifecycle columns move.
        let result = sqlx::query(
            "UPDATE tasks \
             SET status = $2, result_asset = $3, error_detail = $4, updated_at = $5 \
             WHERE id = $1",
        )
        .bind(task.id())
        .bind(task.status().as_str())
        .bind(task.result_asset())
        .bind(task.error_detail())
        .bind(task.updated_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(task.id()));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Task>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Task::try_from)
            .transpose()
    }

    async fn find_by_owner(
        &self,
        owner_id: &str,
        kind: Option<TaskKind>,
    ) -> Result<Vec<Task>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks \
             WHERE owner_id = $1 AND ($2::TEXT IS NULL OR kind = $2) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, TaskRow>(&query)
            .bind(owner_id)
            .bind(kind.map(TaskKind::as_str))
            .fetch_all(&self.pool)
            .await?;
        into_tasks(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn row(kind: &str, status: &str, result: Option<&str>, error: Option<&str>) -> TaskRow {
        let now = Utc::now();
        TaskRow {
            id: 3,
            owner_id: "u1".to_string(),
            kind: kind.to_string(),
            prompt: Some("a red fox".to_string()),
            input_asset: None,
            provider: Some("tencent".to_string()),
            status: status.to_string(),
            result_asset: result.map(str::to_string),
            error_detail: error.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_task() {
        let task = Task::try_from(row("TEXT_TO_IMAGE", "COMPLETED", Some("x"), None)).unwrap();
        assert_eq!(task.id(), 3);
        assert_eq!(task.kind(), TaskKind::TextToImage);
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.provider(), Some("tencent"));
    }

    #[test]
    fn unknown_kind_in_row_is_corrupt() {
        assert_matches!(
            Task::try_from(row("UPSCALE", "PENDING", None, None)),
            Err(StoreError::Corrupt(_))
        );
    }

    #[test]
    fn inconsistent_row_is_corrupt() {
        assert_matches!(
            Task::try_from(row("FACE_SWAP", "FAILED", None, None)),
            Err(StoreError::Corrupt(_))
        );
    }

    #[test]
    fn column_list_matches_row_fields() {
        let columns: Vec<_> = COLUMNS.split(',').map(str::trim).collect();
        assert_eq!(columns.len(), 11);
        assert_eq!(columns.first(), Some(&"id"));
        assert_eq!(columns.last(), Some(&"updated_at"));
    }
}

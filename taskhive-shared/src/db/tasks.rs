/// Task model and database operations
///
/// Tasks are the user-facing records TaskHive manages. Every query is scoped
/// to the owning user: a task id from another account behaves exactly like a
/// missing row.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
///
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     owner_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'pending',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskhive_shared::db::tasks::{CreateTask, Task, TaskStatus};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, owner_id: i64) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, owner_id, CreateTask {
///     title: "Write onboarding doc".to_string(),
///     description: None,
///     status: None,
/// }).await?;
///
/// let mine = Task::list(&pool, owner_id).await?;
/// assert!(mine.iter().any(|t| t.id == task.id));
/// # Ok(())
/// # }
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Task progress state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet
    Pending,

    /// Being worked on
    InProgress,

    /// Done
    Completed,
}

impl TaskStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: i64,

    /// Owning user
    pub owner_id: i64,

    /// Short title
    pub title: String,

    /// Optional longer description
    pub description: Option<String>,

    /// Progress state
    pub status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Initial status (defaults to pending)
    pub status: Option<TaskStatus>,
}

/// Input for a full task replacement (PUT semantics)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceTask {
    /// New title
    pub title: String,

    /// New description (None clears it)
    pub description: Option<String>,

    /// New status
    pub status: TaskStatus,
}

/// Input for a partial task update (PATCH semantics)
///
/// Only non-None fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchTask {
    /// New title
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New status
    pub status: Option<TaskStatus>,
}

const TASK_COLUMNS: &str = "id, owner_id, title, description, status, created_at, updated_at";

impl Task {
    /// Lists all tasks owned by a user, newest first
    pub async fn list(pool: &PgPool, owner_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    /// Finds one of a user's tasks by id
    ///
    /// Returns None when the task does not exist or belongs to someone else.
    pub async fn find(pool: &PgPool, owner_id: i64, task_id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = $1 AND id = $2"
        ))
        .bind(owner_id)
        .bind(task_id)
        .fetch_optional(pool)
        .await
    }

    /// Creates a new task for a user
    pub async fn create(
        pool: &PgPool,
        owner_id: i64,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (owner_id, title, description, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status.unwrap_or(TaskStatus::Pending))
        .fetch_one(pool)
        .await
    }

    /// Replaces every mutable field of a user's task (PUT semantics)
    ///
    /// Returns None when the task does not exist or belongs to someone else.
    pub async fn replace(
        pool: &PgPool,
        owner_id: i64,
        task_id: i64,
        data: ReplaceTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = $3, description = $4, status = $5, updated_at = NOW()
            WHERE owner_id = $1 AND id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(task_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .fetch_optional(pool)
        .await
    }

    /// Updates only the provided fields of a user's task (PATCH semantics)
    ///
    /// Returns None when the task does not exist or belongs to someone else.
    pub async fn patch(
        pool: &PgPool,
        owner_id: i64,
        task_id: i64,
        data: PatchTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build the SET clause from the present fields
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE owner_id = $1 AND id = $2 RETURNING {TASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(owner_id).bind(task_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes one of a user's tasks
    ///
    /// Returns true if a row was deleted, false when the task does not exist
    /// or belongs to someone else.
    pub async fn delete(pool: &PgPool, owner_id: i64, task_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE owner_id = $1 AND id = $2")
            .bind(owner_id)
            .bind(task_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

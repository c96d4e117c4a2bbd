//! Activity notifications
//!
//! Fire-and-forget audit events for cart, coupon and order changes. Recording
//! failures are logged and swallowed, never surfaced to the caller.

use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{query, types::Json};
use thiserror::Error;
use tracing::{info, warn};

use crate::database::Db;

const INSERT_ACTIVITY_SQL: &str = include_str!("sql/insert_activity.sql");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityModule {
    Carts,
    Coupons,
    Orders,
}

impl ActivityModule {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Carts => "CARTS",
            Self::Coupons => "COUPONS",
            Self::Orders => "ORDERS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    Success,
}

impl ActivityStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
        }
    }
}

/// One audit event.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub module: ActivityModule,
    pub event: &'static str,
    pub description: String,
    pub status: ActivityStatus,
    pub context: Map<String, Value>,
}

impl Activity {
    /// A successful event with an empty context.
    #[must_use]
    pub fn success(module: ActivityModule, event: &'static str, description: impl Into<String>) -> Self {
        Self {
            module,
            event,
            description: description.into(),
            status: ActivityStatus::Success,
            context: Map::new(),
        }
    }

    /// Add a context entry; values that fail to serialise are stored as null.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        self.context.insert(
            key.to_string(),
            serde_json::to_value(value).unwrap_or(Value::Null),
        );
        self
    }
}

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("failed to store activity")]
    Sql(#[from] sqlx::Error),
}

#[automock]
#[async_trait]
pub trait ActivityRecorder: Send + Sync {
    /// Record a single event.
    async fn record(&self, activity: Activity) -> Result<(), ActivityError>;
}

/// Record `activity`, logging and discarding any failure.
pub async fn record_activity(recorder: &dyn ActivityRecorder, activity: Activity) {
    let module = activity.module.as_str();
    let event = activity.event;

    if let Err(error) = recorder.record(activity).await {
        warn!(module, event, error = %error, "failed to record activity");
    }
}

/// Emits activities as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivityRecorder;

#[async_trait]
impl ActivityRecorder for TracingActivityRecorder {
    async fn record(&self, activity: Activity) -> Result<(), ActivityError> {
        let context = Value::Object(activity.context);

        info!(
            module = activity.module.as_str(),
            event = activity.event,
            status = activity.status.as_str(),
            context = %context,
            "{}",
            activity.description
        );

        Ok(())
    }
}

/// Stores activities in the `activity_log` table.
#[derive(Debug, Clone)]
pub struct PgActivityRecorder {
    db: Db,
}

impl PgActivityRecorder {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivityRecorder for PgActivityRecorder {
    async fn record(&self, activity: Activity) -> Result<(), ActivityError> {
        query(INSERT_ACTIVITY_SQL)
            .bind(activity.module.as_str())
            .bind(activity.event)
            .bind(activity.description)
            .bind(activity.status.as_str())
            .bind(Json(activity.context))
            .execute(self.db.pool())
            .await?;

        Ok(())
    }
}

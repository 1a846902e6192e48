use crate::{entry::AuditEntry, error::AuditResult};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Storage backend for audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> AuditResult<()>;
}

/// PostgreSQL-backed audit sink writing to the `audit_logs` table
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn record(&self, entry: &AuditEntry) -> AuditResult<()> {
        debug!("Writing audit entry: {} ({})", entry.action, entry.module);

        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, user_id, action, module, details,
                ip_address, user_agent, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(&entry.action)
        .bind(&entry.module)
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// In-memory audit sink for testing and development
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: &AuditEntry) -> AuditResult<()> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
        Ok(())
    }
}

/// Fire-and-forget audit logger
///
/// Sink failures are downgraded to a `warn` log line; the triggering
/// operation must never fail because the trail could not be written.
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub async fn log(&self, entry: AuditEntry) {
        if let Err(e) = self.sink.record(&entry).await {
            warn!(
                action = %entry.action,
                module = %entry.module,
                "Failed to record audit entry: {}",
                e
            );
        }
    }
}

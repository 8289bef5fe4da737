//! Report Archive
//!
//! SQLite persistence for suite reports. The full report is stored as a JSON
//! payload; a few hot columns are broken out for indexed queries. Access
//! goes through an r2d2 connection pool so concurrent readers never contend
//! on a single handle.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::debug;

use crate::types::{PatrolError, Result, SuiteReport};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS reports (
    id              TEXT PRIMARY KEY,
    suite_id        TEXT NOT NULL,
    trigger_name    TEXT NOT NULL,
    timestamp       TEXT NOT NULL,
    quality         INTEGER NOT NULL,
    security        INTEGER NOT NULL,
    success_rate    REAL NOT NULL,
    critical_errors INTEGER NOT NULL,
    payload         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_reports_suite ON reports(suite_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_reports_timestamp ON reports(timestamp);
";

/// Pooled SQLite archive of suite reports
pub struct ReportArchive {
    pool: Pool<SqliteConnectionManager>,
}

impl ReportArchive {
    /// Open (or create) an archive at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
        });
        Self::from_manager(manager)
    }

    /// A private in-memory archive, mostly for tests
    pub fn in_memory() -> Result<Self> {
        Self::from_manager(SqliteConnectionManager::memory())
    }

    fn from_manager(manager: SqliteConnectionManager) -> Result<Self> {
        // One connection keeps an in-memory database coherent and is plenty
        // for the write-rarely access pattern.
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| PatrolError::Archive(format!("pool init: {}", e)))?;
        let archive = Self { pool };
        archive.conn()?.execute_batch(SCHEMA)?;
        Ok(archive)
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| PatrolError::Archive(format!("connection checkout: {}", e)))
    }

    /// Persist one report. Saving the same report id again replaces it.
    pub fn save(&self, report: &SuiteReport) -> Result<()> {
        let payload = serde_json::to_string(report)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO reports
             (id, suite_id, trigger_name, timestamp, quality, security,
              success_rate, critical_errors, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                report.id.to_string(),
                report.suite_id,
                report.trigger,
                report.timestamp.to_rfc3339(),
                report.scores.quality,
                report.scores.security,
                report.summary.success_rate,
                report.summary.critical_errors,
                payload,
            ],
        )?;
        debug!(suite = %report.suite_id, report = %report.id, "Report archived");
        Ok(())
    }

    /// The most recent reports across all suites, newest first
    pub fn load_recent(&self, limit: usize) -> Result<Vec<SuiteReport>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT payload FROM reports ORDER BY timestamp DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![limit as i64], |row| row.get::<_, String>(0))?;
        collect_payloads(rows)
    }

    /// The most recent reports for one suite, newest first
    pub fn load_suite(&self, suite_id: &str, limit: usize) -> Result<Vec<SuiteReport>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT payload FROM reports WHERE suite_id = ?1
             ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![suite_id, limit as i64], |row| {
            row.get::<_, String>(0)
        })?;
        collect_payloads(rows)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Drop everything but the newest `keep` reports
    pub fn prune_to(&self, keep: usize) -> Result<usize> {
        let removed = self.conn()?.execute(
            "DELETE FROM reports WHERE id NOT IN
             (SELECT id FROM reports ORDER BY timestamp DESC LIMIT ?1)",
            params![keep as i64],
        )?;
        Ok(removed)
    }
}

fn collect_payloads(
    rows: impl Iterator<Item = rusqlite::Result<String>>,
) -> Result<Vec<SuiteReport>> {
    let mut reports = Vec::new();
    for payload in rows {
        let payload = payload?;
        reports.push(serde_json::from_str(&payload)?);
    }
    Ok(reports)
}

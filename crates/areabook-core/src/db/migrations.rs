//! Schema migrations for the document table

use libsql::Connection;

use crate::error::Result;

/// One schema step: the version it produces and the statements that get there.
struct Step {
    version: i32,
    statements: &'static [&'static str],
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        statements: &[
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )",
        ],
    },
    Step {
        version: 2,
        statements: &[
            "ALTER TABLE documents ADD COLUMN written_at INTEGER NOT NULL DEFAULT 0",
        ],
    },
];

/// Apply every step newer than the recorded schema version.
pub async fn run(conn: &Connection) -> Result<()> {
    let applied = schema_version(conn).await?;

    for step in STEPS.iter().filter(|step| step.version > applied) {
        apply(conn, step).await?;
        tracing::info!(version = step.version, "document schema migrated");
    }
    Ok(())
}

async fn schema_version(conn: &Connection) -> Result<i32> {
    let mut tables = conn
        .query(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            (),
        )
        .await?;
    let has_table = match tables.next().await? {
        Some(row) => row.get::<i64>(0)? > 0,
        None => false,
    };
    if !has_table {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    Ok(match rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    })
}

/// Runs a step and its version bump atomically.
async fn apply(conn: &Connection, step: &Step) -> Result<()> {
    let tx = conn.transaction().await?;
    for statement in step.statements {
        tx.execute(statement, ()).await?;
    }
    tx.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [i64::from(step.version)],
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

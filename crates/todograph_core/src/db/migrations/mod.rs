//! Ordered schema steps for the todo store.
//!
//! Steps run inside one transaction; the version bump commits with the DDL.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[Step {
    version: 1,
    name: "todos_and_dependencies",
    sql: include_str!("0001_init.sql"),
}];

/// Tables every migrated connection must expose.
const REQUIRED_TABLES: &[&str] = &["todos", "todo_dependencies"];

pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Brings `conn` to [`latest_version`] and returns how many steps ran.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let found = current_user_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::UnsupportedSchemaVersion { found, supported });
    }

    let pending: Vec<&Step> = STEPS.iter().filter(|step| step.version > found).collect();
    if !pending.is_empty() {
        let tx = conn.transaction()?;
        for step in &pending {
            tx.execute_batch(step.sql)?;
            tx.pragma_update(None, "user_version", step.version)?;
            info!(
                "event=db_migrate module=db status=ok version={} name={}",
                step.version, step.name
            );
        }
        tx.commit()?;
    }

    verify_tables(conn)?;
    Ok(pending.len())
}

pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

fn verify_tables(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
    )?;
    for &table in REQUIRED_TABLES {
        let present: bool = stmt.query_row([table], |row| row.get(0))?;
        if !present {
            return Err(DbError::MissingTable {
                table,
                version: current_user_version(conn)?,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, current_user_version, latest_version};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn fresh_connection_runs_every_step_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply_migrations(&mut conn).unwrap(), 1);
        assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
        assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn recorded_version_without_tables_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 1;").unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            DbError::MissingTable {
                table: "todos",
                version: 1
            }
        ));
    }
}

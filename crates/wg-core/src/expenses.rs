//! Read side of the append-only expense log.

use crate::model::Expense;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, params};

fn row_to_expense(row: &rusqlite::Row<'_>) -> rusqlite::Result<Expense> {
    let spent_on: String = row.get(4)?;
    let date = NaiveDate::parse_from_str(&spent_on, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Expense {
        id: row.get(0)?,
        payer: row.get(1)?,
        amount: row.get(2)?,
        description: row.get(3)?,
        date,
        participants: row.get(5)?,
    })
}

/// Newest expenses first (date, then insertion order). `None` lists all.
///
/// # Errors
///
/// Returns an error if the query fails or a stored date is malformed.
pub fn list_recent(conn: &Connection, limit: Option<usize>) -> Result<Vec<Expense>> {
    // SQLite treats a negative LIMIT as "no limit".
    let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
    let mut stmt = conn
        .prepare(
            "SELECT id, payer, amount, description, spent_on, participants
             FROM expenses
             ORDER BY spent_on DESC, id DESC
             LIMIT ?1",
        )
        .context("prepare expense log query")?;
    let rows = stmt
        .query_map(params![limit], row_to_expense)
        .context("execute expense log query")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("read expense rows")
}

/// The full log, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_all(conn: &Connection) -> Result<Vec<Expense>> {
    list_recent(conn, None)
}

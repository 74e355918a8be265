//! Pairwise debt ledger.
//!
//! Debts are stored as directed edges `debtor -> creditor`. Every mutation
//! keeps the table sparse and netted: for any two people there is at most one
//! edge between them, in one direction, with an amount above [`EPSILON`].
//!
//! Mutations open with `BEGIN IMMEDIATE` so the reverse-edge read and the
//! following writes happen under the database write lock.

use crate::error::ErrorCode;
use crate::model::{DebtEdge, EPSILON, Expense, NewExpense};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("amount must be positive")]
    InvalidAmount,

    #[error("nobody to split the expense with")]
    EmptyParticipants,

    #[error("unknown person '{0}'")]
    UnknownPerson(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl LedgerError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidAmount => ErrorCode::InvalidAmount,
            Self::EmptyParticipants => ErrorCode::EmptyParticipants,
            Self::UnknownPerson(_) => ErrorCode::PersonNotFound,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }
}

/// Who one person owes, who owes them, and the difference.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersonBalance {
    /// creditor -> amount this person owes them.
    pub owes: BTreeMap<String, f64>,
    /// debtor -> amount they owe this person.
    pub owed_by: BTreeMap<String, f64>,
    /// Owed to this person minus owed by this person.
    pub net: f64,
}

/// Record an expense and split it evenly.
///
/// `participants` of `None` means everyone on the roster. The payer is always
/// part of the split, added when missing. The expense row and all edge updates
/// commit together or not at all.
///
/// # Errors
///
/// Validation errors are returned before anything is written. Storage errors
/// roll the transaction back.
pub fn record_expense(
    conn: &mut Connection,
    expense: &NewExpense,
    participants: Option<&[String]>,
) -> Result<Expense, LedgerError> {
    if !expense.amount.is_finite() || expense.amount <= 0.0 {
        return Err(LedgerError::InvalidAmount);
    }

    let result = record_expense_tx(conn, expense, participants);
    if let Err(LedgerError::Storage(e)) = &result {
        // Amounts and descriptions stay out of the log.
        tracing::error!(op = "record_expense", error = %e, "ledger write rolled back");
    }
    result
}

fn record_expense_tx(
    conn: &mut Connection,
    expense: &NewExpense,
    participants: Option<&[String]>,
) -> Result<Expense, LedgerError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let roster = roster_in(&tx)?;
    if roster.is_empty() {
        return Err(LedgerError::EmptyParticipants);
    }
    let payer = expense.payer.trim();
    if !roster.iter().any(|n| n == payer) {
        return Err(LedgerError::UnknownPerson(payer.to_string()));
    }

    let mut split: Vec<String> = Vec::new();
    for name in participants.map_or(roster.as_slice(), |p| p) {
        let name = name.trim();
        if !roster.iter().any(|n| n == name) {
            return Err(LedgerError::UnknownPerson(name.to_string()));
        }
        if !split.iter().any(|n| n == name) {
            split.push(name.to_string());
        }
    }
    if split.is_empty() {
        return Err(LedgerError::EmptyParticipants);
    }
    if !split.iter().any(|n| n == payer) {
        split.push(payer.to_string());
    }

    let count = u32::try_from(split.len()).unwrap_or(u32::MAX);
    let share = expense.amount / f64::from(count);

    for person in split.iter().filter(|p| p.as_str() != payer) {
        apply_share(&tx, payer, person, share)?;
    }

    tx.execute(
        "INSERT INTO expenses (payer, amount, description, spent_on, participants)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            payer,
            expense.amount,
            expense.description,
            expense.date.format("%Y-%m-%d").to_string(),
            count
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    tracing::info!(id, participants = count, "recorded expense");

    Ok(Expense {
        id,
        payer: payer.to_string(),
        amount: expense.amount,
        description: expense.description.clone(),
        date: expense.date,
        participants: count,
    })
}

/// `person` owes `payer` one `share`, netted against any debt running the
/// other way.
fn apply_share(
    tx: &Transaction<'_>,
    payer: &str,
    person: &str,
    share: f64,
) -> rusqlite::Result<()> {
    let reverse: Option<f64> = tx
        .query_row(
            "SELECT amount FROM debts WHERE debtor = ?1 AND creditor = ?2",
            params![payer, person],
            |row| row.get(0),
        )
        .optional()?;

    let to_settle = match reverse {
        Some(owed) if owed >= share => {
            let left = owed - share;
            if left <= EPSILON {
                delete_edge(tx, payer, person)?;
            } else {
                tx.execute(
                    "UPDATE debts SET amount = ?3 WHERE debtor = ?1 AND creditor = ?2",
                    params![payer, person, left],
                )?;
            }
            0.0
        }
        Some(owed) => {
            delete_edge(tx, payer, person)?;
            share - owed
        }
        None => share,
    };

    if to_settle > EPSILON {
        tx.execute(
            "INSERT INTO debts (debtor, creditor, amount) VALUES (?1, ?2, ?3)
             ON CONFLICT (debtor, creditor) DO UPDATE SET amount = amount + excluded.amount",
            params![person, payer, to_settle],
        )?;
    }
    Ok(())
}

fn delete_edge(tx: &Transaction<'_>, debtor: &str, creditor: &str) -> rusqlite::Result<()> {
    tx.execute(
        "DELETE FROM debts WHERE debtor = ?1 AND creditor = ?2",
        params![debtor, creditor],
    )?;
    Ok(())
}

fn roster_in(tx: &Transaction<'_>) -> rusqlite::Result<Vec<String>> {
    let mut stmt = tx.prepare("SELECT name FROM people ORDER BY id ASC")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

/// Every stored edge above [`EPSILON`], ordered by debtor then creditor.
///
/// # Errors
///
/// Returns [`LedgerError::Storage`] if the query fails.
pub fn list_edges(conn: &Connection) -> Result<Vec<DebtEdge>, LedgerError> {
    let mut stmt = conn.prepare(
        "SELECT debtor, creditor, amount FROM debts
         WHERE amount > ?1
         ORDER BY debtor ASC, creditor ASC",
    )?;
    let rows = stmt.query_map(params![EPSILON], |row| {
        Ok(DebtEdge {
            debtor: row.get(0)?,
            creditor: row.get(1)?,
            amount: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Balances for everyone on the roster (zeroed when they have no edges), plus
/// anyone else an edge still names.
///
/// # Errors
///
/// Returns [`LedgerError::Storage`] if a query fails.
pub fn aggregate(conn: &Connection) -> Result<BTreeMap<String, PersonBalance>, LedgerError> {
    let mut balances: BTreeMap<String, PersonBalance> = BTreeMap::new();

    let mut stmt = conn.prepare("SELECT name FROM people ORDER BY id ASC")?;
    for name in stmt.query_map([], |row| row.get::<_, String>(0))? {
        balances.entry(name?).or_default();
    }

    for edge in list_edges(conn)? {
        let debtor = balances.entry(edge.debtor.clone()).or_default();
        *debtor.owes.entry(edge.creditor.clone()).or_default() += edge.amount;
        debtor.net -= edge.amount;

        let creditor = balances.entry(edge.creditor).or_default();
        *creditor.owed_by.entry(edge.debtor).or_default() += edge.amount;
        creditor.net += edge.amount;
    }

    Ok(balances)
}

/// Clear every debt `person` owes. Debts owed *to* them stay. Returns how many
/// edges were removed.
///
/// # Errors
///
/// Returns [`LedgerError::UnknownPerson`] for a name not on the roster.
pub fn settle(conn: &mut Connection, person: &str) -> Result<usize, LedgerError> {
    let person = person.trim();
    let result = settle_tx(conn, person);

    match &result {
        Ok(removed) => tracing::info!(removed, "settled debts"),
        Err(LedgerError::Storage(e)) => {
            tracing::error!(op = "settle", error = %e, "ledger write rolled back");
        }
        Err(_) => {}
    }
    result
}

fn settle_tx(conn: &mut Connection, person: &str) -> Result<usize, LedgerError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let known: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM people WHERE name = ?1)",
        params![person],
        |row| row.get(0),
    )?;
    if !known {
        return Err(LedgerError::UnknownPerson(person.to_string()));
    }
    let removed = tx.execute("DELETE FROM debts WHERE debtor = ?1", params![person])?;
    tx.commit()?;
    Ok(removed)
}

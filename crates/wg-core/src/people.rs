//! Household roster.
//!
//! Roster order is registration order (`id ASC`); the rotation depends on it,
//! so nothing here ever reorders people.

use crate::error::ErrorCode;
use crate::model::Person;
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

#[derive(Debug, thiserror::Error)]
pub enum PeopleError {
    #[error("person '{0}' not found")]
    NotFound(String),

    #[error("'{0}' is already registered")]
    Duplicate(String),

    #[error("person name must not be empty")]
    EmptyName,

    #[error("'{name}' still has {count} open debt(s)")]
    OpenDebts { name: String, count: usize },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl PeopleError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::PersonNotFound,
            Self::Duplicate(_) => ErrorCode::DuplicatePerson,
            Self::EmptyName => ErrorCode::InvalidName,
            Self::OpenDebts { .. } => ErrorCode::OpenDebts,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }
}

const PERSON_COLUMNS: &str = "id, name, chat_ref, identity";

fn row_to_person(row: &rusqlite::Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get(0)?,
        name: row.get(1)?,
        chat_ref: row.get(2)?,
        identity: row.get(3)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Register a new person at the end of the roster.
///
/// # Errors
///
/// Returns [`PeopleError::Duplicate`] when the name or identity is taken.
pub fn add_person(
    conn: &Connection,
    name: &str,
    identity: Option<&str>,
    chat_ref: Option<&str>,
) -> Result<Person, PeopleError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PeopleError::EmptyName);
    }

    let now_us = chrono::Utc::now().timestamp_micros();
    conn.execute(
        "INSERT INTO people (name, identity, chat_ref, created_at_us) VALUES (?1, ?2, ?3, ?4)",
        params![name, identity, chat_ref, now_us],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            PeopleError::Duplicate(name.to_string())
        } else {
            PeopleError::Storage(e)
        }
    })?;

    let person = Person {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        chat_ref: chat_ref.map(str::to_string),
        identity: identity.map(str::to_string),
    };
    tracing::info!(id = person.id, "registered person");
    Ok(person)
}

/// Everyone, in roster order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_roster(conn: &Connection) -> Result<Vec<Person>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {PERSON_COLUMNS} FROM people ORDER BY id ASC"))
        .context("prepare roster query")?;
    let rows = stmt
        .query_map([], row_to_person)
        .context("execute roster query")?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("read roster rows")
}

/// Roster names only, in roster order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn roster_names(conn: &Connection) -> Result<Vec<String>> {
    Ok(list_roster(conn)?.into_iter().map(|p| p.name).collect())
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Person>> {
    conn.query_row(
        &format!("SELECT {PERSON_COLUMNS} FROM people WHERE name = ?1"),
        params![name.trim()],
        row_to_person,
    )
    .optional()
    .with_context(|| format!("find person '{}'", name.trim()))
}

/// Look up the person a verified external identity belongs to.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_by_identity(conn: &Connection, identity: &str) -> Result<Option<Person>> {
    conn.query_row(
        &format!("SELECT {PERSON_COLUMNS} FROM people WHERE identity = ?1"),
        params![identity],
        row_to_person,
    )
    .optional()
    .context("find person by identity")
}

/// Attach an external identity to an existing person.
///
/// # Errors
///
/// Returns [`PeopleError::NotFound`] for an unknown name and
/// [`PeopleError::Duplicate`] when the identity is already linked elsewhere.
pub fn link_identity(conn: &Connection, name: &str, identity: &str) -> Result<(), PeopleError> {
    let changed = conn
        .execute(
            "UPDATE people SET identity = ?1 WHERE name = ?2",
            params![identity, name.trim()],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                PeopleError::Duplicate(identity.to_string())
            } else {
                PeopleError::Storage(e)
            }
        })?;
    if changed == 0 {
        return Err(PeopleError::NotFound(name.trim().to_string()));
    }
    tracing::info!("linked identity");
    Ok(())
}

/// Store where chat messages for `identity` should go (the bot's `/start`).
///
/// # Errors
///
/// Returns [`PeopleError::NotFound`] when no person carries that identity.
pub fn register_chat(
    conn: &Connection,
    identity: &str,
    chat_ref: &str,
) -> Result<Person, PeopleError> {
    let changed = conn.execute(
        "UPDATE people SET chat_ref = ?1 WHERE identity = ?2",
        params![chat_ref, identity],
    )?;
    if changed == 0 {
        return Err(PeopleError::NotFound(identity.to_string()));
    }
    let person = conn.query_row(
        &format!("SELECT {PERSON_COLUMNS} FROM people WHERE identity = ?1"),
        params![identity],
        row_to_person,
    )?;
    tracing::info!(id = person.id, "registered chat reference");
    Ok(person)
}

/// Forget a chat reference after the chat became unreachable. Idempotent;
/// returns whether anything changed.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn clear_chat_ref(conn: &Connection, person_id: i64) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE people SET chat_ref = NULL WHERE id = ?1 AND chat_ref IS NOT NULL",
            params![person_id],
        )
        .context("clear chat reference")?;
    Ok(changed > 0)
}

/// Remove a person from the roster. Refused while any debt edge names them,
/// on either side.
///
/// # Errors
///
/// Returns [`PeopleError::NotFound`] or [`PeopleError::OpenDebts`].
pub fn remove_person(conn: &mut Connection, name: &str) -> Result<Person, PeopleError> {
    let name = name.trim();
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let person = tx
        .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM people WHERE name = ?1"),
            params![name],
            row_to_person,
        )
        .optional()?
        .ok_or_else(|| PeopleError::NotFound(name.to_string()))?;

    let open: i64 = tx.query_row(
        "SELECT COUNT(*) FROM debts WHERE debtor = ?1 OR creditor = ?1",
        params![name],
        |row| row.get(0),
    )?;
    if open > 0 {
        return Err(PeopleError::OpenDebts {
            name: name.to_string(),
            count: usize::try_from(open).unwrap_or(usize::MAX),
        });
    }

    tx.execute("DELETE FROM people WHERE id = ?1", params![person.id])?;
    tx.commit()?;
    tracing::info!(id = person.id, "removed person");
    Ok(person)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn names(conn: &Connection) -> Vec<String> {
        roster_names(conn).expect("roster")
    }

    #[test]
    fn roster_keeps_registration_order() {
        let conn = open_in_memory().expect("db");
        for name in ["Carol", "Alice", "Bob"] {
            add_person(&conn, name, None, None).expect("add");
        }
        assert_eq!(names(&conn), ["Carol", "Alice", "Bob"]);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let conn = open_in_memory().expect("db");
        add_person(&conn, "Alice", None, None).expect("add");
        let err = add_person(&conn, " Alice ", None, None).expect_err("duplicate");
        assert!(matches!(err, PeopleError::Duplicate(_)));
        assert_eq!(err.code(), ErrorCode::DuplicatePerson);
    }

    #[test]
    fn blank_name_is_rejected() {
        let conn = open_in_memory().expect("db");
        assert!(matches!(
            add_person(&conn, "   ", None, None),
            Err(PeopleError::EmptyName)
        ));
    }

    #[test]
    fn identity_lookup_and_chat_registration() {
        let conn = open_in_memory().expect("db");
        add_person(&conn, "Alice", Some("tg:100"), None).expect("add");

        let found = find_by_identity(&conn, "tg:100").expect("query").expect("present");
        assert_eq!(found.name, "Alice");
        assert!(found.chat_ref.is_none());

        let updated = register_chat(&conn, "tg:100", "chat-1").expect("register");
        assert_eq!(updated.chat_ref.as_deref(), Some("chat-1"));

        let err = register_chat(&conn, "tg:999", "chat-2").expect_err("unknown identity");
        assert_eq!(err.code(), ErrorCode::PersonNotFound);
    }

    #[test]
    fn link_identity_rejects_taken_identity() {
        let conn = open_in_memory().expect("db");
        add_person(&conn, "Alice", Some("tg:1"), None).expect("add");
        add_person(&conn, "Bob", None, None).expect("add");

        let err = link_identity(&conn, "Bob", "tg:1").expect_err("taken");
        assert!(matches!(err, PeopleError::Duplicate(_)));

        link_identity(&conn, "Bob", "tg:2").expect("link");
        let bob = find_by_name(&conn, "Bob").expect("query").expect("present");
        assert_eq!(bob.identity.as_deref(), Some("tg:2"));

        assert!(matches!(
            link_identity(&conn, "Zed", "tg:3"),
            Err(PeopleError::NotFound(_))
        ));
    }

    #[test]
    fn clear_chat_ref_is_idempotent() {
        let conn = open_in_memory().expect("db");
        let p = add_person(&conn, "Alice", None, Some("chat-1")).expect("add");
        assert!(clear_chat_ref(&conn, p.id).expect("clear"));
        assert!(!clear_chat_ref(&conn, p.id).expect("clear again"));
        let p = find_by_name(&conn, "Alice").expect("query").expect("present");
        assert!(p.chat_ref.is_none());
    }

    #[test]
    fn remove_person_refuses_open_debts() {
        let mut conn = open_in_memory().expect("db");
        add_person(&conn, "Alice", None, None).expect("add");
        add_person(&conn, "Bob", None, None).expect("add");
        conn.execute(
            "INSERT INTO debts (debtor, creditor, amount) VALUES ('Bob', 'Alice', 5.0)",
            [],
        )
        .expect("seed debt");

        let err = remove_person(&mut conn, "Alice").expect_err("creditor side counts");
        assert!(matches!(err, PeopleError::OpenDebts { count: 1, .. }));

        conn.execute("DELETE FROM debts", []).expect("clear debts");
        remove_person(&mut conn, "Alice").expect("remove");
        assert_eq!(names(&conn), ["Bob"]);

        assert!(matches!(
            remove_person(&mut conn, "Alice"),
            Err(PeopleError::NotFound(_))
        ));
    }
}

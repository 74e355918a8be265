//! Weekly assignment pushes and the mid-week Toilet reminder.
//!
//! Delivery goes through the [`Notifier`] seam so jobs can run against the
//! chat API, stdout, or a recording fake. A recipient the chat API reports as
//! unreachable loses their chat reference; everyone else is unaffected.

use crate::error::ErrorCode;
use crate::model::{Person, Task};
use crate::people;
use crate::schedule::{Rotation, WeekPlan, sunday_on_or_before};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The chat blocked the bot or no longer exists. Retrying will not help.
    #[error("recipient unreachable: {0}")]
    Unreachable(String),

    #[error("delivery failed: {0}")]
    Failed(String),
}

impl DeliveryError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::DeliveryFailed
    }
}

/// Sends one text message to one chat.
pub trait Notifier {
    /// # Errors
    ///
    /// [`DeliveryError::Unreachable`] when the recipient can never be reached
    /// again, [`DeliveryError::Failed`] for anything transient.
    fn send(&self, chat_ref: &str, text: &str) -> Result<(), DeliveryError>;
}

/// Outcome of one notification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub week: Option<NaiveDate>,
    pub sent: usize,
    /// People with nothing to send (no task and not forced).
    pub skipped: usize,
    /// People without a chat reference.
    pub no_chat: usize,
    pub failed: usize,
    /// People whose chat reference was cleared after an unreachable error.
    pub cleared: Vec<String>,
}

/// Message for one person's week, or `None` when there is nothing to say.
#[must_use]
pub fn weekly_message(plan: &WeekPlan, name: &str, force: bool) -> Option<String> {
    let tasks = plan.tasks_for(name);
    let sunday = plan.sunday.format(DATE_FORMAT);

    if tasks.is_empty() {
        return force.then(|| {
            format!(
                "Hi {name}, this is your weekly cleaning schedule ping! \
                 No specific major tasks assigned to you this week."
            )
        });
    }

    let mut message =
        format!("Hi {name}! Your cleaning tasks for the week starting Sunday, {sunday}:\n");
    for task in tasks {
        message.push_str(&format!("- {} (Mainly on {sunday})\n", task.task));
        if let Some(midweek) = task.midweek {
            message.push_str(&format!(
                "  (Remember, also on Wednesday, {})\n",
                midweek.format(DATE_FORMAT)
            ));
        }
    }
    Some(message)
}

#[must_use]
pub fn wednesday_message(date: NaiveDate) -> String {
    format!(
        "🧹 Reminder: Today, {}, is your mid-week toilet cleaning day!",
        date.format(DATE_FORMAT)
    )
}

/// Push each person their tasks for the week of `today`.
///
/// # Errors
///
/// Returns an error only for storage failures. Delivery failures are counted
/// in the report.
pub fn send_weekly_assignments(
    conn: &Connection,
    notifier: &dyn Notifier,
    rotation: Rotation,
    today: NaiveDate,
    force: bool,
) -> Result<DispatchReport> {
    let roster = people::list_roster(conn).context("load roster for weekly push")?;
    let mut report = DispatchReport::default();
    if roster.is_empty() {
        tracing::info!("no people registered; weekly push skipped");
        return Ok(report);
    }

    let names: Vec<&str> = roster.iter().map(|p| p.name.as_str()).collect();
    let plan = rotation.plan_week(&names, today);
    report.week = Some(plan.sunday);

    for person in &roster {
        let Some(chat_ref) = person.chat_ref.as_deref() else {
            tracing::debug!(id = person.id, "no chat reference; skipping");
            report.no_chat += 1;
            continue;
        };
        let Some(message) = weekly_message(&plan, &person.name, force) else {
            report.skipped += 1;
            continue;
        };
        deliver(conn, notifier, person, chat_ref, &message, &mut report)?;
    }

    tracing::info!(
        week = %plan.sunday,
        sent = report.sent,
        failed = report.failed,
        "weekly assignments dispatched"
    );
    Ok(report)
}

/// Remind this week's Toilet holder of the Wednesday repeat.
///
/// The week is the one that started on the Sunday on or before `today`, so
/// the reminder reaches the person the weekly push told about it.
///
/// # Errors
///
/// Returns an error only for storage failures.
pub fn send_wednesday_reminders(
    conn: &Connection,
    notifier: &dyn Notifier,
    rotation: Rotation,
    today: NaiveDate,
) -> Result<DispatchReport> {
    let roster = people::list_roster(conn).context("load roster for wednesday reminder")?;
    let mut report = DispatchReport::default();
    if roster.is_empty() {
        tracing::info!("no people registered; wednesday reminder skipped");
        return Ok(report);
    }

    let names: Vec<&str> = roster.iter().map(|p| p.name.as_str()).collect();
    let plan = rotation.plan_week(&names, sunday_on_or_before(today));
    report.week = Some(plan.sunday);
    let message = wednesday_message(plan.midweek);

    let holders = plan.assignments.people(Task::Toilet);
    if holders.is_empty() {
        tracing::info!("nobody holds the toilet this week");
    }

    for name in holders {
        let Some(person) = roster.iter().find(|p| &p.name == name) else {
            continue;
        };
        let Some(chat_ref) = person.chat_ref.as_deref() else {
            tracing::warn!(id = person.id, "toilet holder has no chat reference");
            report.no_chat += 1;
            continue;
        };
        deliver(conn, notifier, person, chat_ref, &message, &mut report)?;
    }

    Ok(report)
}

fn deliver(
    conn: &Connection,
    notifier: &dyn Notifier,
    person: &Person,
    chat_ref: &str,
    message: &str,
    report: &mut DispatchReport,
) -> Result<()> {
    match notifier.send(chat_ref, message) {
        Ok(()) => {
            tracing::debug!(id = person.id, "message delivered");
            report.sent += 1;
        }
        Err(DeliveryError::Unreachable(reason)) => {
            tracing::warn!(id = person.id, %reason, "recipient unreachable; clearing chat reference");
            report.failed += 1;
            if people::clear_chat_ref(conn, person.id)? {
                report.cleared.push(person.name.clone());
            }
        }
        Err(DeliveryError::Failed(reason)) => {
            tracing::warn!(id = person.id, %reason, "message delivery failed");
            report.failed += 1;
        }
    }
    Ok(())
}

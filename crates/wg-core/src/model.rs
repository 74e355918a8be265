//! Typed records for the household store.
//!
//! Rows never leave the storage layer as loose tuples: every query in
//! [`crate::people`], [`crate::expenses`], and [`crate::ledger`] maps into
//! one of these structs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Amounts at or below this threshold are treated as zero and never stored.
pub const EPSILON: f64 = 0.001;

/// A household member. Roster order is ascending `id` (registration order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    /// Where chat notifications go; `None` once a chat became unreachable.
    pub chat_ref: Option<String>,
    /// Verified external identity (e.g. a chat user id).
    pub identity: Option<String>,
}

/// The fixed set of cleaning tasks, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Task {
    Kitchen,
    Bathroom,
    Toilet,
}

impl Task {
    pub const ALL: [Self; 3] = [Self::Kitchen, Self::Bathroom, Self::Toilet];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kitchen => "Kitchen",
            Self::Bathroom => "Bathroom",
            Self::Toilet => "Toilet",
        }
    }

    /// Whether the task recurs mid-week (Wednesday) within its week.
    #[must_use]
    pub const fn has_midweek_repeat(self) -> bool {
        matches!(self, Self::Toilet)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kitchen" => Ok(Self::Kitchen),
            "bathroom" => Ok(Self::Bathroom),
            "toilet" => Ok(Self::Toilet),
            other => Err(format!(
                "unknown task '{other}': expected one of kitchen, bathroom, toilet"
            )),
        }
    }
}

/// A recorded expense. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub payer: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
    /// Number of people the amount was split between.
    pub participants: u32,
}

/// An expense about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub payer: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
}

/// `debtor` owes `creditor` `amount`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtEdge {
    pub debtor: String,
    pub creditor: String,
    pub amount: f64,
}

/// Round to whole cents.
#[must_use]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Parse a user-entered amount such as `12.50` or `12,50`.
///
/// The result is rounded to cents and must be strictly positive.
///
/// # Errors
///
/// Returns a human-readable message when the text is not a positive number.
pub fn parse_amount(text: &str) -> Result<f64, String> {
    let normalized = text.trim().trim_start_matches('€').trim().replace(',', ".");
    let value: f64 = normalized
        .parse()
        .map_err(|_| format!("'{}' is not a number", text.trim()))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not a number", text.trim()));
    }
    let rounded = round_cents(value);
    if rounded <= 0.0 {
        return Err("amount must be positive".to_string());
    }
    Ok(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_round_trips_through_str() {
        for task in Task::ALL {
            assert_eq!(task.as_str().parse::<Task>(), Ok(task));
        }
        assert_eq!("  TOILET ".parse::<Task>(), Ok(Task::Toilet));
        assert!("garden".parse::<Task>().is_err());
    }

    #[test]
    fn only_toilet_repeats_midweek() {
        assert!(Task::Toilet.has_midweek_repeat());
        assert!(!Task::Kitchen.has_midweek_repeat());
        assert!(!Task::Bathroom.has_midweek_repeat());
    }

    #[test]
    fn parse_amount_accepts_dot_and_comma() {
        assert_eq!(parse_amount("12.50"), Ok(12.5));
        assert_eq!(parse_amount("12,50"), Ok(12.5));
        assert_eq!(parse_amount(" €7 "), Ok(7.0));
        assert_eq!(parse_amount("3.333"), Ok(3.33));
    }

    #[test]
    fn parse_amount_rejects_non_positive_and_garbage() {
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-4").is_err());
        assert!(parse_amount("0.001").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("NaN").is_err());
        assert!(parse_amount("inf").is_err());
    }
}

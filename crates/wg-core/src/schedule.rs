//! Stateless weekly cleaning rotation.
//!
//! The rotation phase for a week is derived from the number of whole weeks
//! between a fixed epoch Sunday and that week's Sunday. Nothing is persisted,
//! so re-running a job or asking about a week far in the future always yields
//! the same answer.
//!
//! All arithmetic is on calendar dates ([`NaiveDate`]). Which date is "today"
//! is decided once, in the configured timezone, by
//! [`crate::config::Settings::today`].

use crate::model::Task;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Days from a week's Sunday to its mid-week Toilet repeat (Wednesday).
pub const MIDWEEK_OFFSET_DAYS: i64 = 3;

/// Text shown for a task nobody is assigned to.
pub const UNASSIGNED: &str = "N/A";

/// The Sunday on or after `reference`, advanced by `week_offset` weeks.
#[must_use]
pub fn target_sunday(reference: NaiveDate, week_offset: u32) -> NaiveDate {
    let until_sunday = (7 - i64::from(reference.weekday().num_days_from_sunday())) % 7;
    reference + Duration::days(until_sunday + 7 * i64::from(week_offset))
}

/// The Sunday on or before `date`: the start of the week `date` falls in.
#[must_use]
pub fn sunday_on_or_before(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// Whole weeks from `epoch` to `sunday`, rounded towards negative infinity.
#[must_use]
pub fn weeks_since(epoch: NaiveDate, sunday: NaiveDate) -> i64 {
    (sunday - epoch).num_days().div_euclid(7)
}

/// Rotation phase for a roster of `n` people; always in `0..n`.
#[must_use]
pub fn phase(weeks_passed: i64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let n = i64::try_from(n).unwrap_or(i64::MAX);
    // rem_euclid keeps weeks before the epoch non-negative.
    usize::try_from(weeks_passed.rem_euclid(n)).unwrap_or_default()
}

/// Task -> assigned names for one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignments {
    tasks: BTreeMap<Task, Vec<String>>,
}

impl Assignments {
    fn empty() -> Self {
        Self {
            tasks: Task::ALL.into_iter().map(|t| (t, Vec::new())).collect(),
        }
    }

    fn set(&mut self, task: Task, people: &[&str]) {
        self.tasks
            .insert(task, people.iter().map(|p| (*p).to_string()).collect());
    }

    /// People assigned to `task` (empty for unsupported roster sizes).
    #[must_use]
    pub fn people(&self, task: Task) -> &[String] {
        self.tasks.get(&task).map_or(&[], Vec::as_slice)
    }

    /// Tasks `name` is assigned to, in display order.
    #[must_use]
    pub fn tasks_of(&self, name: &str) -> Vec<Task> {
        Task::ALL
            .into_iter()
            .filter(|t| self.people(*t).iter().any(|p| p == name))
            .collect()
    }

    /// `"A & B"`, or [`UNASSIGNED`] when nobody has the task.
    #[must_use]
    pub fn joined(&self, task: Task) -> String {
        let people = self.people(task);
        if people.is_empty() {
            UNASSIGNED.to_string()
        } else {
            people.join(" & ")
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.values().all(Vec::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Task, &[String])> {
        self.tasks.iter().map(|(t, p)| (*t, p.as_slice()))
    }
}

/// One week's rotation, with its derived dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekPlan {
    pub sunday: NaiveDate,
    /// Mid-week repeat date for Toilet.
    pub midweek: NaiveDate,
    pub weeks_since_epoch: i64,
    pub phase: usize,
    pub assignments: Assignments,
}

impl WeekPlan {
    /// A person's tasks for the week, with reminder dates attached.
    #[must_use]
    pub fn tasks_for(&self, name: &str) -> Vec<PersonTask> {
        self.assignments
            .tasks_of(name)
            .into_iter()
            .map(|task| PersonTask {
                task,
                date: self.sunday,
                midweek: task.has_midweek_repeat().then_some(self.midweek),
            })
            .collect()
    }
}

/// A single task held by one person in a given week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonTask {
    pub task: Task,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midweek: Option<NaiveDate>,
}

/// Flattened row for dashboards: one line per upcoming week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleRow {
    pub date: NaiveDate,
    pub kitchen: String,
    pub bathroom: String,
    pub toilet: String,
}

/// Epoch-anchored rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    epoch: NaiveDate,
}

impl Rotation {
    /// `epoch` should already be a Sunday (see [`crate::config::align_epoch`]).
    #[must_use]
    pub const fn new(epoch: NaiveDate) -> Self {
        Self { epoch }
    }

    #[must_use]
    pub const fn epoch(&self) -> NaiveDate {
        self.epoch
    }

    /// Assign tasks for the calendar week containing (or starting after)
    /// `target`. Roster order matters; sizes outside 1..=4 get no assignments.
    #[must_use]
    pub fn assign<S: AsRef<str>>(&self, roster: &[S], target: NaiveDate) -> Assignments {
        self.plan_week(roster, target).assignments
    }

    /// Full plan for the week of `target`.
    #[must_use]
    pub fn plan_week<S: AsRef<str>>(&self, roster: &[S], target: NaiveDate) -> WeekPlan {
        let sunday = target_sunday(target, 0);
        let weeks = weeks_since(self.epoch, sunday);
        let n = roster.len();
        let phase = phase(weeks, n);

        let rotated: Vec<&str> = (0..n).map(|i| roster[(i + phase) % n].as_ref()).collect();

        let mut assignments = Assignments::empty();
        match rotated.as_slice() {
            [only] => {
                for task in Task::ALL {
                    assignments.set(task, &[only]);
                }
            }
            [a, b] => {
                assignments.set(Task::Kitchen, &[a]);
                assignments.set(Task::Bathroom, &[b]);
                assignments.set(Task::Toilet, &[a]);
            }
            [a, b, c] => {
                assignments.set(Task::Kitchen, &[a]);
                assignments.set(Task::Bathroom, &[b]);
                assignments.set(Task::Toilet, &[c]);
            }
            [a, b, c, d] => {
                assignments.set(Task::Kitchen, &[a, b]);
                assignments.set(Task::Bathroom, &[c]);
                assignments.set(Task::Toilet, &[d]);
            }
            _ => {
                if n > 4 {
                    tracing::debug!(roster = n, "roster size has no task table; nothing assigned");
                }
            }
        }

        WeekPlan {
            sunday,
            midweek: sunday + Duration::days(MIDWEEK_OFFSET_DAYS),
            weeks_since_epoch: weeks,
            phase,
            assignments,
        }
    }

    /// Rows for `weeks` consecutive weeks starting with the week of `today`.
    #[must_use]
    pub fn upcoming<S: AsRef<str>>(
        &self,
        roster: &[S],
        today: NaiveDate,
        weeks: u32,
    ) -> Vec<ScheduleRow> {
        if roster.is_empty() {
            return Vec::new();
        }

        (0..weeks)
            .map(|offset| {
                let sunday = target_sunday(today, offset);
                let assignments = self.assign(roster, sunday);
                ScheduleRow {
                    date: sunday,
                    kitchen: assignments.joined(Task::Kitchen),
                    bathroom: assignments.joined(Task::Bathroom),
                    toilet: assignments.joined(Task::Toilet),
                }
            })
            .collect()
    }
}

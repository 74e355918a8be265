use crate::cmd::{open_house, parse_date};
use crate::output::{OutputMode, fail, render};
use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use wg_core::error::ErrorCode;
use wg_core::people;
use wg_core::schedule::{PersonTask, target_sunday};

#[derive(Args, Debug)]
pub struct TasksArgs {
    /// Person to look up.
    pub person: String,

    /// Weeks ahead of the current week (0 = this week).
    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    /// Reference date instead of today (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct TasksOutput {
    person: String,
    week: NaiveDate,
    tasks: Vec<PersonTask>,
}

/// Execute `wg tasks <person>`: one person's tasks for a week.
///
/// # Errors
///
/// Returns an error for unknown people or storage failures.
pub fn run_tasks(args: &TasksArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let house = open_house(project_root, output)?;
    let roster = people::roster_names(&house.conn)?;
    let name = args.person.trim();
    if !roster.iter().any(|n| n == name) {
        return Err(fail(
            output,
            ErrorCode::PersonNotFound,
            format!("person '{name}' not found"),
        ));
    }

    let week = target_sunday(house.day(args.date), args.offset);
    let plan = house.rotation().plan_week(&roster, week);
    let result = TasksOutput {
        person: name.to_string(),
        week: plan.sunday,
        tasks: plan.tasks_for(name),
    };

    render(output, &result, |r, w| {
        let week = r.week.format("%d/%m/%Y");
        if r.tasks.is_empty() {
            return writeln!(w, "{} has no tasks in the week of {week}.", r.person);
        }
        writeln!(w, "{}'s tasks for the week of {week}:", r.person)?;
        for task in &r.tasks {
            writeln!(w, "- {}", task.task)?;
            if let Some(midweek) = task.midweek {
                writeln!(w, "  also on Wednesday, {}", midweek.format("%d/%m/%Y"))?;
            }
        }
        Ok(())
    })
}

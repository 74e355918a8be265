use crate::cmd::{open_house, parse_date};
use crate::output::{OutputMode, pretty_section, render_mode};
use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use wg_core::people;
use wg_core::schedule::ScheduleRow;

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Number of weeks to show (default: `[schedule].weeks_ahead`).
    #[arg(long, short)]
    pub weeks: Option<u32>,

    /// Show the schedule as of this date instead of today (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct ScheduleOutput {
    today: NaiveDate,
    epoch: NaiveDate,
    timezone: String,
    weeks: Vec<ScheduleRow>,
}

/// Execute `wg schedule`: upcoming weekly assignments.
///
/// # Errors
///
/// Returns an error if the house cannot be opened or queried.
pub fn run_schedule(args: &ScheduleArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let house = open_house(project_root, output)?;
    let today = house.day(args.date);
    let weeks = args.weeks.unwrap_or(house.settings.weeks_ahead);
    let roster = people::roster_names(&house.conn)?;

    let result = ScheduleOutput {
        today,
        epoch: house.settings.epoch,
        timezone: house.settings.timezone.name().to_string(),
        weeks: house.rotation().upcoming(&roster, today, weeks),
    };
    tracing::debug!(weeks = result.weeks.len(), "computed schedule");

    render_mode(
        output,
        &result,
        |r, w| {
            for row in &r.weeks {
                writeln!(w, "{}\t{}\t{}\t{}", row.date, row.kitchen, row.bathroom, row.toilet)?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, "Cleaning schedule")?;
            if r.weeks.is_empty() {
                return writeln!(w, "No people registered.");
            }
            writeln!(w, "{:<12} {:<20} {:<12} {}", "Week of", "Kitchen", "Bathroom", "Toilet")?;
            for row in &r.weeks {
                writeln!(
                    w,
                    "{:<12} {:<20} {:<12} {}",
                    row.date.format("%d/%m/%Y").to_string(),
                    row.kitchen,
                    row.bathroom,
                    row.toilet
                )?;
            }
            Ok(())
        },
    )
}

//! `wg expense add|list`.
//!
//! `wg expense add PAYER` without an amount runs the same two-step dialog the
//! chat bot uses, reading answers line by line from stdin.

use crate::cmd::{House, open_house, parse_date};
use crate::output::{OutputMode, fail, money, pretty_section, render, render_mode};
use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::Path;
use wg_core::dialog::{DialogEvent, ExpenseDialogs, ExpenseDraft};
use wg_core::error::ErrorCode;
use wg_core::model::{Expense, parse_amount};
use wg_core::{expenses, ledger};

#[derive(Args, Debug)]
pub struct ExpenseArgs {
    #[command(subcommand)]
    pub command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    /// Record an expense and split it evenly.
    Add(AddArgs),
    /// Show the expense log, newest first.
    List {
        /// Show at most this many expenses.
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Who paid.
    pub payer: String,

    /// Amount such as 12.50 or 12,50. Omit to be asked interactively.
    pub amount: Option<String>,

    /// What it was for.
    #[arg(long, short)]
    pub description: Option<String>,

    /// Split only with these people (comma separated). The payer is always
    /// included. Default: the whole house.
    #[arg(long = "with", value_delimiter = ',')]
    pub with: Vec<String>,

    /// Date of the expense (YYYY-MM-DD, default today).
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct AddOutput {
    ok: bool,
    expense: Expense,
}

/// # Errors
///
/// Returns an error for invalid input, unknown people, or storage failures.
pub fn run_expense(args: &ExpenseArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let mut house = open_house(project_root, output)?;
    match &args.command {
        ExpenseCommand::Add(add) => run_add(add, &mut house, output),
        ExpenseCommand::List { limit } => run_list(&house, *limit, output),
    }
}

fn run_add(args: &AddArgs, house: &mut House, output: OutputMode) -> Result<()> {
    let draft = match &args.amount {
        Some(raw) => {
            let amount =
                parse_amount(raw).map_err(|msg| fail(output, ErrorCode::InvalidAmount, msg))?;
            ExpenseDraft {
                payer: args.payer.trim().to_string(),
                amount,
                description: args.description.clone().unwrap_or_default(),
            }
        }
        None => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut prompt = std::io::stderr();
            run_dialog(&args.payer, &mut input, &mut prompt)?
                .ok_or_else(|| fail(output, ErrorCode::NoActiveDialog, "expense cancelled"))?
        }
    };

    let participants = (!args.with.is_empty()).then_some(args.with.as_slice());
    let expense = draft.into_expense(house.day(args.date));
    let recorded = ledger::record_expense(&mut house.conn, &expense, participants)
        .map_err(|e| fail(output, e.code(), e.to_string()))?;

    let result = AddOutput {
        ok: true,
        expense: recorded,
    };
    render(output, &result, |r, w| {
        let e = &r.expense;
        if e.description.is_empty() {
            writeln!(w, "✓ Expense of {} added and split {} ways!", money(e.amount), e.participants)
        } else {
            writeln!(
                w,
                "✓ Expense of {} for \"{}\" added and split {} ways!",
                money(e.amount),
                e.description,
                e.participants
            )
        }
    })
}

/// Drive the expense dialog from `input`, writing prompts to `prompt`.
/// Returns `None` when the user cancels with a `/` command or input ends.
fn run_dialog(
    payer: &str,
    input: &mut dyn BufRead,
    prompt: &mut dyn Write,
) -> Result<Option<ExpenseDraft>> {
    let identity = format!("cli:{}", payer.trim());
    let mut dialogs = ExpenseDialogs::new();
    writeln!(prompt, "{}", dialogs.start_expense_dialog(&identity, payer.trim()))?;

    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line).context("read expense input")? == 0 {
            dialogs.cancel(&identity);
            return Ok(None);
        }

        match dialogs.submit_text(&identity, line.trim_end_matches(['\r', '\n'])) {
            Ok(DialogEvent::AskDescription { .. }) => {
                writeln!(prompt, "{}", wg_core::dialog::ASK_DESCRIPTION)?;
            }
            Ok(DialogEvent::Completed(draft)) => return Ok(Some(draft)),
            Ok(DialogEvent::Cancelled | DialogEvent::Ignored) => return Ok(None),
            Err(e) => writeln!(prompt, "{e}. Positive number please.")?,
        }
    }
}

fn run_list(house: &House, limit: Option<usize>, output: OutputMode) -> Result<()> {
    let log = expenses::list_recent(&house.conn, limit)?;
    render_mode(
        output,
        &log,
        |log, w| {
            for e in log {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{:.2}\t{}\t{}",
                    e.id, e.date, e.payer, e.amount, e.participants, e.description
                )?;
            }
            Ok(())
        },
        |log, w| {
            pretty_section(w, "Expenses")?;
            if log.is_empty() {
                return writeln!(w, "No expenses recorded.");
            }
            for e in log {
                writeln!(
                    w,
                    "{}  {:<10} {:>10}  /{}  {}",
                    e.date.format("%d/%m/%Y"),
                    e.payer,
                    money(e.amount),
                    e.participants,
                    e.description
                )?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn dialog(script: &str) -> (Option<ExpenseDraft>, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut prompt = Vec::new();
        let draft = run_dialog("Alice", &mut input, &mut prompt).expect("dialog");
        (draft, String::from_utf8(prompt).expect("utf8"))
    }

    #[test]
    fn dialog_collects_amount_then_description() {
        let (draft, prompts) = dialog("12,50\nToilet paper\n");
        let draft = draft.expect("completed");
        assert_eq!(draft.payer, "Alice");
        assert!((draft.amount - 12.5).abs() < f64::EPSILON);
        assert_eq!(draft.description, "Toilet paper");
        assert!(prompts.contains("How much"));
        assert!(prompts.contains("What was it for"));
    }

    #[test]
    fn dialog_reprompts_on_bad_amount() {
        let (draft, prompts) = dialog("abc\n7\nsoap\n");
        assert!((draft.expect("completed").amount - 7.0).abs() < f64::EPSILON);
        assert!(prompts.contains("Positive number please"));
    }

    #[test]
    fn dialog_cancels_on_command_or_eof() {
        assert!(dialog("/cancel\n").0.is_none());
        assert!(dialog("5\n").0.is_none());
    }
}

use crate::cmd::open_house;
use crate::output::{OutputMode, fail, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::Path;
use wg_core::ledger;

#[derive(Args, Debug)]
pub struct SettleArgs {
    /// Person whose debts are cleared. Money owed to them is kept.
    pub person: String,
}

#[derive(Debug, Serialize)]
struct SettleOutput {
    ok: bool,
    person: String,
    removed: usize,
}

/// Execute `wg settle <person>`.
///
/// # Errors
///
/// Returns an error for unknown people or storage failures.
pub fn run_settle(args: &SettleArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let mut house = open_house(project_root, output)?;
    let removed = ledger::settle(&mut house.conn, &args.person)
        .map_err(|e| fail(output, e.code(), e.to_string()))?;

    let result = SettleOutput {
        ok: true,
        person: args.person.trim().to_string(),
        removed,
    };
    render(output, &result, |r, w| {
        if r.removed == 0 {
            writeln!(w, "✓ {} had no debts to clear. Money owed to them remains.", r.person)
        } else {
            writeln!(
                w,
                "✓ Cleared {} debt record(s) for {}. Money owed to them remains.",
                r.removed, r.person
            )
        }
    })
}

use crate::cmd::open_house;
use crate::output::{OutputMode, fail, money, pretty_section, render_mode};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use wg_core::error::ErrorCode;
use wg_core::ledger::{self, PersonBalance};

#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Show only this person's balance.
    pub person: Option<String>,
}

#[derive(Debug, Serialize)]
struct BalanceOutput {
    balances: BTreeMap<String, PersonBalance>,
}

fn write_person(w: &mut dyn Write, name: &str, b: &PersonBalance) -> io::Result<()> {
    writeln!(w, "{name}  (net {})", signed(b.net))?;
    if b.owes.is_empty() && b.owed_by.is_empty() {
        return writeln!(w, "  all settled");
    }
    for (creditor, amount) in &b.owes {
        writeln!(w, "  ➡️ owes {creditor}: {}", money(*amount))?;
    }
    for (debtor, amount) in &b.owed_by {
        writeln!(w, "  ⬅️ {debtor} owes: {}", money(*amount))?;
    }
    Ok(())
}

fn signed(amount: f64) -> String {
    if amount < 0.0 {
        format!("-{}", money(-amount))
    } else {
        format!("+{}", money(amount))
    }
}

/// Execute `wg balance [person]`.
///
/// # Errors
///
/// Returns an error for unknown people or storage failures.
pub fn run_balance(args: &BalanceArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let house = open_house(project_root, output)?;
    let mut balances =
        ledger::aggregate(&house.conn).map_err(|e| fail(output, e.code(), e.to_string()))?;

    if let Some(name) = args.person.as_deref().map(str::trim) {
        let Some(balance) = balances.remove(name) else {
            return Err(fail(
                output,
                ErrorCode::PersonNotFound,
                format!("person '{name}' not found"),
            ));
        };
        balances = BTreeMap::from([(name.to_string(), balance)]);
    }

    let result = BalanceOutput { balances };
    render_mode(
        output,
        &result,
        |r, w| {
            for (name, b) in &r.balances {
                writeln!(w, "{name}\t{:.2}", b.net)?;
                for (creditor, amount) in &b.owes {
                    writeln!(w, "{name}\towes\t{creditor}\t{amount:.2}")?;
                }
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, "Balances")?;
            for (name, b) in &r.balances {
                write_person(w, name, b)?;
            }
            Ok(())
        },
    )
}

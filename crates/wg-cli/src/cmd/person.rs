//! `wg person`: manage the household roster.
//!
//! Registration order is rotation order, so there is no reorder command.

use crate::cmd::open_house;
use crate::output::{OutputMode, fail, pretty_section, render, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::Path;
use wg_core::model::Person;
use wg_core::people::{self, PeopleError};

#[derive(Args, Debug)]
pub struct PersonArgs {
    #[command(subcommand)]
    pub command: PersonCommand,
}

#[derive(Subcommand, Debug)]
pub enum PersonCommand {
    /// Register a person at the end of the roster.
    Add {
        name: String,
        /// Verified external identity (e.g. a chat user id).
        #[arg(long)]
        identity: Option<String>,
        /// Chat to deliver notifications to.
        #[arg(long = "chat")]
        chat_ref: Option<String>,
    },
    /// List the roster in rotation order.
    List,
    /// Remove a person. Refused while they owe or are owed money.
    Remove { name: String },
    /// Link an external identity to an existing person.
    Link { name: String, identity: String },
    /// Record the chat for an identity (what the bot's /start does).
    RegisterChat { identity: String, chat_ref: String },
}

#[derive(Debug, Serialize)]
struct PersonOutput<'a> {
    ok: bool,
    action: &'static str,
    person: &'a Person,
}

fn people_failure(output: OutputMode, error: &PeopleError) -> anyhow::Error {
    fail(output, error.code(), error.to_string())
}

fn render_person(output: OutputMode, action: &'static str, person: &Person) -> Result<()> {
    let result = PersonOutput {
        ok: true,
        action,
        person,
    };
    render(output, &result, |r, w| {
        writeln!(w, "✓ {} {} (#{})", r.action, r.person.name, r.person.id)
    })
}

/// # Errors
///
/// Returns an error when the house cannot be opened or the change is refused.
pub fn run_person(args: &PersonArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let mut house = open_house(project_root, output)?;
    let conn = &mut house.conn;

    match &args.command {
        PersonCommand::Add {
            name,
            identity,
            chat_ref,
        } => {
            let person = people::add_person(conn, name, identity.as_deref(), chat_ref.as_deref())
                .map_err(|e| people_failure(output, &e))?;
            render_person(output, "added", &person)
        }
        PersonCommand::List => {
            let roster = people::list_roster(conn)?;
            render_mode(
                output,
                &roster,
                |people, w| {
                    for p in people {
                        writeln!(
                            w,
                            "{}\t{}\t{}\t{}",
                            p.id,
                            p.name,
                            p.identity.as_deref().unwrap_or("-"),
                            p.chat_ref.as_deref().unwrap_or("-")
                        )?;
                    }
                    Ok(())
                },
                |people, w| {
                    pretty_section(w, &format!("Roster ({})", people.len()))?;
                    if people.is_empty() {
                        return writeln!(w, "Nobody yet. Add someone with `wg person add NAME`.");
                    }
                    for (position, p) in people.iter().enumerate() {
                        let chat = if p.chat_ref.is_some() { "" } else { "  (no chat)" };
                        writeln!(w, "{:>2}. {}{chat}", position + 1, p.name)?;
                    }
                    Ok(())
                },
            )
        }
        PersonCommand::Remove { name } => {
            let person =
                people::remove_person(conn, name).map_err(|e| people_failure(output, &e))?;
            render_person(output, "removed", &person)
        }
        PersonCommand::Link { name, identity } => {
            people::link_identity(conn, name, identity).map_err(|e| people_failure(output, &e))?;
            let Some(person) = people::find_by_name(conn, name)? else {
                return Err(fail(
                    output,
                    wg_core::error::ErrorCode::PersonNotFound,
                    format!("person '{name}' not found"),
                ));
            };
            render_person(output, "linked", &person)
        }
        PersonCommand::RegisterChat { identity, chat_ref } => {
            let person = people::register_chat(conn, identity, chat_ref)
                .map_err(|e| people_failure(output, &e))?;
            render_person(output, "registered chat for", &person)
        }
    }
}

//! `wg notify weekly|wednesday|due`: chat notifications, meant for cron.
//!
//! `due` decides from the weekday in the configured timezone: Sunday sends the
//! weekly assignments, Wednesday the Toilet reminder, other days nothing.
//!
//! ```text
//! 0 10 * * *  cd /srv/house && wg notify due
//! ```

use crate::cmd::{House, config_failure, open_house, parse_date};
use crate::output::{OutputMode, pretty_kv, render};
use anyhow::Result;
use chrono::{Datelike, NaiveDate, Weekday};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;
use wg_core::config;
use wg_core::notify::{
    DeliveryError, DispatchReport, Notifier, send_wednesday_reminders, send_weekly_assignments,
};

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Args, Debug)]
pub struct NotifyArgs {
    #[command(subcommand)]
    pub command: NotifyCommand,

    /// Print messages instead of sending them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Pretend today is this date (YYYY-MM-DD).
    #[arg(long, global = true, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommand {
    /// Send everyone their tasks for this week.
    Weekly {
        /// Also ping people without a task this week.
        #[arg(long)]
        force: bool,
    },
    /// Remind this week's Toilet holder of the Wednesday repeat.
    Wednesday,
    /// Run whichever job is due today.
    Due,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Job {
    Weekly,
    Wednesday,
}

#[derive(Debug, Serialize)]
struct NotifyOutput {
    today: NaiveDate,
    job: Option<Job>,
    dry_run: bool,
    report: DispatchReport,
}

/// Sends through the Telegram Bot API.
pub struct TelegramNotifier {
    agent: ureq::Agent,
    api_base: String,
    token: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: String) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(SEND_TIMEOUT).build(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn redact(&self, text: &str) -> String {
        text.replace(&self.token, "<redacted>")
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, chat_ref: &str, text: &str) -> Result<(), DeliveryError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let body = serde_json::json!({ "chat_id": chat_ref, "text": text });

        match self.agent.post(&url).send_json(body) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(403, response)) => Err(DeliveryError::Unreachable(
                self.redact(&response.into_string().unwrap_or_default()),
            )),
            Err(ureq::Error::Status(code, response)) => Err(DeliveryError::Failed(format!(
                "HTTP {code}: {}",
                self.redact(&response.into_string().unwrap_or_default())
            ))),
            Err(err) => Err(DeliveryError::Failed(self.redact(&err.to_string()))),
        }
    }
}

/// Prints each message instead of delivering it.
pub struct StdoutNotifier<W: Write> {
    out: Mutex<W>,
}

impl<W: Write> StdoutNotifier<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl<W: Write> Notifier for StdoutNotifier<W> {
    fn send(&self, chat_ref: &str, text: &str) -> Result<(), DeliveryError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| DeliveryError::Failed("output lock poisoned".to_string()))?;
        writeln!(out, "→ {chat_ref}\n{}\n", text.trim_end())
            .map_err(|e| DeliveryError::Failed(e.to_string()))
    }
}

fn job_for(today: NaiveDate) -> Option<Job> {
    match today.weekday() {
        Weekday::Sun => Some(Job::Weekly),
        Weekday::Wed => Some(Job::Wednesday),
        _ => None,
    }
}

fn dispatch(
    house: &House,
    notifier: &dyn Notifier,
    job: Job,
    today: NaiveDate,
    force: bool,
) -> Result<DispatchReport> {
    let rotation = house.rotation();
    match job {
        Job::Weekly => send_weekly_assignments(&house.conn, notifier, rotation, today, force),
        Job::Wednesday => send_wednesday_reminders(&house.conn, notifier, rotation, today),
    }
}

/// # Errors
///
/// Returns an error when the house cannot be opened, the bot token is missing
/// for a real send, or storage fails mid-run.
pub fn run_notify(args: &NotifyArgs, output: OutputMode, project_root: &std::path::Path) -> Result<()> {
    let house = open_house(project_root, output)?;
    let today = house.day(args.date);

    let (job, force) = match &args.command {
        NotifyCommand::Weekly { force } => (Some(Job::Weekly), *force),
        NotifyCommand::Wednesday => (Some(Job::Wednesday), false),
        NotifyCommand::Due => (job_for(today), false),
    };
    let force = force || house.config.notify.force_weekly;

    let report = match job {
        None => {
            tracing::info!(%today, "no notification due today");
            DispatchReport::default()
        }
        Some(job) if args.dry_run => {
            // In JSON mode the preview goes to stderr so stdout stays parseable.
            if output.is_json() {
                dispatch(&house, &StdoutNotifier::new(std::io::stderr()), job, today, force)?
            } else {
                dispatch(&house, &StdoutNotifier::new(std::io::stdout()), job, today, force)?
            }
        }
        Some(job) => {
            let token = config::bot_token(&house.config).map_err(|e| config_failure(output, &e))?;
            let notifier = TelegramNotifier::new(&house.config.notify.api_base, token);
            dispatch(&house, &notifier, job, today, force)?
        }
    };

    let result = NotifyOutput {
        today,
        job,
        dry_run: args.dry_run,
        report,
    };
    render(output, &result, |r, w| {
        let Some(job) = r.job else {
            return writeln!(w, "Nothing due on {}.", r.today.format("%A %d/%m/%Y"));
        };
        let label = match job {
            Job::Weekly => "weekly assignments",
            Job::Wednesday => "wednesday reminder",
        };
        writeln!(w, "✓ {label}{}", if r.dry_run { " (dry run)" } else { "" })?;
        pretty_kv(w, "Sent", r.report.sent.to_string())?;
        pretty_kv(w, "Failed", r.report.failed.to_string())?;
        pretty_kv(w, "No chat", r.report.no_chat.to_string())?;
        if !r.report.cleared.is_empty() {
            pretty_kv(w, "Cleared", r.report.cleared.join(", "))?;
        }
        Ok(())
    })
}

#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "wg: cleaning rotation and shared expenses for a shared flat",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format (overrides FORMAT and TTY detection).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a house",
        long_about = "Create .wg/ with a default config and an empty house database.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    wg init\n\n    # Reset config.toml to the defaults\n    wg init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Manage the roster",
        long_about = "Add, list, link, and remove household members. Registration order is rotation order.",
        after_help = "EXAMPLES:\n    # Register people\n    wg person add Alice --identity tg:1001\n    wg person add Bob\n\n    # Show the roster\n    wg person list\n\n    # Attach a chat for notifications\n    wg person register-chat tg:1001 1001"
    )]
    Person(cmd::person::PersonArgs),

    #[command(
        next_help_heading = "Cleaning",
        about = "Show the upcoming cleaning schedule",
        long_about = "Show who cleans what for the coming weeks.",
        after_help = "EXAMPLES:\n    # Next four weeks\n    wg schedule\n\n    # Eight weeks as JSON\n    wg schedule --weeks 8 --json"
    )]
    Schedule(cmd::schedule::ScheduleArgs),

    #[command(
        next_help_heading = "Cleaning",
        about = "Show one person's tasks",
        long_about = "Show a person's tasks for this week or a later one.",
        after_help = "EXAMPLES:\n    # This week\n    wg tasks Alice\n\n    # Next week\n    wg tasks Alice --offset 1"
    )]
    Tasks(cmd::tasks::TasksArgs),

    #[command(
        next_help_heading = "Money",
        about = "Record or list expenses",
        long_about = "Record a shared expense (split evenly) or show the expense log.",
        after_help = "EXAMPLES:\n    # Split with the whole house\n    wg expense add Alice 12.50 -d \"Toilet paper\"\n\n    # Split with some people only\n    wg expense add Alice 30 --with Bob,Carol\n\n    # Be asked for amount and description\n    wg expense add Alice\n\n    # Last ten expenses\n    wg expense list -n 10"
    )]
    Expense(cmd::expense::ExpenseArgs),

    #[command(
        next_help_heading = "Money",
        about = "Show who owes whom",
        long_about = "Show netted balances for everyone, or for one person.",
        after_help = "EXAMPLES:\n    # Everyone\n    wg balance\n\n    # One person as JSON\n    wg balance Alice --json"
    )]
    Balance(cmd::balance::BalanceArgs),

    #[command(
        next_help_heading = "Money",
        about = "Clear a person's debts",
        long_about = "Delete every debt the person owes. Money owed to them is kept.",
        after_help = "EXAMPLES:\n    wg settle Bob"
    )]
    Settle(cmd::settle::SettleArgs),

    #[command(
        next_help_heading = "Notifications",
        about = "Send chat notifications",
        long_about = "Send weekly assignments or the Wednesday reminder. `due` picks the job for today.",
        after_help = "EXAMPLES:\n    # Preview this week's messages\n    wg notify weekly --dry-run\n\n    # From cron, once a day\n    wg notify due"
    )]
    Notify(cmd::notify::NotifyArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    wg completions bash > /etc/bash_completion.d/wg"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("WG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "wg=debug,info"
        } else {
            "wg=info,warn"
        })
    });

    let format = env::var("WG_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries command output.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_root = std::env::current_dir()?;
    let output = cli.output_mode();
    debug!(?output, "starting");

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, cli.quiet, &project_root),
        Commands::Person(args) => cmd::person::run_person(args, output, &project_root),
        Commands::Schedule(args) => cmd::schedule::run_schedule(args, output, &project_root),
        Commands::Tasks(args) => cmd::tasks::run_tasks(args, output, &project_root),
        Commands::Expense(args) => cmd::expense::run_expense(args, output, &project_root),
        Commands::Balance(args) => cmd::balance::run_balance(args, output, &project_root),
        Commands::Settle(args) => cmd::settle::run_settle(args, output, &project_root),
        Commands::Notify(args) => cmd::notify::run_notify(args, output, &project_root),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

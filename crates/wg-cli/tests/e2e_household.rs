//! E2E workflow tests for the `wg` binary.
//!
//! Each test runs `wg` as a subprocess in an isolated temp directory with a
//! pinned epoch and timezone, so schedules are reproducible.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the `wg` binary, rooted in `dir`.
fn wg_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("wg"));
    cmd.current_dir(dir);
    cmd.env("WG_EPOCH_DATE", "2024-01-07");
    cmd.env("WG_TIMEZONE", "UTC");
    cmd.env("WG_LOG", "error");
    cmd.env_remove("WG_BOT_TOKEN");
    cmd.env_remove("FORMAT");
    cmd
}

fn init_house() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    wg_cmd(dir.path()).args(["init", "-q"]).assert().success();
    dir
}

fn add_person(dir: &Path, name: &str, chat: Option<&str>) {
    let mut cmd = wg_cmd(dir);
    cmd.args(["person", "add", name, "--json"]);
    if let Some(chat) = chat {
        cmd.args(["--chat", chat]);
    }
    cmd.assert().success();
}

fn house_of_four() -> TempDir {
    let dir = init_house();
    for (name, chat) in [("Alice", "1"), ("Bob", "2"), ("Carol", "3"), ("Dave", "4")] {
        add_person(dir.path(), name, Some(chat));
    }
    dir
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("wg should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

fn json_stderr_error(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("wg should not crash");
    assert!(!output.status.success(), "command should fail");
    let value: Value =
        serde_json::from_slice(&output.stderr).expect("stderr should be valid JSON");
    value["error"].clone()
}

fn approx(value: &Value, expected: f64) -> bool {
    value.as_f64().is_some_and(|v| (v - expected).abs() < 0.001)
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

#[test]
fn init_creates_house_and_is_rerunnable() {
    let dir = TempDir::new().expect("temp dir");
    let first = json_stdout(wg_cmd(dir.path()).args(["init", "--json"]));
    assert_eq!(first["ok"], true);
    assert_eq!(first["config_written"], true);
    assert!(dir.path().join(".wg/config.toml").exists());
    assert!(dir.path().join(".wg/house.db").exists());

    let second = json_stdout(wg_cmd(dir.path()).args(["init", "--json"]));
    assert_eq!(second["config_written"], false);
}

#[test]
fn commands_without_house_report_not_initialized() {
    let dir = TempDir::new().expect("temp dir");
    let error = json_stderr_error(wg_cmd(dir.path()).args(["schedule", "--json"]));
    assert_eq!(error["error_code"], "E1001");
    assert!(error["suggestion"].as_str().is_some_and(|s| s.contains("wg init")));
}

#[test]
fn roster_lists_people_in_registration_order() {
    let dir = house_of_four();
    let roster = json_stdout(wg_cmd(dir.path()).args(["person", "list", "--json"]));
    let names: Vec<&str> = roster
        .as_array()
        .expect("array")
        .iter()
        .map(|p| p["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, ["Alice", "Bob", "Carol", "Dave"]);
    assert_eq!(roster[0]["chat_ref"], "1");
}

#[test]
fn duplicate_person_is_rejected() {
    let dir = init_house();
    add_person(dir.path(), "Alice", None);
    let error = json_stderr_error(wg_cmd(dir.path()).args(["person", "add", "Alice", "--json"]));
    assert_eq!(error["error_code"], "E2002");
}

#[test]
fn invalid_epoch_is_a_config_error() {
    let dir = init_house();
    let error = json_stderr_error(
        wg_cmd(dir.path())
            .env("WG_EPOCH_DATE", "not-a-date")
            .args(["schedule", "--json"]),
    );
    assert_eq!(error["error_code"], "E1002");
}

// ---------------------------------------------------------------------------
// Cleaning schedule
// ---------------------------------------------------------------------------

#[test]
fn schedule_rotates_four_people() {
    let dir = house_of_four();
    let schedule = json_stdout(wg_cmd(dir.path()).args([
        "schedule", "--json", "--date", "2024-01-03", "--weeks", "4",
    ]));

    assert_eq!(schedule["epoch"], "2024-01-07");
    assert_eq!(schedule["timezone"], "UTC");
    let weeks = schedule["weeks"].as_array().expect("weeks");
    assert_eq!(weeks.len(), 4);
    assert_eq!(weeks[0]["date"], "2024-01-07");
    assert_eq!(weeks[0]["kitchen"], "Alice & Bob");
    assert_eq!(weeks[0]["bathroom"], "Carol");
    assert_eq!(weeks[0]["toilet"], "Dave");
    assert_eq!(weeks[3]["date"], "2024-01-28");
    assert_eq!(weeks[3]["kitchen"], "Dave & Alice");
}

#[test]
fn schedule_with_empty_roster_has_no_rows() {
    let dir = init_house();
    let schedule = json_stdout(wg_cmd(dir.path()).args(["schedule", "--json"]));
    assert_eq!(schedule["weeks"].as_array().map(Vec::len), Some(0));
}

#[test]
fn tasks_show_wednesday_repeat_for_toilet() {
    let dir = house_of_four();
    let tasks = json_stdout(wg_cmd(dir.path()).args([
        "tasks", "Dave", "--json", "--date", "2024-01-07",
    ]));
    assert_eq!(tasks["week"], "2024-01-07");
    assert_eq!(tasks["tasks"][0]["task"], "Toilet");
    assert_eq!(tasks["tasks"][0]["midweek"], "2024-01-10");
}

#[test]
fn tasks_for_unknown_person_fails() {
    let dir = house_of_four();
    let error = json_stderr_error(wg_cmd(dir.path()).args(["tasks", "Zed", "--json"]));
    assert_eq!(error["error_code"], "E2001");
}

// ---------------------------------------------------------------------------
// Expenses and balances
// ---------------------------------------------------------------------------

#[test]
fn expenses_net_between_pairs() {
    let dir = house_of_four();
    let added = json_stdout(wg_cmd(dir.path()).args([
        "expense", "add", "Alice", "40", "-d", "Groceries", "--json",
    ]));
    assert_eq!(added["expense"]["participants"], 4);
    wg_cmd(dir.path())
        .args(["expense", "add", "Bob", "20,00", "--json"])
        .assert()
        .success();

    let balance = json_stdout(wg_cmd(dir.path()).args(["balance", "--json"]));
    let alice = &balance["balances"]["Alice"];
    assert!(approx(&alice["owed_by"]["Bob"], 5.0));
    assert!(approx(&alice["owed_by"]["Carol"], 10.0));
    assert!(alice["owes"].get("Bob").is_none());

    let bob = &balance["balances"]["Bob"];
    assert!(approx(&bob["owes"]["Alice"], 5.0));
    assert!(approx(&bob["owed_by"]["Dave"], 5.0));
}

#[test]
fn expense_split_with_subset() {
    let dir = house_of_four();
    json_stdout(wg_cmd(dir.path()).args([
        "expense", "add", "Alice", "30", "--with", "Bob,Carol", "--json",
    ]));
    let balance = json_stdout(wg_cmd(dir.path()).args(["balance", "Dave", "--json"]));
    let dave = &balance["balances"]["Dave"];
    assert!(dave["owes"].as_object().is_some_and(serde_json::Map::is_empty));

    let balance = json_stdout(wg_cmd(dir.path()).args(["balance", "Bob", "--json"]));
    assert!(approx(&balance["balances"]["Bob"]["owes"]["Alice"], 10.0));
}

#[test]
fn invalid_amount_is_rejected() {
    let dir = house_of_four();
    let error = json_stderr_error(wg_cmd(dir.path()).args(["expense", "add", "Alice", "abc", "--json"]));
    assert_eq!(error["error_code"], "E2003");
}

#[test]
fn interactive_expense_reads_stdin() {
    let dir = house_of_four();
    let added = json_stdout(
        wg_cmd(dir.path())
            .args(["expense", "add", "Carol", "--json"])
            .write_stdin("oops\n9\nSnacks\n"),
    );
    assert!(approx(&added["expense"]["amount"], 9.0));
    assert_eq!(added["expense"]["description"], "Snacks");

    let log = json_stdout(wg_cmd(dir.path()).args(["expense", "list", "--json"]));
    assert_eq!(log[0]["payer"], "Carol");
}

#[test]
fn settle_clears_only_what_the_person_owes() {
    let dir = house_of_four();
    wg_cmd(dir.path())
        .args(["expense", "add", "Alice", "40", "--json"])
        .assert()
        .success();
    wg_cmd(dir.path())
        .args(["expense", "add", "Bob", "80", "--json"])
        .assert()
        .success();

    let settled = json_stdout(wg_cmd(dir.path()).args(["settle", "Alice", "--json"]));
    assert_eq!(settled["removed"], 1);

    let balance = json_stdout(wg_cmd(dir.path()).args(["balance", "--json"]));
    let alice = &balance["balances"]["Alice"];
    assert!(alice["owes"].as_object().is_some_and(serde_json::Map::is_empty));
    assert!(approx(&balance["balances"]["Bob"]["owed_by"]["Carol"], 20.0));
}

#[test]
fn person_with_debts_cannot_be_removed() {
    let dir = house_of_four();
    wg_cmd(dir.path())
        .args(["expense", "add", "Alice", "40", "--json"])
        .assert()
        .success();
    let error = json_stderr_error(wg_cmd(dir.path()).args(["person", "remove", "Bob", "--json"]));
    assert_eq!(error["error_code"], "E2005");

    wg_cmd(dir.path()).args(["settle", "Bob"]).assert().success();
    // Alice is still owed by Carol and Dave.
    wg_cmd(dir.path())
        .args(["person", "remove", "Bob", "--json"])
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[test]
fn weekly_dry_run_prints_messages() {
    let dir = house_of_four();
    wg_cmd(dir.path())
        .args(["--format", "text", "notify", "weekly", "--dry-run", "--date", "2024-01-07"])
        .assert()
        .success()
        .stdout(predicate::str::contains("→ 4"))
        .stdout(predicate::str::contains(
            "Hi Dave! Your cleaning tasks for the week starting Sunday, 07/01/2024:",
        ))
        .stdout(predicate::str::contains("(Remember, also on Wednesday, 10/01/2024)"));
}

#[test]
fn due_on_wednesday_reminds_toilet_holder() {
    let dir = house_of_four();
    let output = wg_cmd(dir.path())
        .args(["notify", "due", "--dry-run", "--date", "2024-01-10", "--json"])
        .output()
        .expect("wg should not crash");
    assert!(output.status.success());

    let result: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(result["job"], "wednesday");
    assert_eq!(result["report"]["week"], "2024-01-07");
    assert_eq!(result["report"]["sent"], 1);

    let preview = String::from_utf8_lossy(&output.stderr);
    assert!(preview.contains("→ 4"));
    assert!(preview.contains("Today, 10/01/2024, is your mid-week toilet cleaning day!"));
}

#[test]
fn due_on_other_days_does_nothing() {
    let dir = house_of_four();
    let result = json_stdout(wg_cmd(dir.path()).args([
        "notify", "due", "--date", "2024-01-09", "--json",
    ]));
    assert!(result["job"].is_null());
    assert_eq!(result["report"]["sent"], 0);
}

#[test]
fn real_send_without_token_fails() {
    let dir = house_of_four();
    let error = json_stderr_error(wg_cmd(dir.path()).args([
        "notify", "weekly", "--date", "2024-01-07", "--json",
    ]));
    assert_eq!(error["error_code"], "E1003");
}

#[test]
fn completions_are_generated() {
    let dir = TempDir::new().expect("temp dir");
    wg_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wg"));
}

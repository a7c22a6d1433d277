use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use uuid::Uuid;

const OWNER: &str = "owner@example.com";

fn unique_workspace(prefix: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{prefix}-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&path).expect("workspace should be creatable");
    path
}

fn run_networking(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_networking"))
        .env_remove("NETWORKING_USER")
        .env("NO_COLOR", "1")
        .arg("--db")
        .arg(root.join("db/networking.sqlite"))
        .arg("--config")
        .arg(root.join("missing.toml"))
        .args(args)
        .output()
        .expect("networking command should run")
}

fn run_as_owner(root: &Path, args: &[&str]) -> Output {
    let mut full = vec!["--user", OWNER];
    full.extend_from_slice(args);
    run_networking(root, &full)
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "expected success but failed.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "expected failure but command succeeded.\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn json(output: &Output) -> Value {
    assert_success(output);
    serde_json::from_slice(&output.stdout).expect("command should emit json")
}

fn parse_created_id(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .split_whitespace()
        .find_map(|word| word.strip_prefix('#'))
        .expect("created output should include an id")
        .to_string()
}

#[test]
fn contact_and_interaction_commands_dispatch() {
    let root = unique_workspace("networking-cli-dispatch");
    assert_success(&run_networking(&root, &["user", "add", OWNER, "--name", "Owner"]));

    let users = json(&run_networking(&root, &["user", "list", "--json"]));
    assert_eq!(users.as_array().map_or(0, Vec::len), 1);

    let ada = run_as_owner(
        &root,
        &["contact", "add", "Ada Lovelace", "-f", "14", "-e", "ada@example.com"],
    );
    assert_success(&ada);
    let ada_id = parse_created_id(&ada);

    let hidden = run_as_owner(&root, &["contact", "add", "Someone Hidden"]);
    assert_success(&hidden);

    let listed = json(&run_as_owner(&root, &["contact", "list", "--json"]));
    let contacts = listed["contacts"].as_array().expect("contacts array");
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0]["name"], "Ada Lovelace");
    assert_eq!(listed["counts"]["hidden"], 1);

    let hidden_list = json(&run_as_owner(
        &root,
        &["contact", "list", "--status", "2", "--json"],
    ));
    assert_eq!(hidden_list["contacts"][0]["name"], "Someone Hidden");

    assert_success(&run_as_owner(&root, &["touch", &ada_id]));
    let shown = json(&run_as_owner(&root, &["contact", "show", &ada_id, "--json"]));
    assert_eq!(shown["status"], "in_touch");
    assert_eq!(shown["emails"][0]["email"], "ada@example.com");
    assert_eq!(shown["interactions"].as_array().map_or(0, Vec::len), 1);

    assert_success(&run_as_owner(
        &root,
        &[
            "interaction",
            "add",
            "Lunch",
            "-c",
            &ada_id,
            "--type",
            "note",
            "--was-at",
            "2026-01-05T12:00:00Z",
        ],
    ));
    let interactions = json(&run_as_owner(&root, &["interaction", "list", "--json"]));
    let titles = interactions
        .as_array()
        .expect("interaction array")
        .iter()
        .filter_map(|interaction| interaction["title"].as_str())
        .collect::<Vec<_>>();
    assert!(titles.contains(&"Lunch"), "titles: {titles:?}");

    let dashboard = json(&run_as_owner(&root, &["dashboard", "--json"]));
    assert_eq!(dashboard["counts"]["in_touch"], 1);

    let terminal = run_as_owner(&root, &["contact", "list"]);
    assert_success(&terminal);
    assert!(String::from_utf8_lossy(&terminal.stdout).contains("[IN_TOUCH] Ada Lovelace"));

    assert_success(&run_as_owner(&root, &["contact", "delete", &ada_id]));
    assert_failure(&run_as_owner(&root, &["contact", "show", &ada_id]));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn import_and_duplicate_commands_dispatch() {
    let root = unique_workspace("networking-cli-import");
    assert_success(&run_networking(&root, &["user", "add", OWNER]));

    let csv = root.join("people.csv");
    std::fs::write(
        &csv,
        "name,email\nAda Lovelace,ada@example.com\nAda Lovelace,ada.l@example.com\n,broken\n",
    )
    .expect("csv should be writable");
    let csv_arg = csv.to_str().expect("utf8 path");

    let dry = json(&run_as_owner(&root, &["import", "csv", csv_arg, "--dry-run", "--json"]));
    assert_eq!(dry["dry_run"], true);
    assert_eq!(dry["imported_count"], 2);

    let summary = json(&run_as_owner(&root, &["import", "csv", csv_arg, "--json"]));
    assert_eq!(summary["processed_count"], 3);
    assert_eq!(summary["imported_count"], 2);
    assert_eq!(summary["error_count"], 1);
    assert_eq!(summary["status"], "partial");

    let statuses = json(&run_as_owner(&root, &["import", "status", "--json"]));
    assert_eq!(statuses.as_array().map_or(0, Vec::len), 1);

    let duplicates = json(&run_as_owner(
        &root,
        &["duplicates", "compute", "--min-similarity", "0.5", "--json"],
    ));
    assert_eq!(duplicates["contacts_scanned"], 2);
    assert!(duplicates["suggestions_stored"].as_u64().unwrap_or(0) >= 2);

    assert_failure(&run_as_owner(
        &root,
        &["duplicates", "compute", "--min-similarity", "1.0"],
    ));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn commands_fail_without_a_known_user() {
    let root = unique_workspace("networking-cli-user");

    let no_user = run_networking(&root, &["dashboard"]);
    assert_failure(&no_user);
    assert!(String::from_utf8_lossy(&no_user.stderr).contains("--user"));

    let unknown = run_as_owner(&root, &["contact", "list"]);
    assert_failure(&unknown);
    assert!(String::from_utf8_lossy(&unknown.stderr).contains("not found"));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn seed_populates_contacts() {
    let root = unique_workspace("networking-cli-seed");
    assert_success(&run_networking(&root, &["user", "add", OWNER]));

    assert_success(&run_as_owner(
        &root,
        &["seed", "--contacts", "5", "--interactions", "2", "--seed", "9"],
    ));
    let listed = json(&run_as_owner(&root, &["contact", "list", "--json"]));
    assert_eq!(listed["counts"]["selected"], 5);
    let interactions = json(&run_as_owner(&root, &["interaction", "list", "--json"]));
    assert_eq!(interactions.as_array().map_or(0, Vec::len), 10);

    let _ = std::fs::remove_dir_all(root);
}

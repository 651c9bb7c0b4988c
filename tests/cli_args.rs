//! Integration tests for the foodlens binary
//!
//! Exercises argument handling and the offline custom-product commands.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Helper to run the CLI with given args against a private data directory
fn run_cli(data_dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_foodlens"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .env_remove("FOODLENS_DATA_DIR")
        .env_remove("FOODLENS_HTTP_TIMEOUT_SECS")
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute foodlens")
}

#[test]
fn test_help_flag_exits_successfully() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("foodlens"), "Help should mention foodlens");
    assert!(stdout.contains("barcode"), "Help should list the barcode command");
    assert!(stdout.contains("search"), "Help should list the search command");
    assert!(stdout.contains("custom"), "Help should list the custom command");
}

#[test]
fn test_missing_subcommand_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &[]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_source_prints_error_and_exits() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &["details", "1", "--source", "edamam"]);
    assert!(!output.status.success(), "Expected invalid source to fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid source") || stderr.contains("invalid value"),
        "Should print error message about invalid source: {}",
        stderr
    );
}

#[test]
fn test_invalid_timeout_env_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_foodlens"))
        .args(["--data-dir"])
        .arg(temp_dir.path())
        .args(["custom", "list"])
        .env("FOODLENS_HTTP_TIMEOUT_SECS", "soon")
        .output()
        .expect("Failed to execute foodlens");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("FOODLENS_HTTP_TIMEOUT_SECS"), "stderr: {}", stderr);
}

#[test]
fn test_custom_product_lifecycle() {
    let temp_dir = TempDir::new().unwrap();

    let output = run_cli(
        temp_dir.path(),
        &[
            "--json", "custom", "add", "--name", "Overnight oats", "--calories", "350",
            "--protein", "12", "--carbs", "55", "--fat", "9", "--serving-size", "250",
        ],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let created: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("add --json should print JSON");
    assert_eq!(created["source"], "Custom");
    assert_eq!(created["servingSize"], 250.0);
    let id = created["id"].as_str().expect("id should be a string").to_string();
    assert!(id.starts_with("custom-"));

    let output = run_cli(temp_dir.path(), &["--json", "custom", "list"]);
    assert!(output.status.success());
    let listed: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());

    let output = run_cli(temp_dir.path(), &["details", &id, "--source", "custom", "--amount", "125"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Overnight oats"));
    assert!(stdout.contains("175 kcal"), "Scaled output: {}", stdout);

    let output = run_cli(temp_dir.path(), &["custom", "delete", &id]);
    assert!(output.status.success());

    let output = run_cli(temp_dir.path(), &["custom", "delete", &id]);
    assert!(!output.status.success(), "Deleting twice should fail");

    let output = run_cli(temp_dir.path(), &["--json", "custom", "list"]);
    let listed: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(listed.is_empty());
}

#[test]
fn test_non_finite_custom_values_are_rejected_and_list_survives() {
    let temp_dir = TempDir::new().unwrap();
    let base = ["custom", "add", "--protein", "1", "--carbs", "2", "--fat", "3"];

    let output = run_cli(temp_dir.path(), &[&base[..], &["--name", "Good", "--calories", "10"][..]].concat());
    assert!(output.status.success());

    let output = run_cli(temp_dir.path(), &[&base[..], &["--name", "Bad", "--calories", "nan"][..]].concat());
    assert!(!output.status.success(), "NaN calories should be rejected");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid quantity"));

    let output = run_cli(temp_dir.path(), &["details", "1", "--source", "usda", "--amount=-5"]);
    assert!(!output.status.success(), "Negative amount should be rejected");

    let output = run_cli(temp_dir.path(), &["--json", "custom", "list"]);
    let listed: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["name"], "Good");
}

#[test]
fn test_unknown_custom_details_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &["details", "custom-0-none", "--source", "custom"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No Custom product found"));
}

#[test]
fn test_malformed_barcode_finds_nothing_without_network() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_cli(temp_dir.path(), &["barcode", "not/a/barcode"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No product found"));
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use foodlens::cli::{parse_source_arg, Cli, Command, CustomCommand};
    use foodlens::FoodSource;

    #[test]
    fn test_cli_search_with_limit() {
        let cli = Cli::parse_from(["foodlens", "search", "oat milk", "--limit", "5"]);
        match cli.command {
            Command::Search { query, limit } => {
                assert_eq!(query, "oat milk");
                assert_eq!(limit, 5);
            }
            other => panic!("Expected search, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_zero_limit_is_rejected() {
        assert!(Cli::try_parse_from(["foodlens", "search", "x", "--limit", "0"]).is_err());
    }

    #[test]
    fn test_cli_custom_list() {
        let cli = Cli::parse_from(["foodlens", "custom", "list"]);
        assert!(matches!(cli.command, Command::Custom(CustomCommand::List)));
    }

    #[test]
    fn test_parse_source_arg_returns_sources() {
        assert_eq!(parse_source_arg("USDA").unwrap(), FoodSource::Usda);
        assert_eq!(parse_source_arg("openfoodfacts").unwrap(), FoodSource::OpenFoodFacts);
        assert!(parse_source_arg("invalid").is_err());
    }
}

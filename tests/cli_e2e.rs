//! End-to-end tests for the `nvg` subcommands.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[allow(deprecated)]
fn nvg() -> Command {
    let mut cmd = Command::cargo_bin("nvg").expect("failed to find binary");
    cmd.env_clear().env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_subcommand_blocks_with_exit_2() {
    nvg()
        .args(["test", "git commit --no-verify -m 'wip'"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("BLOCKED"))
        .stdout(predicate::str::contains("Verb:    commit"))
        .stdout(predicate::str::contains("pre-commit and commit-msg hooks"));
}

#[test]
fn test_subcommand_allows_with_exit_0() {
    nvg()
        .args(["test", "git commit -m 'Added --no-verify to docs'"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ALLOWED"));
}

#[test]
fn test_subcommand_json_output() {
    let output = nvg()
        .args(["test", "--format", "json", "git push -n"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).expect("valid JSON");
    assert_eq!(value["command"], "git push -n");
    assert_eq!(value["outcome"], "block");
    assert_eq!(value["detection"]["verb"], "push");
    assert_eq!(value["detection"]["flag"], "-n");
    assert_eq!(value["detection"]["flag_index"], 2);
}

#[test]
fn tokens_subcommand_shows_quote_kinds() {
    nvg()
        .args(["tokens", "git commit -m \"a b\" --no-verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("double"))
        .stdout(predicate::str::contains("\"a b\""))
        .stdout(predicate::str::contains("\"--no-verify\""));
}

#[test]
fn init_writes_sample_config() {
    let dir = tempdir().expect("failed to create temp dir");
    let path = dir.path().join("config.toml");
    let path_str = path.to_string_lossy().to_string();

    nvg()
        .args(["init", "--output", &path_str])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"));
    assert!(std::fs::read_to_string(&path).unwrap().contains("[general]"));

    nvg()
        .args(["init", "--output", &path_str])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Use --force to overwrite"));

    nvg().args(["init", "--output", &path_str, "--force"]).assert().success();
}

#[test]
fn init_without_output_prints_sample() {
    nvg()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("[logging]"));
}

#[test]
fn config_swallows_parse_error() {
    let dir = tempdir().expect("failed to create temp dir");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        "[general]\nverbose = true\ncolor = \"always\"\ninvalid_syntax_here = \n",
    )
    .expect("failed to write config file");

    nvg()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env("NVG_CONFIG", &config_path)
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("verbose = false"));
}

#[test]
fn config_reflects_explicit_file() {
    let dir = tempdir().expect("failed to create temp dir");
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[general]\ncolor = \"never\"\n").expect("write config");

    nvg()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env("NVG_CONFIG", &config_path)
        .current_dir(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("color = \"never\""));
}

#[test]
fn config_lists_project_file_as_a_source() {
    let dir = tempdir().expect("failed to create temp dir");
    let repo = dir.path().join("repo");
    std::fs::create_dir_all(repo.join(".git")).expect("create .git");
    std::fs::write(repo.join(".nvg.toml"), "[general]\nverbose = true\n")
        .expect("write project config");

    nvg()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .current_dir(&repo)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("#   project: "))
        .stdout(predicate::str::contains(".nvg.toml"))
        .stdout(predicate::str::contains("verbose = true"));
}

#[test]
fn version_banner_names_the_tool() {
    nvg()
        .arg("--version")
        .assert()
        .success()
        .stderr(predicate::str::contains("nvg v"));
}

#[test]
fn unknown_flag_fails_without_reading_stdin() {
    nvg()
        .arg("--definitely-not-a-flag")
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

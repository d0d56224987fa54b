use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn write_config(dir: &Path, file_name: &str, body: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    fs::write(&config_path, body).expect("write config");
    config_path
}

fn write_valid_config(dir: &Path, file_name: &str) -> PathBuf {
    let db_path = dir.join("data").join("realms.db");
    write_config(
        dir,
        file_name,
        &format!(
            r#"
name = "realm-mgr-cli-test"
env = "dev"

[bind.grpc]
ip = "127.0.0.1"
port = 39951

[database]
backend = "sqlite"

[database.sqlite]
path = "{db}"

[observability]
filter_level = "info"

[observability.log]
output = "console"
"#,
            db = db_path.display()
        ),
    )
}

fn write_warning_only_config(dir: &Path, file_name: &str) -> PathBuf {
    write_config(
        dir,
        file_name,
        r#"
name = "realm-mgr-cli-warning-test"
env = "prod"

[bind.grpc]
ip = "127.0.0.1"
port = 39952

[database]
backend = "memory"

[observability.log]
output = "console"
rotate = false
"#,
    )
}

fn write_validation_error_config(dir: &Path, file_name: &str) -> PathBuf {
    write_config(
        dir,
        file_name,
        r#"
name = "realm-mgr-cli-validation-error-test"
env = "dev"

# Privileged port triggers a validation error.
[bind.grpc]
ip = "127.0.0.1"
port = 80

[database]
backend = "memory"
"#,
    )
}

fn run_realm_mgr(args: &[&str], current_dir: Option<&Path>) -> Output {
    let mut cmd = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_realm-mgr")));
    cmd.args(args);
    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }
    cmd.output().expect("run realm-mgr command")
}

#[test]
fn realm_mgr_test_command_accepts_explicit_valid_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_valid_config(temp.path(), "valid.toml");
    let output = run_realm_mgr(&["test", config_path.to_str().expect("utf8 path")], None);

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn realm_mgr_test_command_finds_default_config_in_current_directory() {
    let temp = tempfile::tempdir().expect("temp dir");
    write_valid_config(temp.path(), "config.toml");
    let output = run_realm_mgr(&["test"], Some(temp.path()));

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn realm_mgr_test_command_fails_for_missing_custom_config_path() {
    let temp = tempfile::tempdir().expect("temp dir");
    let missing_path = temp.path().join("missing.toml");
    let output = run_realm_mgr(&["test", missing_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("Config file not found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn realm_mgr_test_command_fails_when_no_default_config_exists() {
    let temp = tempfile::tempdir().expect("temp dir");
    let output = run_realm_mgr(&["test"], Some(temp.path()));
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("No configuration file found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn realm_mgr_test_command_fails_for_invalid_config_content() {
    let temp = tempfile::tempdir().expect("temp dir");
    let bad_path = temp.path().join("bad.toml");
    fs::write(&bad_path, "name = \"broken\"\nenv = [\n").expect("write invalid toml");

    let output = run_realm_mgr(&["test", bad_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(stderr.contains("配置解析失败"), "unexpected stderr: {stderr}");
}

#[test]
fn realm_mgr_test_command_fails_for_validation_errors() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_validation_error_config(temp.path(), "validation-error.toml");
    let output = run_realm_mgr(&["test", config_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("配置验证失败") && stderr.contains("bind.grpc.port"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn realm_mgr_test_command_succeeds_with_warning_only_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_warning_only_config(temp.path(), "warning.toml");
    let output = run_realm_mgr(&["test", config_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "warning-only config should succeed, stderr: {stderr}"
    );
}

#[test]
fn realm_mgr_run_mode_fails_when_no_default_config_exists() {
    let temp = tempfile::tempdir().expect("temp dir");
    let output = run_realm_mgr(&[], Some(temp.path()));
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "run mode should fail");
    assert!(
        stderr.contains("No configuration file found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn realm_mgr_run_mode_fails_for_missing_custom_config_flag() {
    let temp = tempfile::tempdir().expect("temp dir");
    let missing_path = temp.path().join("missing-run.toml");
    let output = run_realm_mgr(
        &["--config", missing_path.to_str().expect("utf8 path")],
        None,
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "run mode should fail");
    assert!(
        stderr.contains("Config file not found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn realm_mgr_run_mode_fails_for_validation_errors() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_validation_error_config(temp.path(), "run-validation-error.toml");
    let output = run_realm_mgr(
        &["--config", config_path.to_str().expect("utf8 path")],
        None,
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "run mode should fail");
    assert!(
        stderr.contains("bind.grpc.port"),
        "unexpected stderr: {stderr}"
    );
}

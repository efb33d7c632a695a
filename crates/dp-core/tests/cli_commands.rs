//! CLI tests for dp-core.
//!
//! These run the built binary against the fixture diagrams and check
//! payloads on stdout and exit codes.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Get a Command for dp-core binary.
fn dp_core() -> Command {
    let mut cmd = Command::cargo_bin("dp-core").expect("dp-core binary should exist");
    cmd.env_remove("DP_SETTINGS")
        .env_remove("DP_LOG")
        .env_remove("DP_LOG_FORMAT")
        .env_remove("RUST_LOG")
        .env("DP_CONFIG_DIR", "/nonexistent/dp-core-test");
    cmd
}

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../test/fixtures/diagrams")
        .join(name)
        .display()
        .to_string()
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// check
// ============================================================================

mod check {
    use super::*;

    #[test]
    fn reports_model_size() {
        let output = dp_core()
            .args(["check", &fixture("used_car.json")])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["path_count"], 36);
        assert_eq!(json["chance_nodes"], 2);
        assert_eq!(json["decision_nodes"], 2);
        assert_eq!(json["model"]["binaries"], 11);
        assert_eq!(json["model"]["compatibility_variables"], 12);
        assert!(json["config_id"].as_str().is_some_and(|s| !s.is_empty()));
    }

    #[test]
    fn summary_format() {
        dp_core()
            .args(["check", "--format", "summary", &fixture("used_car.toml")])
            .assert()
            .success()
            .stdout(predicate::str::contains("2 chance, 2 decision, 3 value nodes"));
    }

    #[test]
    fn cycle_is_a_diagram_error() {
        let output = dp_core()
            .args(["check", &fixture("invalid_cycle.json")])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(12));
        let json = stdout_json(&output);
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["code_name"], "ERR_DIAGRAM");
    }

    #[test]
    fn ragged_table_is_a_diagram_error() {
        dp_core()
            .args(["check", &fixture("invalid_ragged.json")])
            .assert()
            .code(12);
    }

    #[test]
    fn old_schema_version_is_rejected() {
        let output = dp_core()
            .args(["check", &fixture("invalid_version.json")])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(14));
        assert_eq!(stdout_json(&output)["error"]["code_name"], "ERR_VERSION");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        dp_core()
            .args(["check", "/nonexistent/diagram.json"])
            .assert()
            .code(21);
    }

    #[test]
    fn unparsable_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        dp_core()
            .args(["check", path.to_str().unwrap()])
            .assert()
            .code(11);
    }

    #[test]
    fn missing_settings_file_is_an_io_error() {
        dp_core()
            .args([
                "check",
                "--settings",
                "/nonexistent/settings.toml",
                &fixture("used_car.json"),
            ])
            .assert()
            .code(21);
    }
}

// ============================================================================
// compile
// ============================================================================

mod compile {
    use super::*;

    #[test]
    fn lp_to_stdout() {
        dp_core()
            .args(["compile", &fixture("used_car.json")])
            .assert()
            .success()
            .stdout(predicate::str::contains("Maximize"))
            .stdout(predicate::str::contains("Subject To"))
            .stdout(predicate::str::contains("Binaries"));
    }

    #[test]
    fn lp_to_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("used_car.lp");
        let output = dp_core()
            .args(["compile", &fixture("used_car.json"), "--lp", out.to_str().unwrap()])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["objective"], "expected_value");

        let lp = std::fs::read_to_string(&out).unwrap();
        assert!(lp.starts_with("\\ "));
        assert!(lp.contains("End"));
    }
}

// ============================================================================
// solve and analyze
// ============================================================================

mod solve {
    use super::*;

    #[test]
    fn used_car_expected_value() {
        let output = dp_core()
            .args(["solve", &fixture("used_car.json")])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        let value = json["objective"]["value"].as_f64().unwrap();
        assert!((value - 31.0).abs() < 1e-9);
        assert_eq!(json["solver"], "brute-force");
        assert_eq!(json["strategy"]["decisions"][0]["rules"][0]["choice"], "test");
        assert!(json["run_id"].as_str().unwrap().starts_with("run-"));
    }

    #[test]
    fn assignment_limit_from_settings() {
        let dir = TempDir::new().unwrap();
        let settings = dir.path().join("settings.toml");
        std::fs::write(
            &settings,
            "schema_version = \"1.0.0\"\n\n[solver]\nmax_assignments = 4\n",
        )
        .unwrap();
        let output = dp_core()
            .args([
                "solve",
                "--settings",
                settings.to_str().unwrap(),
                &fixture("used_car.json"),
            ])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(2));
        assert_eq!(stdout_json(&output)["error"]["code_name"], "ERR_SOLVER_LIMIT");
    }

    #[test]
    fn cvar_objective_is_not_enumerated() {
        let dir = TempDir::new().unwrap();
        let text = std::fs::read_to_string(fixture("used_car.json")).unwrap();
        let mut file: Value = serde_json::from_str(&text).unwrap();
        file["model"] = serde_json::json!({
            "objective": {"kind": "conditional_value_at_risk", "alpha": 0.2}
        });
        let path = dir.path().join("cvar.json");
        std::fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        dp_core()
            .args(["solve", path.to_str().unwrap()])
            .assert()
            .code(2)
            .stdout(predicate::str::contains("compile --lp"));

        dp_core()
            .args(["compile", path.to_str().unwrap()])
            .assert()
            .success();
    }

    #[test]
    fn analyze_external_solution() {
        let dir = TempDir::new().unwrap();
        let sol = dir.path().join("used_car.sol");
        // Test, then buy with guarantee after a lemon and without after a peach.
        std::fs::write(
            &sol,
            "# from an external solver\n\
             z1_T_1 1\n\
             z3_A_0_0 1\n\
             z3_A_1_1 1\n\
             z3_A_2_0 1\n\
             x_0_1_1_1 1\n\
             x_1_1_2_0 1\n",
        )
        .unwrap();
        let output = dp_core()
            .args([
                "analyze",
                &fixture("used_car.json"),
                "--solution",
                sol.to_str().unwrap(),
            ])
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));
        let json = stdout_json(&output);
        assert_eq!(json["solver"], "external");
        let mean = json["utility"]["statistics"]["mean"].as_f64().unwrap();
        assert!((mean - 31.0).abs() < 1e-9);
    }

    #[test]
    fn analyze_rejects_unknown_variable() {
        let dir = TempDir::new().unwrap();
        let sol = dir.path().join("bad.sol");
        std::fs::write(&sol, "nonsense 1\n").unwrap();
        dp_core()
            .args([
                "analyze",
                &fixture("used_car.json"),
                "--solution",
                sol.to_str().unwrap(),
            ])
            .assert()
            .code(13);
    }
}

// ============================================================================
// schema and version
// ============================================================================

mod schema {
    use super::*;

    #[test]
    fn list() {
        dp_core()
            .args(["schema", "--list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("DiagramFile"))
            .stdout(predicate::str::contains("SolveReport"));
    }

    #[test]
    fn single_schema_is_json() {
        let output = dp_core().args(["schema", "Settings"]).output().unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert!(json.is_object());
    }

    #[test]
    fn unknown_schema_is_an_args_error() {
        dp_core().args(["schema", "Nope"]).assert().code(10);
    }

    #[test]
    fn version_json() {
        let output = dp_core().arg("version").output().unwrap();
        assert!(output.status.success());
        let json = stdout_json(&output);
        assert_eq!(json["dp_core_version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn unknown_command_fails() {
        dp_core()
            .arg("nonexistent-command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }
}

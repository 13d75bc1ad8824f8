//! End-to-end runs against shell-script stand-ins for the build tool and the
//! utilities. Unix only.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard};

use tempfile::TempDir;
use vhdci::config::{CommandStep, PipelineConfig, Profile};
use vhdci::pipeline::{self, RunOutcome};
use vhdci::SystemRunner;

/// Scripts are written and then executed; serialize so no other test forks
/// while one is still open for writing.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

const UTILITIES: [&str; 3] = ["VHDCreate", "DiskFormat", "DiskDump"];

struct Fixture {
    _root: TempDir,
    work: PathBuf,
    tools: PathBuf,
    build_log: PathBuf,
    run_log: PathBuf,
    _guard: MutexGuard<'static, ()>,
}

impl Fixture {
    fn new() -> Self {
        let guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let root = TempDir::new().unwrap();
        let work = root.path().join("work");
        let tools = root.path().join("tools");
        let build_log = root.path().join("build.log");
        let run_log = root.path().join("run.log");

        for name in UTILITIES {
            fs::create_dir_all(work.join("Utilities").join(name)).unwrap();
        }
        fs::create_dir_all(&tools).unwrap();

        // Build stand-in: logs "<project> <args>", honors marker files in the
        // project directory, and drops the project's executable into bin/.
        write_script(
            &tools.join("msbuild"),
            &format!(
                r#"name=$(basename "$PWD")
echo "$name $*" >> '{log}'
if [ "$*" != "-m" ]; then echo "RETRY-STARTED $name" >&2; fi
if [ -f fail-always ]; then exit 7; fi
if [ -f fail-once ] && [ "$*" = "-m" ]; then exit 1; fi
mkdir -p bin/Release
cp '{tools}'/"$name.exe" bin/Release/"$name.exe"
"#,
                log = build_log.display(),
                tools = tools.display(),
            ),
        );

        let log = run_log.display();
        write_script(
            &tools.join("VHDCreate.exe"),
            &format!(
                "echo \"VHDCreate $*\" >> '{log}'\n[ -f create-fails ] && exit 9\ntouch \"$3\"\n"
            ),
        );
        write_script(
            &tools.join("DiskFormat.exe"),
            &format!(
                "echo \"DiskFormat $*\" >> '{log}'\n[ -f format-fails ] && exit 5\ntest -f \"$5\"\n"
            ),
        );
        write_script(
            &tools.join("DiskDump.exe"),
            &format!("echo \"DiskDump $*\" >> '{log}'\ntest -f \"$2\"\n"),
        );

        Self {
            _root: root,
            work,
            tools,
            build_log,
            run_log,
            _guard: guard,
        }
    }

    fn config(&self, profile: Profile) -> PipelineConfig {
        let mut config = PipelineConfig::for_profile(profile);
        config.working_dir = self.work.clone();
        config.build.program = self.msbuild().display().to_string();
        config
    }

    fn msbuild(&self) -> PathBuf {
        self.tools.join("msbuild")
    }

    fn project(&self, name: &str) -> PathBuf {
        self.work.join("Utilities").join(name)
    }

    fn build_log(&self) -> Vec<String> {
        read_lines(&self.build_log)
    }

    fn run_log(&self) -> Vec<String> {
        read_lines(&self.run_log)
    }

    /// Write an override file that points the build tool at the stand-in.
    fn override_file(&self, extra: serde_json::Value) -> PathBuf {
        let mut value = serde_json::json!({
            "build": { "program": self.msbuild() }
        });
        if let (Some(obj), serde_json::Value::Object(extra)) = (value.as_object_mut(), extra) {
            obj.extend(extra);
        }
        let path = self.work.join("vhdci.json");
        fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        path
    }

    fn vhdci(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_vhdci"));
        cmd.current_dir(&self.work);
        cmd
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn regression_run_creates_disk_image() {
    let fx = Fixture::new();

    let report = pipeline::run(&fx.config(Profile::Regression), &SystemRunner).unwrap();

    assert_eq!(report.exit_code(), 0);
    assert!(fx.work.join("test.vhd").is_file());
    assert_eq!(report.index.as_ref().map(|i| i.len()), Some(3));
    assert_eq!(
        fx.run_log(),
        vec![
            "VHDCreate -sz 20MB test.vhd",
            "DiskFormat -ft fat -ptt guid test.vhd",
            "DiskDump -sf test.vhd",
        ]
    );
}

#[test]
fn stale_artifacts_are_purged_before_building() {
    let fx = Fixture::new();
    fs::write(fx.work.join("old.exe"), "").unwrap();
    fs::write(fx.work.join("old.dll"), "").unwrap();
    fs::write(fx.work.join("test.vhd"), "stale").unwrap();

    let report = pipeline::run(&fx.config(Profile::Regression), &SystemRunner).unwrap();

    assert_eq!(report.cleanup.deleted_for("*.exe"), Some(1));
    assert_eq!(report.cleanup.deleted_for("*.dll"), Some(1));
    assert_eq!(report.cleanup.deleted_for("*.vhd"), Some(1));
    assert!(!fx.work.join("old.exe").exists());
    assert_eq!(fs::read_to_string(fx.work.join("test.vhd")).unwrap(), "");
}

#[test]
fn failed_build_is_retried_once_with_verbose_flag() {
    let fx = Fixture::new();
    fs::write(fx.project("DiskFormat").join("fail-once"), "").unwrap();

    let report = pipeline::run(&fx.config(Profile::Regression), &SystemRunner).unwrap();

    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        fx.build_log(),
        vec![
            "VHDCreate -m",
            "DiskFormat -m",
            "DiskFormat -m -v:detailed",
            "DiskDump -m",
        ]
    );
}

#[test]
fn exhausted_build_stops_everything_after_it() {
    let fx = Fixture::new();
    fs::write(fx.project("DiskFormat").join("fail-always"), "").unwrap();

    let report = pipeline::run(&fx.config(Profile::Regression), &SystemRunner).unwrap();

    assert_eq!(
        report.outcome,
        RunOutcome::BuildFailed {
            project: "DiskFormat".to_string(),
            exit_code: 7,
        }
    );
    assert!(report.index.is_none());
    assert!(!fx.build_log().iter().any(|l| l.starts_with("DiskDump")));
    assert!(fx.run_log().is_empty());
}

#[test]
fn failing_step_stops_the_sequence_with_its_code() {
    let fx = Fixture::new();
    fs::write(fx.work.join("format-fails"), "").unwrap();

    let report = pipeline::run(&fx.config(Profile::Regression), &SystemRunner).unwrap();

    assert_eq!(report.exit_code(), 5);
    assert_eq!(fx.run_log().len(), 2);
    assert!(!fx.run_log().iter().any(|l| l.starts_with("DiskDump")));
}

#[test]
fn unchecked_step_failure_does_not_fail_the_run() {
    let fx = Fixture::new();
    fs::write(fx.work.join("create-fails"), "").unwrap();

    let report = pipeline::run(&fx.config(Profile::Smoke), &SystemRunner).unwrap();

    assert!(report.succeeded());
    assert_eq!(report.steps[0].exit_code, 9);
    assert_eq!(fx.build_log(), vec!["VHDCreate -m"]);
}

#[test]
fn missing_binary_is_reported_without_spawning() {
    let fx = Fixture::new();
    let mut config = fx.config(Profile::Regression);
    config.steps.insert(1, CommandStep::new("Ghost.exe", "--boo"));

    let err = pipeline::run(&config, &SystemRunner).unwrap_err();

    assert_eq!(err.code.as_str(), "sequence.binary_not_found");
    assert_eq!(fx.run_log(), vec!["VHDCreate -sz 20MB test.vhd"]);
}

#[test]
fn unstartable_build_tool_is_a_spawn_error() {
    let fx = Fixture::new();
    let mut config = fx.config(Profile::Regression);
    config.build.program = fx.tools.join("no-such-msbuild").display().to_string();

    let err = pipeline::run(&config, &SystemRunner).unwrap_err();

    assert_eq!(err.code.as_str(), "process.spawn_failed");
    assert!(fx.build_log().is_empty());
}

#[test]
fn cli_default_command_runs_the_pipeline() {
    let fx = Fixture::new();
    let config = fx.override_file(serde_json::json!({}));

    let status = fx
        .vhdci()
        .arg("--config")
        .arg(&config)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(0));
    assert!(fx.work.join("test.vhd").is_file());
}

#[test]
fn cli_exits_with_failing_step_code() {
    let fx = Fixture::new();
    fs::write(fx.work.join("format-fails"), "").unwrap();
    let config = fx.override_file(serde_json::json!({}));

    let status = fx
        .vhdci()
        .args(["run", "--config"])
        .arg(&config)
        .status()
        .unwrap();

    assert_eq!(status.code(), Some(5));
}

#[test]
fn cli_missing_binary_prints_index_and_exits_4() {
    let fx = Fixture::new();
    let config = fx.override_file(serde_json::json!({
        "steps": [{ "executable": "Ghost.exe", "arguments": "--boo" }]
    }));

    let output = fx
        .vhdci()
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sequence.binary_not_found"));
    assert!(stderr.contains("Ghost.exe"));
    assert!(stderr.contains("DiskDump.exe"));
    assert!(fx.run_log().is_empty());
}

#[test]
fn cli_run_json_prints_report_envelope() {
    let fx = Fixture::new();
    let config = fx.override_file(serde_json::json!({}));

    let output = fx
        .vhdci()
        .args(["run", "--json", "--profile", "smoke", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["success"], true);
    assert_eq!(envelope["data"]["profile"], "smoke");
    assert_eq!(envelope["data"]["outcome"]["status"], "succeeded");
}

#[test]
fn cli_reports_first_build_failure_before_retrying() {
    let fx = Fixture::new();
    fs::write(fx.project("VHDCreate").join("fail-once"), "").unwrap();
    let config = fx.override_file(serde_json::json!({}));

    let output = fx
        .vhdci()
        .args(["run", "--profile", "smoke", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let failure = stderr
        .find("VHDCreate build failed with exit code 1")
        .expect("first attempt reported");
    let retry = stderr.find("RETRY-STARTED VHDCreate").expect("retry ran");
    assert!(failure < retry, "stderr was:\n{}", stderr);
}

#[test]
fn cli_locate_lists_built_binaries() {
    let fx = Fixture::new();
    for name in UTILITIES {
        let bin = fx.project(name).join("bin").join("Debug");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join(format!("{}.exe", name)), "").unwrap();
    }

    let output = fx.vhdci().arg("locate").output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["data"]["count"], 3);
    assert!(envelope["data"]["index"]["DiskDump.exe"]
        .as_str()
        .unwrap()
        .ends_with("DiskDump/bin/Debug/DiskDump.exe"));
}

#[test]
fn cli_invalid_override_file_exits_2() {
    let fx = Fixture::new();
    let path = fx.work.join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    let output = fx
        .vhdci()
        .args(["config", "--config"])
        .arg(&path)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let envelope: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["error"]["code"], "config.invalid_json");
}

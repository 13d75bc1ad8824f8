//! Typed pipeline configuration.
//!
//! Everything the pipeline needs is compiled in through [`Profile`]. An
//! optional JSON override file replaces any subset of fields, and CLI flags
//! override the file.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Which built-in pipeline variant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Build all three utilities and run the checked three-step sequence.
    #[default]
    Regression,
    /// Build VHDCreate only and run its single step without an exit-code check.
    Smoke,
}

/// One buildable utility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityProject {
    pub name: String,
    /// Project directory. Relative paths resolve against the utilities root;
    /// when omitted the directory is `<utilities_root>/<name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl UtilityProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directory: None,
        }
    }

    pub fn project_directory(&self, utilities_root: &Path) -> PathBuf {
        match &self.directory {
            Some(dir) => utilities_root.join(dir),
            None => utilities_root.join(&self.name),
        }
    }
}

/// One scripted invocation of a located executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStep {
    pub executable: String,
    #[serde(default)]
    pub arguments: String,
    /// When false, a non-zero exit is recorded but does not stop the sequence.
    #[serde(default = "default_true")]
    pub check_exit: bool,
}

impl CommandStep {
    pub fn new(executable: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            arguments: arguments.into(),
            check_exit: true,
        }
    }

    pub fn unchecked(mut self) -> Self {
        self.check_exit = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupConfig {
    #[serde(default = "default_cleanup_patterns")]
    pub patterns: Vec<String>,

    /// Abort on the first delete failure instead of recording it and moving on.
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            patterns: default_cleanup_patterns(),
            strict: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildToolConfig {
    #[serde(default = "default_build_program")]
    pub program: String,

    #[serde(default = "default_build_args")]
    pub args: Vec<String>,

    /// Appended to `args` for the single retry after a failed build.
    #[serde(default = "default_verbose_args")]
    pub verbose_args: Vec<String>,
}

impl Default for BuildToolConfig {
    fn default() -> Self {
        Self {
            program: default_build_program(),
            args: default_build_args(),
            verbose_args: default_verbose_args(),
        }
    }
}

/// Root configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub profile: Profile,

    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Relative paths resolve against `working_dir`.
    #[serde(default = "default_utilities_root")]
    pub utilities_root: PathBuf,

    #[serde(default)]
    pub cleanup: CleanupConfig,

    #[serde(default)]
    pub build: BuildToolConfig,

    /// File-name pattern matched under `<utilities_root>/*/bin/**/`.
    #[serde(default = "default_executable_pattern")]
    pub executable_pattern: String,

    #[serde(default)]
    pub utilities: Vec<UtilityProject>,

    #[serde(default)]
    pub steps: Vec<CommandStep>,
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_cleanup_patterns() -> Vec<String> {
    vec!["*.exe".to_string(), "*.vhd".to_string(), "*.dll".to_string()]
}

fn default_build_program() -> String {
    "msbuild".to_string()
}

fn default_build_args() -> Vec<String> {
    vec!["-m".to_string()]
}

fn default_verbose_args() -> Vec<String> {
    vec!["-v:detailed".to_string()]
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_utilities_root() -> PathBuf {
    PathBuf::from("Utilities")
}

fn default_executable_pattern() -> String {
    "*.exe".to_string()
}

impl PipelineConfig {
    /// Built-in configuration for a profile.
    pub fn for_profile(profile: Profile) -> Self {
        let (utilities, steps) = match profile {
            Profile::Regression => (
                vec![
                    UtilityProject::new("VHDCreate"),
                    UtilityProject::new("DiskFormat"),
                    UtilityProject::new("DiskDump"),
                ],
                vec![
                    CommandStep::new("VHDCreate.exe", "-sz 20MB test.vhd"),
                    CommandStep::new("DiskFormat.exe", "-ft fat -ptt guid test.vhd"),
                    CommandStep::new("DiskDump.exe", "-sf test.vhd"),
                ],
            ),
            Profile::Smoke => (
                vec![UtilityProject::new("VHDCreate")],
                vec![CommandStep::new("VHDCreate.exe", "-sz 20MB test.vhd").unchecked()],
            ),
        };

        Self {
            profile,
            working_dir: default_working_dir(),
            utilities_root: default_utilities_root(),
            cleanup: CleanupConfig::default(),
            build: BuildToolConfig::default(),
            executable_pattern: default_executable_pattern(),
            utilities,
            steps,
        }
    }

    /// Utilities root with relative paths resolved against the working directory.
    pub fn utilities_root_path(&self) -> PathBuf {
        self.working_dir.join(&self.utilities_root)
    }

    /// Check names and glob patterns before anything touches the filesystem.
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.cleanup.patterns {
            validate_file_pattern("cleanup.patterns", pattern)?;
        }
        validate_file_pattern("executable_pattern", &self.executable_pattern)?;

        if self.build.program.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "build.program",
                None,
                "Build program must not be empty",
            ));
        }

        for utility in &self.utilities {
            if utility.name.trim().is_empty() {
                return Err(Error::config_invalid_value(
                    "utilities",
                    None,
                    "Utility name must not be empty",
                ));
            }
        }

        for (idx, step) in self.steps.iter().enumerate() {
            if step.executable.trim().is_empty() {
                return Err(Error::config_invalid_value(
                    format!("steps[{}].executable", idx),
                    None,
                    "Step executable must not be empty",
                ));
            }
        }

        Ok(())
    }
}

fn validate_file_pattern(key: &str, pattern: &str) -> Result<()> {
    if pattern.trim().is_empty() || pattern.contains('/') || pattern.contains('\\') {
        return Err(Error::config_invalid_value(
            key,
            Some(pattern.to_string()),
            "Pattern must be a non-empty file-name pattern without path separators",
        ));
    }

    glob::Pattern::new(pattern).map_err(|e| {
        Error::config_invalid_value(key, Some(pattern.to_string()), e.to_string())
    })?;

    Ok(())
}

// =============================================================================
// Loading
// =============================================================================

/// Sources for the effective configuration, highest precedence last.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub profile: Option<Profile>,
    pub config_file: Option<String>,
    pub working_dir: Option<String>,
    pub utilities_root: Option<String>,
}

/// Build the effective configuration: profile defaults, then the override
/// file, then CLI flags. Paths come back absolute.
pub fn load(options: &LoadOptions) -> Result<PipelineConfig> {
    let overlay = match &options.config_file {
        Some(path) => Some(read_override_file(path)?),
        None => None,
    };

    let profile = match options.profile {
        Some(profile) => profile,
        None => profile_from_overlay(overlay.as_ref())?,
    };

    let mut config = match overlay {
        Some(mut overlay) => {
            let mut base = serde_json::to_value(PipelineConfig::for_profile(profile)).map_err(
                |e| Error::internal_json(e.to_string(), Some("serialize defaults".to_string())),
            )?;
            if let Value::Object(obj) = &mut overlay {
                obj.remove("profile");
            }
            merge_json(&mut base, overlay);

            let path = options.config_file.clone().unwrap_or_default();
            serde_json::from_value::<PipelineConfig>(base)
                .map_err(|e| Error::config_invalid_json(path, e))?
        }
        None => PipelineConfig::for_profile(profile),
    };

    if let Some(dir) = &options.working_dir {
        config.working_dir = PathBuf::from(dir);
    }
    if let Some(root) = &options.utilities_root {
        config.utilities_root = PathBuf::from(root);
    }

    config.working_dir = absolutize(&config.working_dir)?;
    config.utilities_root = expand(&config.utilities_root);

    config.validate()?;
    Ok(config)
}

fn read_override_file(path: &str) -> Result<Value> {
    let expanded = shellexpand::tilde(path).to_string();
    let content = fs::read_to_string(&expanded)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("read {}", expanded))))?;

    let value: Value =
        serde_json::from_str(&content).map_err(|e| Error::config_invalid_json(&expanded, e))?;

    if !value.is_object() {
        return Err(Error::config_invalid_value(
            "config",
            Some(expanded),
            "Configuration file must contain a JSON object",
        ));
    }

    Ok(value)
}

fn profile_from_overlay(overlay: Option<&Value>) -> Result<Profile> {
    match overlay.and_then(|v| v.get("profile")) {
        Some(value) => serde_json::from_value(value.clone()).map_err(|_| {
            Error::config_invalid_value(
                "profile",
                Some(value.to_string()),
                "Expected 'regression' or 'smoke'",
            )
        }),
        None => Ok(Profile::default()),
    }
}

/// Recursive object merge. Arrays and scalars in `overlay` replace `base`.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_obj), Value::Object(overlay_obj)) => {
            for (key, value) in overlay_obj {
                match base_obj.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_obj.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string())
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    let expanded = expand(path);
    if expanded.is_absolute() {
        return Ok(expanded);
    }

    let cwd = std::env::current_dir().map_err(|e| {
        Error::internal_io(e.to_string(), Some("resolve current directory".to_string()))
    })?;

    if expanded == Path::new(".") {
        Ok(cwd)
    } else {
        Ok(cwd.join(expanded))
    }
}

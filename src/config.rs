use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;

use crate::catalog::Exercise;

#[derive(Parser)]
#[command(name = "exercise-runner", version = "0.1", about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(long = "config", short = 'c')]
    pub config_path: Option<PathBuf>,

    /// Number of verification workers (defaults to the number of CPU cores)
    #[arg(long = "threads", short = 't')]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server and the verification workers
    Serve,
    /// Verify a single source file against an exercise and print the report
    Verify {
        /// Exercise identifier, e.g. `sum-two-numbers`
        #[arg(long, short = 'e')]
        exercise: String,
        /// Submission language: javascript, python, java or cpp
        #[arg(long, short = 'l')]
        language: String,
        /// Path to the submitted source file
        file: PathBuf,
    },
    /// List the exercises in the catalog
    Exercises,
}

impl CliArgs {
    /// Load the configuration from the specified file
    ///
    /// Without `--config`, the per-user config directory is tried before
    /// falling back to built-in defaults.
    pub fn to_config(&self) -> anyhow::Result<Config> {
        let path = match &self.config_path {
            Some(path) => Some(path.clone()),
            None => default_config_path().filter(|p| p.exists()),
        };

        match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Config::from_file(&path)
            }
            None => {
                log::info!("No configuration file found, using defaults");
                Ok(Config::default())
            }
        }
    }

    pub fn worker_count(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    use directories::ProjectDirs;

    ProjectDirs::from("", "", "exercise-runner").map(|dirs| dirs.config_dir().join("config.json"))
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: Limits,
    pub toolchains: Toolchains,
    /// Directory under which per-attempt scratch directories are created
    pub workspace_root: Option<PathBuf>,
    /// Replaces the built-in exercise catalog when present
    pub exercises: Option<Vec<Exercise>>,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("exercise-runner"))
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MilliSecond(pub u64);

impl From<MilliSecond> for Duration {
    fn from(ms: MilliSecond) -> Self {
        Duration::from_millis(ms.0)
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

/// Execution bounds shared by every language adapter
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Limits {
    #[serde(rename = "compile_timeout_ms")]
    pub compile_timeout: MilliSecond,
    #[serde(rename = "run_timeout_ms")]
    pub run_timeout: MilliSecond,
    #[serde(rename = "output_limit_bytes")]
    pub output_limit: ByteSize,
    /// Test cases of one submission allowed to run at the same time
    pub case_parallelism: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            compile_timeout: MilliSecond(10_000),
            run_timeout: MilliSecond(5_000),
            output_limit: ByteSize(1024 * 1024),
            case_parallelism: 1,
        }
    }
}

/// Executables used to compile and run submissions
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Toolchains {
    pub node: String,
    pub python: String,
    pub javac: String,
    pub java: String,
    pub cxx: String,
}

impl Default for Toolchains {
    fn default() -> Self {
        Self {
            node: "node".to_string(),
            python: "python3".to_string(),
            javac: "javac".to_string(),
            java: "java".to_string(),
            cxx: "g++".to_string(),
        }
    }
}

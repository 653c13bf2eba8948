// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `sitepipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sitepipe",
    version,
    about = "Build static-site assets: styles, scripts, images, dev server and watch.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run. Defaults to `default`.
    ///
    /// Several tasks run in parallel unless `--series` is given.
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// When omitted, `Sitepipe.toml` in the current directory is used if it
    /// exists; otherwise built-in defaults apply.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Run the tasks given on the command line one after another.
    #[arg(long)]
    pub series: bool,

    /// Print the task tree and exit without running anything.
    #[arg(long = "tasks")]
    pub list_tasks: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SITEPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    /// Task names requested on the command line, falling back to `default`.
    pub fn requested_tasks(&self) -> Vec<String> {
        if self.tasks.is_empty() {
            vec!["default".to_string()]
        } else {
            self.tasks.clone()
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_positional_tasks_means_default() {
        let args = CliArgs::parse_from(["sitepipe"]);
        assert_eq!(args.requested_tasks(), vec!["default".to_string()]);
        assert!(!args.series);
    }

    #[test]
    fn tasks_flag_is_not_a_task_name() {
        let args = CliArgs::parse_from(["sitepipe", "--tasks", "build"]);
        assert!(args.list_tasks);
        assert_eq!(args.requested_tasks(), vec!["build".to_string()]);
    }
}

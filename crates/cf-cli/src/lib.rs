//! cf-cli: command-line surface for the cf client.

use std::sync::OnceLock;

use cf_core::config::{Config, LoggingConfig};
use tracing_subscriber::EnvFilter;

use crate::user_info::UserRepository;

/// Stable crate label used by bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "cf-cli"
}

static VERSION: OnceLock<String> = OnceLock::new();

/// Set the version string for `--version` output.
pub fn set_version(version: &str) {
    let _ = VERSION.set(version.to_string());
}

fn get_version() -> &'static str {
    VERSION.get().map(|s| s.as_str()).unwrap_or("dev")
}

fn help_text() -> String {
    "\
cf is a command-line client for the cloud platform.

Usage:
  cf [command]

Available Commands:
  help        Help about any command
  user-info   Show the roles users hold in the targeted org and space

Flags:
  -h, --help      help for cf
  -v, --version   version for cf

Use \"cf [command] --help\" for more information about a command.\n"
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Install the stderr log subscriber. An invalid filter is reported, not
/// replaced; a subscriber installed earlier is left in place.
pub fn init_logging(logging: &LoggingConfig) -> Result<(), String> {
    let filter = EnvFilter::try_new(&logging.level)
        .map_err(|err| format!("invalid log filter {:?}: {err}", logging.level))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    Ok(())
}

/// Whether `args` reach a command that reads the saved session. Help,
/// version and unknown commands run without loading config.
pub fn requires_session<S: AsRef<str>>(args: &[S]) -> bool {
    let Some((cmd, rest)) = args.split_first() else {
        return false;
    };
    match cmd.as_ref() {
        "user-info" => !rest
            .iter()
            .any(|arg| matches!(arg.as_ref(), "-h" | "--help" | "help")),
        _ => false,
    }
}

pub mod cc;
pub mod user_info;

pub fn run_cli_for_test(
    args: &[&str],
    config: &Config,
    repo: &dyn UserRepository,
) -> CommandOutput {
    let mut out = CommandOutput {
        stdout: String::new(),
        stderr: String::new(),
        exit_code: 0,
    };

    let Some((cmd, rest)) = args.split_first() else {
        out.stdout = help_text();
        return out;
    };

    match *cmd {
        "--help" | "-h" | "help" => {
            out.stdout = help_text();
            out
        }
        "--version" | "-v" => {
            out.stdout = format!("cf version {}\n", get_version());
            out
        }
        "user-info" => user_info::run_for_test(rest, config, repo),
        _ => {
            out.stderr = format!("Error: unknown command \"{cmd}\" for \"cf\"\n");
            out.exit_code = 1;
            out
        }
    }
}

pub fn run_cli(args: &[String], config: &Config, repo: &dyn UserRepository) -> CommandOutput {
    let refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    run_cli_for_test(&refs, config, repo)
}

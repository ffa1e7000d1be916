//! `cf user-info`: show the roles users hold in the targeted org and space.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::io::Write;

use cf_core::config::Config;
use cf_core::models::{RoleKind, UserFields, ORG_ROLES, SPACE_ROLES};
use cf_core::version::{dispatch_mode, DispatchMode};
use serde::Serialize;
use tabwriter::TabWriter;

use crate::CommandOutput;

pub const PROGRESS_LINE: &str = "Getting user information...";

// ---------------------------------------------------------------------------
// Repository seam
// ---------------------------------------------------------------------------

/// Role membership lookups against the control plane.
///
/// The plain methods resolve usernames through UAA; the `_with_no_uaa`
/// variants rely on the Cloud Controller returning usernames itself.
pub trait UserRepository {
    fn list_users_in_org_for_role(
        &self,
        org_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String>;
    fn list_users_in_org_for_role_with_no_uaa(
        &self,
        org_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String>;
    fn list_users_in_space_for_role(
        &self,
        space_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String>;
    fn list_users_in_space_for_role_with_no_uaa(
        &self,
        space_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryMethod {
    OrgForRole,
    OrgForRoleWithNoUaa,
    SpaceForRole,
    SpaceForRoleWithNoUaa,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: RepositoryMethod,
    pub guid: String,
    pub role: RoleKind,
}

/// Repository backed by a fixed role map. Every lookup is recorded.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users_by_role: HashMap<RoleKind, Vec<UserFields>>,
    failing_role: Option<(RoleKind, String)>,
    calls: RefCell<Vec<RecordedCall>>,
}

impl InMemoryUserRepository {
    pub fn with_users_by_role(users_by_role: HashMap<RoleKind, Vec<UserFields>>) -> Self {
        Self {
            users_by_role,
            ..Self::default()
        }
    }

    /// Make every lookup for `role` fail with `message`.
    pub fn fail_role(mut self, role: RoleKind, message: &str) -> Self {
        self.failing_role = Some((role, message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, method: RepositoryMethod) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    fn lookup(
        &self,
        method: RepositoryMethod,
        guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String> {
        self.calls.borrow_mut().push(RecordedCall {
            method,
            guid: guid.to_string(),
            role,
        });
        if let Some((failing, message)) = &self.failing_role {
            if *failing == role {
                return Err(message.clone());
            }
        }
        Ok(self.users_by_role.get(&role).cloned().unwrap_or_default())
    }
}

impl UserRepository for InMemoryUserRepository {
    fn list_users_in_org_for_role(
        &self,
        org_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String> {
        self.lookup(RepositoryMethod::OrgForRole, org_guid, role)
    }

    fn list_users_in_org_for_role_with_no_uaa(
        &self,
        org_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String> {
        self.lookup(RepositoryMethod::OrgForRoleWithNoUaa, org_guid, role)
    }

    fn list_users_in_space_for_role(
        &self,
        space_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String> {
        self.lookup(RepositoryMethod::SpaceForRole, space_guid, role)
    }

    fn list_users_in_space_for_role_with_no_uaa(
        &self,
        space_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String> {
        self.lookup(RepositoryMethod::SpaceForRoleWithNoUaa, space_guid, role)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum UserInfoError {
    #[error("Not logged in. Use 'cf login' to log in.")]
    NotLoggedIn,
    #[error("No org and space targeted, use 'cf target -o ORG -s SPACE' to target an org and space")]
    NoTarget,
    #[error("list users with role {role}: {message}")]
    Repository { role: RoleKind, message: String },
    #[error("{0}")]
    Usage(String),
    #[error("write output: {0}")]
    Output(String),
}

impl UserInfoError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            _ => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Role table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRow {
    pub username: String,
    pub roles: BTreeSet<RoleKind>,
}

/// Username to held roles. Rows keep first-seen order; roles within a row
/// follow [`RoleKind`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleTable {
    rows: Vec<RoleRow>,
    index: HashMap<String, usize>,
}

impl RoleTable {
    pub fn add(&mut self, username: &str, role: RoleKind) {
        let row = match self.index.get(username) {
            Some(&row) => row,
            None => {
                self.rows.push(RoleRow {
                    username: username.to_string(),
                    roles: BTreeSet::new(),
                });
                let row = self.rows.len() - 1;
                self.index.insert(username.to_string(), row);
                row
            }
        };
        self.rows[row].roles.insert(role);
    }

    pub fn rows(&self) -> &[RoleRow] {
        &self.rows
    }

    fn only_user(self, username: &str) -> Self {
        let mut filtered = Self::default();
        for row in self.rows {
            if row.username.eq_ignore_ascii_case(username) {
                for role in row.roles {
                    filtered.add(&row.username, role);
                }
            }
        }
        filtered
    }
}

/// Query every role kind once, org roles first, using the variant picked by
/// `mode` for all six calls.
pub fn aggregate_roles(
    repo: &dyn UserRepository,
    org_guid: &str,
    space_guid: &str,
    mode: DispatchMode,
) -> Result<RoleTable, UserInfoError> {
    let mut table = RoleTable::default();

    for role in ORG_ROLES.into_iter().chain(SPACE_ROLES) {
        let users = if role.is_org_role() {
            tracing::debug!(%role, org_guid, mode = mode.as_str(), "listing org users");
            match mode {
                DispatchMode::Legacy => repo.list_users_in_org_for_role(org_guid, role),
                DispatchMode::Direct => {
                    repo.list_users_in_org_for_role_with_no_uaa(org_guid, role)
                }
            }
        } else {
            tracing::debug!(%role, space_guid, mode = mode.as_str(), "listing space users");
            match mode {
                DispatchMode::Legacy => repo.list_users_in_space_for_role(space_guid, role),
                DispatchMode::Direct => {
                    repo.list_users_in_space_for_role_with_no_uaa(space_guid, role)
                }
            }
        }
        .map_err(|message| UserInfoError::Repository { role, message })?;
        for user in &users {
            table.add(&user.username, role);
        }
    }

    Ok(table)
}

/// Login and target precondition. Runs before any repository call.
pub fn check_requirements(config: &Config) -> Result<(), UserInfoError> {
    if !config.is_logged_in() {
        return Err(UserInfoError::NotLoggedIn);
    }
    if !config.has_organization() || !config.has_space() {
        return Err(UserInfoError::NoTarget);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ParsedArgs {
    help: bool,
    json: bool,
    username: Option<String>,
}

#[derive(Debug, Serialize)]
struct UserInfoRow<'a> {
    user: &'a str,
    org: &'a str,
    space: &'a str,
    roles: Vec<&'static str>,
}

pub fn run_for_test(
    args: &[&str],
    config: &Config,
    repo: &dyn UserRepository,
) -> CommandOutput {
    let owned_args: Vec<String> = args.iter().map(|arg| (*arg).to_string()).collect();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit_code = run_with_backend(&owned_args, config, repo, &mut stdout, &mut stderr);
    CommandOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code,
    }
}

pub fn run_with_backend(
    args: &[String],
    config: &Config,
    repo: &dyn UserRepository,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    match execute(args, config, repo, stdout) {
        Ok(()) => 0,
        Err(err) => {
            let _ = writeln!(stderr, "{err}");
            err.exit_code()
        }
    }
}

fn execute(
    args: &[String],
    config: &Config,
    repo: &dyn UserRepository,
    stdout: &mut dyn Write,
) -> Result<(), UserInfoError> {
    let parsed = parse_args(args)?;
    if parsed.help {
        return write!(stdout, "{HELP_TEXT}").map_err(|err| UserInfoError::Output(err.to_string()));
    }

    check_requirements(config)?;

    let mode = dispatch_mode(&config.api_version);
    tracing::debug!(
        api_version = %config.api_version,
        mode = mode.as_str(),
        "resolved user lookup variant"
    );

    let mut table = aggregate_roles(
        repo,
        &config.organization_fields.guid,
        &config.space_fields.guid,
        mode,
    )?;
    if let Some(username) = &parsed.username {
        table = table.only_user(username);
    }

    let org = config.organization_fields.name.as_str();
    let space = config.space_fields.name.as_str();
    let written = if parsed.json {
        write_json(&table, org, space, stdout)
    } else {
        write_table(&table, org, space, stdout)
    };
    written.map_err(UserInfoError::Output)
}

fn write_table(
    table: &RoleTable,
    org: &str,
    space: &str,
    stdout: &mut dyn Write,
) -> Result<(), String> {
    writeln!(stdout, "{PROGRESS_LINE}").map_err(|e| e.to_string())?;
    writeln!(stdout).map_err(|e| e.to_string())?;

    let mut tw = TabWriter::new(&mut *stdout).padding(2);
    writeln!(tw, "User\tOrg\tSpace\tRole").map_err(|e| e.to_string())?;
    for row in table.rows() {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}",
            row.username,
            org,
            space,
            role_labels(row).join(", ")
        )
        .map_err(|e| e.to_string())?;
    }
    tw.flush().map_err(|e| e.to_string())?;
    Ok(())
}

fn write_json(
    table: &RoleTable,
    org: &str,
    space: &str,
    stdout: &mut dyn Write,
) -> Result<(), String> {
    let payload: Vec<UserInfoRow<'_>> = table
        .rows()
        .iter()
        .map(|row| UserInfoRow {
            user: &row.username,
            org,
            space,
            roles: role_labels(row),
        })
        .collect();
    serde_json::to_writer_pretty(&mut *stdout, &payload).map_err(|e| e.to_string())?;
    writeln!(stdout).map_err(|e| e.to_string())?;
    Ok(())
}

fn role_labels(row: &RoleRow) -> Vec<&'static str> {
    row.roles.iter().map(|role| role.label()).collect()
}

fn parse_args(args: &[String]) -> Result<ParsedArgs, UserInfoError> {
    let mut index = 0usize;
    if args.get(index).is_some_and(|token| token == "user-info") {
        index += 1;
    }

    let mut parsed = ParsedArgs::default();
    while let Some(token) = args.get(index) {
        match token.as_str() {
            "-h" | "--help" | "help" => {
                parsed.help = true;
                return Ok(parsed);
            }
            "--json" => parsed.json = true,
            "" => {}
            flag if flag.starts_with('-') => {
                return Err(UserInfoError::Usage(format!("unknown flag: {flag}")));
            }
            value => {
                if parsed.username.is_some() {
                    return Err(UserInfoError::Usage(format!(
                        "unexpected argument '{value}'; user-info accepts at most one USERNAME"
                    )));
                }
                parsed.username = Some(value.to_string());
            }
        }
        index += 1;
    }
    Ok(parsed)
}

const HELP_TEXT: &str = "\
Show the roles users hold in the targeted org and space

Usage:
  cf user-info [USERNAME] [flags]

Flags:
  -h, --help   help for user-info
      --json   Output as JSON
";

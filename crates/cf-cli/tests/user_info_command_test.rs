#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;

use cf_cli::user_info::{InMemoryUserRepository, RepositoryMethod};
use cf_cli::{run_cli_for_test, CommandOutput};
use cf_core::config::Config;
use cf_core::models::{OrganizationFields, RoleKind, SpaceFields, UserFields};

#[test]
fn fails_when_not_logged_in() {
    let repo = seeded();
    let out = run(&["user-info"], &Config::default(), &repo);
    assert_eq!(out.exit_code, 1);
    assert!(out.stdout.is_empty());
    assert!(out.stderr.contains("Not logged in"), "stderr: {}", out.stderr);
    assert!(repo.calls().is_empty());
}

#[test]
fn fails_when_not_logged_in_even_if_targeted() {
    let repo = seeded();
    let mut config = targeted("2.22.0");
    config.access_token = String::new();
    let out = run(&["user-info"], &config, &repo);
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("Not logged in"), "stderr: {}", out.stderr);
    assert!(repo.calls().is_empty());
}

#[test]
fn fails_when_no_org_or_space_is_targeted() {
    let repo = seeded();
    let mut config = logged_in();
    config.set_space_fields(SpaceFields::default());
    config.set_organization_fields(OrganizationFields::default());

    let out = run(&["user-info"], &config, &repo);
    assert_eq!(out.exit_code, 1);
    assert!(out.stdout.is_empty());
    assert!(
        out.stderr.contains("No org and space targeted"),
        "stderr: {}",
        out.stderr
    );
    assert!(repo.calls().is_empty());
}

#[test]
fn fails_when_only_space_is_missing() {
    let repo = seeded();
    let mut config = targeted("2.22.0");
    config.set_space_fields(SpaceFields::default());
    let out = run(&["user-info"], &config, &repo);
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("No org and space targeted"));
    assert!(repo.calls().is_empty());
}

#[test]
fn shows_the_user_info() {
    let repo = seeded();
    let out = run(&["user-info"], &targeted("2.22.0"), &repo);
    assert_success(&out);
    assert_eq!(out.stdout, include_str!("golden/user_info/table.txt"));

    let row = out
        .stdout
        .lines()
        .find(|line| line.starts_with("user1"))
        .expect("user row");
    for expected in [
        "Org1",
        "Space1",
        "ORG MANAGER",
        "BILLING MANAGER",
        "ORG AUDITOR",
        "SPACE MANAGER",
        "SPACE DEVELOPER",
        "SPACE AUDITOR",
    ] {
        assert!(row.contains(expected), "missing {expected} in {row:?}");
    }
}

#[test]
fn calls_no_uaa_variant_when_api_is_at_least_2_21_0() {
    let repo = seeded();
    let out = run(&["user-info"], &targeted("2.22.0"), &repo);
    assert_success(&out);

    assert!(repo.call_count(RepositoryMethod::SpaceForRoleWithNoUaa) >= 1);
    assert_eq!(repo.call_count(RepositoryMethod::SpaceForRole), 0);
    assert!(repo.call_count(RepositoryMethod::OrgForRoleWithNoUaa) >= 1);
    assert_eq!(repo.call_count(RepositoryMethod::OrgForRole), 0);
}

#[test]
fn calls_no_uaa_variant_at_the_threshold() {
    let repo = seeded();
    let out = run(&["user-info"], &targeted("2.21.0"), &repo);
    assert_success(&out);
    assert_eq!(repo.call_count(RepositoryMethod::OrgForRoleWithNoUaa), 3);
    assert_eq!(repo.call_count(RepositoryMethod::SpaceForRoleWithNoUaa), 3);
}

#[test]
fn calls_uaa_variant_when_api_is_below_2_21_0() {
    let repo = seeded();
    let out = run(&["user-info"], &targeted("2.20.0"), &repo);
    assert_success(&out);

    assert_eq!(repo.call_count(RepositoryMethod::SpaceForRoleWithNoUaa), 0);
    assert!(repo.call_count(RepositoryMethod::SpaceForRole) >= 1);
    assert_eq!(repo.call_count(RepositoryMethod::OrgForRoleWithNoUaa), 0);
    assert!(repo.call_count(RepositoryMethod::OrgForRole) >= 1);
}

#[test]
fn compares_versions_numerically() {
    let repo = seeded();
    let out = run(&["user-info"], &targeted("2.3.0"), &repo);
    assert_success(&out);
    assert_eq!(repo.call_count(RepositoryMethod::OrgForRoleWithNoUaa), 0);
    assert_eq!(repo.call_count(RepositoryMethod::OrgForRole), 3);
}

#[test]
fn unknown_api_version_uses_uaa_variant() {
    let repo = seeded();
    let out = run(&["user-info"], &targeted(""), &repo);
    assert_success(&out);
    assert_eq!(repo.call_count(RepositoryMethod::OrgForRole), 3);
    assert_eq!(repo.call_count(RepositoryMethod::SpaceForRole), 3);
    assert_eq!(repo.calls().len(), 6);
}

#[test]
fn passes_org_and_space_guids_to_the_matching_lookups() {
    let repo = seeded();
    let out = run(&["user-info"], &targeted("2.22.0"), &repo);
    assert_success(&out);
    for call in repo.calls() {
        let expected = match call.method {
            RepositoryMethod::OrgForRole | RepositoryMethod::OrgForRoleWithNoUaa => "org1-guid",
            RepositoryMethod::SpaceForRole | RepositoryMethod::SpaceForRoleWithNoUaa => {
                "space1-guid"
            }
        };
        assert_eq!(call.guid, expected, "call={call:?}");
    }
}

#[test]
fn merges_users_across_roles_into_one_row_each() {
    let alice = UserFields::new("alice", "alice-guid");
    let bob = UserFields::new("bob", "bob-guid");
    let mut roles = HashMap::new();
    roles.insert(RoleKind::SpaceDeveloper, vec![bob.clone(), alice.clone()]);
    roles.insert(RoleKind::OrgManager, vec![alice]);
    roles.insert(RoleKind::OrgAuditor, vec![bob]);
    let repo = InMemoryUserRepository::with_users_by_role(roles);

    let out = run(&["user-info"], &targeted("2.22.0"), &repo);
    assert_success(&out);
    let rows: Vec<&str> = out.stdout.lines().skip(3).collect();
    assert_eq!(rows.len(), 2, "stdout: {}", out.stdout);
    assert!(rows[0].starts_with("alice"));
    assert!(rows[0].ends_with("ORG MANAGER, SPACE DEVELOPER"));
    assert!(rows[1].starts_with("bob"));
    assert!(rows[1].ends_with("ORG AUDITOR, SPACE DEVELOPER"));
}

#[test]
fn repository_failure_renders_no_table() {
    let repo = seeded().fail_role(RoleKind::SpaceManager, "server returned 500");
    let out = run(&["user-info"], &targeted("2.22.0"), &repo);
    assert_eq!(out.exit_code, 1);
    assert!(out.stdout.is_empty(), "stdout: {}", out.stdout);
    assert!(out.stderr.contains("SPACE MANAGER"), "stderr: {}", out.stderr);
    assert!(out.stderr.contains("server returned 500"), "stderr: {}", out.stderr);
}

#[test]
fn username_argument_filters_rows() {
    let mut roles = HashMap::new();
    roles.insert(
        RoleKind::SpaceAuditor,
        vec![
            UserFields::new("alice", "alice-guid"),
            UserFields::new("user1", "user1-guid"),
        ],
    );
    let repo = InMemoryUserRepository::with_users_by_role(roles);
    let out = run(&["user-info", "USER1"], &targeted("2.22.0"), &repo);
    assert_success(&out);
    assert!(out.stdout.contains("user1"));
    assert!(!out.stdout.contains("alice"));
}

#[test]
fn json_output_is_machine_readable() {
    let repo = seeded();
    let out = run(&["user-info", "--json"], &targeted("2.20.0"), &repo);
    assert_success(&out);
    let parsed: serde_json::Value = serde_json::from_str(&out.stdout).expect("valid json");
    let rows = parsed.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user"], "user1");
    assert_eq!(rows[0]["roles"].as_array().map(Vec::len), Some(6));
    assert_eq!(rows[0]["roles"][0], "ORG MANAGER");
    assert_eq!(rows[0]["roles"][5], "SPACE AUDITOR");
}

#[test]
fn help_matches_golden() {
    let repo = seeded();
    let out = run(&["user-info", "--help"], &Config::default(), &repo);
    assert_success(&out);
    assert_eq!(out.stdout, include_str!("golden/user_info/help.txt"));
    assert!(repo.calls().is_empty());
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let repo = seeded();
    let out = run(&["user-info", "--org", "x"], &targeted("2.22.0"), &repo);
    assert_eq!(out.exit_code, 2);
    assert!(out.stderr.contains("unknown flag: --org"), "stderr: {}", out.stderr);
    assert!(repo.calls().is_empty());
}

fn seeded() -> InMemoryUserRepository {
    let user = UserFields::new("user1", "user1-guid");
    let roles: HashMap<RoleKind, Vec<UserFields>> = [
        RoleKind::SpaceManager,
        RoleKind::SpaceDeveloper,
        RoleKind::SpaceAuditor,
        RoleKind::OrgManager,
        RoleKind::BillingManager,
        RoleKind::OrgAuditor,
    ]
    .into_iter()
    .map(|role| (role, vec![user.clone()]))
    .collect();
    InMemoryUserRepository::with_users_by_role(roles)
}

fn logged_in() -> Config {
    Config {
        access_token: "bearer access-token".to_string(),
        ..Config::default()
    }
}

fn targeted(api_version: &str) -> Config {
    let mut config = logged_in();
    config.set_api_version(api_version);
    config.set_organization_fields(OrganizationFields {
        name: "Org1".to_string(),
        guid: "org1-guid".to_string(),
    });
    config.set_space_fields(SpaceFields {
        name: "Space1".to_string(),
        guid: "space1-guid".to_string(),
    });
    config
}

fn run(args: &[&str], config: &Config, repo: &InMemoryUserRepository) -> CommandOutput {
    run_cli_for_test(args, config, repo)
}

fn assert_success(output: &CommandOutput) {
    assert_eq!(output.exit_code, 0);
    assert!(
        output.stderr.is_empty(),
        "unexpected stderr: {}",
        output.stderr
    );
}

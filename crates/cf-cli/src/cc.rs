//! Cloud Controller v2 backed [`UserRepository`].
//!
//! Role associations live under `/v2/organizations/{guid}/{role}` and
//! `/v2/spaces/{guid}/{role}`. Responses are paginated through `next_url`.
//! The legacy variant only trusts the user guids from the Cloud Controller and
//! asks UAA for the usernames.

use std::collections::{HashMap, HashSet};

use cf_core::config::Config;
use cf_core::models::{RoleKind, UserFields};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::Deserialize;

use crate::user_info::UserRepository;

/// Guids per UAA filter query.
const UAA_BATCH_SIZE: usize = 50;
/// Upper bound on `next_url` hops for a single listing.
const MAX_PAGES: usize = 500;

/// Transport seam: fetch the body of an authenticated GET.
pub trait Gateway {
    fn get(&self, url: &str) -> Result<String, String>;
}

/// Blocking HTTP gateway that sends the saved access token.
pub struct HttpGateway {
    client: Client,
    access_token: String,
}

impl HttpGateway {
    pub fn new(access_token: &str) -> Result<Self, String> {
        let client = Client::builder()
            .user_agent(concat!("cf-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| format!("build http client: {err}"))?;
        Ok(Self {
            client,
            access_token: access_token.to_string(),
        })
    }
}

impl Gateway for HttpGateway {
    fn get(&self, url: &str) -> Result<String, String> {
        tracing::debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, &self.access_token)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|err| format!("GET {url}: {err}"))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|err| format!("read response from {url}: {err}"))?;
        if !status.is_success() {
            return Err(format!("GET {url}: server returned {status}: {}", body.trim()));
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct PaginatedResources {
    #[serde(default)]
    next_url: Option<String>,
    #[serde(default)]
    resources: Vec<UserResource>,
}

#[derive(Debug, Deserialize)]
struct UserResource {
    metadata: ResourceMetadata,
    #[serde(default)]
    entity: UserEntity,
}

#[derive(Debug, Deserialize)]
struct ResourceMetadata {
    guid: String,
}

#[derive(Debug, Default, Deserialize)]
struct UserEntity {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UaaUsers {
    #[serde(default)]
    resources: Vec<UaaUser>,
}

#[derive(Debug, Deserialize)]
struct UaaUser {
    id: String,
    #[serde(rename = "userName")]
    user_name: String,
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Organization,
    Space,
}

impl Scope {
    fn collection(self) -> &'static str {
        match self {
            Self::Organization => "organizations",
            Self::Space => "spaces",
        }
    }
}

pub struct CloudControllerUserRepository<G: Gateway> {
    gateway: G,
    api_endpoint: String,
    uaa_endpoint: String,
}

impl<G: Gateway> CloudControllerUserRepository<G> {
    pub fn new(gateway: G, api_endpoint: &str, uaa_endpoint: &str) -> Self {
        Self {
            gateway,
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            uaa_endpoint: uaa_endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(gateway: G, config: &Config) -> Self {
        Self::new(gateway, &config.api_endpoint, &config.uaa_endpoint)
    }

    fn list_resources(
        &self,
        scope: Scope,
        guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserResource>, String> {
        let mut path = format!(
            "/v2/{}/{}/{}",
            scope.collection(),
            guid,
            role.path_segment()
        );
        let mut resources = Vec::new();
        let mut visited = HashSet::new();
        loop {
            if !visited.insert(path.clone()) {
                return Err(format!("pagination loop at {path}"));
            }
            if visited.len() > MAX_PAGES {
                return Err(format!("pagination exceeded {MAX_PAGES} pages at {path}"));
            }
            let url = format!("{}{}", self.api_endpoint, path);
            let body = self.gateway.get(&url)?;
            let page: PaginatedResources = serde_json::from_str(&body)
                .map_err(|err| format!("decode response from {url}: {err}"))?;
            resources.extend(page.resources);
            match page.next_url {
                Some(next) if !next.is_empty() => path = next,
                _ => break,
            }
        }
        Ok(resources)
    }

    fn list_with_cc_usernames(
        &self,
        scope: Scope,
        guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String> {
        let resources = self.list_resources(scope, guid, role)?;
        // Resources without a username (clients, unsynced users) are dropped.
        Ok(resources
            .into_iter()
            .filter_map(|resource| {
                let username = resource.entity.username.filter(|name| !name.trim().is_empty())?;
                Some(UserFields {
                    username,
                    guid: resource.metadata.guid,
                })
            })
            .collect())
    }

    fn list_with_uaa_usernames(
        &self,
        scope: Scope,
        guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String> {
        let guids: Vec<String> = self
            .list_resources(scope, guid, role)?
            .into_iter()
            .map(|resource| resource.metadata.guid)
            .collect();
        if guids.is_empty() {
            return Ok(Vec::new());
        }

        let usernames = self.resolve_usernames(&guids)?;
        Ok(guids
            .into_iter()
            .filter_map(|guid| {
                let username = usernames.get(&guid)?.clone();
                Some(UserFields { username, guid })
            })
            .collect())
    }

    /// Look the guids up in UAA. Guids UAA does not know are left out.
    fn resolve_usernames(&self, guids: &[String]) -> Result<HashMap<String, String>, String> {
        if self.uaa_endpoint.is_empty() {
            return Err("UAA endpoint missing from config; run 'cf login' again".to_string());
        }
        let mut usernames = HashMap::new();
        for batch in guids.chunks(UAA_BATCH_SIZE) {
            let filter = batch
                .iter()
                .map(|guid| format!("id eq \"{guid}\""))
                .collect::<Vec<String>>()
                .join(" or ");
            let mut url = Url::parse(&format!("{}/Users", self.uaa_endpoint))
                .map_err(|err| format!("invalid UAA endpoint {}: {err}", self.uaa_endpoint))?;
            url.query_pairs_mut()
                .append_pair("attributes", "id,userName")
                .append_pair("filter", &filter);

            let body = self.gateway.get(url.as_str())?;
            let users: UaaUsers = serde_json::from_str(&body)
                .map_err(|err| format!("decode UAA users: {err}"))?;
            for user in users.resources {
                usernames.insert(user.id, user.user_name);
            }
        }
        Ok(usernames)
    }
}

impl<G: Gateway> UserRepository for CloudControllerUserRepository<G> {
    fn list_users_in_org_for_role(
        &self,
        org_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String> {
        self.list_with_uaa_usernames(Scope::Organization, org_guid, role)
    }

    fn list_users_in_org_for_role_with_no_uaa(
        &self,
        org_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String> {
        self.list_with_cc_usernames(Scope::Organization, org_guid, role)
    }

    fn list_users_in_space_for_role(
        &self,
        space_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String> {
        self.list_with_uaa_usernames(Scope::Space, space_guid, role)
    }

    fn list_users_in_space_for_role_with_no_uaa(
        &self,
        space_guid: &str,
        role: RoleKind,
    ) -> Result<Vec<UserFields>, String> {
        self.list_with_cc_usernames(Scope::Space, space_guid, role)
    }
}

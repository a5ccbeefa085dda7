// Organization membership responses - decoding into report tables

use crate::error::Result;
use crate::schema::Schema;
use crate::store::Table;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Columns of the users report. The user id is the record key.
pub const USER_FIELDS: [&str; 11] = [
    "Login",
    "Name",
    "Role",
    "2FA",
    "Email",
    "Company",
    "Url",
    "Bio",
    "Status",
    "Updated",
    "Repositories",
];

/// Header row of the users CSV. It names the key column and labels some
/// columns differently from [`USER_FIELDS`], matching files already written
/// by earlier releases.
pub const USERS_CSV_HEADER: [&str; 12] = [
    "Id",
    "Login",
    "Name",
    "Admin",
    "2FA",
    "Email",
    "Company",
    "Url",
    "Bio",
    "Status",
    "Updated",
    "Repositories Contributed To",
];

/// Timestamp layout of the `Updated` column, e.g. `2019-05-01 10:00:00 +0000 UTC`.
pub const UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z %Z";

pub fn user_schema() -> Schema {
    Schema::new(USER_FIELDS)
}

/// One page of the organization `membersWithRole` GraphQL query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersResponse {
    pub data: UsersData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersData {
    pub organization: Organization,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "membersWithRole")]
    pub members: OrgMembers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgMembers {
    #[serde(rename = "edges", default)]
    pub members: Vec<OrgMember>,
    pub page_info: PageInfo,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgMember {
    #[serde(rename = "hasTwoFactorEnabled", default)]
    pub has_2fa: bool,
    pub role: String,
    #[serde(rename = "node")]
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    pub url: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub status: Option<UserStatus>,
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "repositoriesContributedTo", default)]
    pub repos: UserRepos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatus {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRepos {
    #[serde(default)]
    pub total_count: u64,
    #[serde(rename = "nodes", default)]
    pub repos: Vec<RepoName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoName {
    #[serde(rename = "nameWithOwner")]
    pub name: String,
}

impl UsersResponse {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn members(&self) -> &[OrgMember] {
        &self.data.organization.members.members
    }

    pub fn total_count(&self) -> u64 {
        self.data.organization.members.total_count
    }

    /// Cursor for the following page, if the organization has more members.
    pub fn next_cursor(&self) -> Option<&str> {
        let page = &self.data.organization.members.page_info;
        if page.has_next_page {
            page.end_cursor.as_deref()
        } else {
            None
        }
    }

    /// A users table holding this page's members.
    pub fn to_table(&self) -> Result<Table> {
        let mut table = Table::with_schema(Arc::new(user_schema()));
        self.append_to_table(&mut table)?;
        Ok(table)
    }

    /// Add this page's members to a users table. A member already present
    /// keeps its position and takes the newer row.
    pub fn append_to_table(&self, table: &mut Table) -> Result<()> {
        for member in self.members() {
            if table.contains_key(&member.user.id) {
                log::debug!("Member {} listed again, keeping the newer row", member.user.login);
            }
            table.insert(member.user.id.clone(), member.row())?;
        }
        log::debug!(
            "Loaded {} of {} members",
            self.members().len(),
            self.total_count()
        );
        Ok(())
    }
}

impl OrgMember {
    /// Cells in [`USER_FIELDS`] order.
    pub fn row(&self) -> Vec<String> {
        let user = &self.user;
        let repos = if user.repos.total_count > 0 {
            user.repos
                .repos
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        } else {
            String::new()
        };
        let status = user
            .status
            .as_ref()
            .and_then(|s| s.message.clone())
            .unwrap_or_default();

        vec![
            user.login.clone(),
            user.name.clone().unwrap_or_default(),
            self.role.clone(),
            self.has_2fa.to_string(),
            user.email.clone().unwrap_or_default(),
            user.company.clone().unwrap_or_default(),
            user.url.clone(),
            user.bio.clone().unwrap_or_default(),
            status,
            user.updated_at.format(UPDATED_FORMAT).to_string(),
            repos,
        ]
    }
}

// GraphQL transport - fetching organization membership pages

use crate::error::{GhorgsError, Result};
use crate::members::{user_schema, UsersResponse};
use crate::store::Table;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Members requested per page; the API caps `first` at 100.
pub const PAGE_SIZE: u32 = 100;

const MEMBERS_QUERY: &str = r#"query($org: String!, $first: Int!, $after: String) {
  organization(login: $org) {
    membersWithRole(first: $first, after: $after) {
      totalCount
      pageInfo { hasNextPage endCursor }
      edges {
        hasTwoFactorEnabled
        role
        node {
          id login name email company url bio
          status { message }
          updatedAt
          repositoriesContributedTo(first: 100) {
            totalCount
            nodes { nameWithOwner }
          }
        }
      }
    }
  }
}"#;

/// Request body for one page of the `membersWithRole` query.
pub fn members_query(organization: &str, after: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "query": MEMBERS_QUERY,
        "variables": {
            "org": organization,
            "first": PAGE_SIZE,
            "after": after,
        },
    })
}

/// Anything that can answer a GraphQL request body with raw response bytes.
pub trait PageSource {
    fn post(&self, body: &serde_json::Value) -> Result<Vec<u8>>;
}

/// Posts GraphQL requests over HTTPS with a bearer token.
pub struct HttpFetcher {
    agent: ureq::Agent,
    url: String,
    token: String,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        HttpFetcher {
            agent,
            url: url.into(),
            token: token.into(),
        }
    }
}

impl PageSource for HttpFetcher {
    fn post(&self, body: &serde_json::Value) -> Result<Vec<u8>> {
        let payload = serde_json::to_string(body)?;
        let response = self
            .agent
            .post(&self.url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .send_string(&payload);

        match response {
            Ok(resp) => {
                let mut out = Vec::new();
                resp.into_reader().read_to_end(&mut out)?;
                Ok(out)
            }
            Err(ureq::Error::Status(status, _)) => Err(GhorgsError::Http {
                url: self.url.clone(),
                status,
            }),
            Err(ureq::Error::Transport(err)) => Err(GhorgsError::Transport(err.to_string())),
        }
    }
}

/// Fetch every member of `organization`, following page cursors until the
/// last page. Members that show up on more than one page keep their first
/// position.
pub fn fetch_members<S: PageSource + ?Sized>(source: &S, organization: &str) -> Result<Table> {
    let mut table = Table::with_schema(Arc::new(user_schema()));
    let mut after: Option<String> = None;
    let mut pages = 0;

    loop {
        let bytes = source.post(&members_query(organization, after.as_deref()))?;
        let page = UsersResponse::from_json(&bytes)?;
        page.append_to_table(&mut table)?;
        pages += 1;

        match page.next_cursor() {
            Some(cursor) if after.as_deref() == Some(cursor) => {
                return Err(GhorgsError::Transport(format!(
                    "cursor `{cursor}` repeated on page {pages}"
                )));
            }
            Some(cursor) => after = Some(cursor.to_string()),
            None => break,
        }
    }

    log::info!(
        "Fetched {} members of {organization} in {pages} pages",
        table.len()
    );
    Ok(table)
}

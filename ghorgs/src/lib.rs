pub mod schema;
pub mod store;
pub mod export;
pub mod members;
pub mod fetch;
pub mod config;
pub mod error;

pub use error::{GhorgsError, Result};
pub use schema::{Field, Pivot, Schema};
pub use store::{MatchOutcome, RenderStyle, Rows, Table};
pub use export::{append_csv, FlatFile};
pub use members::UsersResponse;
pub use fetch::{fetch_members, HttpFetcher, PageSource};
pub use config::{parse_config, parse_config_str, Config};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GhorgsError {
    #[error("Invalid search field: {0}")]
    FieldNotFound(String),

    #[error("`{value}` not found at `{field}`")]
    NoMatch { field: String, value: String },

    #[error("{} not found in `{field}`", quote_all(.missing))]
    PartialMatch { field: String, missing: Vec<String> },

    #[error("Out of range: requested {requested} of {available} keys")]
    OutOfRange { requested: usize, available: usize },

    #[error("Row for `{key}` has {found} cells, schema has {expected} fields")]
    RowLength {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn quote_all(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("`{v}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, GhorgsError>;

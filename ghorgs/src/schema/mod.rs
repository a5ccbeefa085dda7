mod types;

pub use types::{Field, Pivot, Schema, ID_NAME};

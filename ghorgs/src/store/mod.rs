mod rows;

pub use rows::{RenderStyle, Rows};

use crate::error::{GhorgsError, Result};
use crate::schema::{Pivot, Schema};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// An ordered collection of keyed records over a fixed schema.
///
/// Every query returns a new table sharing this table's schema; the source is
/// never modified once populated. Cell values are plain text and all
/// comparisons are lexicographic.
///
/// A table is not synchronized. Callers that share one across threads must
/// provide their own locking around population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    schema: Arc<Schema>,
    rows: Rows,
}

/// Result of matching a field against several values at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Every requested value matched at least one record.
    Complete(Table),
    /// Some requested values matched nothing. `table` still holds every
    /// record that did match.
    Partial {
        table: Table,
        field: String,
        missing: Vec<String>,
    },
}

impl MatchOutcome {
    pub fn table(&self) -> &Table {
        match self {
            MatchOutcome::Complete(table) | MatchOutcome::Partial { table, .. } => table,
        }
    }

    pub fn into_table(self) -> Table {
        match self {
            MatchOutcome::Complete(table) | MatchOutcome::Partial { table, .. } => table,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, MatchOutcome::Complete(_))
    }

    /// Requested values that matched no record.
    pub fn missing(&self) -> &[String] {
        match self {
            MatchOutcome::Complete(_) => &[],
            MatchOutcome::Partial { missing, .. } => missing,
        }
    }

    /// Treat a partial match as an error, discarding the partial table.
    pub fn into_result(self) -> Result<Table> {
        match self {
            MatchOutcome::Complete(table) => Ok(table),
            MatchOutcome::Partial { field, missing, .. } => {
                Err(GhorgsError::PartialMatch { field, missing })
            }
        }
    }
}

impl Table {
    /// Create an empty table over `schema`.
    pub fn new(schema: Schema) -> Self {
        Table::with_schema(Arc::new(schema))
    }

    /// Create an empty table sharing an existing schema.
    pub fn with_schema(schema: Arc<Schema>) -> Self {
        let rows = Rows::with_width(schema.len());
        Table { schema, rows }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn field_names(&self) -> Vec<String> {
        self.schema.field_names()
    }

    pub fn keys(&self) -> &[String] {
        self.rows.keys()
    }

    pub fn rows(&self) -> &Rows {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, key: &str) -> Option<&[String]> {
        self.rows.row(key)
    }

    /// Whether `key` is listed in this table's key order.
    pub fn contains_key(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    /// Append a key. Already listed keys are left in place and `false` is
    /// returned. A new key reads as empty cells until its record is added.
    pub fn add_key(&mut self, key: impl Into<String>) -> bool {
        self.rows.add_key(key)
    }

    /// Set the record for a key; the last record added for a key wins.
    /// Fails with `RowLength` if the row does not match the schema.
    pub fn add_record(&mut self, key: impl Into<String>, row: Vec<String>) -> Result<()> {
        self.rows.add_record(key, row)
    }

    /// Add a record and list its key.
    pub fn insert(&mut self, key: impl Into<String>, row: Vec<String>) -> Result<()> {
        self.rows.push(key, row)
    }

    /// Sort ascending by a field.
    ///
    /// Equal cells may come out in any order. The returned table has its own
    /// key order; this table keeps its order.
    pub fn sort_by_field(&self, field: &str) -> Result<Table> {
        let pivot = self.pivot(field)?;
        let mut order: Vec<(&str, &str)> = self
            .rows
            .iter()
            .map(|(key, row)| (key, pivot.cell(key, row)))
            .collect();
        order.sort_unstable_by(|a, b| a.1.cmp(b.1));
        Ok(self.derive(order.into_iter().map(|(key, _)| key)))
    }

    /// All records whose field equals `value`, in source order.
    pub fn find_all_by_field(&self, field: &str, value: &str) -> Result<Table> {
        let found = self.filter(field, |cell| cell == value)?;
        if found.is_empty() {
            return Err(GhorgsError::NoMatch {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
        log::debug!("{} records with {field} = {value}", found.len());
        Ok(found)
    }

    /// All records whose field equals any of `values`, in source order.
    ///
    /// Fails with `NoMatch` only when nothing matched at all. When some of the
    /// values matched and others did not, the matching records are returned
    /// as [`MatchOutcome::Partial`] together with the values that were missing.
    pub fn find_all_by_field_values<S: AsRef<str>>(
        &self,
        field: &str,
        values: &[S],
    ) -> Result<MatchOutcome> {
        let pivot = self.pivot(field)?;
        let mut counts: HashMap<&str, usize> =
            values.iter().map(|v| (v.as_ref(), 0)).collect();

        let mut matched = Vec::new();
        for (key, row) in self.rows.iter() {
            if let Some(count) = counts.get_mut(pivot.cell(key, row)) {
                *count += 1;
                matched.push(key);
            }
        }

        if matched.is_empty() {
            return Err(GhorgsError::NoMatch {
                field: field.to_string(),
                value: values
                    .iter()
                    .map(|v| v.as_ref())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let table = self.derive(matched);
        let mut seen = HashSet::new();
        let missing: Vec<String> = values
            .iter()
            .map(|v| v.as_ref())
            .filter(|v| counts.get(v) == Some(&0) && seen.insert(*v))
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            return Ok(MatchOutcome::Complete(table));
        }
        for value in &missing {
            log::warn!("`{value}` not found in `{field}`");
        }
        Ok(MatchOutcome::Partial {
            table,
            field: field.to_string(),
            missing,
        })
    }

    /// All records whose field sorts strictly before `value`. An empty table
    /// is returned when nothing qualifies.
    pub fn less_than_by_field(&self, field: &str, value: &str) -> Result<Table> {
        self.filter(field, |cell| cell < value)
    }

    /// All records whose field sorts strictly after `value`. An empty table
    /// is returned when nothing qualifies.
    pub fn greater_than_by_field(&self, field: &str, value: &str) -> Result<Table> {
        self.filter(field, |cell| cell > value)
    }

    /// The first `n` records in current order.
    pub fn first(&self, n: usize) -> Result<Table> {
        self.check_count(n)?;
        Ok(self.derive(self.keys()[..n].iter().map(String::as_str)))
    }

    /// The last `n` records in current order.
    pub fn last(&self, n: usize) -> Result<Table> {
        self.check_count(n)?;
        let start = self.len() - n;
        Ok(self.derive(self.keys()[start..].iter().map(String::as_str)))
    }

    /// One line per record: the key and its cells, tab-separated, with empty
    /// cells shown as `-`. No trailing newline.
    pub fn render(&self) -> String {
        self.rows.render(RenderStyle::TABLE)
    }

    fn pivot(&self, field: &str) -> Result<Pivot<'_>> {
        self.schema
            .resolve(field)
            .ok_or_else(|| GhorgsError::FieldNotFound(field.to_string()))
    }

    fn filter<F>(&self, field: &str, keep: F) -> Result<Table>
    where
        F: Fn(&str) -> bool,
    {
        let pivot = self.pivot(field)?;
        let keys = self
            .rows
            .iter()
            .filter(|(key, row)| keep(pivot.cell(key, row)))
            .map(|(key, _)| key);
        Ok(self.derive(keys))
    }

    fn check_count(&self, n: usize) -> Result<()> {
        if n < 1 || n > self.len() {
            return Err(GhorgsError::OutOfRange {
                requested: n,
                available: self.len(),
            });
        }
        Ok(())
    }

    fn derive<'a, I>(&self, keys: I) -> Table
    where
        I: IntoIterator<Item = &'a str>,
    {
        Table {
            schema: Arc::clone(&self.schema),
            rows: self.rows.select(keys),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

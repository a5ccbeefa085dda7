use crate::error::{GhorgsError, Result};
use std::collections::{HashMap, HashSet};

/// How a keyed row is turned into a line of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStyle {
    /// Text written in place of an empty cell.
    pub empty_placeholder: Option<&'static str>,
}

impl RenderStyle {
    /// Report rendering: empty cells become `-` so columns stay visible.
    pub const TABLE: RenderStyle = RenderStyle {
        empty_placeholder: Some("-"),
    };

    /// Flat-file rendering: cells are written as they are.
    pub const EXPORT: RenderStyle = RenderStyle {
        empty_placeholder: None,
    };

    /// Render one row: the key followed by every cell, tab-separated.
    pub fn line(&self, key: &str, row: &[String]) -> String {
        let mut line = String::from(key);
        for cell in row {
            line.push('\t');
            match self.empty_placeholder {
                Some(placeholder) if cell.is_empty() => line.push_str(placeholder),
                _ => line.push_str(cell),
            }
        }
        line
    }
}

/// Ordered set of unique keys, each mapped to one row of text cells.
///
/// When built with a width, every row must have exactly that many cells and a
/// key listed without a row holds a row of empty cells. Without a width rows
/// may be of any length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rows {
    keys: Vec<String>,
    listed: HashSet<String>,
    records: HashMap<String, Vec<String>>,
    width: Option<usize>,
}

impl Rows {
    /// Rows of any length.
    pub fn new() -> Self {
        Rows::default()
    }

    /// Rows that must each hold exactly `width` cells.
    pub fn with_width(width: usize) -> Self {
        Rows {
            width: Some(width),
            ..Rows::default()
        }
    }

    pub fn width(&self) -> Option<usize> {
        self.width
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.listed.contains(key)
    }

    pub fn row(&self, key: &str) -> Option<&[String]> {
        self.records.get(key).map(Vec::as_slice)
    }

    /// Append `key` to the key order. Returns `false` if it is already listed,
    /// in which case nothing changes.
    pub fn add_key(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if !self.listed.insert(key.clone()) {
            return false;
        }
        let width = self.width.unwrap_or(0);
        self.records
            .entry(key.clone())
            .or_insert_with(|| vec![String::new(); width]);
        self.keys.push(key);
        true
    }

    /// Set the row for `key`, replacing any previous row. The key order is
    /// not touched; pair with [`Rows::add_key`] or use [`Rows::push`].
    pub fn add_record(&mut self, key: impl Into<String>, row: Vec<String>) -> Result<()> {
        let key = key.into();
        if let Some(expected) = self.width {
            if row.len() != expected {
                return Err(GhorgsError::RowLength {
                    key,
                    expected,
                    found: row.len(),
                });
            }
        }
        self.records.insert(key, row);
        Ok(())
    }

    /// Set the row for `key` and list the key if it is new.
    pub fn push(&mut self, key: impl Into<String>, row: Vec<String>) -> Result<()> {
        let key = key.into();
        self.add_record(key.clone(), row)?;
        self.add_key(key);
        Ok(())
    }

    /// Keys with their rows, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.keys.iter().filter_map(move |key| {
            self.records
                .get(key)
                .map(|row| (key.as_str(), row.as_slice()))
        })
    }

    /// New rows holding `keys` in the given order, with their rows copied.
    /// Keys that are not listed here are skipped.
    pub fn select<'a, I>(&self, keys: I) -> Rows
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = Rows {
            width: self.width,
            ..Rows::default()
        };
        for key in keys {
            if let Some(row) = self.records.get(key) {
                if self.listed.contains(key) && out.listed.insert(key.to_string()) {
                    out.records.insert(key.to_string(), row.clone());
                    out.keys.push(key.to_string());
                }
            }
        }
        out
    }

    /// One line per key, newline-separated, no trailing newline.
    pub fn render(&self, style: RenderStyle) -> String {
        self.iter()
            .map(|(key, row)| style.line(key, row))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

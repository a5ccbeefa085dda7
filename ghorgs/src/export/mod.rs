// Flat-file export - tab-separated report files

use crate::error::Result;
use crate::store::{RenderStyle, Rows, Table};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Keyed rows destined for a single tab-separated file.
///
/// Unlike [`Table`] rendering, empty cells are written as they are.
#[derive(Debug, Clone)]
pub struct FlatFile {
    path: PathBuf,
    rows: Rows,
}

impl FlatFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FlatFile {
            path: path.into(),
            rows: Rows::new(),
        }
    }

    /// Start a file from the records of a table, in the table's key order.
    pub fn from_table(path: impl Into<PathBuf>, table: &Table) -> Result<Self> {
        let mut file = FlatFile::new(path);
        for (key, row) in table.rows().iter() {
            file.rows.push(key, row.to_vec())?;
        }
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &Rows {
        &self.rows
    }

    pub fn add_key(&mut self, key: impl Into<String>) -> bool {
        self.rows.add_key(key)
    }

    pub fn add_record(&mut self, key: impl Into<String>, row: Vec<String>) -> Result<()> {
        self.rows.add_record(key, row)
    }

    pub fn insert(&mut self, key: impl Into<String>, row: Vec<String>) -> Result<()> {
        self.rows.push(key, row)
    }

    /// Write the file from scratch: `title` first, then one line per key.
    ///
    /// A row whose key is `title[0]` and whose cells equal `title[1..]` is
    /// skipped, so a header that was loaded as data is not written twice.
    /// Other duplicates are written as they are.
    pub fn flush<S: AsRef<str>>(&self, title: &[S]) -> Result<()> {
        let title: Vec<&str> = title.iter().map(|t| t.as_ref()).collect();
        let mut out = BufWriter::new(File::create(&self.path)?);
        writeln!(out, "{}", title.join("\t"))?;

        let mut skipped = 0;
        for (key, row) in self.rows.iter() {
            if is_title_row(&title, key, row) {
                skipped += 1;
                continue;
            }
            writeln!(out, "{}", RenderStyle::EXPORT.line(key, row))?;
        }
        out.flush()?;

        log::debug!(
            "Wrote {} rows to {} ({skipped} skipped)",
            self.rows.len() - skipped,
            self.path.display()
        );
        Ok(())
    }

}

fn is_title_row(title: &[&str], key: &str, row: &[String]) -> bool {
    match title.split_first() {
        Some((first, rest)) => {
            *first == key && row.len() == rest.len() && row.iter().zip(rest).all(|(c, t)| c == t)
        }
        None => false,
    }
}

/// Append a table's records to a tab-separated file.
///
/// A missing file is created with `header` as its first row. An existing
/// file is appended to without one.
pub fn append_csv<S: AsRef<str>>(
    path: impl AsRef<Path>,
    header: &[S],
    table: &Table,
) -> Result<()> {
    let path = path.as_ref();
    let is_new = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut out = BufWriter::new(file);

    if is_new {
        let header: Vec<&str> = header.iter().map(|h| h.as_ref()).collect();
        writeln!(out, "{}", header.join("\t"))?;
    }
    for (key, row) in table.rows().iter() {
        writeln!(out, "{}", RenderStyle::EXPORT.line(key, row))?;
    }
    out.flush()?;

    log::debug!("Appended {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_flush_writes_title_and_rows() {
        let tmp = TempDir::new().unwrap();
        let mut file = FlatFile::new(tmp.path().join("out.tsv"));
        file.insert("u1", cells(&["alice", ""])).unwrap();
        file.insert("u2", cells(&["bob", "Bob"])).unwrap();

        file.flush(&["Id", "Login", "Name"]).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "Id\tLogin\tName\nu1\talice\t\nu2\tbob\tBob\n");
    }

    #[test]
    fn test_flush_skips_row_equal_to_title() {
        let tmp = TempDir::new().unwrap();
        let mut file = FlatFile::new(tmp.path().join("out.tsv"));
        file.insert("Id", cells(&["Login"])).unwrap();
        file.insert("u1", cells(&["alice"])).unwrap();

        file.flush(&["Id", "Login"]).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "Id\tLogin\nu1\talice\n");
    }

    #[test]
    fn test_flush_keeps_row_with_title_key_only() {
        let tmp = TempDir::new().unwrap();
        let mut file = FlatFile::new(tmp.path().join("out.tsv"));
        file.insert("Id", cells(&["something else"])).unwrap();

        file.flush(&["Id", "Login"]).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "Id\tLogin\nId\tsomething else\n");
    }

    #[test]
    fn test_flush_truncates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.tsv");
        std::fs::write(&path, "stale\nstale\nstale\n").unwrap();

        let mut file = FlatFile::new(&path);
        file.insert("u1", cells(&["a"])).unwrap();
        file.flush(&["Id", "Login"]).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Id\tLogin\nu1\ta\n");
    }

    #[test]
    fn test_flush_into_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let file = FlatFile::new(tmp.path().join("missing").join("out.tsv"));
        assert!(file.flush(&["Id"]).is_err());
    }

    #[test]
    fn test_export_and_table_render_differ_on_empty_cells() {
        let tmp = TempDir::new().unwrap();
        let mut table = Table::new(Schema::new(["Login", "Name"]));
        table.insert("u1", cells(&["alice", ""])).unwrap();

        let file = FlatFile::from_table(tmp.path().join("out.tsv"), &table).unwrap();
        file.flush(&["Id", "Login", "Name"]).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(table.render(), "u1\talice\t-");
        assert_eq!(written.lines().nth(1), Some("u1\talice\t"));
    }

    #[test]
    fn test_append_csv_writes_header_once() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("users.csv");
        let mut table = Table::new(Schema::new(["Login"]));
        table.insert("u1", cells(&["alice"])).unwrap();

        append_csv(&path, &["Id", "Handle"], &table).unwrap();
        append_csv(&path, &["Id", "Handle"], &table).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Id\tHandle\nu1\talice\nu1\talice\n");
    }

    #[test]
    fn test_append_csv_users_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("users.csv");
        let table = Table::new(crate::members::user_schema());

        append_csv(&path, &crate::members::USERS_CSV_HEADER, &table).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "Id\tLogin\tName\tAdmin\t2FA\tEmail\tCompany\tUrl\tBio\tStatus\tUpdated\tRepositories Contributed To\n"
        );
    }
}

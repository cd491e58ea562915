use std::io::Write;

use crate::error::FormatError;

/// The `[Data]` section of a samplesheet.
///
/// Columns keep the order in which they were read, rows are addressed by
/// column name so callers never have to care about the layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Table {
            columns: columns.into_iter().map(|c| c.into()).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from comma-separated lines, the first one being the column header
    pub fn from_csv_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self, FormatError> {
        let mut lines = lines.iter();
        let mut table = match lines.next() {
            Some(header) => Table::new(header.as_ref().split(',')),
            None => Table::default(),
        };
        for line in lines {
            table.push_row(line.as_ref().split(',').map(|f| f.to_string()).collect())?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.position(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), FormatError> {
        if row.len() != self.columns.len() {
            return Err(FormatError::RowLength {
                row: self.rows.len() + 1,
                found: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Rewrite every value of `column` in place. Does nothing if the column is absent.
    pub fn map_column<F: Fn(&str) -> String>(&mut self, column: &str, f: F) {
        if let Some(col) = self.position(column) {
            for row in self.rows.iter_mut() {
                row[col] = f(&row[col]);
            }
        }
    }

    /// Keep only the rows whose position satisfies `keep`
    pub fn retain_rows<F: Fn(usize) -> bool>(&mut self, keep: F) {
        let mut pos = 0;
        self.rows.retain(|_| {
            let k = keep(pos);
            pos += 1;
            k
        });
    }

    /// Remove and return the row at `row`. Panics if out of bounds.
    pub fn remove_row(&mut self, row: usize) -> Vec<String> {
        self.rows.remove(row)
    }

    /// Write the table as plain CSV: header line, then one line per row
    pub fn write_csv<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "{}", self.columns.join(","))?;
        for row in &self.rows {
            writeln!(w, "{}", row.join(","))?;
        }
        Ok(())
    }
}

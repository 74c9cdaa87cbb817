//! Whitespace-separated tables with a `<title> <title> ...` header
//!
//! ```text
//! <children_count> <average_time> <stddev_time>
//! 1 2.00000e-04 1.000e-05
//! 2 3.10000e-05 2.000e-06
//! ```

use super::{linear_fit, FitOptions, LinearFit};
use crate::{AnalysisError, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Titled rows of text cells
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    titles: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Empty table with the given column titles
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            titles: titles.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Parse text; the first non-blank line must be the title header
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| AnalysisError::Format("table has no header line".into()))?;
        if !header.trim_start().starts_with('<') {
            return Err(AnalysisError::Format(format!(
                "table header must list <titles>, found {header:?}"
            )));
        }
        let titles = header
            .split_whitespace()
            .map(|title| title.trim_matches(|c| c == '<' || c == '>').to_string())
            .collect();
        let rows = lines
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .collect();
        Ok(Self { titles, rows })
    }

    /// Read and parse a table file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Append a row
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Column titles without angle brackets
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Data rows
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Index of the column titled `title`
    pub fn column_index(&self, title: &str) -> Option<usize> {
        self.titles.iter().position(|t| t == title)
    }

    /// Fit column `y_col` against column `x_col`
    pub fn fit(&self, x_col: usize, y_col: usize, options: &FitOptions<'_>) -> Result<LinearFit> {
        linear_fit(&self.rows, x_col, y_col, options)
    }
}

impl FromStr for Table {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: Vec<String> = self.titles.iter().map(|t| format!("<{t}>")).collect();
        writeln!(f, "{}", header.join(" "))?;
        for row in &self.rows {
            writeln!(f, "{}", row.join(" "))?;
        }
        Ok(())
    }
}

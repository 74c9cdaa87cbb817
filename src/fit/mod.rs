//! Ordinary least squares over tabular rows
//!
//! Rows are any slice-like of cells; two columns are extracted, optionally
//! transformed, and regressed. Returns slope, intercept, and the Pearson
//! correlation coefficient.

mod table;

pub use table::Table;

use crate::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A table cell that can be read as a number
pub trait Cell {
    /// Numeric value, or `None` if the cell does not hold a number
    fn to_f64(&self) -> Option<f64>;
}

impl Cell for f64 {
    fn to_f64(&self) -> Option<f64> {
        Some(*self)
    }
}

impl Cell for String {
    fn to_f64(&self) -> Option<f64> {
        self.as_str().to_f64()
    }
}

impl Cell for &str {
    fn to_f64(&self) -> Option<f64> {
        self.trim().parse().ok()
    }
}

type Transform<'a> = Box<dyn Fn(f64) -> f64 + 'a>;

/// Column transforms and row restriction for [`linear_fit`]
#[derive(Default)]
pub struct FitOptions<'a> {
    x_transform: Option<Transform<'a>>,
    y_transform: Option<Transform<'a>>,
    rows: Option<Range<usize>>,
}

impl<'a> FitOptions<'a> {
    /// No transforms, all rows
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to every extracted x value
    pub fn x_transform(mut self, f: impl Fn(f64) -> f64 + 'a) -> Self {
        self.x_transform = Some(Box::new(f));
        self
    }

    /// Apply `f` to every extracted y value
    pub fn y_transform(mut self, f: impl Fn(f64) -> f64 + 'a) -> Self {
        self.y_transform = Some(Box::new(f));
        self
    }

    /// Only use rows in `range` (clamped to the available rows)
    pub fn rows(mut self, range: Range<usize>) -> Self {
        self.rows = Some(range);
        self
    }
}

impl fmt::Debug for FitOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitOptions")
            .field("x_transform", &self.x_transform.is_some())
            .field("y_transform", &self.y_transform.is_some())
            .field("rows", &self.rows)
            .finish()
    }
}

/// Result of a least-squares fit: `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    /// Fitted slope
    pub slope: f64,
    /// Fitted intercept
    pub intercept: f64,
    /// Pearson correlation coefficient (0 when y is constant)
    pub r: f64,
}

impl LinearFit {
    /// Evaluate the fitted line at `x`
    #[inline]
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Ordinary least squares over `(x, y)` points
///
/// Fails with `EmptyData` for fewer than two points or when every x is equal.
pub fn least_squares(points: &[(f64, f64)]) -> Result<LinearFit> {
    if points.len() < 2 {
        return Err(AnalysisError::EmptyData(format!(
            "linear fit needs at least 2 points, found {}",
            points.len()
        )));
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for &(x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx == 0.0 {
        return Err(AnalysisError::EmptyData(
            "linear fit with zero variance in x".into(),
        ));
    }

    let slope = sxy / sxx;
    let r = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };

    Ok(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        r,
    })
}

/// Fit column `y_col` against column `x_col`
///
/// Errors: a row shorter than either column is `Index`; a cell that is not a
/// number is `Parse` (with the 1-based row number); too few rows or constant
/// x is `EmptyData`.
pub fn linear_fit<R, C>(
    rows: &[R],
    x_col: usize,
    y_col: usize,
    options: &FitOptions<'_>,
) -> Result<LinearFit>
where
    R: AsRef<[C]>,
    C: Cell,
{
    let range = options.rows.clone().unwrap_or(0..rows.len());
    let end = range.end.min(rows.len());
    let start = range.start.min(end);

    let mut points = Vec::with_capacity(end - start);
    for (row_index, row) in rows.iter().enumerate().take(end).skip(start) {
        let row = row.as_ref();
        let cell = |col: usize| -> Result<f64> {
            let cell = row.get(col).ok_or(AnalysisError::Index {
                index: col as i64,
                bound: row.len(),
            })?;
            cell.to_f64().ok_or_else(|| AnalysisError::Parse {
                line: row_index + 1,
                message: format!("column {col} is not a number"),
            })
        };

        let mut x = cell(x_col)?;
        let mut y = cell(y_col)?;
        if let Some(f) = &options.x_transform {
            x = f(x);
        }
        if let Some(f) = &options.y_transform {
            y = f(y);
        }
        points.push((x, y));
    }

    least_squares(&points)
}

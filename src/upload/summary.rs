//! Descriptive statistics for uploaded CSV files.
//!
//! The summary is a plain-text table in the spirit of a dataframe `describe()`:
//! numeric columns get `count, mean, std, min, 25%, 50%, 75%, max`; when no
//! column is numeric every column gets `count, unique, top, freq` instead.
//! Rows shorter than the header are padded with missing values.
//! It is followed by a `Columns:` line naming at most the first ten columns.

use std::collections::HashMap;
use thiserror::Error;

const MAX_LISTED_COLUMNS: usize = 10;

const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

const NUMERIC_LABELS: &[&str] = &["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

const OBJECT_LABELS: &[&str] = &["count", "unique", "top", "freq"];

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("CSV is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("CSV could not be parsed: {0}")]
    Parse(#[from] csv::Error),

    #[error("CSV has no columns")]
    NoColumns,

    #[error("CSV line {line}: expected {expected} fields, saw {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// Parses `bytes` as a headed CSV table and renders its summary.
pub fn summarize_csv(bytes: &[u8]) -> Result<String, CsvError> {
    let text = std::str::from_utf8(bytes)?;
    let table = Table::parse(text)?;

    let mut summary = table.describe();
    summary.push_str("\n\nColumns:\n");
    summary.push_str(
        &table.headers
            .iter()
            .take(MAX_LISTED_COLUMNS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(summary)
}

struct Table {
    headers: Vec<String>,
    /// Column-major cells; `None` marks a missing value.
    columns: Vec<Vec<Option<String>>>,
}

impl Table {
    fn parse(text: &str) -> Result<Self, CsvError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.is_empty() {
            return Err(CsvError::NoColumns);
        }

        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(CsvError::TooManyFields {
                    line: record.position().map_or(0, |p| p.line()),
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            // Short rows are padded with missing values.
            for (i, column) in columns.iter_mut().enumerate() {
                let cell = record.get(i).map(str::trim).filter(|c| !is_missing(c));
                column.push(cell.map(str::to_string));
            }
        }

        Ok(Self { headers, columns })
    }

    fn describe(&self) -> String {
        let numeric: Vec<(&str, NumericStats)> = self.headers
            .iter()
            .zip(&self.columns)
            .filter_map(|(name, cells)| NumericStats::from_cells(cells).map(|s| (name.as_str(), s)))
            .collect();

        if !numeric.is_empty() {
            let headers: Vec<&str> = numeric
                .iter()
                .map(|(name, _)| *name)
                .collect();
            let cells: Vec<Vec<String>> = numeric
                .iter()
                .map(|(_, stats)| stats.cells())
                .collect();
            return render(NUMERIC_LABELS, &headers, &cells);
        }

        let headers: Vec<&str> = self.headers
            .iter()
            .map(String::as_str)
            .collect();
        let cells: Vec<Vec<String>> = self.columns
            .iter()
            .map(|cells| ObjectStats::from_cells(cells).cells())
            .collect();
        render(OBJECT_LABELS, &headers, &cells)
    }
}

fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell)
}

struct NumericStats {
    count: usize,
    mean: f64,
    std: f64,
    min: f64,
    q1: f64,
    median: f64,
    q3: f64,
    max: f64,
}

impl NumericStats {
    /// `None` unless the column has rows and every present cell is a number.
    /// A column whose cells are all missing is numeric with a count of zero.
    fn from_cells(cells: &[Option<String>]) -> Option<Self> {
        if cells.is_empty() {
            return None;
        }
        let mut values = Vec::with_capacity(cells.len());
        for cell in cells.iter().flatten() {
            let value: f64 = cell.parse().ok()?;
            if !value.is_nan() {
                values.push(value);
            }
        }
        if values.is_empty() {
            return Some(Self::empty());
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let count = values.len();
        let mean = values.iter().sum::<f64>() / (count as f64);
        let std = if count < 2 {
            f64::NAN
        } else {
            let squares: f64 = values
                .iter()
                .map(|v| (v - mean).powi(2))
                .sum();
            (squares / ((count - 1) as f64)).sqrt()
        };

        Some(Self {
            count,
            mean,
            std,
            min: values[0],
            q1: quantile(&values, 0.25),
            median: quantile(&values, 0.5),
            q3: quantile(&values, 0.75),
            max: values[count - 1],
        })
    }

    fn empty() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            q1: f64::NAN,
            median: f64::NAN,
            q3: f64::NAN,
            max: f64::NAN,
        }
    }

    fn cells(&self) -> Vec<String> {
        [
            self.count as f64,
            self.mean,
            self.std,
            self.min,
            self.q1,
            self.median,
            self.q3,
            self.max,
        ]
            .iter()
            .map(|v| format_float(*v))
            .collect()
    }
}

/// Linear interpolation between the two closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * ((sorted.len() - 1) as f64);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - (lower as f64))
}

fn format_float(value: f64) -> String {
    if value.is_nan() { "NaN".to_string() } else { format!("{:.6}", value) }
}

struct ObjectStats {
    count: usize,
    unique: usize,
    top: Option<String>,
    freq: usize,
}

impl ObjectStats {
    fn from_cells(cells: &[Option<String>]) -> Self {
        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for cell in cells.iter().flatten() {
            let counter = counts.entry(cell.as_str()).or_insert(0);
            if *counter == 0 {
                order.push(cell.as_str());
            }
            *counter += 1;
        }

        // Ties go to the value seen first.
        let mut top: Option<(&str, usize)> = None;
        for value in &order {
            let freq = counts[value];
            if top.map_or(true, |(_, best)| freq > best) {
                top = Some((*value, freq));
            }
        }

        Self {
            count: counts.values().sum(),
            unique: order.len(),
            top: top.map(|(value, _)| value.to_string()),
            freq: top.map_or(0, |(_, freq)| freq),
        }
    }

    fn cells(&self) -> Vec<String> {
        match &self.top {
            Some(top) =>
                vec![
                    self.count.to_string(),
                    self.unique.to_string(),
                    top.clone(),
                    self.freq.to_string()
                ],
            None =>
                vec![
                    self.count.to_string(),
                    self.unique.to_string(),
                    "NaN".to_string(),
                    "NaN".to_string()
                ],
        }
    }
}

/// Row labels left-aligned, every column right-aligned, two spaces apart.
fn render(labels: &[&str], headers: &[&str], columns: &[Vec<String>]) -> String {
    let label_width = labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);
    let widths: Vec<usize> = headers
        .iter()
        .zip(columns)
        .map(|(header, cells)| {
            cells
                .iter()
                .map(|c| c.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = " ".repeat(label_width);
    for (header, width) in headers.iter().zip(&widths) {
        out.push_str(&format!("  {:>width$}", header, width = *width));
    }
    for (row, label) in labels.iter().enumerate() {
        out.push('\n');
        out.push_str(&format!("{:<width$}", label, width = label_width));
        for (cells, width) in columns.iter().zip(&widths) {
            out.push_str(&format!("  {:>width$}", cells[row], width = *width));
        }
    }
    out
}

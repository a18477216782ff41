use chrono::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};
pub mod chart;
pub mod error;
pub mod export;
pub mod plot;
pub mod yearly;

pub use error::{ExportError, LoadError};

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

pub const DEFAULT_CSV: &str = "multiTimeline.csv";
pub const DEFAULT_TREND: &str = "trend.png";
pub const DEFAULT_RATIO: &str = "ratio.png";

/// Non-data lines (category, blank) before the header of a trends export.
pub const PREAMBLE_LINES: usize = 2;

/// Added to ratio denominators.
pub const RATIO_EPS: f64 = 1e-6;

pub const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
pub const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// What to do with cells that do not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Bad dates drop the row, bad values become NAN.
    Tolerant,
    /// Any bad cell fails the load.
    Strict,
}

impl Default for ParsePolicy {
    fn default() -> Self {
        ParsePolicy::Tolerant
    }
}

/// The main struct for the two-term interest time series.
/// Missing values are stored as NAN.
#[derive(Debug, Clone)]
pub struct TrendTable {
    pub terms: [String; 2],
    pub date: Vec<NaiveDate>,
    pub values: [Vec<f64>; 2],
}

impl TrendTable {
    pub fn new(capacity: usize, terms: [String; 2]) -> TrendTable {
        TrendTable {
            terms,
            date: Vec::with_capacity(capacity),
            values: [Vec::with_capacity(capacity), Vec::with_capacity(capacity)],
        }
    }

    pub fn push(&mut self, date: NaiveDate, a: f64, b: f64) {
        self.date.push(date);
        self.values[0].push(a);
        self.values[1].push(b);
    }

    pub fn len(&self) -> usize {
        self.date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_empty()
    }

    /// Init a TrendTable from a trends csv export:
    /// skip the preamble, take the first three columns of the header and the rows,
    /// parse according to the policy and sort by date.
    pub fn from_csv(fin: &Path, policy: ParsePolicy) -> Result<TrendTable, LoadError> {
        let file = File::open(fin).map_err(|source| LoadError::Open {
            path: fin.to_path_buf(),
            source,
        })?;
        TrendTable::from_reader(BufReader::new(file), fin, policy)
    }

    /// Same as `from_csv` for any buffered reader; `source` only names it in errors.
    pub fn from_reader<R: BufRead>(
        mut rdr: R,
        source: &Path,
        policy: ParsePolicy,
    ) -> Result<TrendTable, LoadError> {
        let mut line = String::new();
        for _ in 0..PREAMBLE_LINES {
            line.clear();
            let n = rdr.read_line(&mut line).map_err(|e| LoadError::Read {
                path: source.to_path_buf(),
                source: e.into(),
            })?;
            if n == 0 {
                return Err(LoadError::MissingPreamble {
                    path: source.to_path_buf(),
                });
            }
        }

        let mut csv_rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let headers = csv_rdr
            .headers()
            .map_err(|e| LoadError::Read {
                path: source.to_path_buf(),
                source: e,
            })?
            .clone();
        if headers.len() < 3 {
            return Err(LoadError::TooFewColumns {
                path: source.to_path_buf(),
                found: headers.len(),
            });
        }
        let terms = [
            term_label(&headers[1], "Term A"),
            term_label(&headers[2], "Term B"),
        ];
        debug!("header {:?}, terms {:?}", headers, terms);

        let mut table = TrendTable::new(1024, terms);
        let mut dropped = 0usize;
        let mut coerced = 0usize;
        for (i, record) in csv_rdr.records().enumerate() {
            let record = record.map_err(|e| LoadError::Read {
                path: source.to_path_buf(),
                source: e,
            })?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(i + 2)
                + PREAMBLE_LINES;
            let date_str = record.get(0).unwrap_or("");
            let date = match parse_date_tolerant(date_str) {
                Some(d) => d,
                None if policy == ParsePolicy::Strict => {
                    return Err(LoadError::InvalidCell {
                        line,
                        column: 1,
                        text: date_str.to_string(),
                    })
                }
                None => {
                    debug!("line {}: dropping row with invalid date '{}'", line, date_str);
                    dropped += 1;
                    continue;
                }
            };
            let mut vs = [f64::NAN; 2];
            for (k, v) in vs.iter_mut().enumerate() {
                let cell = record.get(k + 1).unwrap_or("");
                *v = parse_value_tolerant(cell);
                if v.is_nan() {
                    if policy == ParsePolicy::Strict {
                        return Err(LoadError::InvalidCell {
                            line,
                            column: k + 2,
                            text: cell.to_string(),
                        });
                    }
                    debug!("line {}: '{}' is not a number, set to NAN", line, cell);
                    coerced += 1;
                }
            }
            table.push(date, vs[0], vs[1]);
        }

        if table.is_empty() {
            return Err(LoadError::NoRows {
                path: source.to_path_buf(),
            });
        }
        table.sort_by_date();
        info!(
            "loaded {} rows from {} ({} dropped for invalid dates, {} missing values)",
            table.len(),
            source.display(),
            dropped,
            coerced
        );
        Ok(table)
    }

    /// stable sort on the date, rows with equal dates keep their order
    pub fn sort_by_date(&mut self) {
        let mut idx: Vec<usize> = (0..self.date.len()).collect();
        idx.sort_by_key(|&i| self.date[i]);
        self.date = idx.iter().map(|&i| self.date[i]).collect();
        for series in self.values.iter_mut() {
            *series = idx.iter().map(|&i| series[i]).collect();
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.date.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.date.last().copied()
    }

    /// index, date and values of the most recent row
    pub fn last(&self) -> Option<(usize, NaiveDate, [f64; 2])> {
        let i = self.date.len().checked_sub(1)?;
        Some((i, self.date[i], [self.values[0][i], self.values[1][i]]))
    }

    /// largest non-missing value over both series
    pub fn max_value(&self) -> Option<f64> {
        self.values
            .iter()
            .flat_map(|s| s.iter())
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |m: Option<f64>, v| Some(m.map_or(v, |m| m.max(v))))
    }
}

impl std::fmt::Display for TrendTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "date,{},{}", self.terms[0], self.terms[1])?;
        for (i, d) in self.date.iter().enumerate() {
            writeln!(f, "{},{},{}", d, self.values[0][i], self.values[1][i])?;
        }
        Ok(())
    }
}

/// Parse a date cell, `None` if no accepted format matches.
/// Monthly exports (`2004-01`) map to the first day of the month
/// and timestamps keep only their date.
pub fn parse_date_tolerant(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS.iter() {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS.iter() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    // hourly exports: 2023-06-01T13
    if let Ok(dt) = NaiveDateTime::parse_from_str(&format!("{}:00", s), "%Y-%m-%dT%H:%M") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok()
}

/// Parse a value cell, NAN if it is not a number (e.g. the `<1` of trends exports).
pub fn parse_value_tolerant(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Term name from a header cell such as `Fondue: (Worldwide)`.
pub fn term_label(header: &str, fallback: &str) -> String {
    let name = header
        .trim()
        .trim_start_matches('\u{feff}')
        .split(':')
        .next()
        .unwrap_or("")
        .trim();
    if name.is_empty() {
        fallback.to_string()
    } else {
        name.to_string()
    }
}

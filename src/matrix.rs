use crate::error::ScalerError;
use crate::utils::{hex_to_rate, trailing_mean};
use crate::RECORD_MARKER;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Counts per second, one row per scaler record and one column per data channel.
/// The last column is the coincidence rate.
#[derive(Debug, Clone, PartialEq)]
pub struct CountMatrix {
    pub labels: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// Keep only the lines that literally start with the marker token,
/// e.g., "DS 0A 1B" but neither " DS 0A" nor "DSX 0A".
fn is_record(line: &str) -> bool {
    line.starts_with(RECORD_MARKER) && line.split_whitespace().next() == Some(RECORD_MARKER)
}

impl CountMatrix {
    /// Read the scaler records from a log file.
    /// The file is only held open while the records are read.
    pub fn from_file<P>(fin: P) -> Result<CountMatrix, ScalerError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(fin)?;
        CountMatrix::from_reader(BufReader::new(file))
    }

    /// Parse the records from any buffered reader.
    /// The width is fixed by the first record and every following record is checked against it.
    /// The first converted column is not a data channel and is dropped.
    pub fn from_reader<R: BufRead>(buf: R) -> Result<CountMatrix, ScalerError> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut width: Option<usize> = None;
        for (i, l) in buf.lines().enumerate() {
            let line = l?;
            let lineno = i + 1;
            if !is_record(&line) {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().skip(1).collect();
            let expected = match width {
                Some(w) => w,
                None => {
                    if tokens.len() < 2 {
                        return Err(ScalerError::EmptyRecord {
                            line: lineno,
                            found: tokens.len(),
                        });
                    }
                    log::debug!(
                        "found {} fields in the first record, line {}",
                        tokens.len(),
                        lineno
                    );
                    *width.insert(tokens.len())
                }
            };
            if tokens.len() != expected {
                return Err(ScalerError::InconsistentRowWidth {
                    line: lineno,
                    expected,
                    found: tokens.len(),
                });
            }
            let mut row = tokens
                .iter()
                .map(|t| {
                    hex_to_rate(t).map_err(|_| ScalerError::MalformedHex {
                        line: lineno,
                        token: t.to_string(),
                    })
                })
                .collect::<Result<Vec<f64>, ScalerError>>()?;
            row.remove(0);
            rows.push(row);
        }
        let width = width.ok_or(ScalerError::NoRecordsFound(RECORD_MARKER))?;
        let labels = (1..width).map(|c| format!("Column {}", c)).collect();
        log::info!("parsed {} records with {} data columns", rows.len(), width - 1);
        Ok(CountMatrix { labels, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.labels.len()
    }

    /// Copy of column c, top to bottom.
    pub fn column(&self, c: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[c]).collect()
    }

    /// Index of the coincidence column, always the last one.
    pub fn coincidence_index(&self) -> usize {
        self.width() - 1
    }

    /// Smooth every channel column with a trailing moving average,
    /// leaving the coincidence column untouched.
    /// Windows longer than the series give a cumulative mean.
    pub fn smooth(&self, window: usize) -> Result<CountMatrix, ScalerError> {
        if window == 0 {
            return Err(ScalerError::InvalidWindowSize(window.to_string()));
        }
        let mut smoothed = self.clone();
        for c in 0..self.coincidence_index() {
            let mean = trailing_mean(&self.column(c), window);
            smoothed
                .rows
                .iter_mut()
                .zip(mean)
                .for_each(|(row, m)| row[c] = m);
        }
        Ok(smoothed)
    }
}

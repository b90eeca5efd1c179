//! Column-labelled, date-indexed frame.
//!
//! The regime classifiers, composite builder, and allocation engine all
//! operate on small aligned panels; this type keeps them out of the business
//! of re-implementing date alignment. Storage is column-major, index sorted
//! ascending, NaN marks missing cells.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::series::TimeSeries;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    index: Vec<NaiveDate>,
    columns: Vec<String>,
    /// values[c][r] — column c, row r.
    values: Vec<Vec<f64>>,
}

impl Frame {
    /// Empty frame over a fixed (sorted, unique) index.
    pub fn with_index(mut index: Vec<NaiveDate>) -> Self {
        index.sort();
        index.dedup();
        Self {
            index,
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Outer-join named series on their union of dates, sorted ascending.
    /// Cells without an observation carry NaN.
    pub fn from_series_outer(series: &[(String, TimeSeries)]) -> Self {
        let union: BTreeSet<NaiveDate> = series
            .iter()
            .flat_map(|(_, s)| s.dates().collect::<Vec<_>>())
            .collect();
        let index: Vec<NaiveDate> = union.into_iter().collect();
        let mut frame = Self::with_index(index);
        for (name, s) in series {
            let col = s.reindex(&frame.index);
            frame.push_column(name.clone(), col);
        }
        frame
    }

    /// Append a column. Panics if the length does not match the index.
    pub fn push_column(&mut self, name: String, values: Vec<f64>) {
        assert_eq!(
            values.len(),
            self.index.len(),
            "column '{name}' length mismatch"
        );
        self.columns.push(name);
        self.values.push(values);
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i].as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Row r as a dense vector (one value per column).
    pub fn row(&self, r: usize) -> Vec<f64> {
        self.values.iter().map(|col| col[r]).collect()
    }

    /// Extract one column as a series (NaN cells preserved).
    pub fn column_series(&self, name: &str) -> Option<TimeSeries> {
        self.column(name)
            .map(|col| TimeSeries::from_parts(self.index.clone(), col.to_vec()))
    }

    /// Indices of rows where every column is finite.
    pub fn complete_rows(&self) -> Vec<usize> {
        (0..self.nrows())
            .filter(|&r| self.values.iter().all(|col| col[r].is_finite()))
            .collect()
    }

    /// Keep only rows where every column is finite.
    pub fn drop_incomplete_rows(&self) -> Frame {
        let keep = self.complete_rows();
        Frame {
            index: keep.iter().map(|&r| self.index[r]).collect(),
            columns: self.columns.clone(),
            values: self
                .values
                .iter()
                .map(|col| keep.iter().map(|&r| col[r]).collect())
                .collect(),
        }
    }

    /// Last `n` complete rows (all columns finite).
    pub fn tail_complete(&self, n: usize) -> Frame {
        let complete = self.drop_incomplete_rows();
        let skip = complete.nrows().saturating_sub(n);
        Frame {
            index: complete.index[skip..].to_vec(),
            columns: complete.columns.clone(),
            values: complete
                .values
                .iter()
                .map(|col| col[skip..].to_vec())
                .collect(),
        }
    }

    /// Linear interpolation of interior NaN gaps per column, with flat
    /// extension of the first/last finite value across the edges. Columns
    /// with no finite value at all are left untouched.
    pub fn interpolate_both(&self) -> Frame {
        let mut out = self.clone();
        for col in &mut out.values {
            interpolate_column(col);
        }
        out
    }

    /// Resample to a daily grid from first to last index date, carrying each
    /// column's previous value forward (stepwise constant).
    pub fn resample_daily_ffill(&self) -> Frame {
        let (Some(&first), Some(&last)) = (self.index.first(), self.index.last()) else {
            return self.clone();
        };
        let ndays = (last - first).num_days() as usize + 1;
        let mut index = Vec::with_capacity(ndays);
        let mut day = first;
        while day <= last {
            index.push(day);
            day += chrono::Duration::days(1);
        }
        let mut values = Vec::with_capacity(self.ncols());
        for col in &self.values {
            let mut out = Vec::with_capacity(ndays);
            let mut cursor = 0usize;
            let mut carry = f64::NAN;
            for d in &index {
                while cursor < self.index.len() && self.index[cursor] <= *d {
                    if col[cursor].is_finite() {
                        carry = col[cursor];
                    }
                    cursor += 1;
                }
                out.push(carry);
            }
            // ffill never looks ahead, so leading cells may stay NaN
            values.push(out);
        }
        Frame {
            index,
            columns: self.columns.clone(),
            values,
        }
    }
}

fn interpolate_column(col: &mut [f64]) {
    let finite: Vec<usize> = (0..col.len()).filter(|&i| col[i].is_finite()).collect();
    let (Some(&first), Some(&last)) = (finite.first(), finite.last()) else {
        return;
    };
    for i in 0..first {
        col[i] = col[first];
    }
    for i in last + 1..col.len() {
        col[i] = col[last];
    }
    for pair in finite.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi - lo > 1 {
            let step = (col[hi] - col[lo]) / (hi - lo) as f64;
            for i in lo + 1..hi {
                col[i] = col[lo] + step * (i - lo) as f64;
            }
        }
    }
}

//! CSV-directory data source.
//!
//! Layout: `{dir}/{series_id}.csv` with a `date,value` header, dates in
//! `YYYY-MM-DD`. One store can stand in for any named provider, which makes
//! offline runs and fixtures trivial: point a store at a directory per source.
//!
//! A missing file is "no data" (empty series), not an error — unknown ids are
//! soft per the provider contract. A present-but-unparseable file is a
//! malformed-response error.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use super::provider::{DataError, SeriesProvider};
use crate::domain::TimeSeries;

pub struct CsvStore {
    name: String,
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(name: &str, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn series_path(&self, series_id: &str) -> PathBuf {
        // series ids may embed path separators (ECB keys do)
        let safe: String = series_id
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{safe}.csv"))
    }

    /// Write a series as a fixture (used by tests and seeding tools).
    pub fn write_series(&self, series_id: &str, series: &TimeSeries) -> Result<(), DataError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| DataError::Io(e.to_string()))?;
        let path = self.series_path(series_id);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| DataError::Io(e.to_string()))?;
        writer
            .write_record(["date", "value"])
            .map_err(|e| DataError::Io(e.to_string()))?;
        for (date, value) in series.iter() {
            writer
                .write_record([date.format("%Y-%m-%d").to_string(), value.to_string()])
                .map_err(|e| DataError::Io(e.to_string()))?;
        }
        writer.flush().map_err(|e| DataError::Io(e.to_string()))?;
        Ok(())
    }

    fn read_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries, DataError> {
        let path = self.series_path(series_id);
        if !path.exists() {
            return Ok(TimeSeries::new());
        }
        let mut reader =
            csv::Reader::from_path(&path).map_err(|e| DataError::Io(e.to_string()))?;
        let mut points = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| DataError::MalformedResponse(e.to_string()))?;
            let date_field = record.get(0).unwrap_or_default();
            let value_field = record.get(1).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_field, "%Y-%m-%d").map_err(|_| {
                DataError::MalformedResponse(format!("bad date '{date_field}' in {series_id}"))
            })?;
            let value: f64 = value_field.parse().map_err(|_| {
                DataError::MalformedResponse(format!("bad value '{value_field}' in {series_id}"))
            })?;
            if value.is_finite() {
                points.push((date, value));
            }
        }
        Ok(TimeSeries::from_points(points).restrict(start, end))
    }
}

impl SeriesProvider for CsvStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries, DataError> {
        self.read_series(series_id, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn write_then_fetch_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new("FRED", dir.path());
        let series = TimeSeries::from_points(vec![(d(2024, 1, 1), 1.5), (d(2024, 2, 1), 2.5)]);
        store.write_series("DGS10", &series).unwrap();

        let out = store.fetch("DGS10", d(2024, 1, 1), d(2024, 12, 31)).unwrap();
        assert_eq!(out, series);
    }

    #[test]
    fn missing_file_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new("FRED", dir.path());
        let out = store.fetch("NOPE", d(2024, 1, 1), d(2024, 12, 31)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn range_restriction_applies() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new("FRED", dir.path());
        let series = TimeSeries::from_points(vec![
            (d(2023, 6, 1), 1.0),
            (d(2024, 1, 1), 2.0),
            (d(2024, 6, 1), 3.0),
        ]);
        store.write_series("X", &series).unwrap();

        let out = store.fetch("X", d(2024, 1, 1), d(2024, 3, 1)).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get(d(2024, 1, 1)), Some(2.0));
    }

    #[test]
    fn malformed_value_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BAD.csv"), "date,value\n2024-01-01,not_a_number\n")
            .unwrap();
        let store = CsvStore::new("FRED", dir.path());
        assert!(matches!(
            store.fetch("BAD", d(2024, 1, 1), d(2024, 12, 31)),
            Err(DataError::MalformedResponse(_))
        ));
    }

    #[test]
    fn slash_in_series_id_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new("ECB", dir.path());
        let series = TimeSeries::from_points(vec![(d(2024, 1, 1), 1.0)]);
        store.write_series("YC/B.U2.EUR", &series).unwrap();
        let out = store.fetch("YC/B.U2.EUR", d(2024, 1, 1), d(2024, 12, 31)).unwrap();
        assert_eq!(out.len(), 1);
    }
}

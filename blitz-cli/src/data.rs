//! CSV bar files: `timestamp,open,high,low,close`.
//!
//! Timestamps are RFC 3339 or unix seconds. Rows must be in strictly
//! increasing time order; anything else is rejected with the row number.

use anyhow::{bail, Context, Result};
use blitz_core::domain::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let secs: i64 = raw
        .parse()
        .with_context(|| format!("timestamp '{raw}' is neither RFC 3339 nor unix seconds"))?;
    DateTime::from_timestamp(secs, 0).with_context(|| format!("unix timestamp {secs} out of range"))
}

pub fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open bar file {}", path.display()))?;

    let mut bars: Vec<Bar> = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = row.with_context(|| format!("{}: bad row at line {line}", path.display()))?;
        let timestamp = parse_timestamp(&row.timestamp)
            .with_context(|| format!("{}: line {line}", path.display()))?;

        if let Some(prev) = bars.last() {
            if timestamp <= prev.timestamp {
                bail!(
                    "{}: line {line}: timestamp {timestamp} is not after {}",
                    path.display(),
                    prev.timestamp
                );
            }
        }
        bars.push(Bar::new(timestamp, row.open, row.high, row.low, row.close));
    }
    Ok(bars)
}

pub fn write_bars(path: &Path, bars: &[Bar]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for bar in bars {
        writer.serialize(CsvRow {
            timestamp: bar.timestamp.to_rfc3339(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_both_timestamp_forms() {
        let a = parse_timestamp("2024-03-01T09:00:00Z").unwrap();
        let b = parse_timestamp("1709283600").unwrap();
        assert_eq!(a, b);
        let offset = parse_timestamp("2024-03-01T10:00:00+01:00").unwrap();
        assert_eq!(offset, a);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn loads_rows_in_order() {
        let file = write_temp(
            "timestamp,open,high,low,close\n\
             2024-03-01T09:00:00Z,10,11,9,10.5\n\
             1709290800,10.5,12,10,11.5\n",
        );
        let bars = load_bars(file.path()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 11.5);
        assert_eq!(bars[1].hour_utc(), 11);
    }

    #[test]
    fn rejects_out_of_order_rows() {
        let file = write_temp(
            "timestamp,open,high,low,close\n\
             2024-03-01T09:00:00Z,10,11,9,10.5\n\
             2024-03-01T09:00:00Z,10.5,12,10,11.5\n",
        );
        let err = load_bars(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("line 3"));
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        let start = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        let bars = crate::synthetic::generate(50, 7, start);
        write_bars(&path, &bars).unwrap();
        let loaded = load_bars(&path).unwrap();
        assert_eq!(loaded.len(), 50);
        assert_eq!(loaded[0].timestamp, bars[0].timestamp);
        assert_eq!(loaded[49].timestamp, bars[49].timestamp);
    }
}

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use rdclaim_engine::{RawRecord, RecordRejection};
use shared_types::{CostCategory, MappingError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A `--input CATEGORY=PATH` argument
#[derive(Debug, Clone, PartialEq)]
pub struct InputArg {
    pub category: CostCategory,
    pub path: PathBuf,
}

pub fn parse_input_arg(value: &str) -> Result<InputArg, String> {
    let (category, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=PATH, got '{}'", value))?;
    let category = CostCategory::parse(category)
        .ok_or_else(|| format!("unknown cost category '{}'", category))?;
    if path.trim().is_empty() {
        return Err(format!("no file given for {}", category));
    }
    Ok(InputArg {
        category,
        path: PathBuf::from(path.trim()),
    })
}

/// Rows of one CSV export. Row numbers count data rows from 1, so a row the
/// reader could not decode keeps its place instead of shifting later rows.
#[derive(Debug, Default)]
pub struct CsvRows {
    pub records: Vec<(usize, RawRecord)>,
    pub unreadable: Vec<RecordRejection>,
}

/// Read a CSV export into one map per row, keyed by header.
pub fn parse_to_maps(content: &[u8]) -> Result<CsvRows> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content);

    let headers = reader
        .headers()
        .map_err(|e| anyhow!("Failed to read CSV headers: {}", e))?
        .clone();

    let mut rows = CsvRows::default();

    for (index, result) in reader.records().enumerate() {
        let row = index + 1;
        match result {
            Ok(record) => {
                let mut map = HashMap::new();
                for (i, field) in record.iter().enumerate() {
                    if let Some(header) = headers.get(i) {
                        map.insert(header.to_string(), field.to_string());
                    }
                }
                rows.records.push((row, map));
            }
            Err(e) if e.is_io_error() => {
                return Err(anyhow!("Failed to read CSV row {}: {}", row, e));
            }
            Err(e) => {
                tracing::warn!("Failed to parse CSV row {}: {}", row, e);
                rows.unreadable.push(RecordRejection {
                    row,
                    error: MappingError::UnreadableRow(e.to_string()),
                });
            }
        }
    }

    Ok(rows)
}

pub fn read_records(path: &Path) -> Result<CsvRows> {
    let content =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_to_maps(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_arg() {
        let arg = parse_input_arg("staff=payroll.csv").unwrap();
        assert_eq!(arg.category, CostCategory::Staff);
        assert_eq!(arg.path, PathBuf::from("payroll.csv"));

        let arg = parse_input_arg("cloud_compute=aws.csv").unwrap();
        assert_eq!(arg.category, CostCategory::CloudCompute);

        assert!(parse_input_arg("payroll.csv").is_err());
        assert!(parse_input_arg("equipment=kit.csv").is_err());
        assert!(parse_input_arg("staff=").is_err());
    }

    #[test]
    fn test_parse_to_maps() {
        let csv = "Pay Date,Employee,Gross\n2024-06-30,Ada,\"50,000.00\"\n2024-07-31,Alan,1000\n";
        let rows = parse_to_maps(csv.as_bytes()).unwrap();
        assert_eq!(rows.records.len(), 2);
        assert_eq!(rows.records[0].1["Gross"], "50,000.00");
        assert_eq!(rows.records[1].0, 2);
        assert_eq!(rows.records[1].1["Employee"], "Alan");
        assert!(rows.unreadable.is_empty());
    }

    #[test]
    fn test_undecodable_row_is_rejected_in_place() {
        let mut csv = b"Date,Name,Gross\n2024-06-30,A,100\n2024-06-30,".to_vec();
        csv.extend_from_slice(&[0xff, 0xfe]);
        csv.extend_from_slice(b",200\n2024-06-30,C,300\n");

        let rows = parse_to_maps(&csv).unwrap();
        let names: Vec<(usize, &str)> = rows
            .records
            .iter()
            .map(|(row, record)| (*row, record["Name"].as_str()))
            .collect();
        assert_eq!(names, vec![(1, "A"), (3, "C")]);

        assert_eq!(rows.unreadable.len(), 1);
        assert_eq!(rows.unreadable[0].row, 2);
        assert!(matches!(
            rows.unreadable[0].error,
            MappingError::UnreadableRow(_)
        ));
    }

    #[test]
    fn test_short_rows_keep_present_fields() {
        let csv = "Date,Name,Gross,Grant\n2024-06-30,Lab kit,500\n";
        let rows = parse_to_maps(csv.as_bytes()).unwrap();
        assert_eq!(rows.records[0].1.len(), 3);
        assert!(!rows.records[0].1.contains_key("Grant"));
    }
}

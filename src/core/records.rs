use crate::domain::model::Record;
use crate::utils::error::{BulkError, Result};
use crate::utils::validation::validate_file_extension;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Csv,
}

impl InputFormat {
    pub fn from_path(path: &str) -> Result<Self> {
        validate_file_extension("input", path, &["json", "csv"])?;

        if path.to_ascii_lowercase().ends_with(".csv") {
            Ok(InputFormat::Csv)
        } else {
            Ok(InputFormat::Json)
        }
    }
}

pub fn parse_records(data: &[u8], format: InputFormat) -> Result<Vec<Record>> {
    match format {
        InputFormat::Json => parse_json_records(data),
        InputFormat::Csv => parse_csv_records(data),
    }
}

/// A JSON array of objects.
pub fn parse_json_records(data: &[u8]) -> Result<Vec<Record>> {
    let value: serde_json::Value = serde_json::from_slice(data)?;
    let serde_json::Value::Array(items) = value else {
        return Err(BulkError::ValidationError {
            message: "JSON input must be an array of records".to_string(),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            serde_json::Value::Object(record) => Ok(record),
            other => Err(BulkError::ValidationError {
                message: format!("Record {} is not an object: {}", index, other),
            }),
        })
        .collect()
}

/// Header row gives the field names. Cells stay strings; empty cells
/// become null so Salesforce clears the field.
pub fn parse_csv_records(data: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();

    for row in reader.records() {
        let row = row?;
        let mut record = Record::new();
        for (field, cell) in headers.iter().zip(row.iter()) {
            let value = if cell.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::Value::String(cell.to_string())
            };
            record.insert(field.to_string(), value);
        }
        records.push(record);
    }

    Ok(records)
}

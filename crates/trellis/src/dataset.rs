// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::error::{DataError, DataResult};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y%m%d",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            Value::Null => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{n:.0}")
                } else {
                    format!("{n}")
                }
            }
            Value::Text(s) => s.clone(),
        }
    }
}

pub fn parse_date_str(raw: &str, formats: &[String]) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.and_hms_opt(0, 0, 0)?);
        }
    }
    None
}

pub fn parse_date(value: &Value, formats: &[String]) -> Option<NaiveDateTime> {
    match value {
        Value::Text(s) => parse_date_str(s, formats),
        _ => None,
    }
}

pub fn default_date_formats() -> Vec<String> {
    DEFAULT_DATE_FORMATS.iter().map(ToString::to_string).collect()
}

pub type Record = IndexMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    Amount,
    Timestamp,
    Category,
    Quantity,
}

impl FieldRole {
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            FieldRole::Amount => &["amount", "revenue", "sales"],
            FieldRole::Timestamp => &["date", "timestamp"],
            FieldRole::Category => &["product", "item", "name"],
            FieldRole::Quantity => &["quantity"],
        }
    }

    // First alias present with a non-null value wins.
    pub fn resolve(self, record: &Record) -> Option<&Value> {
        self.aliases()
            .iter()
            .find_map(|alias| record.get(*alias).filter(|v| !v.is_null()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    rows: Vec<Record>,
}

impl Dataset {
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column list as the union of keys over a leading sample of records,
    /// in first-appearance order. Rows missing a key read as null.
    pub fn infer_columns(&self, sample_size: usize) -> Vec<String> {
        let mut columns: IndexSet<String> = IndexSet::new();
        for record in self.rows.iter().take(sample_size.max(1)) {
            for key in record.keys() {
                columns.insert(key.clone());
            }
        }
        columns.into_iter().collect()
    }

    pub fn from_json_value(value: serde_json::Value) -> DataResult<Self> {
        let serde_json::Value::Array(items) = value else {
            return Err(DataError::invalid_input(
                "dataset must be a JSON array of objects",
            ));
        };
        let mut rows = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let serde_json::Value::Object(fields) = item else {
                return Err(DataError::invalid_input(format!(
                    "record {index} is not an object"
                )));
            };
            let mut record = Record::with_capacity(fields.len());
            for (key, field) in fields {
                let converted = match field {
                    serde_json::Value::Null => Value::Null,
                    serde_json::Value::Number(n) => {
                        Value::Number(n.as_f64().unwrap_or(f64::NAN))
                    }
                    serde_json::Value::String(s) => Value::Text(s),
                    serde_json::Value::Bool(b) => Value::Text(b.to_string()),
                    other => {
                        return Err(DataError::invalid_input(format!(
                            "record {index} field '{key}' holds a nested {}, expected a scalar",
                            if other.is_array() { "array" } else { "object" }
                        )));
                    }
                };
                record.insert(key, converted);
            }
            rows.push(record);
        }
        Ok(Self::new(rows))
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> DataResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let mut row = Record::with_capacity(headers.len());
            for (header, field) in headers.iter().zip(record.iter()) {
                let value = if field.is_empty() {
                    Value::Null
                } else {
                    Value::Text(field.to_string())
                };
                row.insert(header.clone(), value);
            }
            rows.push(row);
        }
        tracing::debug!(rows = rows.len(), columns = headers.len(), "loaded CSV dataset");
        Ok(Self::new(rows))
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Ok(Self::from_csv_reader(file)?)
    }
}

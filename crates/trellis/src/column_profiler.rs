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

use crate::chart_shaper::ChartKind;
use crate::dataset::{default_date_formats, parse_date, Dataset};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Date,
    Number,
    #[serde(rename = "string")]
    Text,
}

impl ColumnType {
    pub fn is_date(self) -> bool {
        matches!(self, ColumnType::Date)
    }

    pub fn is_number(self) -> bool {
        matches!(self, ColumnType::Number)
    }

    pub fn is_text(self) -> bool {
        matches!(self, ColumnType::Text)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Date => "date",
            ColumnType::Number => "number",
            ColumnType::Text => "string",
        }
    }
}

pub type ColumnTypeMap = IndexMap<String, ColumnType>;

#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    pub type_ratio_threshold: f64,
    pub date_formats: Vec<String>,
    pub schema_sample_size: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            type_ratio_threshold: 0.8,
            date_formats: default_date_formats(),
            schema_sample_size: 100,
        }
    }
}

impl ProfilerConfig {
    pub fn for_fast_profiling() -> Self {
        Self {
            date_formats: vec!["%Y-%m-%d".to_string(), "%Y-%m-%d %H:%M:%S".to_string()],
            schema_sample_size: 20,
            ..Default::default()
        }
    }
}

pub struct ColumnProfiler {
    config: ProfilerConfig,
}

impl ColumnProfiler {
    pub fn new() -> Self {
        Self {
            config: ProfilerConfig::default(),
        }
    }

    pub fn with_config(config: ProfilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn detect_column_types(&self, dataset: &Dataset) -> ColumnTypeMap {
        if dataset.is_empty() {
            return ColumnTypeMap::new();
        }
        let columns = dataset.infer_columns(self.config.schema_sample_size);
        let classified: Vec<(String, ColumnType)> = columns
            .into_par_iter()
            .map(|column| {
                let column_type = self.classify_column(dataset, &column);
                (column, column_type)
            })
            .collect();
        let map: ColumnTypeMap = classified.into_iter().collect();
        tracing::debug!(columns = map.len(), "classified dataset columns");
        map
    }

    fn classify_column(&self, dataset: &Dataset, column: &str) -> ColumnType {
        let rows = dataset.rows();
        let Some(probe) = rows
            .iter()
            .find_map(|record| record.get(column).filter(|v| !v.is_null()))
        else {
            return ColumnType::Text;
        };

        // The probe gates the date full-pass: only a column whose first
        // non-null value already parses as a date is worth validating.
        if parse_date(probe, &self.config.date_formats).is_some()
            && self.date_ratio(dataset, column) > self.config.type_ratio_threshold
        {
            return ColumnType::Date;
        }

        if self.numeric_ratio(dataset, column) > self.config.type_ratio_threshold {
            return ColumnType::Number;
        }

        ColumnType::Text
    }

    // Nulls and missing keys count as date-consistent; they do not count
    // toward the numeric ratio.
    fn date_ratio(&self, dataset: &Dataset, column: &str) -> f64 {
        let total = dataset.len();
        if total == 0 {
            return 0.0;
        }
        let consistent = dataset
            .rows()
            .iter()
            .filter(|record| match record.get(column) {
                None => true,
                Some(value) if value.is_null() => true,
                Some(value) => parse_date(value, &self.config.date_formats).is_some(),
            })
            .count();
        consistent as f64 / total as f64
    }

    fn numeric_ratio(&self, dataset: &Dataset, column: &str) -> f64 {
        let total = dataset.len();
        if total == 0 {
            return 0.0;
        }
        let numeric = dataset
            .rows()
            .iter()
            .filter(|record| {
                record
                    .get(column)
                    .is_some_and(|value| !value.is_null() && value.as_number().is_some())
            })
            .count();
        numeric as f64 / total as f64
    }
}

impl Default for ColumnProfiler {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub total_columns: usize,
    pub date_count: usize,
    pub number_count: usize,
    pub text_count: usize,
}

impl ProfileSummary {
    pub fn from_type_map(types: &ColumnTypeMap) -> Self {
        let (date_count, number_count, text_count) =
            types
                .values()
                .fold((0, 0, 0), |(date, number, text), t| match t {
                    ColumnType::Date => (date + 1, number, text),
                    ColumnType::Number => (date, number + 1, text),
                    ColumnType::Text => (date, number, text + 1),
                });
        Self {
            total_columns: types.len(),
            date_count,
            number_count,
            text_count,
        }
    }

    pub fn satisfiable_kinds(&self) -> Vec<ChartKind> {
        let mut kinds = Vec::new();
        if self.date_count >= 1 && self.number_count >= 1 {
            kinds.push(ChartKind::TimeSeries);
        }
        if self.number_count >= 1 {
            kinds.push(ChartKind::Distribution);
        }
        if self.number_count >= 2 {
            kinds.push(ChartKind::Correlation);
        }
        if self.text_count >= 1 {
            kinds.push(ChartKind::Pie);
        }
        if self.number_count >= 1 {
            kinds.push(ChartKind::Radar);
        }
        kinds
    }
}

impl std::fmt::Display for ProfileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} columns ({} date, {} number, {} string)",
            self.total_columns, self.date_count, self.number_count, self.text_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Record, Value};

    fn dataset_of(column: &str, values: Vec<Value>) -> Dataset {
        let rows = values
            .into_iter()
            .map(|value| {
                let mut record = Record::new();
                record.insert(column.to_string(), value);
                record
            })
            .collect();
        Dataset::new(rows)
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn empty_dataset_yields_empty_map() {
        let profiler = ColumnProfiler::new();
        assert!(profiler.detect_column_types(&Dataset::default()).is_empty());
    }

    #[test]
    fn key_set_matches_columns_and_types_are_exhaustive() {
        let dataset = Dataset::from_json_value(serde_json::json!([
            {"when": "2023-01-01", "amount": 12.5, "label": "alpha"},
            {"when": "2023-01-02", "amount": 13.0, "label": "beta"}
        ]))
        .unwrap();
        let types = ColumnProfiler::new().detect_column_types(&dataset);
        assert_eq!(
            types.keys().cloned().collect::<Vec<_>>(),
            vec!["when", "amount", "label"]
        );
        assert_eq!(types["when"], ColumnType::Date);
        assert_eq!(types["amount"], ColumnType::Number);
        assert_eq!(types["label"], ColumnType::Text);
    }

    #[test]
    fn dates_with_minority_nulls_classify_as_date() {
        let mut values: Vec<Value> = (0..85)
            .map(|i| text(&format!("2023-01-{:02}", (i % 28) + 1)))
            .collect();
        values.extend((0..15).map(|_| Value::Null));
        let types = ColumnProfiler::new().detect_column_types(&dataset_of("when", values));
        assert_eq!(types["when"], ColumnType::Date);
    }

    #[test]
    fn numbers_below_threshold_classify_as_text() {
        let mut values: Vec<Value> = (0..70).map(|i| Value::Number(f64::from(i))).collect();
        values.extend((0..30).map(|_| text("n/a")));
        let types = ColumnProfiler::new().detect_column_types(&dataset_of("score", values));
        assert_eq!(types["score"], ColumnType::Text);
    }

    #[test]
    fn numbers_above_threshold_classify_as_number() {
        let mut values: Vec<Value> = (0..90).map(|i| text(&format!("{}.5", i))).collect();
        values.extend((0..10).map(|_| text("missing")));
        let types = ColumnProfiler::new().detect_column_types(&dataset_of("score", values));
        assert_eq!(types["score"], ColumnType::Number);
    }

    #[test]
    fn malformed_probe_blocks_date_classification() {
        // First non-null value decides whether the date pass runs at all.
        let mut values = vec![text("garbage")];
        values.extend((0..99).map(|i| text(&format!("2023-02-{:02}", (i % 28) + 1))));
        let types = ColumnProfiler::new().detect_column_types(&dataset_of("when", values));
        assert_eq!(types["when"], ColumnType::Text);
    }

    #[test]
    fn all_null_column_classifies_as_text() {
        let values = vec![Value::Null, Value::Null, Value::Null];
        let types = ColumnProfiler::new().detect_column_types(&dataset_of("empty", values));
        assert_eq!(types["empty"], ColumnType::Text);
    }

    #[test]
    fn exact_threshold_is_not_enough() {
        // 8 of 10 dates is a ratio of exactly 0.8, which must fail the
        // strict comparison.
        let mut values: Vec<Value> = (0..8).map(|i| text(&format!("2023-03-0{}", i + 1))).collect();
        values.extend((0..2).map(|_| text("junk")));
        let types = ColumnProfiler::new().detect_column_types(&dataset_of("when", values));
        assert_eq!(types["when"], ColumnType::Text);
    }

    #[test]
    fn summary_counts_and_kind_hints() {
        let mut types = ColumnTypeMap::new();
        types.insert("when".into(), ColumnType::Date);
        types.insert("amount".into(), ColumnType::Number);
        types.insert("qty".into(), ColumnType::Number);
        types.insert("label".into(), ColumnType::Text);
        let summary = ProfileSummary::from_type_map(&types);
        assert_eq!(summary.date_count, 1);
        assert_eq!(summary.number_count, 2);
        assert_eq!(summary.text_count, 1);
        let kinds = summary.satisfiable_kinds();
        assert!(kinds.contains(&ChartKind::TimeSeries));
        assert!(kinds.contains(&ChartKind::Correlation));
        assert!(kinds.contains(&ChartKind::Pie));
    }
}

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

use crate::column_profiler::{ColumnType, ColumnTypeMap};
use crate::dataset::{default_date_formats, parse_date, Dataset, Record, Value};
use crate::error::{ChartError, ChartResult};
use crate::palette;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DISTRIBUTION_BINS: usize = 20;
pub const TOOLTIP_BACKGROUND: &str = "rgba(17, 24, 39, 0.9)";
pub const GRID_COLOUR: &str = "rgba(148, 163, 184, 0.2)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    TimeSeries,
    Distribution,
    Correlation,
    Pie,
    Radar,
}

impl ChartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::TimeSeries => "timeSeries",
            ChartKind::Distribution => "distribution",
            ChartKind::Correlation => "correlation",
            ChartKind::Pie => "pie",
            ChartKind::Radar => "radar",
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartMapping {
    pub date_column: Option<String>,
    pub value_column: Option<String>,
    pub x_column: Option<String>,
    pub y_column: Option<String>,
    pub category_column: Option<String>,
    pub metrics: Vec<String>,
}

impl ChartMapping {
    /// UI mapping forms submit the radar metrics as one comma-joined field.
    pub fn metrics_from_joined(joined: &str) -> Vec<String> {
        joined
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayConfig {
    pub title: Option<String>,
    pub x_axis_label: Option<String>,
    pub y_axis_label: Option<String>,
    pub legend_position: LegendPosition,
    pub aspect_ratio: Option<f64>,
    pub animation: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: None,
            x_axis_label: None,
            y_axis_label: None,
            legend_position: LegendPosition::Top,
            aspect_ratio: None,
            animation: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis_label: Option<String>,
    pub legend_position: LegendPosition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    pub animation: bool,
    pub tooltip_background: String,
    pub grid_colour: String,
}

impl DisplayOptions {
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self {
            title: config.title.clone(),
            x_axis_label: config.x_axis_label.clone(),
            y_axis_label: config.y_axis_label.clone(),
            legend_position: config.legend_position,
            aspect_ratio: config.aspect_ratio,
            animation: config.animation,
            tooltip_background: TOOLTIP_BACKGROUND.to_string(),
            grid_colour: GRID_COLOUR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SeriesData {
    Values(Vec<f64>),
    Points(Vec<Point>),
}

impl SeriesData {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Values(v) => v.len(),
            SeriesData::Points(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub label: String,
    pub data: SeriesData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_colours: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_alpha: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_alpha: Option<f64>,
}

impl Series {
    pub fn values(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            data: SeriesData::Values(values),
            colour: None,
            background_colours: None,
            fill_alpha: None,
            border_alpha: None,
        }
    }

    pub fn points(label: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            label: label.into(),
            data: SeriesData::Points(points),
            colour: None,
            background_colours: None,
            fill_alpha: None,
            border_alpha: None,
        }
    }

    pub fn with_colour(mut self, colour: impl Into<String>) -> Self {
        self.colour = Some(colour.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Series>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShapedChart {
    pub data: ChartData,
    pub options: DisplayOptions,
}

#[derive(Debug, Clone)]
pub struct ShaperConfig {
    pub date_formats: Vec<String>,
    pub distribution_bins: usize,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self {
            date_formats: default_date_formats(),
            distribution_bins: DEFAULT_DISTRIBUTION_BINS,
        }
    }
}

/// Shapes a dataset into labelled series for one of the five chart kinds.
/// Every operation is a pure projection of dataset + mapping; none of
/// them re-validate column types. Callers that skip [`validate_mapping`]
/// get degraded values (`NaN` entries) rather than errors.
pub struct ChartShaper {
    config: ShaperConfig,
}

impl ChartShaper {
    pub fn new() -> Self {
        Self {
            config: ShaperConfig::default(),
        }
    }

    pub fn with_config(config: ShaperConfig) -> Self {
        Self { config }
    }

    pub fn shape(
        &self,
        kind: ChartKind,
        dataset: &Dataset,
        mapping: &ChartMapping,
        display: &DisplayConfig,
    ) -> ChartResult<ShapedChart> {
        tracing::debug!(kind = %kind, rows = dataset.len(), "shaping chart data");
        match kind {
            ChartKind::TimeSeries => {
                let date_column = required(kind, "dateColumn", mapping.date_column.as_deref())?;
                let value_column = required(kind, "valueColumn", mapping.value_column.as_deref())?;
                Ok(self.time_series(dataset, date_column, value_column, display))
            }
            ChartKind::Distribution => {
                let value_column = required(kind, "valueColumn", mapping.value_column.as_deref())?;
                Ok(self.distribution(dataset, value_column, display))
            }
            ChartKind::Correlation => {
                let x_column = required(kind, "xColumn", mapping.x_column.as_deref())?;
                let y_column = required(kind, "yColumn", mapping.y_column.as_deref())?;
                Ok(self.correlation(dataset, x_column, y_column, display))
            }
            ChartKind::Pie => {
                let category_column =
                    required(kind, "categoryColumn", mapping.category_column.as_deref())?;
                Ok(self.pie(
                    dataset,
                    category_column,
                    mapping.value_column.as_deref(),
                    display,
                ))
            }
            ChartKind::Radar => {
                if mapping.metrics.is_empty() {
                    return Err(ChartError::MissingRole {
                        kind: kind.to_string(),
                        role: "metrics".to_string(),
                    });
                }
                Ok(self.radar(
                    dataset,
                    &mapping.metrics,
                    mapping.category_column.as_deref(),
                    display,
                ))
            }
        }
    }

    /// Records sorted ascending by parsed date (stable; unparseable dates
    /// sort first), one label per record, one numeric series.
    pub fn time_series(
        &self,
        dataset: &Dataset,
        date_column: &str,
        value_column: &str,
        display: &DisplayConfig,
    ) -> ShapedChart {
        let mut indexed: Vec<_> = dataset
            .rows()
            .iter()
            .map(|record| {
                let parsed = record
                    .get(date_column)
                    .and_then(|v| parse_date(v, &self.config.date_formats));
                (parsed, record)
            })
            .collect();
        indexed.sort_by(|a, b| a.0.cmp(&b.0));

        let labels = indexed
            .iter()
            .map(|(parsed, record)| match parsed {
                Some(dt) => dt.format("%Y-%m-%d").to_string(),
                None => record.get(date_column).map(Value::display).unwrap_or_default(),
            })
            .collect();
        let values = indexed
            .iter()
            .map(|(_, record)| numeric_or_nan(record, value_column))
            .collect();

        ShapedChart {
            data: ChartData {
                labels,
                datasets: vec![Series::values(value_column, values)],
            },
            options: DisplayOptions::from_config(display),
        }
    }

    /// Histogram with a fixed bin count. Values are assigned to
    /// `floor((v - min) / width)` clamped to the last bin so the maximum
    /// lands inside it; non-numeric values are excluded before binning.
    pub fn distribution(
        &self,
        dataset: &Dataset,
        value_column: &str,
        display: &DisplayConfig,
    ) -> ShapedChart {
        let options = DisplayOptions::from_config(display);
        let values: Vec<f64> = dataset
            .rows()
            .iter()
            .filter_map(|record| record.get(value_column).and_then(Value::as_number))
            .collect();
        if values.is_empty() {
            return ShapedChart {
                data: ChartData::default(),
                options,
            };
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let bins = self.config.distribution_bins.max(1);

        // Degenerate range: a single bin holds everything rather than
        // dividing by a zero width.
        if max == min {
            return ShapedChart {
                data: ChartData {
                    labels: vec![format!("{min:.2} - {max:.2}")],
                    datasets: vec![Series::values("Frequency", vec![values.len() as f64])],
                },
                options,
            };
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for value in &values {
            let index = (((value - min) / width).floor() as usize).min(bins - 1);
            counts[index] += 1;
        }
        let labels = (0..bins)
            .map(|i| {
                let start = min + i as f64 * width;
                format!("{start:.2} - {:.2}", start + width)
            })
            .collect();

        ShapedChart {
            data: ChartData {
                labels,
                datasets: vec![Series::values(
                    "Frequency",
                    counts.into_iter().map(|c| c as f64).collect(),
                )],
            },
            options,
        }
    }

    /// One point per input row, in input order. No sorting, no grouping,
    /// no deduplication.
    pub fn correlation(
        &self,
        dataset: &Dataset,
        x_column: &str,
        y_column: &str,
        display: &DisplayConfig,
    ) -> ShapedChart {
        let points = dataset
            .rows()
            .iter()
            .map(|record| Point {
                x: numeric_or_nan(record, x_column),
                y: numeric_or_nan(record, y_column),
            })
            .collect();
        ShapedChart {
            data: ChartData {
                labels: Vec::new(),
                datasets: vec![Series::points(format!("{y_column} vs {x_column}"), points)],
            },
            options: DisplayOptions::from_config(display),
        }
    }

    /// Groups by category in first-appearance order; sums the value
    /// column when mapped, counts records otherwise.
    pub fn pie(
        &self,
        dataset: &Dataset,
        category_column: &str,
        value_column: Option<&str>,
        display: &DisplayConfig,
    ) -> ShapedChart {
        let mut groups: IndexMap<String, f64> = IndexMap::new();
        for record in dataset.rows() {
            let label = category_label(record, category_column);
            let contribution = match value_column {
                Some(column) => record
                    .get(column)
                    .and_then(Value::as_number)
                    .unwrap_or(0.0),
                None => 1.0,
            };
            *groups.entry(label).or_insert(0.0) += contribution;
        }

        let colours = palette::hue_rotation(groups.len());
        let (labels, values): (Vec<String>, Vec<f64>) = groups.into_iter().unzip();
        let mut series = Series::values(category_column, values);
        series.background_colours = Some(colours);

        ShapedChart {
            data: ChartData {
                labels,
                datasets: vec![series],
            },
            options: DisplayOptions::from_config(display),
        }
    }

    /// Arithmetic mean per metric, unparseable entries excluded from both
    /// sum and count. With a category column, one series per distinct
    /// category with stepped alphas; the renderer owns any clamping.
    pub fn radar(
        &self,
        dataset: &Dataset,
        metrics: &[String],
        category_column: Option<&str>,
        display: &DisplayConfig,
    ) -> ShapedChart {
        let datasets = match category_column {
            None => vec![Series::values(
                "Average",
                metrics
                    .iter()
                    .map(|metric| metric_mean(dataset.rows().iter(), metric))
                    .collect(),
            )],
            Some(column) => {
                let mut by_category: IndexMap<String, Vec<&Record>> = IndexMap::new();
                for record in dataset.rows() {
                    by_category
                        .entry(category_label(record, column))
                        .or_default()
                        .push(record);
                }
                by_category
                    .into_iter()
                    .enumerate()
                    .map(|(index, (category, records))| {
                        let means = metrics
                            .iter()
                            .map(|metric| metric_mean(records.iter().copied(), metric))
                            .collect();
                        let mut series = Series::values(category, means);
                        series.fill_alpha = Some(
                            palette::RADAR_FILL_ALPHA_BASE
                                + index as f64 * palette::RADAR_FILL_ALPHA_STEP,
                        );
                        series.border_alpha = Some(
                            palette::RADAR_BORDER_ALPHA_BASE
                                + index as f64 * palette::RADAR_BORDER_ALPHA_STEP,
                        );
                        series
                    })
                    .collect()
            }
        };

        ShapedChart {
            data: ChartData {
                labels: metrics.to_vec(),
                datasets,
            },
            options: DisplayOptions::from_config(display),
        }
    }
}

impl Default for ChartShaper {
    fn default() -> Self {
        Self::new()
    }
}

fn required<'a>(kind: ChartKind, role: &str, column: Option<&'a str>) -> ChartResult<&'a str> {
    column.ok_or_else(|| ChartError::MissingRole {
        kind: kind.to_string(),
        role: role.to_string(),
    })
}

fn numeric_or_nan(record: &Record, column: &str) -> f64 {
    record
        .get(column)
        .and_then(Value::as_number)
        .unwrap_or(f64::NAN)
}

fn category_label(record: &Record, column: &str) -> String {
    match record.get(column) {
        Some(value) if !value.is_null() => value.display(),
        _ => "Unknown".to_string(),
    }
}

fn metric_mean<'a>(records: impl Iterator<Item = &'a Record>, metric: &str) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for record in records {
        if let Some(value) = record.get(metric).and_then(Value::as_number) {
            sum += value;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Pre-condition table callers run before shaping:
///
/// | kind         | required roles              | type constraints                |
/// |--------------|-----------------------------|---------------------------------|
/// | timeSeries   | dateColumn, valueColumn     | date, number                    |
/// | distribution | valueColumn                 | number                          |
/// | correlation  | xColumn, yColumn            | number, number                  |
/// | pie          | categoryColumn (+valueColumn)| string (+number)               |
/// | radar        | metrics ≥ 1 (+categoryColumn)| all number (+string)           |
pub fn validate_mapping(
    kind: ChartKind,
    mapping: &ChartMapping,
    types: &ColumnTypeMap,
) -> ChartResult<()> {
    match kind {
        ChartKind::TimeSeries => {
            check_role(kind, "dateColumn", mapping.date_column.as_deref(), ColumnType::Date, types)?;
            check_role(
                kind,
                "valueColumn",
                mapping.value_column.as_deref(),
                ColumnType::Number,
                types,
            )
        }
        ChartKind::Distribution => check_role(
            kind,
            "valueColumn",
            mapping.value_column.as_deref(),
            ColumnType::Number,
            types,
        ),
        ChartKind::Correlation => {
            check_role(kind, "xColumn", mapping.x_column.as_deref(), ColumnType::Number, types)?;
            check_role(kind, "yColumn", mapping.y_column.as_deref(), ColumnType::Number, types)
        }
        ChartKind::Pie => {
            check_role(
                kind,
                "categoryColumn",
                mapping.category_column.as_deref(),
                ColumnType::Text,
                types,
            )?;
            if mapping.value_column.is_some() {
                check_role(
                    kind,
                    "valueColumn",
                    mapping.value_column.as_deref(),
                    ColumnType::Number,
                    types,
                )?;
            }
            Ok(())
        }
        ChartKind::Radar => {
            if mapping.metrics.is_empty() {
                return Err(ChartError::MissingRole {
                    kind: kind.to_string(),
                    role: "metrics".to_string(),
                });
            }
            for metric in &mapping.metrics {
                check_column(kind, "metrics", metric, ColumnType::Number, types)?;
            }
            if mapping.category_column.is_some() {
                check_role(
                    kind,
                    "categoryColumn",
                    mapping.category_column.as_deref(),
                    ColumnType::Text,
                    types,
                )?;
            }
            Ok(())
        }
    }
}

fn check_role(
    kind: ChartKind,
    role: &str,
    column: Option<&str>,
    expected: ColumnType,
    types: &ColumnTypeMap,
) -> ChartResult<()> {
    let column = required(kind, role, column)?;
    check_column(kind, role, column, expected, types)
}

fn check_column(
    _kind: ChartKind,
    role: &str,
    column: &str,
    expected: ColumnType,
    types: &ColumnTypeMap,
) -> ChartResult<()> {
    let Some(found) = types.get(column) else {
        return Err(ChartError::MissingColumn {
            column: column.to_string(),
            role: role.to_string(),
        });
    };
    if *found != expected {
        return Err(ChartError::TypeMismatch {
            column: column.to_string(),
            role: role.to_string(),
            expected: expected.as_str().to_string(),
            found: found.as_str().to_string(),
        });
    }
    Ok(())
}

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

pub mod chart_shaper;
pub mod column_profiler;
pub mod dataset;
pub mod error;
pub mod palette;
pub mod report_metrics;

pub use chart_shaper::{
    validate_mapping, ChartData, ChartKind, ChartMapping, ChartShaper, DisplayConfig,
    DisplayOptions, LegendPosition, Point, Series, SeriesData, ShapedChart, ShaperConfig,
};
pub use column_profiler::{
    ColumnProfiler, ColumnType, ColumnTypeMap, ProfileSummary, ProfilerConfig,
};
pub use dataset::{Dataset, FieldRole, Record, Value};
pub use error::{ChartError, DataError, Result, ShapingError};
pub use report_metrics::{
    average_positive_transaction, average_transaction, calculate_metrics,
    generate_visualisations, LabelValue, Metric, MetricValue, ReportChart,
};

pub struct ChartDataSystem {
    profiler: ColumnProfiler,
    shaper: ChartShaper,
}
impl ChartDataSystem {
    pub fn new() -> Self {
        Self {
            profiler: ColumnProfiler::new(),
            shaper: ChartShaper::new(),
        }
    }
    pub fn with_config(profiler_config: ProfilerConfig, shaper_config: ShaperConfig) -> Self {
        Self {
            profiler: ColumnProfiler::with_config(profiler_config),
            shaper: ChartShaper::with_config(shaper_config),
        }
    }
    pub fn load_csv(&self, csv_path: &str) -> Result<Dataset> {
        Dataset::from_csv_path(csv_path)
    }
    pub fn load_json(&self, value: serde_json::Value) -> Result<Dataset> {
        Ok(Dataset::from_json_value(value)?)
    }
    pub fn profile(&self, dataset: &Dataset) -> ColumnTypeMap {
        self.profiler.detect_column_types(dataset)
    }
    pub fn summarise(&self, types: &ColumnTypeMap) -> ProfileSummary {
        ProfileSummary::from_type_map(types)
    }
    /// Validates the mapping against detected column types, then shapes.
    pub fn shape_chart(
        &self,
        kind: ChartKind,
        dataset: &Dataset,
        mapping: &ChartMapping,
        display: &DisplayConfig,
    ) -> Result<ShapedChart> {
        let types = self.profiler.detect_column_types(dataset);
        validate_mapping(kind, mapping, &types)?;
        Ok(self.shaper.shape(kind, dataset, mapping, display)?)
    }
    /// Shapes without the type-validation pass; values may degrade to NaN.
    pub fn shape_chart_unchecked(
        &self,
        kind: ChartKind,
        dataset: &Dataset,
        mapping: &ChartMapping,
        display: &DisplayConfig,
    ) -> Result<ShapedChart> {
        Ok(self.shaper.shape(kind, dataset, mapping, display)?)
    }
    pub fn metrics(&self, dataset: &Dataset) -> Vec<Metric> {
        report_metrics::calculate_metrics(dataset)
    }
    pub fn visualisations(&self, dataset: &Dataset) -> Vec<ReportChart> {
        report_metrics::generate_visualisations(dataset)
    }
}
impl Default for ChartDataSystem {
    fn default() -> Self {
        Self::new()
    }
}

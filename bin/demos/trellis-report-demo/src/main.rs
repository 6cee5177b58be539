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

use anyhow::{bail, Context};
use trellis::{
    ChartDataSystem, ChartKind, ChartMapping, ColumnType, DisplayConfig, MetricValue,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let Some(csv_path) = std::env::args().nth(1) else {
        bail!("usage: trellis-report-demo <dataset.csv>");
    };

    let system = ChartDataSystem::new();
    let dataset = system
        .load_csv(&csv_path)
        .with_context(|| format!("failed to load '{csv_path}'"))?;
    println!("Loaded {} records from {csv_path}", dataset.len());

    let types = system.profile(&dataset);
    println!("\nDetected column types:");
    for (column, column_type) in &types {
        println!("  {column}: {}", column_type.as_str());
    }
    let summary = system.summarise(&types);
    println!("\n{summary}");
    println!(
        "Satisfiable chart kinds: {}",
        summary
            .satisfiable_kinds()
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    println!("\nSummary metrics:");
    for metric in system.metrics(&dataset) {
        match metric.value {
            MetricValue::Scalar(value) => println!("  {}: {value:.2}", metric.label),
            MetricValue::Breakdown(entries) => {
                println!("  {}:", metric.label);
                for entry in entries {
                    println!("    {}: {:.2}", entry.label, entry.value);
                }
            }
            MetricValue::Undefined { reason } => {
                println!("  {}: undefined ({reason})", metric.label);
            }
        }
    }

    let charts = system.visualisations(&dataset);
    println!("\nReport charts:");
    for chart in &charts {
        println!("  {} ({})", chart.title, chart.id);
    }
    println!("\n{}", serde_json::to_string_pretty(&charts)?);

    // Shape a time series when the dataset offers the right columns.
    let date_column = types
        .iter()
        .find(|(_, t)| **t == ColumnType::Date)
        .map(|(name, _)| name.clone());
    let value_column = types
        .iter()
        .find(|(_, t)| **t == ColumnType::Number)
        .map(|(name, _)| name.clone());
    if let (Some(date_column), Some(value_column)) = (date_column, value_column) {
        let mapping = ChartMapping {
            date_column: Some(date_column),
            value_column: Some(value_column),
            ..Default::default()
        };
        let shaped = system.shape_chart(
            ChartKind::TimeSeries,
            &dataset,
            &mapping,
            &DisplayConfig::default(),
        )?;
        println!(
            "\nTime series sample:\n{}",
            serde_json::to_string_pretty(&shaped)?
        );
    }

    Ok(())
}

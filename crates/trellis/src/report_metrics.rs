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

use crate::chart_shaper::{ChartData, Point, Series};
use crate::dataset::{default_date_formats, parse_date, Dataset, FieldRole, Record, Value};
use crate::palette;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub const TOP_PRODUCT_LIMIT: usize = 5;
pub const PERIOD_FORMAT: &str = "%Y-%m";

pub mod metric_ids {
    pub const TOTAL_REVENUE: &str = "total-revenue";
    pub const GROWTH_RATE: &str = "growth-rate";
    pub const SALES_BY_PERIOD: &str = "sales-by-period";
    pub const AVG_TRANSACTION: &str = "avg-transaction";
    pub const TOP_PRODUCTS: &str = "top-products";
}

pub mod chart_ids {
    pub const LINE_CHART: &str = "line-chart";
    pub const BAR_CHART: &str = "bar-chart";
    pub const PIE_CHART: &str = "pie-chart";
    pub const AREA_CHART: &str = "area-chart";
    pub const SCATTER_PLOT: &str = "scatter-plot";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelValue {
    pub label: String,
    pub value: f64,
}

/// A division whose denominator is empty or zero yields `Undefined` with
/// a human-readable reason rather than a NaN or infinity leaking into
/// serialised output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum MetricValue {
    Scalar(f64),
    Breakdown(Vec<LabelValue>),
    Undefined { reason: String },
}

impl MetricValue {
    fn undefined(reason: impl Into<String>) -> Self {
        MetricValue::Undefined {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    pub label: String,
    pub value: MetricValue,
}

impl Metric {
    fn new(id: &str, label: &str, value: MetricValue) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportChart {
    pub id: String,
    pub title: String,
    pub data: ChartData,
}

fn amount_of(record: &Record) -> Option<f64> {
    FieldRole::Amount.resolve(record).and_then(Value::as_number)
}

fn category_of(record: &Record) -> String {
    match FieldRole::Category.resolve(record) {
        Some(value) => value.display(),
        None => "Unknown".to_string(),
    }
}

fn period_of(record: &Record, formats: &[String]) -> Option<String> {
    FieldRole::Timestamp
        .resolve(record)
        .and_then(|value| parse_date(value, formats))
        .map(|dt| dt.format(PERIOD_FORMAT).to_string())
}

pub fn total_revenue(dataset: &Dataset) -> f64 {
    dataset.rows().iter().filter_map(amount_of).sum()
}

/// Monthly revenue buckets keyed `YYYY-MM`, sorted lexicographically
/// (which is chronological for that key shape). Records whose timestamp
/// does not resolve or parse are left out of every bucket; their amounts
/// still count toward [`total_revenue`].
pub fn revenue_by_period(dataset: &Dataset) -> IndexMap<String, f64> {
    let formats = default_date_formats();
    let mut buckets: IndexMap<String, f64> = IndexMap::new();
    for record in dataset.rows() {
        let Some(period) = period_of(record, &formats) else {
            continue;
        };
        let amount = amount_of(record).unwrap_or(0.0);
        *buckets.entry(period).or_insert(0.0) += amount;
    }
    buckets.sort_unstable_keys();
    buckets
}

pub fn growth_rate(dataset: &Dataset) -> MetricValue {
    let buckets = revenue_by_period(dataset);
    if buckets.len() < 2 {
        return MetricValue::Scalar(0.0);
    }
    let first = buckets[0];
    let last = buckets[buckets.len() - 1];
    if first == 0.0 {
        return MetricValue::undefined("first period has zero revenue");
    }
    MetricValue::Scalar((last - first) / first * 100.0)
}

/// Mean amount over every record, including records whose amount does
/// not resolve (they contribute zero to the numerator).
pub fn average_transaction(dataset: &Dataset) -> MetricValue {
    if dataset.is_empty() {
        return MetricValue::undefined("no records");
    }
    MetricValue::Scalar(total_revenue(dataset) / dataset.len() as f64)
}

/// Mean over strictly positive amounts only. The two averages coexist
/// on purpose; summary metrics use [`average_transaction`].
pub fn average_positive_transaction(dataset: &Dataset) -> MetricValue {
    let positives: Vec<f64> = dataset
        .rows()
        .iter()
        .filter_map(amount_of)
        .filter(|amount| *amount > 0.0)
        .collect();
    if positives.is_empty() {
        return MetricValue::undefined("no positive transactions");
    }
    MetricValue::Scalar(positives.iter().sum::<f64>() / positives.len() as f64)
}

/// Revenue per category in first-appearance order, then sorted by
/// revenue descending (stable, so ties keep appearance order), capped
/// at `limit` entries.
pub fn top_products(dataset: &Dataset, limit: usize) -> Vec<LabelValue> {
    let mut by_category: IndexMap<String, f64> = IndexMap::new();
    for record in dataset.rows() {
        let amount = amount_of(record).unwrap_or(0.0);
        *by_category.entry(category_of(record)).or_insert(0.0) += amount;
    }
    by_category
        .into_iter()
        .map(|(label, value)| LabelValue { label, value })
        .sorted_by(|a, b| b.value.total_cmp(&a.value))
        .take(limit)
        .collect()
}

pub fn calculate_metrics(dataset: &Dataset) -> Vec<Metric> {
    tracing::debug!(rows = dataset.len(), "calculating summary metrics");
    let sales_by_period = revenue_by_period(dataset)
        .into_iter()
        .map(|(label, value)| LabelValue { label, value })
        .collect();
    let top = top_products(dataset, TOP_PRODUCT_LIMIT);
    vec![
        Metric::new(
            metric_ids::TOTAL_REVENUE,
            "Total Revenue",
            MetricValue::Scalar(total_revenue(dataset)),
        ),
        Metric::new(metric_ids::GROWTH_RATE, "Growth Rate", growth_rate(dataset)),
        Metric::new(
            metric_ids::SALES_BY_PERIOD,
            "Sales by Period",
            MetricValue::Breakdown(sales_by_period),
        ),
        Metric::new(
            metric_ids::AVG_TRANSACTION,
            "Average Transaction",
            average_transaction(dataset),
        ),
        Metric::new(
            metric_ids::TOP_PRODUCTS,
            "Top Products",
            MetricValue::Breakdown(top),
        ),
    ]
}

/// The five standard report charts, always in the same order, each
/// series coloured by its position in the report palette.
pub fn generate_visualisations(dataset: &Dataset) -> Vec<ReportChart> {
    let periods = revenue_by_period(dataset);
    let top = top_products(dataset, TOP_PRODUCT_LIMIT);

    let period_labels: Vec<String> = periods.keys().cloned().collect();
    let period_values: Vec<f64> = periods.values().copied().collect();

    let line = ReportChart {
        id: chart_ids::LINE_CHART.to_string(),
        title: "Revenue Over Time".to_string(),
        data: ChartData {
            labels: period_labels.clone(),
            datasets: vec![
                Series::values("Revenue", period_values.clone())
                    .with_colour(palette::report_colour(0)),
            ],
        },
    };

    let top_labels: Vec<String> = top.iter().map(|entry| entry.label.clone()).collect();
    let top_values: Vec<f64> = top.iter().map(|entry| entry.value).collect();

    // Bar and pie present the same ranking, so both colour by rank.
    let rank_colours: Vec<String> = (0..top_labels.len())
        .map(|rank| palette::report_colour(rank).to_string())
        .collect();

    let mut bar_series = Series::values("Revenue", top_values.clone());
    bar_series.background_colours = Some(rank_colours.clone());
    let bar = ReportChart {
        id: chart_ids::BAR_CHART.to_string(),
        title: "Top Products".to_string(),
        data: ChartData {
            labels: top_labels.clone(),
            datasets: vec![bar_series],
        },
    };

    let mut pie_series = Series::values("Revenue Share", top_values);
    pie_series.background_colours = Some(rank_colours);
    let pie = ReportChart {
        id: chart_ids::PIE_CHART.to_string(),
        title: "Revenue Share".to_string(),
        data: ChartData {
            labels: top_labels,
            datasets: vec![pie_series],
        },
    };

    let cumulative: Vec<f64> = period_values
        .iter()
        .scan(0.0, |running, value| {
            *running += value;
            Some(*running)
        })
        .collect();
    let area = ReportChart {
        id: chart_ids::AREA_CHART.to_string(),
        title: "Cumulative Revenue".to_string(),
        data: ChartData {
            labels: period_labels,
            datasets: vec![
                Series::values("Cumulative Revenue", cumulative)
                    .with_colour(palette::report_colour(3)),
            ],
        },
    };

    // One point per record: unresolvable amounts read as zero, only the
    // quantity defaults to one.
    let points: Vec<Point> = dataset
        .rows()
        .iter()
        .map(|record| {
            let quantity = FieldRole::Quantity
                .resolve(record)
                .and_then(Value::as_number)
                .unwrap_or(1.0);
            Point {
                x: quantity,
                y: amount_of(record).unwrap_or(0.0),
            }
        })
        .collect();
    let scatter = ReportChart {
        id: chart_ids::SCATTER_PLOT.to_string(),
        title: "Quantity vs Amount".to_string(),
        data: ChartData {
            labels: Vec::new(),
            datasets: vec![
                Series::points("Transactions", points).with_colour(palette::report_colour(4)),
            ],
        },
    };

    vec![line, bar, pie, area, scatter]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_shaper::SeriesData;
    use serde_json::json;

    fn sales() -> Dataset {
        Dataset::from_json_value(json!([
            {"date": "2023-02-10", "amount": 200.0, "product": "Widget", "quantity": 2.0},
            {"date": "2023-01-05", "revenue": 100.0, "item": "Gadget"},
            {"date": "2023-03-20", "sales": 300.0, "name": "Widget", "quantity": 3.0},
            {"date": "2023-01-25", "amount": 50.0}
        ]))
        .unwrap()
    }

    #[test]
    fn total_revenue_resolves_amount_aliases() {
        assert_eq!(total_revenue(&sales()), 650.0);
    }

    #[test]
    fn periods_sort_lexicographically_and_sum_amounts() {
        let buckets = revenue_by_period(&sales());
        assert_eq!(
            buckets.keys().cloned().collect::<Vec<_>>(),
            vec!["2023-01", "2023-02", "2023-03"]
        );
        assert_eq!(buckets["2023-01"], 150.0);
        assert_eq!(buckets["2023-03"], 300.0);
    }

    #[test]
    fn unparseable_timestamps_stay_out_of_buckets_but_count_in_total() {
        let dataset = Dataset::from_json_value(json!([
            {"date": "2023-01-01", "amount": 10.0},
            {"date": "whenever", "amount": 90.0}
        ]))
        .unwrap();
        assert_eq!(total_revenue(&dataset), 100.0);
        let buckets = revenue_by_period(&dataset);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets["2023-01"], 10.0);
    }

    #[test]
    fn growth_rate_spans_first_to_last_period() {
        // 150 -> 300 across three periods is a 100% rise.
        assert_eq!(growth_rate(&sales()), MetricValue::Scalar(100.0));
    }

    #[test]
    fn growth_rate_with_fewer_than_two_periods_is_zero() {
        let dataset = Dataset::from_json_value(json!([
            {"date": "2023-01-01", "amount": 10.0}
        ]))
        .unwrap();
        assert_eq!(growth_rate(&dataset), MetricValue::Scalar(0.0));
    }

    #[test]
    fn growth_rate_guards_zero_first_period() {
        let dataset = Dataset::from_json_value(json!([
            {"date": "2023-01-01", "amount": 0.0},
            {"date": "2023-02-01", "amount": 10.0}
        ]))
        .unwrap();
        assert!(matches!(
            growth_rate(&dataset),
            MetricValue::Undefined { .. }
        ));
    }

    #[test]
    fn average_transaction_divides_by_every_record() {
        // 650 over 4 records, the amount-less record included.
        assert_eq!(average_transaction(&sales()), MetricValue::Scalar(162.5));
    }

    #[test]
    fn average_transaction_on_empty_dataset_is_undefined() {
        assert!(matches!(
            average_transaction(&Dataset::default()),
            MetricValue::Undefined { .. }
        ));
    }

    #[test]
    fn average_positive_transaction_excludes_non_positive_amounts() {
        let dataset = Dataset::from_json_value(json!([
            {"amount": 10.0}, {"amount": -5.0}, {"amount": 0.0}, {"amount": 30.0}
        ]))
        .unwrap();
        assert_eq!(
            average_positive_transaction(&dataset),
            MetricValue::Scalar(20.0)
        );
        let refunds = Dataset::from_json_value(json!([{"amount": -1.0}])).unwrap();
        assert!(matches!(
            average_positive_transaction(&refunds),
            MetricValue::Undefined { .. }
        ));
    }

    #[test]
    fn top_products_ranks_descending_with_unknown_fallback() {
        let ranked = top_products(&sales(), TOP_PRODUCT_LIMIT);
        assert_eq!(ranked[0].label, "Widget");
        assert_eq!(ranked[0].value, 500.0);
        assert_eq!(ranked[1].label, "Gadget");
        assert_eq!(ranked[2].label, "Unknown");
        assert_eq!(ranked[2].value, 50.0);
    }

    #[test]
    fn top_products_caps_at_limit() {
        let rows = json!((0..8)
            .map(|i| json!({"product": format!("P{i}"), "amount": f64::from(i)}))
            .collect::<Vec<_>>());
        let dataset = Dataset::from_json_value(rows).unwrap();
        assert_eq!(top_products(&dataset, 5).len(), 5);
    }

    #[test]
    fn metric_ids_and_order_are_stable() {
        let metrics = calculate_metrics(&sales());
        let ids: Vec<&str> = metrics.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "total-revenue",
                "growth-rate",
                "sales-by-period",
                "avg-transaction",
                "top-products"
            ]
        );
    }

    #[test]
    fn empty_dataset_yields_zero_and_undefined_metrics() {
        let metrics = calculate_metrics(&Dataset::default());
        assert_eq!(metrics[0].value, MetricValue::Scalar(0.0));
        assert_eq!(metrics[1].value, MetricValue::Scalar(0.0));
        assert_eq!(metrics[2].value, MetricValue::Breakdown(Vec::new()));
        assert!(matches!(metrics[3].value, MetricValue::Undefined { .. }));
        assert_eq!(metrics[4].value, MetricValue::Breakdown(Vec::new()));
    }

    #[test]
    fn bar_and_pie_charts_share_the_top_five() {
        let charts = generate_visualisations(&sales());
        let bar = &charts[1];
        let pie = &charts[2];
        assert_eq!(bar.data.labels, pie.data.labels);
        assert_eq!(bar.data.datasets[0].data, pie.data.datasets[0].data);
    }

    #[test]
    fn visualisations_cover_the_five_report_charts() {
        let charts = generate_visualisations(&sales());
        let ids: Vec<&str> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "line-chart",
                "bar-chart",
                "pie-chart",
                "area-chart",
                "scatter-plot"
            ]
        );
        assert_eq!(charts[0].data.labels, vec!["2023-01", "2023-02", "2023-03"]);
        assert_eq!(
            charts[0].data.datasets[0].colour.as_deref(),
            Some("#3B82F6")
        );
    }

    #[test]
    fn area_chart_accumulates_period_revenue() {
        let charts = generate_visualisations(&sales());
        assert_eq!(
            charts[3].data.datasets[0].data,
            SeriesData::Values(vec![150.0, 350.0, 650.0])
        );
    }

    #[test]
    fn pie_chart_colours_slices_positionally() {
        let charts = generate_visualisations(&sales());
        let colours = charts[2].data.datasets[0]
            .background_colours
            .as_ref()
            .unwrap();
        assert_eq!(colours[0], "#3B82F6");
        assert_eq!(colours[1], "#10B981");
    }

    #[test]
    fn scatter_keeps_amountless_records_at_zero() {
        let dataset = Dataset::from_json_value(json!([
            {"amount": 10.0, "quantity": 2.0},
            {"quantity": 5.0}
        ]))
        .unwrap();
        let charts = generate_visualisations(&dataset);
        let SeriesData::Points(points) = &charts[4].data.datasets[0].data else {
            panic!("expected point series");
        };
        assert_eq!(points.len(), 2);
        assert_eq!(points[1], Point { x: 5.0, y: 0.0 });
    }

    #[test]
    fn bar_chart_colours_bars_by_rank_like_the_pie() {
        let charts = generate_visualisations(&sales());
        let bar_colours = charts[1].data.datasets[0]
            .background_colours
            .as_ref()
            .unwrap();
        let pie_colours = charts[2].data.datasets[0]
            .background_colours
            .as_ref()
            .unwrap();
        assert_eq!(bar_colours, pie_colours);
        assert_eq!(bar_colours[0], "#3B82F6");
        assert_eq!(bar_colours[1], "#10B981");
        assert_eq!(bar_colours[2], "#6366F1");
    }

    #[test]
    fn scatter_defaults_missing_quantity_to_one() {
        let charts = generate_visualisations(&sales());
        let SeriesData::Points(points) = &charts[4].data.datasets[0].data else {
            panic!("expected point series");
        };
        assert_eq!(points.len(), 4);
        let gadget = points
            .iter()
            .find(|p| p.y == 100.0)
            .expect("gadget point present");
        assert_eq!(gadget.x, 1.0);
    }
}

use crate::core::table::Table;
use crate::domain::model::{MetricKind, MetricQuery, MetricSeries};
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::collections::{BTreeMap, HashMap};

/// CloudWatch GetMetricData 單次最多 500 個查詢
pub const MAX_QUERIES_PER_REQUEST: usize = 500;

impl MetricQuery {
    /// 最近 `hours` 小時的查詢範圍
    pub fn last_hours(
        function_names: Vec<String>,
        hours: i64,
        period_seconds: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            function_names,
            period_seconds,
            start: now - Duration::hours(hours),
            end: now,
        }
    }

    /// 每批函數數量，讓查詢數不超過上限
    pub fn functions_per_batch() -> usize {
        MAX_QUERIES_PER_REQUEST / MetricKind::ALL.len()
    }
}

/// 將函數切成多批，每批附上在整份清單中的索引
pub fn query_batches(function_names: &[String]) -> Vec<Vec<(usize, &str)>> {
    let indexed: Vec<(usize, &str)> = function_names
        .iter()
        .enumerate()
        .map(|(index, name)| (index, name.as_str()))
        .collect();
    indexed
        .chunks(MetricQuery::functions_per_batch())
        .map(<[_]>::to_vec)
        .collect()
}

/// 合併 GetMetricData 各頁的結果，同一查詢 id 的資料點串接成一條序列
#[derive(Debug, Default)]
pub struct SeriesCollector {
    series: HashMap<(usize, MetricKind), MetricSeries>,
}

impl SeriesCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入一筆結果；無法辨識的 id 回傳 false
    pub fn add<I>(&mut self, query_id: &str, points: I) -> bool
    where
        I: IntoIterator<Item = (DateTime<Utc>, f64)>,
    {
        let Some((kind, function_index)) = MetricKind::from_query_id(query_id) else {
            tracing::warn!(id = query_id, "Ignoring metric result with unknown id");
            return false;
        };
        let series = self
            .series
            .entry((function_index, kind))
            .or_insert_with(|| MetricSeries {
                function_index,
                kind,
                timestamps: Vec::new(),
                values: Vec::new(),
            });
        for (timestamp, value) in points {
            series.timestamps.push(timestamp);
            series.values.push(value);
        }
        true
    }

    /// 依函數索引與指標順序排序後輸出
    pub fn finish(self) -> Vec<MetricSeries> {
        let mut series: Vec<MetricSeries> = self.series.into_values().collect();
        series.sort_by_key(|s| {
            let kind_order = MetricKind::ALL.iter().position(|k| *k == s.kind);
            (s.function_index, kind_order)
        });
        series
    }
}

pub fn datetime_column(hours: i64) -> String {
    format!("DateTime ({} hours ago)", hours)
}

fn format_value(kind: MetricKind, value: f64, total: f64) -> String {
    match kind {
        MetricKind::Duration => format!("{:.2} avg", value),
        _ => format!("{:.0} / {:.0}", value, total),
    }
}

type MetricRows = BTreeMap<(usize, DateTime<Utc>), Vec<(String, String)>>;

fn row_entry<'a>(
    rows: &'a mut MetricRows,
    function_index: usize,
    timestamp: DateTime<Utc>,
    function_name: &str,
    datetime_col: &str,
) -> &'a mut Vec<(String, String)> {
    rows.entry((function_index, timestamp)).or_insert_with(|| {
        vec![
            ("Function".to_string(), function_name.to_string()),
            (
                datetime_col.to_string(),
                timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ),
        ]
    })
}

/// 將指標序列整理成表格：每個 (函數, 時間點) 一列，依清單順序再依時間排序
pub fn build_metric_table(
    function_names: &[String],
    series: &[MetricSeries],
    hours: i64,
    now: DateTime<Utc>,
) -> Table {
    let datetime_col = datetime_column(hours);
    let current_hour = now.duration_trunc(Duration::hours(1)).unwrap_or(now);

    let mut rows = MetricRows::new();

    for s in series {
        let Some(function_name) = function_names.get(s.function_index) else {
            tracing::warn!(index = s.function_index, "Metric result for unknown function");
            continue;
        };
        let label = s.kind.label().to_string();

        if s.values.is_empty() {
            row_entry(&mut rows, s.function_index, current_hour, function_name, &datetime_col)
                .push((label, "-".to_string()));
            continue;
        }

        let total: f64 = s.values.iter().sum();
        for (timestamp, value) in s.timestamps.iter().zip(&s.values) {
            row_entry(&mut rows, s.function_index, *timestamp, function_name, &datetime_col)
                .push((label.clone(), format_value(s.kind, *value, total)));
        }
    }

    let mut table = Table::new(
        ["Function".to_string(), datetime_col]
            .into_iter()
            .chain(MetricKind::ALL.iter().map(|k| k.label().to_string())),
    );
    for cells in rows.into_values() {
        table.push_row(cells);
    }
    table
}

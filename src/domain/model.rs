use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 預設日誌保存天數
pub const DEFAULT_LOG_RETENTION_DAYS: i32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    #[default]
    Status,
    Patch,
    Check,
    Metric,
    Snapshot,
}

impl Operation {
    /// 是否需要取得每個函數的即時狀態
    pub fn needs_function_state(&self) -> bool {
        !matches!(self, Operation::Metric)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Status => "STATUS",
            Operation::Patch => "PATCH",
            Operation::Check => "CHECK",
            Operation::Metric => "METRIC",
            Operation::Snapshot => "SNAPSHOT",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "status" => Ok(Operation::Status),
            "patch" => Ok(Operation::Patch),
            "check" => Ok(Operation::Check),
            "metric" => Ok(Operation::Metric),
            "snapshot" => Ok(Operation::Snapshot),
            other => Err(format!(
                "unknown operation '{}', expected status|patch|check|metric|snapshot",
                other
            )),
        }
    }
}

/// 清單中的一筆目標函數與期望的安全設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub region: String,
    pub account: String,
    pub function_name: String,
    pub qualifier: Option<String>,
    pub log_retention_days: i32,
    pub custom_kms_arn: Option<String>,
    pub secure_function: bool,
    pub secure_log: bool,
}

impl ManifestEntry {
    pub fn kms_key_arn(region: &str, account: &str, key_id: &str) -> String {
        format!("arn:aws:kms:{}:{}:key/{}", region, account, key_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionInfo {
    pub function_name: String,
    pub code_sha256: String,
    pub last_modified: String,
    pub version: String,
    pub state: Option<String>,
    pub code_size: i64,
    pub timeout: i32,
    pub kms_key_arn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerInfo {
    pub layer_version_arn: String,
    pub code_sha256: String,
    pub created_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogGroupInfo {
    pub log_group_name: String,
    pub retention_in_days: Option<i32>,
    pub kms_key_id: Option<String>,
    /// 日誌群組尚未建立時為 false
    pub exists: bool,
}

impl LogGroupInfo {
    pub fn name_for(function_name: &str) -> String {
        format!("/aws/lambda/{}", function_name)
    }
}

/// 函數的即時狀態：設定、層與日誌群組
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionMeta {
    pub configuration: FunctionInfo,
    pub layers: Vec<LayerInfo>,
    pub log_group: LogGroupInfo,
}

/// 清單項目與其即時狀態，供輸出階段使用
#[derive(Debug, Clone)]
pub struct ScannedFunction {
    pub entry: ManifestEntry,
    pub meta: FunctionMeta,
}

/// PATCH 時對日誌群組要做的變更，只包含與現況不同的部分
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSecurityRequest {
    pub log_group_name: String,
    pub create: bool,
    pub associate_kms_key: Option<String>,
    pub disassociate_kms_key: bool,
    pub retention_in_days: Option<i32>,
}

impl LogSecurityRequest {
    pub fn is_noop(&self) -> bool {
        !self.create
            && self.associate_kms_key.is_none()
            && !self.disassociate_kms_key
            && self.retention_in_days.is_none()
    }
}

// ---- snapshot file ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotRecord {
    pub function_name: String,
    pub code_sha256: String,
    pub last_modified: String,
    pub version: String,
    #[serde(default)]
    pub layers: Vec<SnapshotLayer>,
    pub log_group: SnapshotLogGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotLayer {
    pub code_sha256: String,
    pub layer_version_arn: String,
    pub created_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SnapshotLogGroup {
    pub log_group_name: String,
}

impl From<&FunctionMeta> for SnapshotRecord {
    fn from(meta: &FunctionMeta) -> Self {
        Self {
            function_name: meta.configuration.function_name.clone(),
            code_sha256: meta.configuration.code_sha256.clone(),
            last_modified: meta.configuration.last_modified.clone(),
            version: meta.configuration.version.clone(),
            layers: meta
                .layers
                .iter()
                .map(|layer| SnapshotLayer {
                    code_sha256: layer.code_sha256.clone(),
                    layer_version_arn: layer.layer_version_arn.clone(),
                    created_date: layer.created_date.clone(),
                })
                .collect(),
            log_group: SnapshotLogGroup {
                log_group_name: meta.log_group.log_group_name.clone(),
            },
        }
    }
}

// ---- metrics ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Invocations,
    Errors,
    Duration,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [
        MetricKind::Invocations,
        MetricKind::Errors,
        MetricKind::Duration,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Invocations => "Invocations",
            MetricKind::Errors => "Errors",
            MetricKind::Duration => "Duration",
        }
    }

    pub fn statistic(&self) -> &'static str {
        match self {
            MetricKind::Duration => "Average",
            _ => "Sum",
        }
    }

    /// 查詢 id，例如 `invocations_0`
    pub fn query_id(&self, function_index: usize) -> String {
        format!("{}_{}", self.label().to_lowercase(), function_index)
    }

    pub fn from_query_id(id: &str) -> Option<(MetricKind, usize)> {
        let (prefix, index) = id.split_once('_')?;
        let index = index.parse().ok()?;
        let kind = MetricKind::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(prefix))?;
        Some((kind, index))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    pub function_names: Vec<String>,
    pub period_seconds: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// 單一函數單一指標的時間序列
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub function_index: usize,
    pub kind: MetricKind,
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

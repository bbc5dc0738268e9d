use crate::core::table::{truncate_left, truncate_right, Table};
use crate::domain::model::{ScannedFunction, SnapshotRecord};
use chrono::{DateTime, Utc};

pub const STATUS_COLUMNS: [&str; 11] = [
    "FunctionName",
    "LastModified",
    "State",
    "CodeSize",
    "Timeout",
    "CodeSha256",
    "Layers",
    "LogRetention",
    "EncryptionKey",
    "SecureFunction",
    "SecureLog",
];

fn ok_or(ok: bool, otherwise: &'static str) -> &'static str {
    if ok {
        "OK"
    } else {
        otherwise
    }
}

/// Lambda 的 LastModified 形如 `2024-01-01T10:00:00.000+0000`
pub fn normalize_timestamp(value: &str) -> String {
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| {
            dt.with_timezone(&Utc)
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        })
        .unwrap_or_else(|_| value.to_string())
}

/// 快照中的每一層都必須在現況中以相同 ARN 與 SHA 存在
pub fn layers_match(func: &ScannedFunction, baseline: Option<&SnapshotRecord>) -> bool {
    let Some(baseline) = baseline else {
        return false;
    };
    baseline.layers.iter().all(|layer| {
        func.meta
            .layers
            .iter()
            .find(|live| live.layer_version_arn == layer.layer_version_arn)
            .is_some_and(|live| live.code_sha256 == layer.code_sha256)
    })
}

/// 產生 STATUS 表格的一列
pub fn status_row(
    func: &ScannedFunction,
    baseline: Option<&SnapshotRecord>,
) -> Vec<(&'static str, String)> {
    let info = &func.meta.configuration;
    let log_group = &func.meta.log_group;
    let entry = &func.entry;

    let code_ok = baseline.is_some_and(|b| b.code_sha256 == info.code_sha256);
    let retention_ok = log_group.retention_in_days == Some(entry.log_retention_days);
    let key_ok = info.kms_key_arn == entry.custom_kms_arn;
    let has_key = info.kms_key_arn.is_some();
    let log_has_key = log_group.kms_key_id.is_some();

    let encryption_key = format!(
        "{} ({})",
        if entry.custom_kms_arn.is_some() {
            "KMS"
        } else {
            "Default"
        },
        ok_or(key_ok, "PATCH")
    );

    vec![
        ("FunctionName", truncate_right(&info.function_name, 20)),
        ("LastModified", normalize_timestamp(&info.last_modified)),
        ("State", info.state.clone().unwrap_or_else(|| "-".to_string())),
        ("CodeSize", format!("{} bytes", info.code_size)),
        ("Timeout", format!("{} secs", info.timeout)),
        (
            "CodeSha256",
            format!(
                "{} ({})",
                truncate_left(&info.code_sha256, 5),
                ok_or(code_ok, "NOK")
            ),
        ),
        (
            "Layers",
            format!(
                "{} ({})",
                func.meta.layers.len(),
                ok_or(layers_match(func, baseline), "NOK")
            ),
        ),
        (
            "LogRetention",
            format!(
                "{} / {} ({})",
                log_group
                    .retention_in_days
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                entry.log_retention_days,
                ok_or(retention_ok, "PATCH")
            ),
        ),
        ("EncryptionKey", encryption_key),
        (
            "SecureFunction",
            format!(
                "{} ({})",
                if entry.secure_function { "YES" } else { "NO" },
                ok_or(entry.secure_function == has_key, "PATCH")
            ),
        ),
        (
            "SecureLog",
            format!(
                "{} ({})",
                if entry.secure_log { "YES" } else { "NO" },
                ok_or(entry.secure_log == log_has_key, "PATCH")
            ),
        ),
    ]
}

/// 與快照比較並產生 STATUS 表格。`snapshot` 為 `None` 代表沒有基準。
pub fn build_status_table(
    functions: &[ScannedFunction],
    snapshot: Option<&[SnapshotRecord]>,
) -> Table {
    let mut table = Table::new(STATUS_COLUMNS);
    for func in functions {
        let baseline = snapshot.and_then(|records| {
            records
                .iter()
                .find(|r| r.function_name == func.meta.configuration.function_name)
        });
        if snapshot.is_some() && baseline.is_none() {
            tracing::warn!(
                function = %func.meta.configuration.function_name,
                "Function is not in the baseline snapshot"
            );
        }
        table.push_row(status_row(func, baseline));
    }
    table
}

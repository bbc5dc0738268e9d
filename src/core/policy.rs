use crate::utils::error::{Result, SecOpsError};
use serde_json::{json, Value};

pub const LOGS_STATEMENT_SID: &str = "AllowCloudWatchLogsEncryption";

/// CloudWatch Logs 在該區域的服務主體
pub fn logs_service_principal(region: &str) -> String {
    format!("logs.{}.amazonaws.com", region)
}

/// 確認 key policy 允許 CloudWatch Logs 使用此 key。
///
/// 已經有授權時回傳 `None`，否則回傳加上授權聲明後的新 policy。
pub fn grant_logs_access(policy: &str, region: &str) -> Result<Option<String>> {
    let mut document: Value = serde_json::from_str(policy)?;
    let principal = logs_service_principal(region);

    let object = document
        .as_object_mut()
        .ok_or_else(|| SecOpsError::config("KMS key policy is not a JSON object"))?;

    // 單一聲明物件轉成陣列
    let statement = object
        .entry("Statement")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !statement.is_array() {
        let single = statement.take();
        *statement = Value::Array(vec![single]);
    }
    let statements = statement
        .as_array_mut()
        .ok_or_else(|| SecOpsError::config("KMS key policy has no statement list"))?;

    if statements.iter().any(|s| grants_service(s, &principal)) {
        return Ok(None);
    }

    statements.push(json!({
        "Sid": LOGS_STATEMENT_SID,
        "Effect": "Allow",
        "Principal": { "Service": principal },
        "Action": [
            "kms:Encrypt*",
            "kms:Decrypt*",
            "kms:ReEncrypt*",
            "kms:GenerateDataKey*",
            "kms:Describe*"
        ],
        "Resource": "*"
    }));

    Ok(Some(serde_json::to_string_pretty(&document)?))
}

fn grants_service(statement: &Value, principal: &str) -> bool {
    if statement.get("Effect").and_then(Value::as_str) != Some("Allow") {
        return false;
    }
    match statement.pointer("/Principal/Service") {
        Some(Value::String(service)) => service == principal,
        Some(Value::Array(services)) => services.iter().any(|s| s.as_str() == Some(principal)),
        _ => false,
    }
}

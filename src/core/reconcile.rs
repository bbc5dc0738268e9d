//! 單筆函數的比對與修補邏輯。
//!
//! 決策部分都是純函數（[`check`]、[`plan_patch`]），只有 [`apply_patch`]
//! 會透過 [`CloudProvider`] 改動雲端資源。

use crate::domain::model::{FunctionMeta, LogSecurityRequest, ManifestEntry};
use crate::domain::ports::CloudProvider;
use crate::utils::error::{Result, SecOpsError};
use crate::utils::validation::validate_log_retention;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Good,
    Warn,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Good => write!(f, "GOOD"),
            Verdict::Warn => write!(f, "WARN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concern {
    EncryptionKey,
    LogRetention,
    LogEncryption,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub concern: Concern,
    pub verdict: Verdict,
    pub message: String,
}

impl Finding {
    fn good(concern: Concern, message: impl Into<String>) -> Self {
        Self {
            concern,
            verdict: Verdict::Good,
            message: message.into(),
        }
    }

    fn warn(concern: Concern, message: impl Into<String>) -> Self {
        Self {
            concern,
            verdict: Verdict::Warn,
            message: message.into(),
        }
    }
}

/// CHECK：只回報，不修改
pub fn check(entry: &ManifestEntry, meta: &FunctionMeta) -> Vec<Finding> {
    vec![
        check_encryption_key(entry, meta),
        check_log_retention(entry, meta),
        check_log_encryption(entry, meta),
    ]
}

fn check_encryption_key(entry: &ManifestEntry, meta: &FunctionMeta) -> Finding {
    let current = meta.configuration.kms_key_arn.as_deref();
    let custom = entry.custom_kms_arn.as_deref();
    let concern = Concern::EncryptionKey;

    match (entry.secure_function, current == custom) {
        (true, true) if current.is_some() => {
            Finding::good(concern, "Has already configured with KMS custom key id")
        }
        (true, true) => Finding::warn(
            concern,
            "Provide a KMS custom key id to set up secure function",
        ),
        (true, false) if custom.is_some() => {
            Finding::warn(concern, "Has KMS custom key id but it is not set")
        }
        (true, false) => Finding::warn(concern, "Missing KMS custom key id"),
        (false, true) if current.is_none() => {
            Finding::good(concern, "Not required to use a KMS custom key id")
        }
        (false, true) => Finding::good(concern, "Has already configured with KMS custom key id"),
        (false, false) => Finding::warn(concern, "Not matching KMS custom key ids"),
    }
}

fn check_log_retention(entry: &ManifestEntry, meta: &FunctionMeta) -> Finding {
    let desired = entry.log_retention_days;
    match meta.log_group.retention_in_days {
        Some(days) if days == desired => Finding::good(
            Concern::LogRetention,
            format!("Log retention is {} days", days),
        ),
        Some(days) => Finding::warn(
            Concern::LogRetention,
            format!("Log retention is {} days, expected {}", days, desired),
        ),
        None => Finding::warn(
            Concern::LogRetention,
            format!("Log retention is not set, expected {} days", desired),
        ),
    }
}

fn check_log_encryption(entry: &ManifestEntry, meta: &FunctionMeta) -> Finding {
    let encrypted = meta.log_group.kms_key_id.is_some();
    match (entry.secure_log, encrypted) {
        (true, true) => Finding::good(Concern::LogEncryption, "Log group is encrypted"),
        (true, false) => Finding::warn(Concern::LogEncryption, "Log group is not encrypted"),
        (false, false) => Finding::good(Concern::LogEncryption, "Log encryption not required"),
        (false, true) => Finding::warn(
            Concern::LogEncryption,
            "Log group is encrypted but secure log is disabled",
        ),
    }
}

/// PATCH 的執行計畫
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
    pub function_name: String,
    /// 需要寫入函數設定的 KMS key
    pub function_kms_key: Option<String>,
    pub log: LogSecurityRequest,
}

impl PatchPlan {
    pub fn is_noop(&self) -> bool {
        self.function_kms_key.is_none() && self.log.is_noop()
    }
}

/// 比對期望與現況，產生需要的變更。
///
/// 自訂 key 優先，否則沿用函數現有的 key。
pub fn plan_patch(entry: &ManifestEntry, meta: &FunctionMeta) -> Result<PatchPlan> {
    // CloudWatch Logs 只接受固定的保存天數
    validate_log_retention("LogRetention", entry.log_retention_days)?;

    let function_name = meta.configuration.function_name.clone();
    let current = meta.configuration.kms_key_arn.as_deref();
    let effective = entry.custom_kms_arn.as_deref().or(current);

    let missing_key = |purpose: &str| SecOpsError::MissingKmsKeyError {
        function_name: function_name.clone(),
        purpose: purpose.to_string(),
    };

    let function_kms_key = if entry.secure_function {
        match effective {
            None => return Err(missing_key("enable secure function")),
            Some(key) if current != Some(key) => Some(key.to_string()),
            Some(_) => None,
        }
    } else {
        None
    };

    let log_group = &meta.log_group;
    let mut log = LogSecurityRequest {
        log_group_name: log_group.log_group_name.clone(),
        create: !log_group.exists,
        ..Default::default()
    };

    if entry.secure_log {
        let key = effective.ok_or_else(|| missing_key("encrypt the log group"))?;
        if log_group.kms_key_id.as_deref() != Some(key) {
            log.associate_kms_key = Some(key.to_string());
        }
    } else {
        log.disassociate_kms_key = log_group.kms_key_id.is_some();
    }

    if log_group.retention_in_days != Some(entry.log_retention_days) {
        log.retention_in_days = Some(entry.log_retention_days);
    }

    Ok(PatchPlan {
        function_name,
        function_kms_key,
        log,
    })
}

/// 依計畫修改雲端資源：先函數加密，再日誌群組
pub async fn apply_patch<P: CloudProvider + ?Sized>(provider: &P, plan: &PatchPlan) -> Result<()> {
    if plan.is_noop() {
        tracing::debug!(function = %plan.function_name, "Nothing to patch");
        return Ok(());
    }

    if let Some(key) = &plan.function_kms_key {
        tracing::debug!(function = %plan.function_name, "Updating function KMS key");
        provider
            .update_function_kms_key(&plan.function_name, key)
            .await?;
    }

    if !plan.log.is_noop() {
        provider.configure_log_group(&plan.log).await?;
    }

    Ok(())
}

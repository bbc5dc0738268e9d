use crate::utils::error::{Result, SecOpsError};
use chrono::NaiveDate;

/// 基準快照的預設名稱
pub const LATEST_BASELINE: &str = "$LATEST";

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> SecOpsError {
    SecOpsError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

pub fn validate_aws_region(field_name: &str, region: &str) -> Result<()> {
    validate_non_empty_string(field_name, region)?;

    if !region
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            field_name,
            region,
            "AWS region can only contain lowercase letters, numbers, and hyphens",
        ));
    }

    Ok(())
}

/// `$LATEST` 或 `YYYY-MM-DD`
pub fn validate_baseline(field_name: &str, baseline: &str) -> Result<()> {
    if baseline == LATEST_BASELINE {
        return Ok(());
    }
    NaiveDate::parse_from_str(baseline, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|e| invalid(field_name, baseline, format!("Expected YYYY-MM-DD: {}", e)))
}

/// CloudWatch 只接受 1、5、10、30 秒或 60 的倍數
pub fn validate_metric_period(field_name: &str, seconds: i32) -> Result<()> {
    match seconds {
        1 | 5 | 10 | 30 => Ok(()),
        s if s > 0 && s % 60 == 0 => Ok(()),
        s => Err(invalid(
            field_name,
            s,
            "Period must be 1, 5, 10, 30 or a multiple of 60 seconds",
        )),
    }
}

/// CloudWatch Logs 接受的保存天數
pub const LOG_RETENTION_DAYS: [i32; 22] = [
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

pub fn validate_log_retention(field_name: &str, days: i32) -> Result<()> {
    if LOG_RETENTION_DAYS.contains(&days) {
        return Ok(());
    }
    Err(invalid(
        field_name,
        days,
        "Not a retention period supported by CloudWatch Logs",
    ))
}

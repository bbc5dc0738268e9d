use crate::domain::model::{ManifestEntry, DEFAULT_LOG_RETENTION_DAYS};
use crate::utils::error::{Result, SecOpsError};
use std::io::Read;
use std::path::Path;

const HEADER_PREFIX: &str = "Region";

// 欄位位置
const COL_REGION: usize = 0;
const COL_ACCOUNT: usize = 1;
const COL_FUNCTION: usize = 2;
const COL_VERSION: usize = 3;
const COL_RETENTION: usize = 4;
const COL_KMS_KEY: usize = 5;
const COL_SECURE_FUNCTION: usize = 6;
const COL_SECURE_LOG: usize = 7;

/// 從檔案載入清單
pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<ManifestEntry>> {
    let file = std::fs::File::open(&path)?;
    parse_manifest(file)
}

/// 解析 CSV 清單。第一列必須是以 `Region` 開頭的標題列。
pub fn parse_manifest<R: Read>(mut reader: R) -> Result<Vec<ManifestEntry>> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_slice());

    let mut records = csv_reader.records();

    let header = match records.next() {
        Some(header) => header?,
        None => {
            return Err(SecOpsError::ManifestError {
                line: 1,
                message: "manifest is empty".to_string(),
            })
        }
    };
    let first = header.get(0).unwrap_or_default().trim_start_matches('\u{feff}');
    if !first.starts_with(HEADER_PREFIX) {
        return Err(SecOpsError::ManifestError {
            line: 1,
            message: format!("header must start with '{}', found '{}'", HEADER_PREFIX, first),
        });
    }

    let mut entries = Vec::new();
    for record in records {
        let record = record?;
        let line = record
            .position()
            .map(|p| line_at(&content, p.byte()))
            .unwrap_or_default();
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        entries.push(parse_row(&record, line)?);
    }

    tracing::debug!("Parsed {} manifest entries", entries.len());
    Ok(entries)
}

/// 記錄起點的行號，從位移處略過前面的空白行後以換行數計算
fn line_at(content: &[u8], byte: u64) -> u64 {
    let offset = usize::try_from(byte).map_or(content.len(), |b| b.min(content.len()));
    let skipped = content[offset..]
        .iter()
        .take_while(|&&b| b == b'\r' || b == b'\n')
        .count();
    1 + content[..offset + skipped]
        .iter()
        .filter(|&&b| b == b'\n')
        .count() as u64
}

fn parse_row(record: &csv::StringRecord, line: u64) -> Result<ManifestEntry> {
    let field = |index: usize| record.get(index).filter(|value| !value.is_empty());

    if record.len() <= COL_FUNCTION {
        return Err(SecOpsError::ManifestError {
            line,
            message: format!("expected at least 3 columns, found {}", record.len()),
        });
    }

    let function_name = field(COL_FUNCTION)
        .ok_or_else(|| SecOpsError::ManifestError {
            line,
            message: "FunctionName is empty".to_string(),
        })?
        .to_string();
    let region = field(COL_REGION).unwrap_or_default().to_string();
    let account = field(COL_ACCOUNT).unwrap_or_default().to_string();

    let log_retention_days = match field(COL_RETENTION) {
        Some(value) => value.parse::<i32>().map_err(|_| SecOpsError::ManifestError {
            line,
            message: format!("LogRetention '{}' is not a number of days", value),
        })?,
        None => DEFAULT_LOG_RETENTION_DAYS,
    };

    let custom_kms_arn = match field(COL_KMS_KEY) {
        Some(key_id) if region.is_empty() || account.is_empty() => {
            return Err(SecOpsError::ManifestError {
                line,
                message: format!("KMS key '{}' needs both Region and Account", key_id),
            })
        }
        Some(key_id) => Some(ManifestEntry::kms_key_arn(&region, &account, key_id)),
        None => None,
    };

    Ok(ManifestEntry {
        function_name,
        qualifier: field(COL_VERSION).map(str::to_string),
        log_retention_days,
        custom_kms_arn,
        secure_function: parse_flag(field(COL_SECURE_FUNCTION), "SecureFunction", line)?,
        secure_log: parse_flag(field(COL_SECURE_LOG), "SecureLog", line)?,
        region,
        account,
    })
}

fn parse_flag(value: Option<&str>, column: &str, line: u64) -> Result<bool> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(other) => Err(SecOpsError::ManifestError {
            line,
            message: format!("{} must be true or false, found '{}'", column, other),
        }),
    }
}

use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 選用的 TOML 設定檔，所有欄位皆可省略
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecOpsSettings {
    pub aws: Option<AwsSettings>,
    pub manifest: Option<ManifestSettings>,
    pub snapshot: Option<SnapshotSettings>,
    pub metrics: Option<MetricsSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsSettings {
    pub profile: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSettings {
    pub input: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSettings {
    pub output: Option<String>,
    pub baseline: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSettings {
    pub hours: Option<i64>,
    pub periods: Option<i32>,
}

impl SecOpsSettings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${AWS_PROFILE})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR
            .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid pattern"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn profile(&self) -> Option<String> {
        self.aws.as_ref().and_then(|a| a.profile.clone())
    }

    pub fn region(&self) -> Option<String> {
        self.aws.as_ref().and_then(|a| a.region.clone())
    }

    pub fn input(&self) -> Option<String> {
        self.manifest.as_ref().and_then(|m| m.input.clone())
    }

    pub fn output(&self) -> Option<String> {
        self.snapshot.as_ref().and_then(|s| s.output.clone())
    }

    pub fn baseline(&self) -> Option<String> {
        self.snapshot.as_ref().and_then(|s| s.baseline.clone())
    }

    pub fn hours(&self) -> Option<i64> {
        self.metrics.as_ref().and_then(|m| m.hours)
    }

    pub fn periods(&self) -> Option<i32> {
        self.metrics.as_ref().and_then(|m| m.periods)
    }
}

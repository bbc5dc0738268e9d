pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::model::Operation;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate, LATEST_BASELINE};
use clap::Parser;
use toml_config::SecOpsSettings;

pub const DEFAULT_INPUT: &str = "functions.csv";
pub const DEFAULT_OUTPUT: &str = ".snapshot";
pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_REGION: &str = "eu-west-1";
pub const DEFAULT_HOURS: i64 = 3;
pub const DEFAULT_PERIOD_SECONDS: i32 = 300;

#[derive(Debug, Clone, Parser)]
#[command(name = "simplify-secops")]
#[command(about = "Audit and patch KMS encryption and log settings of serverless functions")]
#[command(override_usage = "simplify-secops status|patch|check|metric|snapshot [options]")]
pub struct CliConfig {
    /// status | patch | check | metric | snapshot
    #[arg(default_value = "status")]
    pub operation: Operation,

    /// Input file contains function list
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output snapshot folder
    #[arg(short, long)]
    pub output: Option<String>,

    /// Baseline snapshot date YYYY-MM-DD
    #[arg(short, long)]
    pub baseline: Option<String>,

    /// How many hours since now, eg: 12 - last 12 hours
    #[arg(short = 'H', long)]
    pub hours: Option<i64>,

    /// Time resolution periods in seconds, eg: 5 10 30 60 N*60
    #[arg(short = 't', long)]
    pub periods: Option<i32>,

    /// AWS profile configuration
    #[arg(short, long)]
    pub profile: Option<String>,

    /// AWS specific region
    #[arg(short, long)]
    pub region: Option<String>,

    /// Optional TOML settings file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

/// 合併命令列、設定檔與預設值後的執行設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub operation: Operation,
    pub input: String,
    pub output: String,
    pub baseline: String,
    pub hours: i64,
    pub period_seconds: i32,
    pub profile: String,
    pub region: String,
}

impl RunConfig {
    /// 優先順序：命令列 > 設定檔 > 預設值
    pub fn resolve(cli: &CliConfig, settings: &SecOpsSettings) -> Self {
        fn pick<T: Clone>(flag: &Option<T>, file: Option<T>, default: T) -> T {
            flag.clone().or(file).unwrap_or(default)
        }

        Self {
            operation: cli.operation,
            input: pick(&cli.input, settings.input(), DEFAULT_INPUT.to_string()),
            output: pick(&cli.output, settings.output(), DEFAULT_OUTPUT.to_string()),
            baseline: pick(&cli.baseline, settings.baseline(), LATEST_BASELINE.to_string()),
            hours: pick(&cli.hours, settings.hours(), DEFAULT_HOURS),
            period_seconds: pick(&cli.periods, settings.periods(), DEFAULT_PERIOD_SECONDS),
            profile: pick(&cli.profile, settings.profile(), DEFAULT_PROFILE.to_string()),
            region: pick(&cli.region, settings.region(), DEFAULT_REGION.to_string()),
        }
    }

    /// 讀取 `--config` 指定的設定檔（若有）後合併
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let settings = match &cli.config {
            Some(path) => {
                tracing::info!("📁 Loading settings from: {}", path);
                SecOpsSettings::from_file(path)?
            }
            None => SecOpsSettings::default(),
        };
        Ok(Self::resolve(cli, &settings))
    }
}

impl ConfigProvider for RunConfig {
    fn manifest_path(&self) -> &str {
        &self.input
    }

    fn snapshot_dir(&self) -> &str {
        &self.output
    }

    fn baseline(&self) -> &str {
        &self.baseline
    }

    fn hours(&self) -> i64 {
        self.hours
    }

    fn period_seconds(&self) -> i32 {
        self.period_seconds
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input)?;
        validation::validate_path("output", &self.output)?;
        validation::validate_baseline("baseline", &self.baseline)?;
        validation::validate_non_empty_string("profile", &self.profile)?;
        validation::validate_aws_region("region", &self.region)?;

        if self.operation == Operation::Metric {
            // CloudWatch 最多保留 63 天的高解析度資料
            validation::validate_range("hours", self.hours, 1, 24 * 63)?;
            validation::validate_metric_period("periods", self.period_seconds)?;
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

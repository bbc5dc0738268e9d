use crate::core::manifest::load_manifest;
use crate::core::metrics::build_metric_table;
use crate::core::reconcile::{apply_patch, check, plan_patch, Finding, Verdict};
use crate::core::snapshot::SnapshotStore;
use crate::core::status::build_status_table;
use crate::core::table::Table;
use crate::core::{CloudProvider, ConfigProvider, Storage};
use crate::domain::model::{ManifestEntry, MetricQuery, Operation, ScannedFunction};
use crate::utils::error::{ErrorSeverity, Result, SecOpsError};
use chrono::{DateTime, Local, Utc};

/// 單筆失敗，不會中斷整個流程
#[derive(Debug)]
pub struct RecordFailure {
    pub function_name: String,
    pub error: SecOpsError,
}

#[derive(Debug)]
pub enum RunReport {
    Status(Table),
    Check(Vec<(String, Vec<Finding>)>),
    Patch { patched: Vec<String> },
    Metric(Table),
    Snapshot { written: Vec<String> },
}

#[derive(Debug)]
pub struct RunSummary {
    pub operation: Operation,
    pub processed: usize,
    pub failures: Vec<RecordFailure>,
    pub report: RunReport,
}

impl RunSummary {
    /// 失敗中最嚴重的等級
    pub fn worst_severity(&self) -> Option<ErrorSeverity> {
        self.failures.iter().map(|f| f.error.severity()).max()
    }
}

pub struct SecOpsEngine<P: CloudProvider, S: Storage, C: ConfigProvider> {
    provider: P,
    snapshots: SnapshotStore<S>,
    config: C,
}

impl<P: CloudProvider, S: Storage, C: ConfigProvider> SecOpsEngine<P, S, C> {
    pub fn new(provider: P, storage: S, config: C) -> Self {
        Self {
            provider,
            snapshots: SnapshotStore::new(storage),
            config,
        }
    }

    /// 讀取設定中的清單並執行
    pub async fn run(&self, operation: Operation) -> Result<RunSummary> {
        tracing::info!(
            operation = %operation,
            "Loading manifest from {}",
            self.config.manifest_path()
        );
        let entries = load_manifest(self.config.manifest_path())?;
        self.run_entries(operation, &entries, Local::now()).await
    }

    pub async fn run_entries(
        &self,
        operation: Operation,
        entries: &[ManifestEntry],
        now: DateTime<Local>,
    ) -> Result<RunSummary> {
        let mut scanned = Vec::new();
        let mut failures = Vec::new();
        let mut findings = Vec::new();
        let mut patched = Vec::new();

        // 逐筆依序處理，單筆失敗只記錄
        let targets = if operation.needs_function_state() {
            entries
        } else {
            &[]
        };
        for entry in targets {
            match self.process(operation, entry).await {
                Ok((func, outcome)) => {
                    match outcome {
                        Outcome::Checked(list) => {
                            findings.push((func.meta.configuration.function_name.clone(), list))
                        }
                        Outcome::Patched => {
                            patched.push(func.meta.configuration.function_name.clone())
                        }
                        Outcome::Scanned => {}
                    }
                    scanned.push(func);
                }
                Err(error) => {
                    tracing::error!(
                        operation = %operation,
                        function = %entry.function_name,
                        "❌ {}",
                        error
                    );
                    failures.push(RecordFailure {
                        function_name: entry.function_name.clone(),
                        error,
                    });
                }
            }
        }

        let processed = match operation {
            Operation::Metric => entries.len(),
            _ => scanned.len(),
        };

        let report = match operation {
            Operation::Status => {
                let snapshot = self.snapshots.load(self.config.baseline()).await?;
                RunReport::Status(build_status_table(&scanned, snapshot.as_deref()))
            }
            Operation::Check => RunReport::Check(findings),
            Operation::Patch => RunReport::Patch { patched },
            Operation::Metric => RunReport::Metric(self.metrics(entries, now).await?),
            Operation::Snapshot => {
                let date = now.format("%Y-%m-%d").to_string();
                let written = self.snapshots.save(&scanned, &date).await?;
                RunReport::Snapshot { written }
            }
        };

        tracing::info!(
            operation = %operation,
            "Processed {} functions, {} failed",
            processed,
            failures.len()
        );

        Ok(RunSummary {
            operation,
            processed,
            failures,
            report,
        })
    }

    async fn process(
        &self,
        operation: Operation,
        entry: &ManifestEntry,
    ) -> Result<(ScannedFunction, Outcome)> {
        let meta = self
            .provider
            .get_function_meta(&entry.function_name, entry.qualifier.as_deref())
            .await?;
        tracing::debug!(
            function = %entry.function_name,
            layers = meta.layers.len(),
            "Fetched function state"
        );

        let outcome = match operation {
            Operation::Patch => {
                let plan = plan_patch(entry, &meta)?;
                apply_patch(&self.provider, &plan).await?;
                tracing::info!(
                    operation = %operation,
                    function = %entry.function_name,
                    "Configured secure logs with {} days ✅",
                    entry.log_retention_days
                );
                Outcome::Patched
            }
            Operation::Check => {
                let list = check(entry, &meta);
                for finding in &list {
                    match finding.verdict {
                        Verdict::Good => tracing::info!(
                            operation = %operation,
                            function = %entry.function_name,
                            "{} [{}]",
                            finding.message,
                            finding.verdict
                        ),
                        Verdict::Warn => tracing::warn!(
                            operation = %operation,
                            function = %entry.function_name,
                            "{} [{}]",
                            finding.message,
                            finding.verdict
                        ),
                    }
                }
                Outcome::Checked(list)
            }
            _ => Outcome::Scanned,
        };

        Ok((
            ScannedFunction {
                entry: entry.clone(),
                meta,
            },
            outcome,
        ))
    }

    async fn metrics(&self, entries: &[ManifestEntry], now: DateTime<Local>) -> Result<Table> {
        let now = now.with_timezone(&Utc);
        let hours = self.config.hours();
        let names: Vec<String> = entries.iter().map(|e| e.function_name.clone()).collect();
        let query = MetricQuery::last_hours(names, hours, self.config.period_seconds(), now);

        tracing::info!(
            "Fetching metrics for {} functions over the last {} hours",
            query.function_names.len(),
            hours
        );
        let series = self.provider.get_function_metrics(&query).await?;
        Ok(build_metric_table(&query.function_names, &series, hours, now))
    }
}

enum Outcome {
    Scanned,
    Checked(Vec<Finding>),
    Patched,
}

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use simplify_secops::core::engine::RunReport;
use simplify_secops::core::reconcile::{Concern, Verdict};
use simplify_secops::core::CloudProvider;
use simplify_secops::domain::model::{
    FunctionInfo, FunctionMeta, LayerInfo, LogGroupInfo, LogSecurityRequest, ManifestEntry,
    MetricKind, MetricQuery, MetricSeries, Operation,
};
use simplify_secops::utils::error::{ErrorSeverity, Result};
use simplify_secops::{LocalStorage, RunConfig, SecOpsEngine, SecOpsError};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;

const CUSTOM_KEY: &str = "arn:aws:kms:eu-west-1:123456789012:key/custom";

#[derive(Clone, Default)]
struct MockProvider {
    functions: Arc<Mutex<HashMap<String, FunctionMeta>>>,
    calls: Arc<Mutex<Vec<String>>>,
    queries: Arc<Mutex<Vec<MetricQuery>>>,
    series: Vec<MetricSeries>,
}

impl MockProvider {
    async fn insert(&self, meta: FunctionMeta) {
        self.functions
            .lock()
            .await
            .insert(meta.configuration.function_name.clone(), meta);
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    async fn get_function_meta(
        &self,
        function_name: &str,
        _qualifier: Option<&str>,
    ) -> Result<FunctionMeta> {
        self.functions
            .lock()
            .await
            .get(function_name)
            .cloned()
            .ok_or_else(|| {
                SecOpsError::provider("GetFunction", "ResourceNotFoundException: Function not found")
            })
    }

    async fn update_function_kms_key(&self, function_name: &str, kms_key_arn: &str) -> Result<()> {
        self.calls
            .lock()
            .await
            .push(format!("update_function_kms_key {} {}", function_name, kms_key_arn));
        if let Some(meta) = self.functions.lock().await.get_mut(function_name) {
            meta.configuration.kms_key_arn = Some(kms_key_arn.to_string());
        }
        Ok(())
    }

    async fn configure_log_group(&self, request: &LogSecurityRequest) -> Result<()> {
        self.calls
            .lock()
            .await
            .push(format!("configure_log_group {}", request.log_group_name));

        let mut functions = self.functions.lock().await;
        let meta = functions
            .values_mut()
            .find(|m| m.log_group.log_group_name == request.log_group_name);
        if let Some(meta) = meta {
            let log_group = &mut meta.log_group;
            log_group.exists = true;
            if let Some(key) = &request.associate_kms_key {
                log_group.kms_key_id = Some(key.clone());
            }
            if request.disassociate_kms_key {
                log_group.kms_key_id = None;
            }
            if let Some(days) = request.retention_in_days {
                log_group.retention_in_days = Some(days);
            }
        }
        Ok(())
    }

    async fn get_function_metrics(&self, query: &MetricQuery) -> Result<Vec<MetricSeries>> {
        self.queries.lock().await.push(query.clone());
        Ok(self.series.clone())
    }
}

fn meta(name: &str, sha: &str) -> FunctionMeta {
    FunctionMeta {
        configuration: FunctionInfo {
            function_name: name.to_string(),
            code_sha256: sha.to_string(),
            last_modified: "2024-04-30T08:15:00.000+0000".to_string(),
            version: "$LATEST".to_string(),
            state: Some("Active".to_string()),
            code_size: 2048,
            timeout: 30,
            kms_key_arn: None,
        },
        layers: vec![LayerInfo {
            layer_version_arn: "arn:aws:lambda:eu-west-1:123456789012:layer:deps:7".to_string(),
            code_sha256: "layer-sha".to_string(),
            created_date: "2024-04-01T00:00:00.000+0000".to_string(),
        }],
        log_group: LogGroupInfo {
            log_group_name: LogGroupInfo::name_for(name),
            retention_in_days: Some(14),
            kms_key_id: None,
            exists: true,
        },
    }
}

fn entry(name: &str, custom: Option<&str>, secure: bool) -> ManifestEntry {
    ManifestEntry {
        region: "eu-west-1".to_string(),
        account: "123456789012".to_string(),
        function_name: name.to_string(),
        qualifier: None,
        log_retention_days: 90,
        custom_kms_arn: custom.map(str::to_string),
        secure_function: secure,
        secure_log: secure,
    }
}

fn run_config(operation: Operation, output: &str) -> RunConfig {
    RunConfig {
        operation,
        input: "functions.csv".to_string(),
        output: output.to_string(),
        baseline: "$LATEST".to_string(),
        hours: 3,
        period_seconds: 300,
        profile: "default".to_string(),
        region: "eu-west-1".to_string(),
    }
}

fn noon() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_snapshot_then_status_detects_code_change() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().to_str().unwrap().to_string();

    let provider = MockProvider::default();
    provider.insert(meta("orders", "sha-orders-v1")).await;
    let entries = vec![entry("orders", None, false)];

    let engine = SecOpsEngine::new(
        provider.clone(),
        LocalStorage::new(output.clone()),
        run_config(Operation::Snapshot, &output),
    );

    let summary = engine
        .run_entries(Operation::Snapshot, &entries, noon())
        .await
        .unwrap();
    match &summary.report {
        RunReport::Snapshot { written } => assert_eq!(written.len(), 2),
        other => panic!("unexpected report: {:?}", other),
    }
    assert!(temp_dir.path().join("2024-05-01.json").exists());
    assert!(temp_dir.path().join("$LATEST.json").exists());

    let saved: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join("$LATEST.json")).unwrap())
            .unwrap();
    assert_eq!(saved[0]["FunctionName"], "orders");
    assert_eq!(saved[0]["CodeSha256"], "sha-orders-v1");

    // 未變更時全部 OK
    let summary = engine
        .run_entries(Operation::Status, &entries, noon())
        .await
        .unwrap();
    let RunReport::Status(table) = &summary.report else {
        panic!("expected status table");
    };
    assert_eq!(table.rows().len(), 1);
    assert_eq!(table.cell(0, "CodeSha256"), Some("…s-v1 (OK)"));
    assert_eq!(table.cell(0, "Layers"), Some("1 (OK)"));
    assert_eq!(table.cell(0, "LastModified"), Some("2024-04-30T08:15:00.000Z"));
    assert_eq!(table.cell(0, "LogRetention"), Some("14 / 90 (PATCH)"));

    // 部署新版本後與快照不符
    provider.insert(meta("orders", "sha-orders-v2")).await;
    let summary = engine
        .run_entries(Operation::Status, &entries, noon())
        .await
        .unwrap();
    let RunReport::Status(table) = &summary.report else {
        panic!("expected status table");
    };
    assert_eq!(table.cell(0, "CodeSha256"), Some("…s-v2 (NOK)"));
}

#[tokio::test]
async fn test_status_without_baseline_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().to_str().unwrap().to_string();

    let provider = MockProvider::default();
    provider.insert(meta("orders", "sha-orders-v1")).await;

    let engine = SecOpsEngine::new(
        provider,
        LocalStorage::new(output.clone()),
        run_config(Operation::Status, &output),
    );
    let summary = engine
        .run_entries(Operation::Status, &[entry("orders", None, false)], noon())
        .await
        .unwrap();

    let RunReport::Status(table) = &summary.report else {
        panic!("expected status table");
    };
    assert_eq!(table.cell(0, "CodeSha256"), Some("…s-v1 (NOK)"));
    assert_eq!(table.cell(0, "Layers"), Some("1 (NOK)"));
}

#[tokio::test]
async fn test_patch_continues_after_failed_record() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().to_str().unwrap().to_string();

    let provider = MockProvider::default();
    provider.insert(meta("orders", "sha")).await;
    let entries = vec![
        entry("ghost", Some(CUSTOM_KEY), true),
        entry("orders", Some(CUSTOM_KEY), true),
    ];

    let engine = SecOpsEngine::new(
        provider.clone(),
        LocalStorage::new(output.clone()),
        run_config(Operation::Patch, &output),
    );
    let summary = engine
        .run_entries(Operation::Patch, &entries, noon())
        .await
        .unwrap();

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].function_name, "ghost");
    assert_eq!(summary.worst_severity(), Some(ErrorSeverity::Medium));
    match &summary.report {
        RunReport::Patch { patched } => assert_eq!(patched, &vec!["orders".to_string()]),
        other => panic!("unexpected report: {:?}", other),
    }

    assert_eq!(
        provider.calls().await,
        vec![
            format!("update_function_kms_key orders {}", CUSTOM_KEY),
            "configure_log_group /aws/lambda/orders".to_string(),
        ]
    );

    let patched = provider.get_function_meta("orders", None).await.unwrap();
    assert_eq!(patched.configuration.kms_key_arn.as_deref(), Some(CUSTOM_KEY));
    assert_eq!(patched.log_group.kms_key_id.as_deref(), Some(CUSTOM_KEY));
    assert_eq!(patched.log_group.retention_in_days, Some(90));

    // 已符合時再次執行不會再呼叫任何修改
    engine
        .run_entries(Operation::Patch, &entries[1..], noon())
        .await
        .unwrap();
    assert_eq!(provider.calls().await.len(), 2);
}

#[tokio::test]
async fn test_patch_without_any_key_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().to_str().unwrap().to_string();

    let provider = MockProvider::default();
    provider.insert(meta("orders", "sha")).await;

    let engine = SecOpsEngine::new(
        provider.clone(),
        LocalStorage::new(output.clone()),
        run_config(Operation::Patch, &output),
    );
    let summary = engine
        .run_entries(Operation::Patch, &[entry("orders", None, true)], noon())
        .await
        .unwrap();

    assert_eq!(summary.failures.len(), 1);
    assert!(matches!(
        summary.failures[0].error,
        SecOpsError::MissingKmsKeyError { .. }
    ));
    assert_eq!(summary.worst_severity(), Some(ErrorSeverity::Low));
    assert!(provider.calls().await.is_empty());
}

#[tokio::test]
async fn test_check_reports_without_modifying() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().to_str().unwrap().to_string();

    let provider = MockProvider::default();
    provider.insert(meta("orders", "sha")).await;

    let engine = SecOpsEngine::new(
        provider.clone(),
        LocalStorage::new(output.clone()),
        run_config(Operation::Check, &output),
    );
    let summary = engine
        .run_entries(Operation::Check, &[entry("orders", Some(CUSTOM_KEY), true)], noon())
        .await
        .unwrap();

    let RunReport::Check(results) = &summary.report else {
        panic!("expected check report");
    };
    assert_eq!(results.len(), 1);
    let (function_name, findings) = &results[0];
    assert_eq!(function_name, "orders");
    assert_eq!(findings.len(), 3);
    assert!(findings.iter().all(|f| f.verdict == Verdict::Warn));
    let key = findings
        .iter()
        .find(|f| f.concern == Concern::EncryptionKey)
        .unwrap();
    assert_eq!(key.message, "Has KMS custom key id but it is not set");

    assert!(provider.calls().await.is_empty());
}

#[tokio::test]
async fn test_metric_table_from_series() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().to_str().unwrap().to_string();

    let ten = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let eleven = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
    let provider = MockProvider {
        series: vec![
            MetricSeries {
                function_index: 0,
                kind: MetricKind::Invocations,
                timestamps: vec![ten, eleven],
                values: vec![3.0, 2.0],
            },
            MetricSeries {
                function_index: 0,
                kind: MetricKind::Duration,
                timestamps: vec![ten],
                values: vec![120.5],
            },
        ],
        ..Default::default()
    };

    let engine = SecOpsEngine::new(
        provider.clone(),
        LocalStorage::new(output.clone()),
        run_config(Operation::Metric, &output),
    );
    let summary = engine
        .run_entries(Operation::Metric, &[entry("orders", None, false)], noon())
        .await
        .unwrap();

    let queries = provider.queries.lock().await.clone();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].function_names, vec!["orders".to_string()]);
    assert_eq!(queries[0].end - queries[0].start, chrono::Duration::hours(3));
    assert_eq!(queries[0].period_seconds, 300);

    let RunReport::Metric(table) = &summary.report else {
        panic!("expected metric table");
    };
    assert_eq!(table.rows().len(), 2);
    assert_eq!(table.cell(0, "Function"), Some("orders"));
    assert_eq!(
        table.cell(0, "DateTime (3 hours ago)"),
        Some("2024-05-01T10:00:00.000Z")
    );
    assert_eq!(table.cell(0, "Invocations"), Some("3 / 5"));
    assert_eq!(table.cell(0, "Duration"), Some("120.50 avg"));
    assert_eq!(table.cell(1, "Invocations"), Some("2 / 5"));
}

#[tokio::test]
async fn test_run_reads_manifest_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join(".snapshot");
    let manifest = temp_dir.path().join("functions.csv");
    std::fs::write(
        &manifest,
        "Region,Account,FunctionName,FunctionVersion,LogRetention,CustomKmsKeyId,SecureFunction,SecureLog\n\
         eu-west-1,123456789012,orders,,30,,false,false\n\
         \n\
         eu-west-1,123456789012,billing,,,,false,false\n",
    )
    .unwrap();

    let provider = MockProvider::default();
    provider.insert(meta("orders", "sha-1")).await;
    provider.insert(meta("billing", "sha-2")).await;

    let mut config = run_config(Operation::Status, output.to_str().unwrap());
    config.input = manifest.to_str().unwrap().to_string();

    let engine = SecOpsEngine::new(
        provider,
        LocalStorage::new(output.to_str().unwrap().to_string()),
        config,
    );
    let summary = engine.run(Operation::Status).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert!(summary.failures.is_empty());
    let RunReport::Status(table) = &summary.report else {
        panic!("expected status table");
    };
    assert_eq!(table.cell(0, "FunctionName"), Some("orders"));
    assert_eq!(table.cell(0, "LogRetention"), Some("14 / 30 (PATCH)"));
    assert_eq!(table.cell(1, "FunctionName"), Some("billing"));
    assert_eq!(table.cell(1, "LogRetention"), Some("14 / 90 (PATCH)"));
}

#[tokio::test]
async fn test_run_rejects_manifest_without_header() {
    let temp_dir = TempDir::new().unwrap();
    let manifest = temp_dir.path().join("functions.csv");
    std::fs::write(&manifest, "eu-west-1,123456789012,orders\n").unwrap();

    let output = temp_dir.path().to_str().unwrap().to_string();
    let mut config = run_config(Operation::Check, &output);
    config.input = manifest.to_str().unwrap().to_string();

    let engine = SecOpsEngine::new(MockProvider::default(), LocalStorage::new(output), config);
    let err = engine.run(Operation::Check).await.unwrap_err();
    assert!(matches!(err, SecOpsError::ManifestError { line: 1, .. }));
}

#[tokio::test]
async fn test_unsupported_retention_fails_only_patch_of_that_record() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join(".snapshot");
    let manifest = temp_dir.path().join("functions.csv");
    std::fs::write(
        &manifest,
        "Region,Account,FunctionName,FunctionVersion,LogRetention,CustomKmsKeyId,SecureFunction,SecureLog\n\
         eu-west-1,123456789012,orders,,45,custom,true,true\n\
         eu-west-1,123456789012,billing,,30,custom,true,true\n",
    )
    .unwrap();

    let provider = MockProvider::default();
    provider.insert(meta("orders", "sha-1")).await;
    provider.insert(meta("billing", "sha-2")).await;

    let mut config = run_config(Operation::Status, output.to_str().unwrap());
    config.input = manifest.to_str().unwrap().to_string();
    let engine = SecOpsEngine::new(
        provider.clone(),
        LocalStorage::new(output.to_str().unwrap().to_string()),
        config,
    );

    // 只讀取的操作照常執行
    let summary = engine.run(Operation::Status).await.unwrap();
    assert!(summary.failures.is_empty());
    let RunReport::Status(table) = &summary.report else {
        panic!("expected status table");
    };
    assert_eq!(table.cell(0, "LogRetention"), Some("14 / 45 (PATCH)"));

    let summary = engine.run(Operation::Check).await.unwrap();
    assert!(summary.failures.is_empty());

    let summary = engine.run(Operation::Patch).await.unwrap();
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].function_name, "orders");
    assert!(matches!(
        summary.failures[0].error,
        SecOpsError::InvalidConfigValueError { .. }
    ));
    match &summary.report {
        RunReport::Patch { patched } => assert_eq!(patched, &vec!["billing".to_string()]),
        other => panic!("unexpected report: {:?}", other),
    }
    assert!(provider
        .calls()
        .await
        .iter()
        .all(|call| !call.contains("orders")));
}

use crate::core::metrics::{query_batches, SeriesCollector};
use crate::core::policy::grant_logs_access;
use crate::core::CloudProvider;
use crate::domain::model::{
    FunctionInfo, FunctionMeta, LayerInfo, LogGroupInfo, LogSecurityRequest, MetricKind,
    MetricQuery, MetricSeries,
};
use crate::utils::error::{Result, SecOpsError};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{Dimension, Metric, MetricDataQuery, MetricStat, ScanBy};
use aws_sdk_lambda::config::Region;
use aws_sdk_lambda::error::DisplayErrorContext;

const KEY_POLICY_NAME: &str = "default";
const LAMBDA_NAMESPACE: &str = "AWS/Lambda";

fn sdk_error<E: std::error::Error>(operation: &str, err: E) -> SecOpsError {
    SecOpsError::provider(operation, DisplayErrorContext(err))
}

/// 以 AWS SDK 實作的雲端操作
#[derive(Debug, Clone)]
pub struct AwsProvider {
    region: String,
    lambda: aws_sdk_lambda::Client,
    logs: aws_sdk_cloudwatchlogs::Client,
    cloudwatch: aws_sdk_cloudwatch::Client,
    kms: aws_sdk_kms::Client,
}

impl AwsProvider {
    /// 以指定的 profile 與區域建立各服務的 client
    pub async fn connect(profile: &str, region: &str) -> Self {
        tracing::debug!(profile, region, "Loading AWS configuration");
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            region: region.to_string(),
            lambda: aws_sdk_lambda::Client::new(&shared_config),
            logs: aws_sdk_cloudwatchlogs::Client::new(&shared_config),
            cloudwatch: aws_sdk_cloudwatch::Client::new(&shared_config),
            kms: aws_sdk_kms::Client::new(&shared_config),
        }
    }

    async fn get_layer(&self, arn: &str) -> Result<LayerInfo> {
        let output = self
            .lambda
            .get_layer_version_by_arn()
            .arn(arn)
            .send()
            .await
            .map_err(|e| sdk_error("GetLayerVersionByArn", e))?;

        Ok(LayerInfo {
            layer_version_arn: output.layer_version_arn().unwrap_or(arn).to_string(),
            code_sha256: output
                .content()
                .and_then(|c| c.code_sha256())
                .unwrap_or_default()
                .to_string(),
            created_date: output.created_date().unwrap_or_default().to_string(),
        })
    }

    async fn get_log_group(&self, function_name: &str) -> Result<LogGroupInfo> {
        let log_group_name = LogGroupInfo::name_for(function_name);
        let output = self
            .logs
            .describe_log_groups()
            .log_group_name_prefix(&log_group_name)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeLogGroups", e))?;

        let found = output
            .log_groups()
            .iter()
            .find(|group| group.log_group_name() == Some(log_group_name.as_str()));

        Ok(match found {
            Some(group) => LogGroupInfo {
                log_group_name,
                retention_in_days: group.retention_in_days(),
                kms_key_id: group.kms_key_id().map(str::to_string),
                exists: true,
            },
            None => LogGroupInfo {
                log_group_name,
                ..Default::default()
            },
        })
    }

    /// CloudWatch Logs 需要 key policy 授權才能使用該 key
    async fn ensure_logs_key_access(&self, key_arn: &str) -> Result<()> {
        let output = self
            .kms
            .get_key_policy()
            .key_id(key_arn)
            .policy_name(KEY_POLICY_NAME)
            .send()
            .await
            .map_err(|e| sdk_error("GetKeyPolicy", e))?;

        let policy = output.policy().unwrap_or("{}");
        if let Some(updated) = grant_logs_access(policy, &self.region)? {
            tracing::info!(key = key_arn, "Granting CloudWatch Logs access to KMS key");
            self.kms
                .put_key_policy()
                .key_id(key_arn)
                .policy_name(KEY_POLICY_NAME)
                .policy(updated)
                .send()
                .await
                .map_err(|e| sdk_error("PutKeyPolicy", e))?;
        }
        Ok(())
    }

    fn build_queries(batch: &[(usize, &str)], period_seconds: i32) -> Vec<MetricDataQuery> {
        let mut queries = Vec::with_capacity(batch.len() * MetricKind::ALL.len());

        for (index, function_name) in batch {
            for kind in MetricKind::ALL {
                let dimension = Dimension::builder()
                    .name("FunctionName")
                    .value(*function_name)
                    .build();
                let metric = Metric::builder()
                    .namespace(LAMBDA_NAMESPACE)
                    .metric_name(kind.label())
                    .dimensions(dimension)
                    .build();
                let stat = MetricStat::builder()
                    .metric(metric)
                    .period(period_seconds)
                    .stat(kind.statistic())
                    .build();
                queries.push(
                    MetricDataQuery::builder()
                        .id(kind.query_id(*index))
                        .label(kind.label())
                        .metric_stat(stat)
                        .return_data(true)
                        .build(),
                );
            }
        }
        queries
    }
}

#[async_trait]
impl CloudProvider for AwsProvider {
    async fn get_function_meta(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<FunctionMeta> {
        let output = self
            .lambda
            .get_function()
            .function_name(function_name)
            .set_qualifier(qualifier.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_error("GetFunction", e))?;

        let config = output.configuration().ok_or_else(|| {
            SecOpsError::provider("GetFunction", format!("{} has no configuration", function_name))
        })?;

        let configuration = FunctionInfo {
            function_name: config.function_name().unwrap_or(function_name).to_string(),
            code_sha256: config.code_sha256().unwrap_or_default().to_string(),
            last_modified: config.last_modified().unwrap_or_default().to_string(),
            version: config.version().unwrap_or_default().to_string(),
            state: config.state().map(|s| s.as_str().to_string()),
            code_size: config.code_size(),
            timeout: config.timeout().unwrap_or_default(),
            kms_key_arn: config.kms_key_arn().map(str::to_string),
        };

        let mut layers = Vec::new();
        for layer in config.layers() {
            if let Some(arn) = layer.arn() {
                layers.push(self.get_layer(arn).await?);
            }
        }

        let log_group = self.get_log_group(&configuration.function_name).await?;

        Ok(FunctionMeta {
            configuration,
            layers,
            log_group,
        })
    }

    async fn update_function_kms_key(&self, function_name: &str, kms_key_arn: &str) -> Result<()> {
        self.lambda
            .update_function_configuration()
            .function_name(function_name)
            .kms_key_arn(kms_key_arn)
            .send()
            .await
            .map_err(|e| sdk_error("UpdateFunctionConfiguration", e))?;
        tracing::info!(function = function_name, "Function encrypted with custom KMS key");
        Ok(())
    }

    async fn configure_log_group(&self, request: &LogSecurityRequest) -> Result<()> {
        let name = request.log_group_name.as_str();

        if request.create {
            tracing::info!(log_group = name, "Creating log group");
            self.logs
                .create_log_group()
                .log_group_name(name)
                .send()
                .await
                .map_err(|e| sdk_error("CreateLogGroup", e))?;
        }

        if request.disassociate_kms_key {
            tracing::info!(log_group = name, "Removing log group encryption");
            self.logs
                .disassociate_kms_key()
                .log_group_name(name)
                .send()
                .await
                .map_err(|e| sdk_error("DisassociateKmsKey", e))?;
        }

        if let Some(key) = &request.associate_kms_key {
            self.ensure_logs_key_access(key).await?;
            tracing::info!(log_group = name, "Encrypting log group");
            self.logs
                .associate_kms_key()
                .log_group_name(name)
                .kms_key_id(key)
                .send()
                .await
                .map_err(|e| sdk_error("AssociateKmsKey", e))?;
        }

        if let Some(days) = request.retention_in_days {
            tracing::info!(log_group = name, days, "Setting log retention");
            self.logs
                .put_retention_policy()
                .log_group_name(name)
                .retention_in_days(days)
                .send()
                .await
                .map_err(|e| sdk_error("PutRetentionPolicy", e))?;
        }

        Ok(())
    }

    async fn get_function_metrics(&self, query: &MetricQuery) -> Result<Vec<MetricSeries>> {
        let start = AwsDateTime::from_secs(query.start.timestamp());
        let end = AwsDateTime::from_secs(query.end.timestamp());
        let mut collector = SeriesCollector::new();

        for batch in query_batches(&query.function_names) {
            let queries = Self::build_queries(&batch, query.period_seconds);
            let mut next_token: Option<String> = None;

            loop {
                let output = self
                    .cloudwatch
                    .get_metric_data()
                    .set_metric_data_queries(Some(queries.clone()))
                    .start_time(start)
                    .end_time(end)
                    .scan_by(ScanBy::TimestampAscending)
                    .set_next_token(next_token.take())
                    .send()
                    .await
                    .map_err(|e| sdk_error("GetMetricData", e))?;

                for result in output.metric_data_results() {
                    let Some(id) = result.id() else {
                        continue;
                    };
                    let points = result
                        .timestamps()
                        .iter()
                        .zip(result.values())
                        .filter_map(|(timestamp, value)| {
                            chrono::DateTime::from_timestamp(
                                timestamp.secs(),
                                timestamp.subsec_nanos(),
                            )
                            .map(|ts| (ts, *value))
                        });
                    collector.add(id, points);
                }

                next_token = output.next_token().map(str::to_string);
                if next_token.is_none() {
                    break;
                }
            }
        }

        let series = collector.finish();
        tracing::debug!("Received {} metric series", series.len());
        Ok(series)
    }
}

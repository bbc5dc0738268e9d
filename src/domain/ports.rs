use crate::domain::model::{FunctionMeta, LogSecurityRequest, MetricQuery, MetricSeries};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 顯示用的完整路徑
    fn location(&self, path: &str) -> String;
}

/// 執行期設定
pub trait ConfigProvider: Send + Sync {
    fn manifest_path(&self) -> &str;
    fn snapshot_dir(&self) -> &str;
    fn baseline(&self) -> &str;
    fn hours(&self) -> i64;
    fn period_seconds(&self) -> i32;
}

/// 雲端操作介面：取得函數狀態、修改加密與保存設定、查詢指標
#[async_trait]
pub trait CloudProvider: Send + Sync {
    async fn get_function_meta(
        &self,
        function_name: &str,
        qualifier: Option<&str>,
    ) -> Result<FunctionMeta>;

    async fn update_function_kms_key(&self, function_name: &str, kms_key_arn: &str) -> Result<()>;

    async fn configure_log_group(&self, request: &LogSecurityRequest) -> Result<()>;

    async fn get_function_metrics(&self, query: &MetricQuery) -> Result<Vec<MetricSeries>>;
}

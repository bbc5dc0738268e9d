// 外部系統的具體實作
pub mod aws;

pub use aws::AwsProvider;

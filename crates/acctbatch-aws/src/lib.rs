//! AWS adapters for acctbatch.
//!
//! Implements the service traits from `acctbatch-core` on top of the
//! official AWS SDK crates:
//!
//! - [`OrganizationsDirectory`] - AWS Organizations
//! - [`DynamoRecordStore`] - DynamoDB request table
//! - [`ServiceCatalog`] - Service Catalog (Account Factory)
//! - [`BatchFetcher`] - S3 objects and HTTP(S) URLs
//! - [`CfnResponder`] - CloudFormation custom-resource responses

pub mod ack;
pub mod dynamodb;
pub mod organizations;
pub mod servicecatalog;
pub mod source;

pub use ack::CfnResponder;
pub use dynamodb::DynamoRecordStore;
pub use organizations::OrganizationsDirectory;
pub use servicecatalog::ServiceCatalog;
pub use source::BatchFetcher;

/// Load shared SDK configuration from the environment.
///
/// `region` overrides the region from the default provider chain.
pub async fn load_sdk_config(region: Option<&str>) -> aws_config::SdkConfig {
    let mut loader = aws_config::from_env();
    if let Some(region) = region {
        loader = loader.region(aws_config::Region::new(region.to_string()));
    }
    let sdk_config = loader.load().await;

    tracing::info!(
        region = ?sdk_config.region().map(ToString::to_string),
        "AWS SDK configuration loaded"
    );
    sdk_config
}

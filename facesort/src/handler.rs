use std::sync::Arc;

use envconfig::Envconfig;
use lambda_runtime::LambdaEvent;
use serde_json::Value;
use tracing::error;

use crate::api::{LambdaResponse, RunSummary};
use crate::config::Config;
use crate::processor::MatchProcessor;
use crate::rekognition::{FaceComparator, RekognitionComparator};
use crate::s3::{ObjectStore, S3ObjectStore};

/// Lambda entry point. The event payload carries nothing we use, and every
/// outcome, including failure, is reported through the response object, so
/// this never returns `Err`.
pub async fn handle(
    _event: LambdaEvent<Value>,
    s3: &aws_sdk_s3::Client,
    rekognition: &aws_sdk_rekognition::Client,
) -> Result<LambdaResponse, lambda_runtime::Error> {
    Ok(invoke(s3, rekognition).await)
}

/// Read the bucket configuration and run one sorting pass.
pub async fn invoke(
    s3: &aws_sdk_s3::Client,
    rekognition: &aws_sdk_rekognition::Client,
) -> LambdaResponse {
    let config = match Config::init_from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("bucket configuration rejected: {e}");
            return LambdaResponse::failure("Environment variables for bucket names not set");
        }
    };

    let store = Arc::new(S3ObjectStore::new(s3.clone()));
    let comparator = Arc::new(RekognitionComparator::new(
        rekognition.clone(),
        config.reference_bucket.as_str().to_owned(),
        config.database_bucket.as_str().to_owned(),
    ));

    process(&config, store, comparator).await
}

/// Run the processor and map its outcome onto the response contract. Split
/// out from [`invoke`] so tests can drive it with in-memory clients.
pub async fn process(
    config: &Config,
    store: Arc<dyn ObjectStore + Send + Sync>,
    comparator: Arc<dyn FaceComparator + Send + Sync>,
) -> LambdaResponse {
    let processor = MatchProcessor::new(store, comparator, config);

    let report = match processor.run().await {
        Ok(report) => report,
        Err(e) => {
            error!("error processing images: {e}");
            return LambdaResponse::failure(&format!("Error processing images: {e}"));
        }
    };

    match LambdaResponse::success(&RunSummary::from_report(&report)) {
        Ok(response) => response,
        Err(e) => {
            error!("error encoding the run summary: {e}");
            LambdaResponse::failure(&format!("Error processing images: {e}"))
        }
    }
}

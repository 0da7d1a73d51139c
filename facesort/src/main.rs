use std::env;

use anyhow::Context;
use aws_config::BehaviorVersion;
use lambda_runtime::{run, service_fn, Error};
use tracing_subscriber::EnvFilter;

use facesort::handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .json()
        .init();

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3 = aws_sdk_s3::Client::new(&aws_config);
    let rekognition = aws_sdk_rekognition::Client::new(&aws_config);

    if env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        run(service_fn(|event| handler::handle(event, &s3, &rekognition))).await
    } else {
        // Outside the Lambda environment, run one pass against the demo
        // buckets and print the response.
        env::set_var("database_bucket", "facesort-database-bucket-demo");
        env::set_var("reference_bucket", "facesort-reference-bucket-demo");

        let response = handler::invoke(&s3, &rekognition).await;
        let encoded = serde_json::to_string(&response).context("failed to encode the response")?;
        println!("{encoded}");
        Ok(())
    }
}

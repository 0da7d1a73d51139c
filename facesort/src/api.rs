use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::processor::ProcessReport;

/// What the invocation returns to its caller: an API-Gateway-style status
/// code plus a body that is itself a JSON-encoded string.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct LambdaResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl LambdaResponse {
    pub fn success(summary: &RunSummary) -> Result<Self, serde_json::Error> {
        Ok(Self {
            status_code: 200,
            body: serde_json::to_string(summary)?,
        })
    }

    pub fn failure(message: &str) -> Self {
        Self {
            status_code: 500,
            body: json!(message).to_string(),
        }
    }
}

/// Body of a successful run.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub message: String,
    pub matches_found: usize,
    pub reference_images_processed: usize,
    pub database_images_processed: usize,
}

impl RunSummary {
    pub fn from_report(report: &ProcessReport) -> Self {
        Self {
            message: "Image processing complete".to_owned(),
            matches_found: report.matches_found(),
            reference_images_processed: report.reference_images_processed,
            database_images_processed: report.database_images_processed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_body_is_an_encoded_string() {
        let response = LambdaResponse::failure("it broke");

        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, r#""it broke""#);
        assert_eq!(
            serde_json::from_str::<String>(&response.body).unwrap(),
            "it broke"
        );
    }

    #[test]
    fn success_body_decodes_back_to_the_summary() {
        let summary = RunSummary {
            message: "Image processing complete".to_owned(),
            matches_found: 3,
            reference_images_processed: 2,
            database_images_processed: 5,
        };

        let response = LambdaResponse::success(&summary).unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(serde_json::from_str::<RunSummary>(&response.body).unwrap(), summary);
    }

    #[test]
    fn status_code_field_uses_the_camel_case_name() {
        let value = serde_json::to_value(LambdaResponse::failure("nope")).unwrap();

        assert_eq!(value["statusCode"], json!(500));
        assert!(value.get("status_code").is_none());
    }
}

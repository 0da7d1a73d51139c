use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_sdk_rekognition::error::DisplayErrorContext;
use aws_sdk_rekognition::types::{CompareFacesMatch, Image, S3Object};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("comparing {source_key} against {target_key} failed: {message}")]
    Service {
        source_key: String,
        target_key: String,
        message: String,
    },
}

/// One face the comparison service matched in the target image.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    /// Similarity in percent, between 0 and 100.
    pub similarity: f32,
}

/// Compare the largest face of a reference image against every face of a
/// candidate image.
#[async_trait]
pub trait FaceComparator {
    /// Matches the service reported at or above `similarity_threshold`.
    /// An empty vector means the service saw no matching face, which is not
    /// an error.
    async fn compare(
        &self,
        source_key: &str,
        target_key: &str,
        similarity_threshold: f32,
    ) -> Result<Vec<FaceMatch>, CompareError>;
}

/// Comparator backed by Amazon Rekognition. Both images are passed by
/// reference to their bucket objects, so image bytes never move through here.
pub struct RekognitionComparator {
    client: aws_sdk_rekognition::Client,
    reference_bucket: String,
    database_bucket: String,
}

impl RekognitionComparator {
    pub fn new(
        client: aws_sdk_rekognition::Client,
        reference_bucket: String,
        database_bucket: String,
    ) -> Self {
        Self {
            client,
            reference_bucket,
            database_bucket,
        }
    }
}

#[async_trait]
impl FaceComparator for RekognitionComparator {
    async fn compare(
        &self,
        source_key: &str,
        target_key: &str,
        similarity_threshold: f32,
    ) -> Result<Vec<FaceMatch>, CompareError> {
        let source_image = Image::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&self.reference_bucket)
                    .name(source_key)
                    .build(),
            )
            .build();
        let target_image = Image::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&self.database_bucket)
                    .name(target_key)
                    .build(),
            )
            .build();

        let response = self
            .client
            .compare_faces()
            .source_image(source_image)
            .target_image(target_image)
            .similarity_threshold(similarity_threshold)
            .send()
            .await
            .map_err(|e| CompareError::Service {
                source_key: source_key.to_owned(),
                target_key: target_key.to_owned(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(face_matches(response.face_matches()))
    }
}

/// Pull the similarity scores out of the service response. A match without a
/// similarity carries no usable signal and is dropped.
fn face_matches(matches: &[CompareFacesMatch]) -> Vec<FaceMatch> {
    matches
        .iter()
        .filter_map(|m| match m.similarity() {
            Some(similarity) => Some(FaceMatch { similarity }),
            None => {
                error!("dropping face match without a similarity score");
                None
            }
        })
        .collect()
}

/// Comparator for tests, scripted per key pair.
#[derive(Clone, Default)]
pub struct MockFaceComparator {
    matches: HashMap<(String, String), Vec<FaceMatch>>,
    failures: HashSet<(String, String)>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockFaceComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matches(mut self, source_key: &str, target_key: &str, similarities: &[f32]) -> Self {
        self.matches.insert(
            (source_key.to_owned(), target_key.to_owned()),
            similarities
                .iter()
                .map(|similarity| FaceMatch {
                    similarity: *similarity,
                })
                .collect(),
        );
        self
    }

    pub fn with_failure(mut self, source_key: &str, target_key: &str) -> Self {
        self.failures
            .insert((source_key.to_owned(), target_key.to_owned()));
        self
    }

    /// Key pairs compared so far, in request order. Clones of this comparator
    /// share the record.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FaceComparator for MockFaceComparator {
    async fn compare(
        &self,
        source_key: &str,
        target_key: &str,
        _similarity_threshold: f32,
    ) -> Result<Vec<FaceMatch>, CompareError> {
        let pair = (source_key.to_owned(), target_key.to_owned());
        self.calls.lock().unwrap().push(pair.clone());

        if self.failures.contains(&pair) {
            return Err(CompareError::Service {
                source_key: source_key.to_owned(),
                target_key: target_key.to_owned(),
                message: "comparison disabled for this test".to_owned(),
            });
        }

        Ok(self.matches.get(&pair).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_scored_matches_and_drops_unscored_ones() {
        let scored = CompareFacesMatch::builder().similarity(97.5).build();
        let unscored = CompareFacesMatch::builder().build();

        assert_eq!(
            face_matches(&[scored, unscored]),
            vec![FaceMatch { similarity: 97.5 }]
        );
        assert_eq!(face_matches(&[]), vec![]);
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to list objects in bucket {bucket}: {message}")]
    List { bucket: String, message: String },

    #[error("failed to copy {source_key} to {destination_key} in bucket {bucket}: {message}")]
    Copy {
        bucket: String,
        source_key: String,
        destination_key: String,
        message: String,
    },
}

/// Read and duplicate objects in a bucket.
#[async_trait]
pub trait ObjectStore {
    /// Key names from the first page of the bucket listing, in listing order.
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, StoreError>;

    /// Copy an object to another key in the same bucket, leaving the source
    /// object in place.
    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        destination_key: &str,
    ) -> Result<(), StoreError>;
}

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| StoreError::List {
                bucket: bucket.to_owned(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let mut keys = Vec::new();
        for object in response.contents() {
            match object.key() {
                Some(key) => keys.push(key.to_owned()),
                None => error!("skipping listed object without a key in bucket {bucket}"),
            }
        }

        info!("found {} objects in bucket {bucket}", keys.len());
        Ok(keys)
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        destination_key: &str,
    ) -> Result<(), StoreError> {
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(format!("{bucket}/{source_key}"))
            .key(destination_key)
            .send()
            .await
            .map_err(|e| StoreError::Copy {
                bucket: bucket.to_owned(),
                source_key: source_key.to_owned(),
                destination_key: destination_key.to_owned(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    listings: HashMap<String, Vec<String>>,
    unlistable: HashSet<String>,
    fail_copies: bool,
    copies: Arc<Mutex<Vec<CopyRecord>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRecord {
    pub bucket: String,
    pub source_key: String,
    pub destination_key: String,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(mut self, bucket: &str, keys: &[&str]) -> Self {
        self.listings
            .insert(bucket.to_owned(), keys.iter().map(|k| (*k).to_owned()).collect());
        self
    }

    /// Make `list_keys` fail for this bucket.
    pub fn with_unlistable_bucket(mut self, bucket: &str) -> Self {
        self.unlistable.insert(bucket.to_owned());
        self
    }

    /// Make every `copy_object` call fail.
    pub fn with_failing_copies(mut self) -> Self {
        self.fail_copies = true;
        self
    }

    /// Copies recorded so far, in request order. Clones of this store share
    /// the record.
    pub fn copies(&self) -> Vec<CopyRecord> {
        self.copies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, StoreError> {
        if self.unlistable.contains(bucket) {
            return Err(StoreError::List {
                bucket: bucket.to_owned(),
                message: "listing disabled for this test".to_owned(),
            });
        }

        Ok(self.listings.get(bucket).cloned().unwrap_or_default())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        destination_key: &str,
    ) -> Result<(), StoreError> {
        if self.fail_copies {
            return Err(StoreError::Copy {
                bucket: bucket.to_owned(),
                source_key: source_key.to_owned(),
                destination_key: destination_key.to_owned(),
                message: "copies disabled for this test".to_owned(),
            });
        }

        self.copies.lock().unwrap().push(CopyRecord {
            bucket: bucket.to_owned(),
            source_key: source_key.to_owned(),
            destination_key: destination_key.to_owned(),
        });

        Ok(())
    }
}

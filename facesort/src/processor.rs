use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::config::Config;
use crate::rekognition::FaceComparator;
use crate::s3::{ObjectStore, StoreError};

/// Extensions the database listing is narrowed to before any comparison is
/// attempted. Everything else in the bucket is counted but never compared.
const IMAGE_EXTENSIONS: [&str; 6] = [".png", ".jpg", ".jpeg", ".gif", ".bmp", ".webp"];

/// One match recorded against a reference image.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    /// Key of the matching database image.
    pub image: String,
    /// Similarity in percent, as reported by the comparison service.
    pub similarity: f32,
}

/// Outcome of one full pass over the two buckets.
#[derive(Debug)]
pub struct ProcessReport {
    /// Every reference key, mapped to the matches found for it. References
    /// without matches are present with an empty list.
    pub matches: HashMap<String, Vec<MatchRecord>>,
    pub reference_images_processed: usize,
    pub database_images_processed: usize,
}

impl ProcessReport {
    pub fn matches_found(&self) -> usize {
        self.matches.values().map(Vec::len).sum()
    }
}

pub struct MatchProcessor {
    store: Arc<dyn ObjectStore + Send + Sync>,
    comparator: Arc<dyn FaceComparator + Send + Sync>,
    reference_bucket: String,
    database_bucket: String,
    similarity_threshold: f32,
    relocation_threshold: f32,
}

impl MatchProcessor {
    pub fn new(
        store: Arc<dyn ObjectStore + Send + Sync>,
        comparator: Arc<dyn FaceComparator + Send + Sync>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            comparator,
            reference_bucket: config.reference_bucket.as_str().to_owned(),
            database_bucket: config.database_bucket.as_str().to_owned(),
            similarity_threshold: config.similarity_threshold,
            relocation_threshold: config.relocation_threshold,
        }
    }

    /// Compare every reference image against every database image, record the
    /// matches, and copy high-confidence ones into a folder named after the
    /// matching reference.
    ///
    /// A failed comparison only skips its pair. Failed listings and failed
    /// copies abort the run.
    #[instrument(skip_all)]
    pub async fn run(&self) -> Result<ProcessReport, StoreError> {
        let reference_keys = self.store.list_keys(&self.reference_bucket).await?;
        let database_keys = self.store.list_keys(&self.database_bucket).await?;

        let mut matches: HashMap<String, Vec<MatchRecord>> = HashMap::new();

        for reference_key in &reference_keys {
            let records = matches.entry(reference_key.clone()).or_default();

            for database_key in &database_keys {
                if !is_image_key(database_key) {
                    continue;
                }

                let face_matches = match self
                    .comparator
                    .compare(reference_key, database_key, self.similarity_threshold)
                    .await
                {
                    Ok(face_matches) => face_matches,
                    Err(e) => {
                        // No signal for this pair, move on to the next one.
                        error!("error comparing faces: {e}");
                        continue;
                    }
                };

                for face_match in face_matches {
                    let similarity = face_match.similarity;
                    records.push(MatchRecord {
                        image: database_key.clone(),
                        similarity,
                    });
                    info!(
                        "match found: {reference_key} matches {database_key} \
                         with similarity {similarity}%"
                    );

                    if similarity > self.relocation_threshold {
                        self.relocate(reference_key, database_key).await?;
                    }
                }
            }
        }

        Ok(ProcessReport {
            matches,
            reference_images_processed: reference_keys.len(),
            database_images_processed: database_keys.len(),
        })
    }

    /// Copy a database image under `<reference stem>/<database key>` in the
    /// database bucket. The original object stays where it is, so reruns
    /// issue the same copies again.
    async fn relocate(&self, reference_key: &str, database_key: &str) -> Result<(), StoreError> {
        let folder = key_stem(reference_key);
        let destination_key = format!("{folder}/{database_key}");

        self.store
            .copy_object(&self.database_bucket, database_key, &destination_key)
            .await?;

        info!("copied {database_key} to {destination_key}");
        Ok(())
    }
}

fn is_image_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|extension| lowered.ends_with(extension))
}

/// The key without its extension. The extension starts at the last dot of
/// the final path segment, except that dots leading that segment never start
/// one, so hidden-file style names keep their full name.
fn key_stem(key: &str) -> &str {
    let basename_start = key.rfind('/').map_or(0, |slash| slash + 1);
    let basename = &key[basename_start..];

    match basename.rfind('.') {
        Some(dot) if basename[..dot].chars().any(|c| c != '.') => &key[..basename_start + dot],
        _ => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_filter_is_case_insensitive_and_extension_anchored() {
        assert!(is_image_key("holiday.jpg"));
        assert!(is_image_key("holiday.JPG"));
        assert!(is_image_key("scan.webp"));
        assert!(is_image_key("nested/path/photo.jpeg"));

        assert!(!is_image_key("readme.txt"));
        assert!(!is_image_key("no_extension"));
        assert!(!is_image_key("archive.jpg.zip"));
    }

    #[test]
    fn key_stem_drops_the_extension_only() {
        assert_eq!(key_stem("alice.jpg"), "alice");
        assert_eq!(key_stem("people/alice.png"), "people/alice");
        assert_eq!(key_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(key_stem("trailing."), "trailing");
        assert_eq!(key_stem("noext"), "noext");
        assert_eq!(key_stem("dotted.dir/noext"), "dotted.dir/noext");
    }

    #[test]
    fn key_stem_keeps_hidden_file_names_whole() {
        assert_eq!(key_stem(".hidden"), ".hidden");
        assert_eq!(key_stem("..strange"), "..strange");
        assert_eq!(key_stem("a..b"), "a.");
        assert_eq!(key_stem("people/.profile"), "people/.profile");
    }
}

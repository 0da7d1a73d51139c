//! Sort a bucket of photos by the people in them. Every photo in the
//! database bucket is compared against every portrait in the reference
//! bucket with Amazon Rekognition, and confident matches are copied into a
//! folder named after the portrait.

pub mod api;
pub mod config;
pub mod handler;
pub mod processor;
pub mod rekognition;
pub mod s3;

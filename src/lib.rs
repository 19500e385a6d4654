//! music-bootstrap - environment bootstrap for the music subscription demo
//!
//! This crate tears down, provisions, and seeds the demo's cloud resources:
//! - Three DynamoDB tables (`login`, `subscriptions`, `music`) with a GSI
//! - An S3 bucket holding album art fetched from external URLs
//! - Swappable store backends (AWS REST, in-memory dry run)
//!
//! WARNING: the teardown stage deletes EVERY table and EVERY bucket in the
//! target account/region, not just this workflow's own resources. Point it
//! at a throwaway development account only.

pub mod aws;
pub mod config;
pub mod fetch;
pub mod object_store;
pub mod table_store;
pub mod workflow;

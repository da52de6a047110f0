//! bucketjanitor — indexes an S3-compatible bucket to find duplicate
//! objects and naming anomalies, then emits review-able shell scripts
//! for the operator to run.
//!
//! The library is organized around the data flow from the design doc:
//! [`scanner`] reconciles a live listing into [`store`], [`fingerprint`]
//! resolves duplicates over the index (driving [`hasher`] for the
//! multipart wave), and [`report`]/[`script`] render the results.
//! [`normalize`], [`retention`], and [`rename`] are pure supporting
//! modules; [`transport`] and [`media`] are the external collaborators
//! (object store, tag parsing); [`error`] and [`progress`] are shared
//! ambient plumbing.

pub mod error;
pub mod fingerprint;
pub mod hasher;
pub mod media;
pub mod normalize;
pub mod progress;
pub mod rename;
pub mod report;
pub mod retention;
pub mod scanner;
pub mod script;
pub mod store;
pub mod transport;
pub mod types;

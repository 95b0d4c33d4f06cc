//! # jar-mavenizer
//!
//! Finds the Maven coordinates (groupId, artifactId, version) of jar files that
//! were copied around without their build metadata.
//!
//! - `ingest` walks a jar once, hashing every entry and collecting the manifest,
//!   embedded POM files and class entries.
//! - `extract` turns each evidence source into scored candidate values and
//!   `candidate` aggregates them per component.
//! - `verify` downloads the best candidates from remote repositories through a
//!   `repository::RepositoryClient` and compares digests.
//! - `select` picks the final coordinate automatically or asks the operator, and
//!   `report` writes the JSON result.

pub mod analyze;
pub mod candidate;
pub mod cli;
pub mod config;
pub mod coordinate;
pub mod extract;
pub mod ingest;
pub mod manifest;
pub mod patterns;
pub mod print;
pub mod remote;
pub mod report;
pub mod repository;
pub mod scan;
pub mod select;
pub mod settings;
pub mod verify;

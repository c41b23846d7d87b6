//! # Riparian Parallel
//!
//! Bounded, order-preserving parallel processing.
//!
//! This crate provides:
//! - `Workers`: the degree-of-parallelism setting (`auto` or a fixed count)
//! - `ChunkScheduler`: contiguous chunking of a slice over a rayon pool,
//!   with results merged in input order and fail-fast error propagation

pub mod chunked;
pub mod strategy;

pub use chunked::{chunk_ranges, ChunkScheduler};
pub use strategy::{num_cpus, Workers};

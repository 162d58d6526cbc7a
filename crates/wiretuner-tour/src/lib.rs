//! Deterministic stress harness for the document engine's replay path.
//!
//! # Overview
//!
//! This crate is not a benchmark suite in the criterion sense -- it is a
//! fixture generator plus a timing harness that proves replay performance
//! against spec §4.6's targets on a realistic, reproducible event stream.
//! Same seed, same event count → the same fixture, always.
//!
//! # Pipeline
//!
//! ```text
//! generate (deterministic events + periodic snapshots) → replay → measure
//! ```

pub mod bench;
pub mod fixture;

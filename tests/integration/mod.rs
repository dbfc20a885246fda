//! Integration test suite for duplex.
//!
//! These tests drive whole pipelines against disposable project trees,
//! with every external tool replaced by a small stand-in binary
//! (`true`, `false`, `touch`), so no real compiler, installer, or
//! browser is needed.
//!
//! # Test Categories
//!
//! - `ordering`: task-graph ordering guarantees over randomized graphs
//! - `pipeline_e2e`: full build/test pipelines end to end
//! - `stamping`: version stamping filesystem properties

mod fixtures;

mod ordering;
mod pipeline_e2e;
mod stamping;

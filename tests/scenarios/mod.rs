//! Scenario-based tests for sara

mod batch_partition;
mod capture_replay;
mod failure_handling;
mod sweep_generation;

// ABOUTME: Library root for shipout - exposes public modules for testing.
// ABOUTME: The main binary is in main.rs.

pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod output;
pub mod process;
pub mod provider;
pub mod repo;
pub mod report;
pub mod run;

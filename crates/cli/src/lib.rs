//! `stockguard` command-line collaborators: synthetic data, reporting and
//! reset. Everything here drives `stockguard-infra`; none of it bypasses the
//! core for stock changes.

pub mod commands;
pub mod generator;
pub mod simulation;

//! Subcommand handlers

pub mod about;
pub mod dataset;
pub mod evaluate;
pub mod predict;
pub mod rank;

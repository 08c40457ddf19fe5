//! Command handlers

pub mod datasets;
pub mod examples;
pub mod run;

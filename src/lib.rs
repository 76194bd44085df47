//! Command line front end of aiteam.

pub mod commands;
pub mod config;

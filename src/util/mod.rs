//! Utility modules: string helpers, configuration and logging

pub mod config;
pub mod logger;
pub mod string;

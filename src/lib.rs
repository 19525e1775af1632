//! `q`: maps short command-line commands to prompt templates, sends them to a
//! language model and keeps a running conversation between invocations.

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;

// src/core/mod.rs

pub mod arg_parser;
pub mod conversation_store;
pub mod overwrite;
pub mod paths;
pub mod prompt_builder;
pub mod registry;
pub mod response_processor;
pub mod settings;

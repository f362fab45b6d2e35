pub mod error;
pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod prompt_builder;
pub mod prompts;

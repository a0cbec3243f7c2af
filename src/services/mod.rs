pub mod chunker;
pub mod generator;
pub mod llm_provider;
pub mod pdf;
pub mod pipeline;
pub mod prompts;
pub mod text_extract;

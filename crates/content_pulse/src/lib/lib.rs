pub mod discovery;
mod error;
mod llm;
pub mod media;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod patch;
mod processor;
pub mod server;
pub mod social;
pub mod tracing;
pub mod types;
pub mod yt;

pub use error::Error;
pub use llm::{anthropic, gemini, tokens};
pub use llm::{copywriter::Copywriter, summarizer::Summarizer};
pub use processor::{builder::ContentPipelineBuilder, ArtifactGenerator, ContentPipeline};

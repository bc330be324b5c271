pub mod anthropic;
pub mod copywriter;
pub mod gemini;
pub mod model;
pub mod summarizer;
pub mod tokens;

#![allow(dead_code)]

pub mod copywriter;
pub mod image_generator;
pub mod lister;
pub mod media_host;
pub mod publisher;
pub mod queue_store;
pub mod summarizer;
pub mod transcript;

pub mod encoder;
pub mod llm;
pub mod network;

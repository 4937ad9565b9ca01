pub mod content_parser;
pub mod label_validator;
pub mod llm_service;
pub mod prompts;
pub mod recognition;

pub use content_parser::parse_sections;
pub use label_validator::{Correction, LabelValidator, ValidatedText};
pub use llm_service::LlmService;
pub use recognition::{RecognitionModel, RetryPolicy, RetryingModel};

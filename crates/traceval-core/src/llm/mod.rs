//! Direct language-model targets

mod openai;

pub use openai::OpenAiModel;

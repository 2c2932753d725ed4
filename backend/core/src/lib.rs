pub mod error;
pub mod traits;

pub use error::ChatError;
pub use traits::{
    CompletionBackend, CompletionRequest, CompletionResponse, GenerationParams, LineSource,
};

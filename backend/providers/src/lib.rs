pub mod azure;
mod chat_api;
pub mod error;
pub mod mock;
pub mod openai;
pub mod retry;
pub mod service;

pub use azure::AzureOpenAiBackend;
pub use error::{is_transient, ProviderError};
pub use mock::MockBackend;
pub use openai::OpenAiBackend;
pub use retry::{RetryPolicy, RetryingBackend};
pub use service::{build_backend, AiService, ServiceSettings};

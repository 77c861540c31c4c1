// Public modules
pub mod chat_message;
pub mod chat_request;
pub mod chat_response;
pub mod end_session_response;
pub mod review_summary;
pub mod role;
pub mod sender;
pub mod session_request;
pub mod start_response;
pub mod theme;
pub mod thread_id;

// Re-exports
pub use chat_message::{Message, RenderedAs};
pub use chat_request::ChatRequest;
pub use chat_response::ChatResponse;
pub use end_session_response::EndSessionResponse;
pub use review_summary::ReviewSummary;
pub use role::Role;
pub use sender::Sender;
pub use session_request::SessionRequest;
pub use start_response::StartResponse;
pub use theme::Theme;
pub use thread_id::ThreadId;

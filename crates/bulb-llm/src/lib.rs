pub mod error;
pub mod model;
pub mod request;
pub mod response;
pub mod stream;

pub use error::Error;
pub use model::{ChatBackend, ChatModel};
pub use request::{ChatRequest, Message, MessageId, Role};
pub use response::Response;
pub use stream::StreamEvent;

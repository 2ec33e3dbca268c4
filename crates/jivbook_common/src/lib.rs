pub mod error;
pub mod http;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used items
pub use error::{HttpStatusCode, JivbookError};
pub use services::{BoxFuture, BoxedError};

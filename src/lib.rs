pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod render;
pub mod router;
pub mod service;
pub mod store;
pub mod types;

pub use error::VerseError;
pub use render::VerseRenderer;
pub use service::VerseService;
pub use store::{ContentStore, GithubStore, MemoryStore};

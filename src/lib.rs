pub mod config;
pub mod error;
pub mod invoker;
pub mod manager;
pub mod models;
pub mod normalize;
pub mod routes;

pub use config::Config;
pub use error::{LessonError, Result};
pub use manager::LessonManager;
pub use routes::{router, AppState};

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod schema;
pub mod session;
pub mod store;
pub mod table;
pub mod tracing;

pub use error::{DatagenError, Result};

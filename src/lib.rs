//! facetsync command line application
//!
//! Exposes modules for integration testing

pub mod cli;
pub mod config;
pub mod page;
pub mod session;

pub use config::AppConfig;
pub use page::{load_page, LoadedPage};
pub use session::PageSession;

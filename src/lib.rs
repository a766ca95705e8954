pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod display;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fx;
pub mod history;
pub mod host;
pub mod messages;
pub mod normalize;
pub mod observer;
pub mod page_facts;
pub mod price;
pub mod record;
pub mod resolve;
pub mod store;

pub use error::{LensError, Result};

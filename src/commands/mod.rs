//! Command implementations for the artbook CLI

mod history;
mod inspect;
mod misc;

pub use history::*;
pub use inspect::*;
pub use misc::*;

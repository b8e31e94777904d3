pub mod ai_client;
pub mod backend;
pub mod codes;
pub mod content;
pub mod editor;
pub mod error;
pub mod export;
pub mod extract;
pub mod kit;
pub mod logging;
pub mod notice;
pub mod settings;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use error::{KitError, Result};
pub use notice::Notice;

pub mod engine;
pub mod error;
pub mod packer;
pub mod render;
pub mod score;
pub mod stock;
pub mod types;

pub use engine::PackEngine;
pub use error::{PackError, Result};

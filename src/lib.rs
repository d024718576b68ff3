pub mod diagram;
pub mod error;
pub mod fonts;
pub mod theme;
pub mod xml;

pub use error::{Error, Result};

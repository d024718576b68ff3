//! Register-allocation diagrams: dump model, layout, and SVG output.

pub mod edges;
pub mod geometry;
pub mod grid;
pub mod highlight;
pub mod listing;
pub mod parser;
pub mod render;
pub mod segment;
pub mod types;

pub use highlight::{Highlighter, TagIndex, Target};
pub use parser::{parse_dump, validate};
pub use render::{render_document, RenderOptions, Renderer};
pub use types::{Block, Dump, Instruction, Interval};

//! Mapping from logical diagram coordinates (column, row, block) to SVG
//! user units. Pure arithmetic over the theme's spacing constants.

use super::types::Block;
use crate::theme::Spacing;

/// Axis-aligned rectangle in SVG user units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Geometry of one diagram: spacing plus the number of interval rows
#[derive(Debug, Clone, Copy)]
pub struct Geometry<'a> {
    spacing: &'a Spacing,
    rows: usize,
}

impl<'a> Geometry<'a> {
    pub fn new(spacing: &'a Spacing, rows: usize) -> Self {
        Self { spacing, rows }
    }

    pub fn spacing(&self) -> &'a Spacing {
        self.spacing
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Left edge of column `col`
    pub fn column_x(&self, col: usize) -> f32 {
        self.spacing.offset_left + col as f32 * self.spacing.cell_width
    }

    /// Top edge of interval row `row`
    pub fn row_y(&self, row: usize) -> f32 {
        self.spacing.offset_top + self.spacing.block_title_height + row as f32 * self.spacing.cell_height
    }

    /// Width of the cell at `col`; the last cell of a run gives up the padding.
    pub fn cell_width(&self, col: usize, run_end: usize) -> f32 {
        if col + 1 == run_end {
            self.spacing.cell_width - self.spacing.cell_padding_x
        } else {
            self.spacing.cell_width
        }
    }

    pub fn cell_height(&self) -> f32 {
        self.spacing.cell_height - self.spacing.cell_padding_y
    }

    /// Width of a run of cells `start..end`, padded at the right edge
    pub fn span_width(&self, start: usize, end: usize) -> f32 {
        (end - start) as f32 * self.spacing.cell_width - self.spacing.cell_padding_x
    }

    /// Every block is tall enough to host the full interval grid. `rows`
    /// counts families: split fragments share their parent's row.
    pub fn block_height(&self) -> f32 {
        self.spacing.block_title_height
            + self.rows as f32 * self.spacing.cell_height
            + self.spacing.block_radius
    }

    pub fn block_rect(&self, block: &Block) -> Rect {
        Rect::new(
            self.column_x(block.start),
            self.spacing.offset_top,
            self.span_width(block.start, block.end),
            self.block_height(),
        )
    }

    /// Baseline of the block title
    pub fn title_y(&self) -> f32 {
        self.spacing.offset_top + self.spacing.block_title_height / 2.0
    }
}

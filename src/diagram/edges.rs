use std::f32::consts::E;

use log::trace;

use super::geometry::Geometry;
use super::types::{Block, Dump};

/// Arrow endpoint: position plus the loop depth of the block it sits on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
    pub depth: u32,
}

/// Cubic Bezier of one control-flow edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCurve {
    pub start: (f32, f32),
    pub control1: (f32, f32),
    pub control2: (f32, f32),
    pub end: (f32, f32),
    pub bulge: f32,
}

impl EdgeCurve {
    pub fn path_data(&self) -> String {
        format!(
            "M {:.2} {:.2} C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}",
            self.start.0,
            self.start.1,
            self.control1.0,
            self.control1.1,
            self.control2.0,
            self.control2.1,
            self.end.0,
            self.end.1
        )
    }

    /// Lowest point the curve can reach (it stays inside its control hull).
    pub fn max_y(&self) -> f32 {
        self.start
            .1
            .max(self.end.1)
            .max(self.control1.1)
            .max(self.control2.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutedEdge {
    pub from_block: usize,
    pub to_block: usize,
    pub curve: EdgeCurve,
}

/// Fall-through is positional: the successor is the next block by id.
pub fn is_fall_through(from: &Block, to: &Block) -> bool {
    to.id == from.id + 1
}

pub struct EdgeRouter<'a> {
    geometry: Geometry<'a>,
}

impl<'a> EdgeRouter<'a> {
    pub fn new(geometry: Geometry<'a>) -> Self {
        Self { geometry }
    }

    /// Anchors of the arrow between `from` and `to`.
    ///
    /// Fall-through edges leave the right edge of the source and enter the
    /// left edge of the target, lifted by half the block height. Other edges
    /// leave the bottom-right corner of the source and land on the middle of
    /// the target's bottom edge.
    pub fn anchors(&self, from: &Block, to: &Block) -> (Anchor, Anchor) {
        let src = self.geometry.block_rect(from);
        let dst = self.geometry.block_rect(to);
        let radius = self.geometry.spacing().block_radius;

        let (offset, end_x) = if is_fall_through(from, to) {
            (src.height / 2.0, dst.x)
        } else {
            (0.0, dst.center_x())
        };

        (
            Anchor {
                x: src.right(),
                y: src.bottom() + radius - offset,
                depth: from.loop_depth,
            },
            Anchor {
                x: end_x,
                y: dst.bottom() + radius - offset,
                depth: to.loop_depth,
            },
        )
    }

    /// Vertical displacement of both control points from the chord midpoint.
    ///
    /// Grows with the loop depth both ends share, so back edges of inner
    /// loops swing wider than the edges around them.
    pub fn bulge(&self, from: &Anchor, to: &Anchor, dx: f32) -> f32 {
        let shared_depth = from.depth.min(to.depth);
        let depth_factor = (E * (1.0 + shared_depth as f32)).ln();
        let distance_factor = (dx.abs() + 1.0).ln();
        4.0 * depth_factor * distance_factor
    }

    pub fn curve(&self, from: Anchor, to: Anchor) -> EdgeCurve {
        let bulge = self.bulge(&from, &to, to.x - from.x);
        let arrow = self.geometry.spacing().arrow_width;

        // Leave room for the arrowhead at the target
        let (mut x1, mut x2) = (from.x, to.x);
        if x2 > x1 {
            x2 -= arrow;
            if x1 > x2 {
                x1 -= arrow;
            }
        } else {
            x2 += arrow;
            if x1 < x2 {
                x1 += arrow;
            }
        }

        let span = x2 - x1;
        let mid_y = (from.y + to.y) / 2.0 + bulge;

        EdgeCurve {
            start: (x1, from.y),
            control1: (x1 + span / 4.0, mid_y),
            control2: (x1 + span * 3.0 / 4.0, mid_y),
            end: (x2, to.y),
            bulge,
        }
    }

    /// Every edge, in block-then-successor order
    pub fn route(&self, dump: &Dump) -> Vec<RoutedEdge> {
        let mut edges = Vec::new();
        for block in &dump.blocks {
            for succ in &block.successors {
                let target = &dump.blocks[*succ];
                let (from, to) = self.anchors(block, target);
                let curve = self.curve(from, to);
                trace!(
                    "edge {} -> {}: bulge {:.2}, {}",
                    block.id,
                    target.id,
                    curve.bulge,
                    curve.path_data()
                );
                edges.push(RoutedEdge {
                    from_block: block.id,
                    to_block: target.id,
                    curve,
                });
            }
        }
        edges
    }
}

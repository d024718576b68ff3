//! Blocks and the interval grid.
//!
//! Each top-level interval gets one row, shared with the fragments it was
//! split into. A row is drawn in three layers: background cells (one per
//! column of every block, tagged with the fragment owning that column),
//! live ranges (one rect per range, colored by `physical`) and use markers.

use log::debug;

use super::geometry::{Geometry, Rect};
use super::highlight::tag_class;
use super::segment::Families;
use super::types::{Dump, InstrId, IntervalId, UseKind};
use crate::theme::Theme;
use crate::xml::escape_xml;

#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    Background,
    Range { physical: bool },
    Use(UseKind),
}

impl CellKind {
    fn color_key(&self) -> &'static str {
        match self {
            CellKind::Background => "interval:empty",
            CellKind::Range { physical: true } => "interval:physical",
            CellKind::Range { physical: false } => "interval:normal",
            CellKind::Use(UseKind::Any) => "use:any",
            CellKind::Use(UseKind::Register) => "use:register",
            CellKind::Use(UseKind::Fixed(_)) => "use:fixed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub kind: CellKind,
    pub rect: Rect,
    pub row: IntervalId,
    pub col: Option<InstrId>,
}

impl GridCell {
    /// Range rects let the pointer through to the background cells below.
    pub fn is_transparent_to_pointer(&self) -> bool {
        matches!(self.kind, CellKind::Range { .. })
    }
}

/// Cells of every row, top to bottom, layered per row.
pub fn layout_grid(dump: &Dump, families: &Families<'_>, geometry: &Geometry<'_>) -> Vec<GridCell> {
    let mut cells = Vec::new();
    let height = geometry.cell_height();

    for (row, family) in families.iter().enumerate() {
        let y = geometry.row_y(row);

        for block in &dump.blocks {
            for col in block.start..block.end {
                cells.push(GridCell {
                    kind: CellKind::Background,
                    rect: Rect::new(geometry.column_x(col), y, geometry.cell_width(col, block.end), height),
                    row: family.owner_at(col),
                    col: Some(col),
                });
            }
        }

        for member in &family.members {
            for range in &member.ranges {
                cells.push(GridCell {
                    kind: CellKind::Range {
                        physical: member.physical,
                    },
                    rect: Rect::new(
                        geometry.column_x(range.start),
                        y,
                        geometry.span_width(range.start, range.end),
                        height,
                    ),
                    row: member.id,
                    col: None,
                });
            }
        }

        for member in &family.members {
            for use_ in &member.uses {
                cells.push(GridCell {
                    kind: CellKind::Use(use_.kind.clone()),
                    rect: Rect::new(geometry.column_x(use_.pos), y, geometry.spacing().use_width, height),
                    row: member.id,
                    col: Some(use_.pos),
                });
            }
        }
    }

    debug!("grid: {} rows, {} cells", families.len(), cells.len());
    cells
}

pub fn render_blocks(dump: &Dump, geometry: &Geometry<'_>, theme: &Theme) -> String {
    let spacing = geometry.spacing();
    let mut svg = String::new();

    for block in &dump.blocks {
        let rect = geometry.block_rect(block);
        svg.push_str(&format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" ry="{:.2}" fill="{}" />"#,
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            spacing.block_radius,
            spacing.block_radius,
            theme.color("block:fill")
        ));
        svg.push('\n');
        svg.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" dominant-baseline="middle" font-family="{}" fill="{}">{}</text>"#,
            rect.x + spacing.block_radius,
            geometry.title_y(),
            escape_xml(&spacing.font_family),
            theme.color("block:title"),
            block.id
        ));
        svg.push('\n');
    }

    svg
}

pub fn render_grid(cells: &[GridCell], theme: &Theme) -> String {
    let mut svg = String::new();

    for cell in cells {
        let kind = match &cell.kind {
            CellKind::Use(UseKind::Fixed(Some(location))) => {
                format!(r#" data-use="fixed" data-location="{}""#, escape_xml(location))
            }
            CellKind::Use(kind) => format!(r#" data-use="{}""#, kind.name()),
            _ => String::new(),
        };
        let pointer = if cell.is_transparent_to_pointer() {
            r#" pointer-events="none""#
        } else {
            ""
        };

        svg.push_str(&format!(
            r#"<rect class="{}" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"{}{} />"#,
            tag_class(Some(cell.row), cell.col),
            cell.rect.x,
            cell.rect.y,
            cell.rect.width,
            cell.rect.height,
            theme.color(cell.kind.color_key()),
            kind,
            pointer
        ));
        svg.push('\n');
    }

    svg
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::diagram::types::{Block, Interval, IntervalValue, LiveRange, Use};
    use crate::theme::Spacing;

    fn block(id: usize, start: usize, end: usize, successors: Vec<usize>) -> Block {
        Block {
            id,
            start,
            end,
            successors,
            loop_depth: 0,
        }
    }

    fn interval(id: IntervalId, ranges: &[(usize, usize)]) -> Interval {
        Interval {
            id,
            value: IntervalValue::Virtual,
            physical: false,
            parent: None,
            children: vec![],
            ranges: ranges.iter().map(|(s, e)| LiveRange::new(*s, *e)).collect(),
            uses: vec![],
        }
    }

    fn two_blocks(intervals: Vec<Interval>) -> Dump {
        Dump {
            blocks: vec![block(0, 0, 2, vec![1]), block(1, 2, 4, vec![])],
            intervals,
            instructions: BTreeMap::new(),
        }
    }

    #[test]
    fn test_unsplit_range_spans_both_blocks() {
        let dump = two_blocks(vec![interval(0, &[(0, 4)])]);
        let families = Families::new(&dump);
        let spacing = Spacing::default();
        let geometry = Geometry::new(&spacing, dump.row_count());
        let cells = layout_grid(&dump, &families, &geometry);

        let ranges: Vec<&GridCell> = cells
            .iter()
            .filter(|c| matches!(c.kind, CellKind::Range { .. }))
            .collect();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].rect.x, 8.0);
        assert_eq!(ranges[0].rect.width, 62.0);
        assert!(!cells.iter().any(|c| matches!(c.kind, CellKind::Use(_))));

        let backgrounds: Vec<&GridCell> = cells
            .iter()
            .filter(|c| c.kind == CellKind::Background)
            .collect();
        assert_eq!(backgrounds.len(), 4);
        // Last cell of each block is narrowed.
        let widths: Vec<f32> = backgrounds.iter().map(|c| c.rect.width).collect();
        assert_eq!(widths, vec![16.0, 14.0, 16.0, 14.0]);
    }

    #[test]
    fn test_split_family_shares_one_row() {
        let mut parent = interval(5, &[(0, 2)]);
        parent.children = vec![6];
        let mut child = interval(6, &[(2, 4)]);
        child.parent = Some(5);
        child.physical = true;
        child.uses.push(Use {
            pos: 3,
            kind: UseKind::Register,
            group: None,
        });
        let dump = two_blocks(vec![parent, child]);
        let families = Families::new(&dump);
        let spacing = Spacing::default();
        let geometry = Geometry::new(&spacing, dump.row_count());
        let cells = layout_grid(&dump, &families, &geometry);

        assert!(cells.iter().all(|c| c.rect.y == geometry.row_y(0)));
        assert_eq!(geometry.block_height(), 24.0 + 16.0 + 3.0);
        let owners: Vec<IntervalId> = cells
            .iter()
            .filter(|c| c.kind == CellKind::Background)
            .map(|c| c.row)
            .collect();
        assert_eq!(owners, vec![5, 5, 6, 6]);

        let svg = render_grid(&cells, &Theme::default());
        assert!(svg.contains(r##"class="r-6" x="40.00" y="56.00" width="30.00" height="14.00" fill="#FD6218" pointer-events="none""##));
        assert!(svg.contains(r##"class="r-6 c-3" x="56.00" y="56.00" width="5.00" height="14.00" fill="#BCDD70" data-use="register""##));
    }

    #[test]
    fn test_blocks_have_titles() {
        let dump = two_blocks(vec![interval(0, &[(0, 1)])]);
        let spacing = Spacing::default();
        let geometry = Geometry::new(&spacing, 1);
        let svg = render_blocks(&dump, &geometry, &Theme::default());

        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(svg.contains(r##"<rect x="8.00" y="32.00" width="30.00" height="43.00" rx="3.00" ry="3.00" fill="#4CBFCB" />"##));
        assert!(svg.contains(">1</text>"));
    }
}

//! Document assembly.

use log::{debug, info};

use super::edges::{EdgeRouter, RoutedEdge};
use super::geometry::Geometry;
use super::grid::{layout_grid, render_blocks, render_grid};
use super::highlight::{operand_rows, script_source};
use super::listing::{layout_listing, render_listing};
use super::segment::Families;
use super::types::Dump;
use crate::error::Result;
use crate::fonts::TextMeasure;
use crate::theme::Theme;
use crate::xml::{cdata, escape_xml};

/// Swatches of the legend: label and theme color key
const LEGEND: &[(&str, &str)] = &[
    ("empty", "interval:empty"),
    ("live", "interval:normal"),
    ("physical", "interval:physical"),
    ("use: any", "use:any"),
    ("use: register", "use:register"),
    ("use: fixed", "use:fixed"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Embed interval metadata and the hover script
    pub interactive: bool,
    pub legend: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            interactive: true,
            legend: false,
        }
    }
}

pub struct Renderer<'a, T: TextMeasure> {
    theme: &'a Theme,
    measure: T,
    options: RenderOptions,
}

impl<'a, T: TextMeasure> Renderer<'a, T> {
    pub fn new(theme: &'a Theme, measure: T, options: RenderOptions) -> Self {
        Self {
            theme,
            measure,
            options,
        }
    }

    pub fn render(&mut self, dump: &Dump) -> Result<String> {
        let theme = self.theme;
        let spacing = &theme.spacing;
        let families = Families::new(dump);
        let geometry = Geometry::new(spacing, families.len());

        let cells = layout_grid(dump, &families, &geometry);
        let edges = EdgeRouter::new(geometry).route(dump);
        let lines = layout_listing(dump, &families, &mut self.measure, spacing.listing_font_size);
        debug!(
            "layout: {} blocks, {} rows, {} edges (max loop depth {}), {} listing lines",
            dump.blocks.len(),
            families.len(),
            edges.len(),
            dump.max_loop_depth(),
            lines.len()
        );

        // Edges hang below the blocks; the listing starts under the lowest one.
        let blocks_bottom = spacing.offset_top + geometry.block_height() + spacing.block_radius;
        let edges_bottom = edges
            .iter()
            .map(|e| e.curve.max_y())
            .fold(blocks_bottom, f32::max);
        let listing_top = edges_bottom + spacing.listing_line_height;
        let listing_bottom = listing_top + lines.len() as f32 * spacing.listing_line_height;

        let mut width = geometry.column_x(dump.column_count()) + spacing.offset_left;
        for line in &lines {
            width = width.max(spacing.offset_left * 2.0 + line.width);
        }

        let legend_top = listing_bottom + spacing.listing_line_height / 2.0;
        let (legend, legend_width) = if self.options.legend {
            self.render_legend(legend_top)
        } else {
            (String::new(), 0.0)
        };
        width = width.max(legend_width);
        let height = if self.options.legend {
            legend_top + spacing.cell_height + spacing.offset_left
        } else {
            listing_bottom + spacing.offset_left
        };

        let mut svg = String::new();
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {:.2} {:.2}" width="{:.2}" height="{:.2}">"#,
            width, height, width, height
        ));
        svg.push('\n');
        svg.push_str(&self.render_defs());
        if let Some(background) = &theme.palette.background {
            svg.push_str(&format!(
                r#"<rect width="100%" height="100%" fill="{}" />"#,
                escape_xml(background)
            ));
            svg.push('\n');
        }
        svg.push_str(&format!(
            r#"<text id="hint" x="{:.2}" y="{:.2}" dominant-baseline="central" xml:space="preserve" font-family="{}" fill="{}"> </text>"#,
            spacing.offset_left,
            spacing.offset_top / 2.0,
            escape_xml(&spacing.font_family),
            theme.color("text")
        ));
        svg.push('\n');
        svg.push_str(&legend);
        svg.push_str(&self.render_data(dump, &families)?);
        svg.push_str(&render_blocks(dump, &geometry, theme));
        svg.push_str(&render_grid(&cells, theme));
        svg.push_str(&self.render_edges(&edges));
        svg.push_str(&render_listing(&lines, listing_top, theme));
        if self.options.interactive {
            svg.push_str(&format!(
                r#"<script type="text/ecmascript">{}</script>"#,
                cdata(&script_source(theme))
            ));
            svg.push('\n');
        }
        svg.push_str("</svg>\n");

        info!(
            "rendered {}x{} diagram ({}, {} bytes)",
            width.ceil(),
            height.ceil(),
            if self.options.interactive { "interactive" } else { "static" },
            svg.len()
        );
        Ok(svg)
    }

    fn render_defs(&self) -> String {
        let theme = self.theme;
        let arrow = theme.spacing.arrow_width;
        format!(
            concat!(
                r#"<defs><marker id="arrow" refX="0" refY="2" fill="{}" markerUnits="strokeWidth" markerWidth="6" markerHeight="6" orient="auto">"#,
                r#"<path d="M 0 0 L {:.2} 2 L 0 4 Z" /></marker></defs>"#,
                "\n<style>text {{ cursor: default; }} rect[class] {{ cursor: crosshair; }}</style>\n"
            ),
            theme.color("arrow"),
            arrow
        )
    }

    /// Instructions always; interval metadata and resolved operand rows
    /// only for the hover script.
    fn render_data(&self, dump: &Dump, families: &Families<'_>) -> Result<String> {
        let mut data = format!("var instructions = {};", serde_json::to_string(&dump.instructions)?);
        if self.options.interactive {
            data.push_str(&format!("\nvar intervals = {};", serde_json::to_string(&dump.intervals)?));
            data.push_str(&format!(
                "\nvar operands = {};",
                serde_json::to_string(&operand_rows(dump, families))?
            ));
        }
        Ok(format!(
            "<script type=\"text/ecmascript\">{}</script>\n",
            cdata(&data)
        ))
    }

    fn render_edges(&self, edges: &[RoutedEdge]) -> String {
        let color = self.theme.color("arrow");
        let mut svg = String::new();
        for edge in edges {
            svg.push_str(&format!(
                r#"<path d="{}" fill="transparent" stroke="{}" stroke-width="2" marker-end="url(#arrow)" pointer-events="none" />"#,
                edge.curve.path_data(),
                color
            ));
            svg.push('\n');
        }
        svg
    }

    fn render_legend(&mut self, top: f32) -> (String, f32) {
        let theme = self.theme;
        let spacing = &theme.spacing;
        let swatch_w = spacing.cell_width - spacing.cell_padding_x;
        let swatch_h = spacing.cell_height - spacing.cell_padding_y;
        let font_size = spacing.listing_font_size;

        let mut svg = String::new();
        let mut x = spacing.offset_left;
        for (label, key) in LEGEND {
            svg.push_str(&format!(
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" />"#,
                x,
                top,
                swatch_w,
                swatch_h,
                theme.color(key)
            ));
            x += spacing.cell_width;

            let (label_w, _) = self.measure.measure_text(label, font_size, false);
            svg.push_str(&format!(
                r#"<text x="{:.2}" y="{:.2}" dominant-baseline="middle" font-family="{}" font-size="{:.1}" fill="{}">{}</text>"#,
                x,
                top + swatch_h / 2.0,
                escape_xml(&spacing.font_family),
                font_size,
                theme.color("text"),
                escape_xml(label)
            ));
            svg.push('\n');
            x += label_w + spacing.cell_width;
        }

        (svg, x)
    }
}

/// Render `dump` as one SVG document.
pub fn render_document<T: TextMeasure>(
    dump: &Dump,
    theme: &Theme,
    options: RenderOptions,
    measure: T,
) -> Result<String> {
    Renderer::new(theme, measure, options).render(dump)
}

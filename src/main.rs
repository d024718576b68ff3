use std::path::{Path, PathBuf};

use allocviz::diagram::{parse_dump, render_document, RenderOptions};
use allocviz::fonts::CosmicTextMeasure;
use allocviz::theme::Theme;
use clap::Parser;
use log::{info, LevelFilter};
use resvg::usvg;
use tiny_skia::{Pixmap, Transform};

/// Render register-allocator dumps as SVG, PNG or PDF diagrams
#[derive(Parser, Debug)]
#[command(name = "allocviz")]
#[command(about = "Render a register-allocation dump as an interactive diagram", long_about = None)]
struct Args {
    /// Input dump (JSON, use "-" for stdin)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path (extension determines format: .svg, .png or .pdf)
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Theme file (TOML or YAML) or built-in theme name
    #[arg(short, long, value_name = "THEME")]
    theme: Option<String>,

    /// Leave out the hover script and interval metadata
    #[arg(long = "static")]
    static_svg: bool,

    /// Draw a color legend under the instruction listing
    #[arg(long)]
    legend: bool,

    /// Raster scale multiplier for PNG output (e.g. 2.0 for sharper output)
    #[arg(long, default_value_t = 1.0)]
    png_scale: f32,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), String> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let theme = load_theme(args.theme.as_deref())?;

    let input = if args.input.to_str() == Some("-") {
        let mut buffer = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        buffer
    } else {
        std::fs::read_to_string(&args.input)
            .map_err(|e| format!("Failed to read input file: {}", e))?
    };
    let dump = parse_dump(&input).map_err(|e| e.to_string())?;

    let output_ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .ok_or("Output file has no extension")?
        .to_ascii_lowercase();

    // Raster and PDF output cannot run the hover script.
    let options = RenderOptions {
        interactive: output_ext == "svg" && !args.static_svg,
        legend: args.legend,
    };
    let svg = render_document(&dump, &theme, options, CosmicTextMeasure::new())
        .map_err(|e| e.to_string())?;

    match output_ext.as_str() {
        "svg" => {
            std::fs::write(&args.output, svg).map_err(|e| format!("Failed to write SVG: {}", e))?;
        }
        "png" => {
            let png_data = svg_to_png(&svg, args.png_scale)?;
            std::fs::write(&args.output, png_data)
                .map_err(|e| format!("Failed to write PNG: {}", e))?;
        }
        "pdf" => {
            let pdf_data = svg_to_pdf(&svg)?;
            std::fs::write(&args.output, pdf_data)
                .map_err(|e| format!("Failed to write PDF: {}", e))?;
        }
        _ => {
            return Err(format!(
                "Unsupported output format: .{} (use .svg, .png or .pdf)",
                output_ext
            ));
        }
    }
    info!("{} saved to: {}", output_ext.to_ascii_uppercase(), args.output.display());
    eprintln!("Saved to: {}", args.output.display());

    Ok(())
}

/// A path to an existing file is read as a theme config; anything else
/// names a built-in theme.
fn load_theme(theme: Option<&str>) -> Result<Theme, String> {
    let Some(theme) = theme else {
        return Ok(Theme::default());
    };

    let path = Path::new(theme);
    if path.is_file() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read theme file: {}", e))?;
        Theme::from_config(&content).map_err(|e| e.to_string())
    } else {
        Theme::from_builtin(theme).map_err(|e| e.to_string())
    }
}

fn svg_to_png(svg: &str, scale: f32) -> Result<Vec<u8>, String> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(format!("Invalid --png-scale value: {}", scale));
    }

    let mut opts = usvg::Options::default();
    {
        let fontdb = opts.fontdb_mut();
        fontdb.load_system_fonts();

        let local_fonts = Path::new("fonts");
        if local_fonts.is_dir() {
            fontdb.load_fonts_dir(local_fonts);
        }

        let fallbacks = FontFallbacks::pick(
            fontdb
                .faces()
                .flat_map(|face| face.families.iter().map(|(family, _)| family.as_str())),
        );
        if let Some(family) = fallbacks.sans() {
            fontdb.set_sans_serif_family(family);
        }
        if let Some(family) = fallbacks.serif() {
            fontdb.set_serif_family(family);
        }
        if let Some(family) = fallbacks.monospace() {
            fontdb.set_monospace_family(family);
        }
    }

    let tree =
        usvg::Tree::from_str(svg, &opts).map_err(|e| format!("Failed to parse SVG: {}", e))?;

    let width = (tree.size().width() * scale).ceil() as u32;
    let height = (tree.size().height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width, height).ok_or("Failed to create pixmap")?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| format!("Failed to encode PNG: {}", e))
}

fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, String> {
    use svg2pdf::usvg::fontdb;

    let mut fontdb = fontdb::Database::new();
    fontdb.load_system_fonts();

    let local_fonts = Path::new("fonts");
    if local_fonts.is_dir() {
        fontdb.load_fonts_dir(local_fonts);
    }

    let fallbacks = FontFallbacks::pick(
        fontdb
            .faces()
            .flat_map(|face| face.families.iter().map(|(family, _)| family.as_str())),
    );
    if let Some(family) = fallbacks.sans() {
        fontdb.set_sans_serif_family(family);
    }
    if let Some(family) = fallbacks.serif() {
        fontdb.set_serif_family(family);
    }
    if let Some(family) = fallbacks.monospace() {
        fontdb.set_monospace_family(family);
    }

    let mut opts = svg2pdf::usvg::Options::default();
    opts.fontdb = std::sync::Arc::new(fontdb);

    let tree = svg2pdf::usvg::Tree::from_str(svg, &opts)
        .map_err(|e| format!("Failed to parse SVG: {}", e))?;

    // Text as paths: the listing stays readable when embedding fails.
    let mut options = svg2pdf::ConversionOptions::default();
    options.embed_text = false;
    let page_options = svg2pdf::PageOptions::default();

    svg2pdf::to_pdf(&tree, options, page_options)
        .map_err(|e| format!("Failed to convert SVG to PDF: {}", e))
}

/// Generic family names mapped onto whatever fonts are installed
#[derive(Debug, Default)]
struct FontFallbacks {
    first: Option<String>,
    sans: Option<String>,
    serif: Option<String>,
    mono: Option<String>,
}

impl FontFallbacks {
    fn pick<'a>(families: impl Iterator<Item = &'a str>) -> Self {
        let mut picked = FontFallbacks::default();
        for family in families {
            if picked.first.is_none() {
                picked.first = Some(family.to_string());
            }

            let lower = family.to_ascii_lowercase();
            if picked.sans.is_none() && lower.contains("sans") {
                picked.sans = Some(family.to_string());
            }
            if picked.serif.is_none() && lower.contains("serif") {
                picked.serif = Some(family.to_string());
            }
            if picked.mono.is_none() && (lower.contains("mono") || lower.contains("code")) {
                picked.mono = Some(family.to_string());
            }
        }
        picked
    }

    fn sans(&self) -> Option<&str> {
        self.sans.as_deref().or(self.first.as_deref())
    }

    fn serif(&self) -> Option<&str> {
        self.serif.as_deref().or(self.first.as_deref())
    }

    /// The listing is monospace; prefer any sans face over an arbitrary one.
    fn monospace(&self) -> Option<&str> {
        self.mono
            .as_deref()
            .or(self.sans.as_deref())
            .or(self.first.as_deref())
    }
}

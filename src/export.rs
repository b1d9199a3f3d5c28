use base64::Engine as _;
use image::ImageEncoder;
use tracing::{debug, info};

use crate::model::{Connector, ConnectorPath, Rgba, Shape, ShapeKind};

/// Space kept free to the right of and below the last shape.
pub const SURFACE_PADDING: f32 = 40.0;
pub const MIN_SURFACE_WIDTH: f32 = 800.0;
pub const MIN_SURFACE_HEIGHT: f32 = 600.0;
pub const DEFAULT_EXPORT_SCALE: f32 = 2.0;

const SHAPE_STROKE: &str = "#333333";
const SHAPE_STROKE_WIDTH: f32 = 2.0;
const CONNECTOR_STROKE_WIDTH: f32 = 2.0;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to parse SVG")]
    SvgParse,
    #[error("failed to allocate a {width}x{height} pixmap")]
    PixmapAlloc { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    PngEncode(String),
    #[error("failed to convert image to PDF")]
    PdfConvert,
    #[error("failed to write {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// The drawable diagram region handed to the rasterizer.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSurface {
    pub name: String,
    pub background: Rgba,
    pub width: f32,
    pub height: f32,
    pub svg: String,
}

impl ExportSurface {
    /// Captures the region from the diagram origin to just past the furthest shape.
    pub fn capture(name: &str, background: Rgba, shapes: &[Shape], connectors: &[Connector]) -> Self {
        let extent = shapes
            .iter()
            .map(|s| s.bounds())
            .reduce(|a, b| a.union(b));
        let (width, height) = match extent {
            Some(r) => (
                (r.max.x + SURFACE_PADDING).max(MIN_SURFACE_WIDTH).ceil(),
                (r.max.y + SURFACE_PADDING).max(MIN_SURFACE_HEIGHT).ceil(),
            ),
            None => (MIN_SURFACE_WIDTH, MIN_SURFACE_HEIGHT),
        };
        Self {
            name: name.to_string(),
            background,
            width,
            height,
            svg: diagram_to_svg(shapes, connectors, width, height, background),
        }
    }

    pub fn file_name(&self) -> String {
        pdf_file_name(&self.name)
    }
}

/// `<name>.pdf`, or `diagram.pdf` for an unnamed diagram.
pub fn pdf_file_name(name: &str) -> String {
    let stem = name.trim();
    let stem = if stem.is_empty() { "diagram" } else { stem };
    let stem: String = stem
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    format!("{stem}.pdf")
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn points_attr(points: &[crate::model::Point]) -> String {
    let mut out = String::new();
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:.3},{:.3}", p.x, p.y));
    }
    out
}

fn text_tspans(text: &str, x: f32, font_size: f32) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let line_height = font_size * 1.2;
    let first_dy = -line_height * (lines.len().saturating_sub(1) as f32) / 2.0;
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let dy = if i == 0 { first_dy } else { line_height };
        out.push_str(&format!(
            r#"<tspan x="{:.3}" dy="{:.3}">{}</tspan>"#,
            x,
            dy,
            escape_xml(line)
        ));
    }
    out
}

fn connector_svg(out: &mut String, connector: &Connector, from: &Shape, to: &Shape) {
    let path = ConnectorPath::between(from, to, connector.kind);
    let color = connector.color.to_hex();
    let dash = connector
        .kind
        .dash_pattern()
        .map(|(dash, gap)| format!(r#" stroke-dasharray="{dash},{gap}""#))
        .unwrap_or_default();
    out.push_str(&format!(
        r#"<line x1="{:.3}" y1="{:.3}" x2="{:.3}" y2="{:.3}" stroke="{}" stroke-width="{}"{} />"#,
        path.start.x,
        path.start.y,
        path.line_end.x,
        path.line_end.y,
        color,
        CONNECTOR_STROKE_WIDTH,
        dash
    ));
    if let Some(head) = path.head {
        out.push_str(&format!(
            r#"<polygon points="{}" fill="{}" />"#,
            points_attr(&head),
            color
        ));
    }
    out.push('\n');
}

fn shape_svg(out: &mut String, shape: &Shape) {
    let fill = shape.color.to_hex();
    match shape.kind {
        ShapeKind::Rectangle => out.push_str(&format!(
            r#"<rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" rx="4" fill="{}" stroke="{}" stroke-width="{}" />"#,
            shape.x, shape.y, shape.width, shape.height, fill, SHAPE_STROKE, SHAPE_STROKE_WIDTH
        )),
        ShapeKind::Circle => {
            let c = shape.center();
            out.push_str(&format!(
                r#"<ellipse cx="{:.3}" cy="{:.3}" rx="{:.3}" ry="{:.3}" fill="{}" stroke="{}" stroke-width="{}" />"#,
                c.x,
                c.y,
                shape.width / 2.0,
                shape.height / 2.0,
                fill,
                SHAPE_STROKE,
                SHAPE_STROKE_WIDTH
            ));
        }
        ShapeKind::Triangle | ShapeKind::Diamond | ShapeKind::Hexagon => out.push_str(&format!(
            r#"<polygon points="{}" fill="{}" stroke="{}" stroke-width="{}" />"#,
            points_attr(&shape.outline(0)),
            fill,
            SHAPE_STROKE,
            SHAPE_STROKE_WIDTH
        )),
    }
    if !shape.text.is_empty() {
        let anchor = shape.text_anchor();
        let style = &shape.text_style;
        out.push_str(&format!(
            r#"<text x="{:.3}" y="{:.3}" text-anchor="middle" dominant-baseline="middle" font-family="{}" font-size="{:.3}" fill="{}">{}</text>"#,
            anchor.x,
            anchor.y,
            escape_xml(&style.font_family),
            style.font_size,
            style.color.to_hex(),
            text_tspans(&shape.text, anchor.x, style.font_size)
        ));
    }
    out.push('\n');
}

/// Connectors are drawn first, as one layer under all shapes.
pub fn diagram_to_svg(
    shapes: &[Shape],
    connectors: &[Connector],
    width: f32,
    height: f32,
    background: Rgba,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
        w = width,
        h = height
    ));
    out.push('\n');
    out.push_str(&format!(
        r#"<rect x="0" y="0" width="{:.0}" height="{:.0}" fill="{}" />"#,
        width,
        height,
        background.to_hex()
    ));
    out.push('\n');

    out.push_str("<g>\n");
    for connector in connectors {
        let from = shapes.iter().find(|s| s.id == connector.from_shape_id);
        let to = shapes.iter().find(|s| s.id == connector.to_shape_id);
        if let (Some(from), Some(to)) = (from, to) {
            connector_svg(&mut out, connector, from, to);
        }
    }
    out.push_str("</g>\n");

    for shape in shapes {
        shape_svg(&mut out, shape);
    }
    out.push_str("</svg>\n");
    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Renders the surface at `scale` pixels per diagram unit over its background color.
pub fn rasterize(surface: &ExportSurface, scale: f32) -> Result<RasterImage> {
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        DEFAULT_EXPORT_SCALE
    };
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = crate::model::DEFAULT_FONT_FAMILY.to_string();
    let tree = usvg::Tree::from_str(&surface.svg, &opt).map_err(|_| ExportError::SvgParse)?;

    let width = (surface.width * scale).ceil().max(1.0) as u32;
    let height = (surface.height * scale).ceil().max(1.0) as u32;
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(ExportError::PixmapAlloc { width, height })?;
    let bg = surface.background;
    pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    // tiny-skia stores premultiplied alpha; PNG wants straight alpha.
    let mut rgba = Vec::with_capacity((width as usize) * (height as usize) * 4);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png)
        .write_image(&rgba, width, height, image::ExtendedColorType::Rgba8)
        .map_err(|e| ExportError::PngEncode(e.to_string()))?;
    debug!(width, height, bytes = png.len(), "surface rasterized");
    Ok(RasterImage { png, width, height })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn for_size(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

#[derive(Clone, Debug)]
pub struct PdfDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub orientation: Orientation,
    pub width: u32,
    pub height: u32,
}

impl PdfDocument {
    pub fn write_to(&self, path: &std::path::Path) -> Result<()> {
        std::fs::write(path, &self.bytes).map_err(|source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), bytes = self.bytes.len(), "PDF written");
        Ok(())
    }
}

/// Places the image on a single page of exactly its own size.
pub fn embed_in_pdf(image: &RasterImage, file_name: String) -> Result<PdfDocument> {
    let data = base64::engine::general_purpose::STANDARD.encode(&image.png);
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><image x="0" y="0" width="{w}" height="{h}" xlink:href="data:image/png;base64,{data}" /></svg>"#,
        w = image.width,
        h = image.height,
    );
    let opt = svg2pdf::usvg::Options::default();
    let tree = svg2pdf::usvg::Tree::from_str(&svg, &opt).map_err(|_| ExportError::SvgParse)?;
    let bytes = svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|_| ExportError::PdfConvert)?;
    Ok(PdfDocument {
        bytes,
        file_name,
        orientation: Orientation::for_size(image.width, image.height),
        width: image.width,
        height: image.height,
    })
}

/// Rasterizes the surface and wraps the image in a one-page PDF.
pub fn export_pdf(surface: &ExportSurface, scale: f32) -> Result<PdfDocument> {
    let image = rasterize(surface, scale)?;
    let doc = embed_in_pdf(&image, surface.file_name())?;
    info!(
        file = %doc.file_name,
        width = doc.width,
        height = doc.height,
        orientation = ?doc.orientation,
        "diagram exported"
    );
    Ok(doc)
}

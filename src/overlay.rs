//! Static rendering of an image with its recognized-text layer.
//!
//! The SVG canvas is sized to the natural pixel dimensions and every box is
//! positioned with the percentages from [`crate::viewport::project_box`], the
//! same numbers the interactive viewer applies inside its transformed container.

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use resvg::render;
use std::io::Cursor;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use crate::settings::Settings;
use crate::viewport::{DetectionBox, NaturalSize, OverlayBox, layout_overlay};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerMode {
    /// Original image with translucent box outlines.
    Outline,
    /// Dimmed image with the recognized text drawn inside each box.
    TextLayer,
}

#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub outline_color: String,
    pub fill_color: String,
    pub text_color: String,
    pub font_family: String,
}

impl OverlayStyle {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            outline_color: settings.overlay_outline_color.clone(),
            fill_color: settings.overlay_fill_color.clone(),
            text_color: settings.overlay_text_color.clone(),
            font_family: settings.overlay_font_style.css_family().to_string(),
        }
    }
}

pub fn render_overlay_svg(
    image_bytes: &[u8],
    image_mime: &str,
    natural: NaturalSize,
    boxes: &[DetectionBox],
    mode: LayerMode,
    style: &OverlayStyle,
) -> String {
    let encoded = BASE64.encode(image_bytes);
    let data_uri = format!("data:{};base64,{}", image_mime, encoded);
    let opacity = match mode {
        LayerMode::Outline => "1",
        LayerMode::TextLayer => "0.4",
    };

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = natural.width,
        h = natural.height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none" opacity="{opacity}"/>"#,
        uri = data_uri,
        w = natural.width,
        h = natural.height,
        opacity = opacity
    ));

    for (idx, item) in layout_overlay(boxes, natural).iter().enumerate() {
        match mode {
            LayerMode::Outline => push_outline(&mut svg, item, style),
            LayerMode::TextLayer => push_text(&mut svg, idx, item, style),
        }
    }

    svg.push_str("</svg>");
    svg
}

fn push_outline(svg: &mut String, item: &OverlayBox, style: &OverlayStyle) {
    let p = item.placement;
    svg.push_str(&format!(
        r#"<rect x="{x}%" y="{y}%" width="{w}%" height="{h}%" fill="{fill}" fill-opacity="0.1" stroke="{stroke}" stroke-opacity="0.6" stroke-width="1"><title>{title}</title></rect>"#,
        x = number(p.left_pct),
        y = number(p.top_pct),
        w = number(p.width_pct),
        h = number(p.height_pct),
        fill = escape_xml(&style.fill_color),
        stroke = escape_xml(&style.outline_color),
        title = escape_xml(&item.text)
    ));
}

fn push_text(svg: &mut String, idx: usize, item: &OverlayBox, style: &OverlayStyle) {
    let p = item.placement;
    svg.push_str(&format!(
        r#"<clipPath id="box-{idx}"><rect x="{x}%" y="{y}%" width="{w}%" height="{h}%"/></clipPath>"#,
        idx = idx,
        x = number(p.left_pct),
        y = number(p.top_pct),
        w = number(p.width_pct),
        h = number(p.height_pct)
    ));
    svg.push_str(&format!(
        r#"<rect x="{x}%" y="{y}%" width="{w}%" height="{h}%" fill="none" stroke="{stroke}" stroke-opacity="0.3" stroke-width="1"/>"#,
        x = number(p.left_pct),
        y = number(p.top_pct),
        w = number(p.width_pct),
        h = number(p.height_pct),
        stroke = escape_xml(&style.outline_color)
    ));
    if item.text.trim().is_empty() {
        return;
    }
    svg.push_str(&format!(
        r##"<text clip-path="url(#box-{idx})" x="{cx}%" y="{cy}%" text-anchor="middle" dominant-baseline="central" font-family="{family}" font-size="{size}" font-weight="600" letter-spacing="-0.03em" fill="{fill}" stroke="#ffffff" stroke-width="3" stroke-opacity="0.9" paint-order="stroke">{text}</text>"##,
        idx = idx,
        cx = number(p.left_pct + p.width_pct / 2.0),
        cy = number(p.top_pct + p.height_pct / 2.0),
        family = escape_xml(&style.font_family),
        size = number(item.font_size),
        fill = escape_xml(&style.text_color),
        text = escape_xml(&item.text)
    ));
}

/// Rasterizes an overlay SVG and encodes it as `output_mime` (PNG, JPEG, WebP or BMP).
pub fn render_svg_bytes(svg: &str, output_mime: &str) -> Result<Vec<u8>> {
    let format = image_format_from_mime(output_mime)
        .ok_or_else(|| anyhow!("unsupported output image mime '{}'", output_mime))?;
    let image = rasterize(svg)?;
    let output = match format {
        // JPEG has no alpha channel.
        image::ImageFormat::Jpeg => image::DynamicImage::ImageRgb8(
            image::DynamicImage::ImageRgba8(image).to_rgb8(),
        ),
        _ => image::DynamicImage::ImageRgba8(image),
    };
    let mut bytes = Vec::new();
    output
        .write_to(&mut Cursor::new(&mut bytes), format)
        .with_context(|| format!("failed to encode overlay as {}", output_mime))?;
    Ok(bytes)
}

fn rasterize(svg: &str) -> Result<image::RgbaImage> {
    let mut fonts = fontdb::Database::new();
    fonts.load_system_fonts();
    let options = Options {
        fontdb: Arc::new(fonts),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse overlay SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow!("overlay SVG has no area"))?;
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());
    image::RgbaImage::from_raw(size.width(), size.height(), pixmap.take())
        .ok_or_else(|| anyhow!("pixmap does not match the overlay size"))
}

pub fn image_format_from_mime(mime: &str) -> Option<image::ImageFormat> {
    match mime {
        "image/png" => Some(image::ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(image::ImageFormat::Jpeg),
        "image/webp" => Some(image::ImageFormat::WebP),
        "image/bmp" => Some(image::ImageFormat::Bmp),
        _ => None,
    }
}

/// Four decimals without trailing zeros, so `10.000000000000002` prints as `10`.
fn number(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

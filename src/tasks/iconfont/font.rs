// src/tasks/iconfont/font.rs

//! SVG font generation from icon outlines.
//!
//! Browsers other than Safari ignore SVG fonts; binary formats come from an
//! external converter configured under `[transform.icon_font]`.

use std::fmt::Write as _;

use anyhow::{anyhow, Context, Result};
use usvg::tiny_skia_path::{PathSegment, Point, Transform};
use usvg::{Group, Node, Tree};

use crate::config::IconFontSection;
use crate::fs::FileSystem;
use crate::tasks::transform::TransformOutput;

use super::glyphs::Glyph;

/// Output of the icon-font producer, shared by both sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFont {
    pub font_name: String,
    pub glyphs: Vec<Glyph>,
    /// The SVG font document.
    pub svg: String,
    /// Binary formats converted from `svg` by `[transform.icon_font]`.
    pub converted: Vec<TransformOutput>,
}

impl GeneratedFont {
    /// File name of the SVG font inside the font directory.
    pub fn svg_file_name(&self) -> String {
        format!("{}.svg", self.font_name)
    }

    /// Every font file the font sink writes: converted formats, then the SVG.
    pub fn file_names(&self) -> Vec<String> {
        self.converted
            .iter()
            .map(|f| f.rel.to_string_lossy().replace('\\', "/"))
            .chain(std::iter::once(self.svg_file_name()))
            .collect()
    }
}

/// Outline of one glyph in font units.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphOutline {
    pub d: String,
    pub advance: u32,
}

/// Read every glyph source and assemble the SVG font.
pub fn generate_font(
    fs: &dyn FileSystem,
    glyphs: Vec<Glyph>,
    settings: &IconFontSection,
) -> Result<GeneratedFont> {
    let height = settings.font_height;
    let mut out = String::new();

    writeln!(out, r#"<?xml version="1.0" standalone="no"?>"#)?;
    writeln!(
        out,
        r#"<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">"#
    )?;
    writeln!(out, r#"<svg xmlns="http://www.w3.org/2000/svg">"#)?;
    writeln!(out, "<defs>")?;
    writeln!(out, r#"<font id="{}" horiz-adv-x="{height}">"#, settings.font_name)?;
    writeln!(
        out,
        r#"<font-face font-family="{}" units-per-em="{height}" ascent="{height}" descent="0"/>"#,
        settings.font_name
    )?;
    writeln!(out, r#"<missing-glyph horiz-adv-x="0"/>"#)?;

    for glyph in &glyphs {
        let data = fs.read(&glyph.source)?;
        let outline = glyph_outline(&data, height)
            .with_context(|| format!("glyph {:?} from {:?}", glyph.name, glyph.source))?;
        writeln!(
            out,
            r#"<glyph glyph-name="{}" unicode="&#x{};" horiz-adv-x="{}" d="{}"/>"#,
            glyph.name,
            glyph.codepoint_hex(),
            outline.advance,
            outline.d
        )?;
    }

    writeln!(out, "</font>")?;
    writeln!(out, "</defs>")?;
    writeln!(out, "</svg>")?;

    Ok(GeneratedFont {
        font_name: settings.font_name.clone(),
        glyphs,
        svg: out,
        converted: Vec::new(),
    })
}

/// Flatten every path of an icon into one outline scaled to `height` font
/// units, with the y axis flipped to font coordinates.
pub fn glyph_outline(svg: &[u8], height: u32) -> Result<GlyphOutline> {
    let tree = Tree::from_data(svg, &usvg::Options::default()).context("Failed to parse SVG")?;
    let size = tree.size();
    if size.height() <= 0.0 {
        return Err(anyhow!("icon has zero height"));
    }

    let scale = height as f32 / size.height();
    let mut d = String::new();
    collect_group(tree.root(), scale, height as f32, &mut d);

    Ok(GlyphOutline {
        d: d.trim_end().to_string(),
        advance: (size.width() * scale).round() as u32,
    })
}

fn collect_group(group: &Group, scale: f32, height: f32, d: &mut String) {
    for node in group.children() {
        match node {
            Node::Group(nested) => collect_group(nested, scale, height, d),
            Node::Path(path) => {
                let ts = path.abs_transform();
                let map = |p: Point| map_point(ts, p, scale, height);
                for segment in path.data().segments() {
                    match segment {
                        PathSegment::MoveTo(p) => push_cmd(d, 'M', &[map(p)]),
                        PathSegment::LineTo(p) => push_cmd(d, 'L', &[map(p)]),
                        PathSegment::QuadTo(p1, p) => push_cmd(d, 'Q', &[map(p1), map(p)]),
                        PathSegment::CubicTo(p1, p2, p) => {
                            push_cmd(d, 'C', &[map(p1), map(p2), map(p)])
                        }
                        PathSegment::Close => d.push_str("Z "),
                    }
                }
            }
            _ => {}
        }
    }
}

fn map_point(ts: Transform, p: Point, scale: f32, height: f32) -> (f32, f32) {
    let x = ts.sx * p.x + ts.kx * p.y + ts.tx;
    let y = ts.ky * p.x + ts.sy * p.y + ts.ty;
    (x * scale, height - y * scale)
}

fn push_cmd(d: &mut String, cmd: char, points: &[(f32, f32)]) {
    d.push(cmd);
    for (i, (x, y)) in points.iter().enumerate() {
        if i > 0 {
            d.push(' ');
        }
        let _ = write!(d, "{} {}", fmt_num(*x), fmt_num(*y));
    }
    d.push(' ');
}

/// Two decimals, trailing zeros dropped.
fn fmt_num(v: f32) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

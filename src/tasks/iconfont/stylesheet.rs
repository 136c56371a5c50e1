// src/tasks/iconfont/stylesheet.rs

//! Icon stylesheet template rendering.
//!
//! Templates use `{{fontName}}`, `{{fontPath}}`, `{{className}}` and
//! `{{fontSrc}}` (the `@font-face` source list of every written font file),
//! plus a `{{#glyphs}} ... {{/glyphs}}` block repeated per glyph with
//! `{{name}}` and `{{codepoint}}` (lowercase hex) inside.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::glyphs::Glyph;

/// Used when the project has no stylesheet template of its own.
pub const DEFAULT_TEMPLATE: &str = r#"@font-face {
  font-family: "{{fontName}}";
  src: {{fontSrc}};
  font-weight: normal;
  font-style: normal;
}

[class^="{{className}}-"]:before,
[class*=" {{className}}-"]:before {
  font-family: "{{fontName}}";
  font-style: normal;
  font-weight: normal;
  line-height: 1;
  -webkit-font-smoothing: antialiased;
  -moz-osx-font-smoothing: grayscale;
}
{{#glyphs}}
.{{className}}-{{name}}:before { content: "\{{codepoint}}"; }
{{/glyphs}}
"#;

static GLYPH_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{#glyphs\}\}\n?(.*?)\{\{/glyphs\}\}\n?").unwrap());
static VARIABLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").unwrap());

/// Values available to the template.
#[derive(Debug, Clone)]
pub struct StylesheetContext<'a> {
    pub font_name: &'a str,
    pub font_path: &'a str,
    pub class_name: &'a str,
    /// File names written by the font sink.
    pub font_files: &'a [String],
    pub glyphs: &'a [Glyph],
}

pub fn render_stylesheet(template: &str, ctx: &StylesheetContext<'_>) -> String {
    let expanded = GLYPH_BLOCK.replace_all(template, |caps: &Captures| {
        let body = &caps[1];
        ctx.glyphs
            .iter()
            .map(|glyph| substitute(body, ctx, Some(glyph)))
            .collect::<String>()
    });
    substitute(&expanded, ctx, None)
}

fn substitute(text: &str, ctx: &StylesheetContext<'_>, glyph: Option<&Glyph>) -> String {
    VARIABLE
        .replace_all(text, |caps: &Captures| {
            match (&caps[1], glyph) {
                ("fontName", _) => ctx.font_name.to_string(),
                ("fontPath", _) => ctx.font_path.to_string(),
                ("className", _) => ctx.class_name.to_string(),
                ("fontSrc", _) => font_src(ctx),
                ("name", Some(g)) => g.name.clone(),
                ("codepoint", Some(g)) => g.codepoint_hex(),
                // Unknown names stay as written.
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// CSS `format()` hint for a font file, most preferred first.
fn font_format(file: &str) -> Option<(u8, &'static str)> {
    let ext = file.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "woff2" => Some((0, "woff2")),
        "woff" => Some((1, "woff")),
        "ttf" => Some((2, "truetype")),
        "otf" => Some((3, "opentype")),
        "eot" => Some((4, "embedded-opentype")),
        "svg" => Some((5, "svg")),
        _ => None,
    }
}

fn font_src(ctx: &StylesheetContext<'_>) -> String {
    let mut files: Vec<(u8, &'static str, &str)> = ctx
        .font_files
        .iter()
        .filter_map(|f| font_format(f).map(|(rank, format)| (rank, format, f.as_str())))
        .collect();
    files.sort();

    files
        .iter()
        .map(|(_, format, file)| {
            let suffix = match *format {
                "svg" => format!("#{}", ctx.font_name),
                "embedded-opentype" => "?#iefix".to_string(),
                _ => String::new(),
            };
            format!(r#"url("{}{file}{suffix}") format("{format}")"#, ctx.font_path)
        })
        .collect::<Vec<_>>()
        .join(",\n       ")
}

/// True for lodash-style (`<%= fontName %>`) templates, which this renderer
/// does not understand.
pub fn has_foreign_syntax(template: &str) -> bool {
    template.contains("<%")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn glyph(name: &str, codepoint: u32) -> Glyph {
        Glyph {
            name: name.to_string(),
            codepoint,
            source: PathBuf::from(format!("{name}.svg")),
        }
    }

    #[test]
    fn glyph_block_repeats_per_glyph() {
        let glyphs = vec![glyph("arrow", 0xEA01), glyph("close", 0xEA02)];
        let ctx = StylesheetContext {
            font_name: "iconfont",
            font_path: "../fonts/",
            class_name: "icon",
            font_files: &[],
            glyphs: &glyphs,
        };
        let out = render_stylesheet(
            "src: url('{{fontPath}}{{fontName}}.svg');\n{{#glyphs}}\n.{{className}}-{{name}} { content: '\\{{codepoint}}'; }\n{{/glyphs}}\n",
            &ctx,
        );
        assert_eq!(
            out,
            "src: url('../fonts/iconfont.svg');\n.icon-arrow { content: '\\ea01'; }\n.icon-close { content: '\\ea02'; }\n"
        );
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let ctx = StylesheetContext {
            font_name: "f",
            font_path: "p/",
            class_name: "c",
            font_files: &[],
            glyphs: &[],
        };
        assert_eq!(render_stylesheet("{{ fontName }} {{other}}", &ctx), "f {{other}}");
    }

    #[test]
    fn default_template_renders_every_glyph() {
        let glyphs = vec![glyph("home", 0xEA01)];
        let files = vec!["iconfont.svg".to_string()];
        let ctx = StylesheetContext {
            font_name: "iconfont",
            font_path: "../fonts/",
            class_name: "icon",
            font_files: &files,
            glyphs: &glyphs,
        };
        let out = render_stylesheet(DEFAULT_TEMPLATE, &ctx);
        assert!(out.contains(r#".icon-home:before { content: "\ea01"; }"#));
        assert!(out.contains(r#"src: url("../fonts/iconfont.svg#iconfont") format("svg");"#));
        assert!(!out.contains("{{"));
    }

    #[test]
    fn font_sources_prefer_compact_formats() {
        let files: Vec<String> = ["iconfont.svg", "iconfont.ttf", "iconfont.eot", "iconfont.woff", "README"]
            .iter()
            .map(|f| f.to_string())
            .collect();
        let ctx = StylesheetContext {
            font_name: "iconfont",
            font_path: "/fonts/",
            class_name: "icon",
            font_files: &files,
            glyphs: &[],
        };
        let src = render_stylesheet("{{fontSrc}}", &ctx);
        let lines: Vec<&str> = src.lines().map(str::trim).collect();
        assert_eq!(
            lines,
            vec![
                r#"url("/fonts/iconfont.woff") format("woff"),"#,
                r#"url("/fonts/iconfont.ttf") format("truetype"),"#,
                r#"url("/fonts/iconfont.eot?#iefix") format("embedded-opentype"),"#,
                r#"url("/fonts/iconfont.svg#iconfont") format("svg")"#,
            ]
        );
    }

    #[test]
    fn lodash_templates_are_detected() {
        assert!(has_foreign_syntax("font-family: \"<%= fontName %>\";"));
        assert!(!has_foreign_syntax("font-family: \"{{fontName}}\";"));
    }
}

//! Mermaid rendering backed by `mermaid-rs-renderer`.
//!
//! The crate does the parsing, layout and SVG writing. This module checks
//! the diagram header, fixes up the markup so `resvg` can read it, and
//! prefixes every id with the render id so two diagrams can share a page.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::{Captures, Regex};

use super::{Artifact, RenderError, Renderer};

/// Keywords mermaid accepts as the first statement of a diagram.
const DIAGRAM_KINDS: &[&str] = &[
    "graph",
    "flowchart",
    "flowchart-elk",
    "sequenceDiagram",
    "classDiagram",
    "classDiagram-v2",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "journey",
    "gantt",
    "pie",
    "quadrantChart",
    "requirementDiagram",
    "gitGraph",
    "C4Context",
    "C4Container",
    "C4Component",
    "C4Dynamic",
    "C4Deployment",
    "mindmap",
    "timeline",
    "sankey-beta",
    "xychart-beta",
    "block-beta",
    "packet-beta",
    "architecture-beta",
    "kanban",
    "radar-beta",
];

static SVG_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<svg\b[^>]*>").expect("valid svg tag regex"));
static ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\s)id="([^"]*)""#).expect("valid id regex"));
static URL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"url\(#([^)\s]+)\)").expect("valid url regex"));
static HREF_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r##"href="#([^"]+)""##).expect("valid href regex"));
static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(<style[^>]*>)(.*?)(</style>)").expect("valid style regex")
});
static CSS_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z_][\w-]*)").expect("valid selector regex"));
static SIZE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s(width|height)="([\d.]+)(?:px)?""#).expect("valid size regex")
});
static VIEW_BOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"viewBox="\s*[-\d.eE]+[\s,]+[-\d.eE]+[\s,]+([\d.eE]+)[\s,]+([\d.eE]+)\s*""#)
        .expect("valid viewBox regex")
});

/// Renderer backed by the `mermaid-rs-renderer` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MermaidRenderer;

impl MermaidRenderer {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renderer for MermaidRenderer {
    async fn validate(&self, source: &str) -> Result<(), RenderError> {
        diagram_kind(source)?;
        mermaid_rs_renderer::parser::parse_mermaid(source)
            .map_err(|e| RenderError::Syntax(e.to_string()))?;
        Ok(())
    }

    async fn render(&self, render_id: &str, source: &str) -> Result<Artifact, RenderError> {
        let kind = diagram_kind(source)?;
        let svg = mermaid_rs_renderer::render(source)
            .map_err(|e| RenderError::Syntax(format!("{e:#}")))?;
        let svg = namespace_ids(&fix_svg_font_families(&svg), render_id);
        let (width, height) = svg_size(&svg)
            .ok_or_else(|| RenderError::Backend("rendered SVG has no size".to_string()))?;
        Ok(Artifact {
            render_id: render_id.to_string(),
            svg,
            width,
            height,
            kind: kind.to_string(),
        })
    }
}

/// The diagram keyword that opens `source`.
///
/// Blank lines, `%%` comments and directives, and a `---` front matter
/// block may come before it.
///
/// # Errors
///
/// Returns [`RenderError::Syntax`] naming the line when the first statement
/// is not a known diagram type.
pub fn diagram_kind(source: &str) -> Result<&'static str, RenderError> {
    let mut front_matter = false;
    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if front_matter {
            front_matter = line != "---";
            continue;
        }
        if line.is_empty() || line.starts_with("%%") {
            continue;
        }
        if line == "---" {
            front_matter = true;
            continue;
        }
        let keyword = line
            .split(|c: char| c.is_whitespace() || c == ';')
            .next()
            .unwrap_or(line);
        return DIAGRAM_KINDS
            .iter()
            .copied()
            .find(|kind| *kind == keyword)
            .ok_or_else(|| {
                RenderError::Syntax(format!(
                    "line {}: unknown diagram type `{keyword}`",
                    index + 1
                ))
            });
    }
    Err(RenderError::Syntax("no diagram type found".to_string()))
}

/// Fix unescaped double quotes inside font-family attributes.
///
/// `mermaid-rs-renderer` emits values like
/// `font-family="Inter, "Segoe UI", sans-serif"`, which `resvg` cannot
/// parse. Inner double quotes become single quotes.
fn fix_svg_font_families(svg: &str) -> String {
    const MARKER: &str = "font-family=\"";
    let mut result = String::with_capacity(svg.len());
    let mut rest = svg;

    while let Some(pos) = rest.find(MARKER) {
        result.push_str(&rest[..pos + MARKER.len()]);
        rest = &rest[pos + MARKER.len()..];

        // The value ends at a quote followed by `>`, ` `, `/` or the end.
        let mut value = String::new();
        let mut end_offset = rest.len();
        for (i, ch) in rest.char_indices() {
            if ch != '"' {
                value.push(ch);
                continue;
            }
            let after = rest.get(i + 1..i + 2).unwrap_or("");
            if after.is_empty() || after.starts_with(['>', ' ', '/']) {
                result.push_str(&value.replace('"', "'"));
                result.push('"');
                end_offset = i + 1;
                break;
            }
            value.push('"');
        }
        rest = &rest[end_offset..];
    }
    result.push_str(rest);
    result
}

/// Prefix every id in `svg`, and every reference to one, with `render_id`.
///
/// The root `<svg>` element ends up with `render_id` itself as its id.
fn namespace_ids(svg: &str, render_id: &str) -> String {
    let root_tag = SVG_OPEN.find(svg).map(|m| m.as_str());
    let root_id = root_tag
        .and_then(|tag| ID_ATTR.captures(tag))
        .map(|c| c[2].to_string());
    let rename = |old: &str| {
        if root_id.as_deref() == Some(old) {
            render_id.to_string()
        } else {
            format!("{render_id}-{old}")
        }
    };
    let known: HashSet<String> = ID_ATTR
        .captures_iter(svg)
        .map(|c| c[2].to_string())
        .collect();

    let svg = ID_ATTR.replace_all(svg, |c: &Captures| {
        format!(r#"{}id="{}""#, &c[1], rename(&c[2]))
    });
    let svg = URL_REF.replace_all(&svg, |c: &Captures| format!("url(#{})", rename(&c[1])));
    let svg = HREF_REF.replace_all(&svg, |c: &Captures| format!(r##"href="#{}""##, rename(&c[1])));
    let svg = STYLE_BLOCK.replace_all(&svg, |c: &Captures| {
        let rules = CSS_ID.replace_all(&c[2], |r: &Captures| {
            if known.contains(&r[1]) {
                format!("#{}", rename(&r[1]))
            } else {
                r[0].to_string()
            }
        });
        format!("{}{rules}{}", &c[1], &c[3])
    });

    if root_id.is_some() {
        return svg.into_owned();
    }
    SVG_OPEN
        .replace(&svg, |c: &Captures| {
            format!(r#"<svg id="{render_id}"{}"#, &c[0]["<svg".len()..])
        })
        .into_owned()
}

/// Intrinsic size of the root element, from `width`/`height` or `viewBox`.
fn svg_size(svg: &str) -> Option<(f32, f32)> {
    let tag = SVG_OPEN.find(svg)?.as_str();
    let mut width = None;
    let mut height = None;
    for c in SIZE_ATTR.captures_iter(tag) {
        let value = c[2].parse::<f32>().ok();
        match &c[1] {
            "width" => width = value,
            _ => height = value,
        }
    }
    let (width, height) = match (width, height) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            let c = VIEW_BOX.captures(tag)?;
            (c[1].parse().ok()?, c[2].parse().ok()?)
        }
    };
    (width > 0.0 && height > 0.0).then_some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_svg_font_families_replaces_inner_quotes() {
        let input = r#"<text font-family="Inter, "Segoe UI", sans-serif" font-size="14">"#;
        assert_eq!(
            fix_svg_font_families(input),
            r#"<text font-family="Inter, 'Segoe UI', sans-serif" font-size="14">"#
        );
    }

    #[test]
    fn test_fix_svg_font_families_no_op_when_clean() {
        let input = r#"<text font-family="Inter, sans-serif" font-size="14">"#;
        assert_eq!(fix_svg_font_families(input), input);
    }

    #[test]
    fn test_diagram_kind_skips_comments_and_front_matter() {
        assert_eq!(diagram_kind("graph TD;\nA-->B").unwrap(), "graph");
        assert_eq!(
            diagram_kind("\n%% checkout\n%%{init: {}}%%\nsequenceDiagram\nA->>B: hi").unwrap(),
            "sequenceDiagram"
        );
        assert_eq!(
            diagram_kind("---\ntitle: Flow\n---\nflowchart LR\nA-->B").unwrap(),
            "flowchart"
        );
    }

    #[test]
    fn test_unknown_diagram_kind_names_the_line() {
        let err = diagram_kind("%% note\nflowchrt TD\nA-->B").unwrap_err();
        assert!(matches!(err, RenderError::Syntax(ref m) if m.starts_with("line 2:")));
        assert!(diagram_kind("  \n%% only a comment").is_err());
    }

    #[test]
    fn test_namespace_ids_rewrites_definitions_and_references() {
        let svg = concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="20">"#,
            r#"<style>#arrow { fill: #fff; }</style>"#,
            r#"<defs><marker id="arrow"/></defs>"#,
            r#"<path marker-end="url(#arrow)"/><use xlink:href="#arrow"/>"#,
            r#"<g data-id="n1"/></svg>"#
        );
        let out = namespace_ids(svg, "mermaid-7");
        assert!(out.starts_with(r#"<svg id="mermaid-7" xmlns="#));
        assert!(out.contains(r#"<marker id="mermaid-7-arrow"/>"#));
        assert!(out.contains("url(#mermaid-7-arrow)"));
        assert!(out.contains(r##"xlink:href="#mermaid-7-arrow""##));
        assert!(out.contains("#mermaid-7-arrow { fill: #fff; }"));
        assert!(out.contains(r#"data-id="n1""#));
    }

    #[test]
    fn test_namespace_ids_replaces_existing_root_id() {
        let svg = r#"<svg id="graph" viewBox="0 0 5 5"><style>#graph .node{}</style></svg>"#;
        let out = namespace_ids(svg, "mermaid-8");
        assert_eq!(
            out,
            r#"<svg id="mermaid-8" viewBox="0 0 5 5"><style>#mermaid-8 .node{}</style></svg>"#
        );
    }

    #[test]
    fn test_svg_size_prefers_attributes_then_view_box() {
        assert_eq!(
            svg_size(r#"<svg width="120px" height="80" viewBox="0 0 1 1"></svg>"#),
            Some((120.0, 80.0))
        );
        assert_eq!(
            svg_size(r#"<svg width="100%" viewBox="0 0 300.5 40"></svg>"#),
            Some((300.5, 40.0))
        );
        assert_eq!(svg_size("<svg></svg>"), None);
    }

    #[tokio::test]
    async fn test_renderer_accepts_richer_syntax() {
        let renderer = MermaidRenderer::new();
        for source in [
            "graph TD\nA-- yes -->B",
            "flowchart LR\n    subgraph one\n    a1-->a2\n    end\n    a2-->b1",
            "sequenceDiagram\n    Alice->>Bob: Hello\n    Bob-->>Alice: Hi",
        ] {
            renderer.validate(source).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_render_namespaces_ids_and_reports_kind() {
        let artifact = MermaidRenderer::new()
            .render("mermaid-abc", "flowchart LR\n    A[Start] --> B[End]")
            .await
            .unwrap();
        assert_eq!(artifact.render_id, "mermaid-abc");
        assert_eq!(artifact.kind, "flowchart");
        assert!(artifact.width > 0.0 && artifact.height > 0.0);
        assert!(artifact.svg.contains(r#"id="mermaid-abc""#));
    }

    #[tokio::test]
    async fn test_unknown_kind_fails_validation() {
        let err = MermaidRenderer::new()
            .validate("flowchrt TD\nA-->B")
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Syntax(ref m) if m.starts_with("line 1:")));
    }
}

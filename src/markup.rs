use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::graph::HierarchyGraph;
use crate::layout::ForceLayout;
use crate::locator::LocatedSpan;
use crate::{
    COLLIDE_RADIUS_CATEGORY, COLLIDE_RADIUS_ROOT, COLLIDE_RADIUS_SUBCATEGORY, COLLIDE_RADIUS_TYPE,
};

const LABEL_TRUNCATE_AT: usize = 15;
const LABEL_TRUNCATE_KEEP: usize = 12;

/// One piece of the annotated text: either untouched plain text or a
/// highlighted span carrying its annotation payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Segment {
    Text {
        text: String,
    },
    Highlight {
        text: String,
        suggestion: String,
        hierarchy_key: String,
    },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Text { text } => text,
            Segment::Highlight { text, .. } => text,
        }
    }
}

/// The marked-up representation of one message. Segments concatenate back
/// to the exact source text; highlights are all active by default and carry
/// enough data for the host UI to wire hover and edit affordances.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedText {
    pub segments: Vec<Segment>,
}

impl AnnotatedText {
    /// Builds the segment list from located spans. Spans are expected sorted
    /// and non-overlapping (the locator's contract); any span that falls
    /// outside the text or behind the write cursor is skipped rather than
    /// corrupting the round trip.
    pub fn render(text: &str, spans: &[LocatedSpan]) -> Self {
        let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
        let mut cursor = 0usize;

        for span in spans {
            if span.start < cursor || span.end > text.len() || span.start >= span.end {
                continue;
            }
            if !text.is_char_boundary(span.start) || !text.is_char_boundary(span.end) {
                continue;
            }
            if span.start > cursor {
                segments.push(Segment::Text {
                    text: text[cursor..span.start].to_string(),
                });
            }
            segments.push(Segment::Highlight {
                text: text[span.start..span.end].to_string(),
                suggestion: span.suggestion.clone(),
                hierarchy_key: span.hierarchy_key.clone(),
            });
            cursor = span.end;
        }

        if cursor < text.len() {
            segments.push(Segment::Text {
                text: text[cursor..].to_string(),
            });
        }

        Self { segments }
    }

    /// Reconstructs the source text exactly, ignoring suggestion state.
    pub fn source_text(&self) -> String {
        self.segments
            .iter()
            .map(Segment::text)
            .collect::<String>()
    }

    pub fn highlight_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, Segment::Highlight { .. }))
            .count()
    }

    /// HTML projection for host UIs: plain segments escaped, highlights
    /// wrapped in spans carrying the hierarchy key, suggestion and original
    /// phrase as data attributes.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text { text } => html.push_str(&escape_html(text)),
                Segment::Highlight {
                    text,
                    suggestion,
                    hierarchy_key,
                } => {
                    let _ = write!(
                        html,
                        "<span class=\"bias-highlight active\" data-hierarchy-key=\"{}\" data-original=\"{}\" data-suggestion=\"{}\">{}</span>",
                        escape_html(hierarchy_key),
                        escape_html(text),
                        escape_html(suggestion),
                        escape_html(text)
                    );
                }
            }
        }
        html
    }
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::new();
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn node_radius(level: u8) -> f32 {
    match level {
        0 => COLLIDE_RADIUS_ROOT * 0.6,
        1 => COLLIDE_RADIUS_CATEGORY * 0.5,
        2 => COLLIDE_RADIUS_SUBCATEGORY * 0.5,
        _ => COLLIDE_RADIUS_TYPE * 0.4,
    }
}

fn node_fill(level: u8) -> &'static str {
    // Tol palette, one color per hierarchy level.
    match level {
        0 => "#4477AA",
        1 => "#66CCEE",
        2 => "#CCBB44",
        _ => "#EE6677",
    }
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() > LABEL_TRUNCATE_AT {
        let kept: String = label.chars().take(LABEL_TRUNCATE_KEEP).collect();
        format!("{kept}...")
    } else {
        label.to_string()
    }
}

/// Renders the hierarchy graph at its current layout positions as a
/// standalone SVG string.
pub fn render_graph_svg(graph: &HierarchyGraph, layout: &ForceLayout) -> String {
    let (width, height) = layout.canvas_size();

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{:.0}\" height=\"{:.0}\" viewBox=\"0 0 {:.0} {:.0}\" font-family=\"Inter, system-ui, sans-serif\" class=\"bias-map\">\n",
        width, height, width, height
    );

    for edge in &graph.edges {
        let (Some(source), Some(target)) =
            (layout.position(&edge.source), layout.position(&edge.target))
        else {
            continue;
        };
        let _ = write!(
            svg,
            "  <line class=\"bias-map-link\" x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#94a3b8\" stroke-width=\"1.5\" />\n",
            source.x, source.y, target.x, target.y
        );
    }

    for node in &graph.nodes {
        let Some(position) = layout.position(&node.id) else {
            continue;
        };
        let _ = write!(
            svg,
            "  <g class=\"bias-map-node level-{}\" data-id=\"{}\">\n",
            node.level,
            escape_html(&node.id)
        );
        let _ = write!(
            svg,
            "    <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" fill=\"{}\" stroke=\"#2d3748\" stroke-width=\"1.5\" />\n",
            position.x,
            position.y,
            node_radius(node.level),
            node_fill(node.level)
        );
        let _ = write!(
            svg,
            "    <text x=\"{:.1}\" y=\"{:.1}\" fill=\"#1a202c\" font-size=\"11\" text-anchor=\"middle\">{}</text>\n",
            position.x,
            position.y + node_radius(node.level) + 12.0,
            escape_html(&truncate_label(&node.label))
        );
        if let Some(count) = node.count.filter(|&count| count > 0) {
            let _ = write!(
                svg,
                "    <text x=\"{:.1}\" y=\"{:.1}\" fill=\"#ef4444\" font-size=\"9\" font-weight=\"bold\" text-anchor=\"middle\">{}</text>\n",
                position.x + node_radius(node.level),
                position.y - node_radius(node.level),
                count
            );
        }
        svg.push_str("  </g>\n");
    }

    svg.push_str("</svg>\n");
    svg
}

pub mod annotation;
pub mod coordinator;
pub mod edit;
pub mod graph;
pub mod layout;
pub mod locator;
pub mod markup;
#[cfg(feature = "server")]
pub mod serve;
pub mod session;

pub use annotation::{BiasAnnotation, BiasHierarchy, ResolvedHierarchy, clean_bias_label, slug};
pub use coordinator::{EdgeEmphasis, EmphasisMap, HighlightCoordinator, HighlightEvent, NodeEmphasis};
pub use edit::{EditReceipt, apply_edit};
pub use graph::{GraphEdge, HierarchyGraph, HierarchyNode, ROOT_ID, ROOT_LABEL};
pub use layout::{ForceLayout, NodePosition};
pub use locator::{LocatedSpan, locate};
pub use markup::{AnnotatedText, Segment, escape_html, render_graph_svg};
pub use session::ReviewSession;

/// Default canvas dimensions used when the host gives us nothing better.
pub const DEFAULT_CANVAS_WIDTH: f32 = 500.0;
pub const DEFAULT_CANVAS_HEIGHT: f32 = 300.0;

// Force simulation tuning. Spring rest lengths shrink with depth so the
// category ring dominates visually; collision radii shrink the same way.
pub const CHARGE_STRENGTH: f32 = -400.0;
pub const LINK_DISTANCE_ROOT: f32 = 120.0;
pub const LINK_DISTANCE_CATEGORY: f32 = 100.0;
pub const LINK_DISTANCE_DEFAULT: f32 = 80.0;
pub const LINK_STRENGTH: f32 = 0.7;
pub const AXIS_STRENGTH: f32 = 0.08;
pub const COLLIDE_RADIUS_ROOT: f32 = 50.0;
pub const COLLIDE_RADIUS_CATEGORY: f32 = 40.0;
pub const COLLIDE_RADIUS_SUBCATEGORY: f32 = 30.0;
pub const COLLIDE_RADIUS_TYPE: f32 = 25.0;

// Cooling schedule. A fresh simulation starts at full alpha and idles once
// it decays below ALPHA_MIN; drags hold it warm at DRAG_ALPHA_TARGET.
pub const ALPHA_INITIAL: f32 = 1.0;
pub const ALPHA_MIN: f32 = 0.001;
pub const ALPHA_DECAY: f32 = 0.0228;
pub const VELOCITY_RETENTION: f32 = 0.6;
pub const DRAG_ALPHA_TARGET: f32 = 0.3;
pub const REHEAT_ALPHA: f32 = 0.3;

// Highlight emphasis opacities shared by the graph and text views.
pub const DIM_NODE_OPACITY: f32 = 0.3;
pub const DIM_EDGE_OPACITY: f32 = 0.2;
pub const NEUTRAL_EDGE_OPACITY: f32 = 0.6;
pub const FULL_OPACITY: f32 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    /// The text at the recorded offsets no longer matches the span's phrase,
    /// typically because an earlier edit shifted offsets. The caller must
    /// re-render before retrying.
    #[error("stale edit: expected '{expected}' at {start}..{end}")]
    StaleEdit {
        expected: String,
        start: usize,
        end: usize,
    },

    /// The render target has no usable area; the layout declines to start.
    #[error("layout canvas unavailable ({width}x{height})")]
    EmptyCanvas { width: f32, height: f32 },
}

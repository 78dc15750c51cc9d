use tracing::{debug, warn};

use crate::annotation::BiasAnnotation;
use crate::coordinator::{EmphasisMap, HighlightCoordinator, HighlightEvent};
use crate::edit::{EditReceipt, apply_edit};
use crate::graph::HierarchyGraph;
use crate::layout::ForceLayout;
use crate::locator::{LocatedSpan, locate};
use crate::markup::AnnotatedText;
use crate::AnnotateError;

/// One user-facing review session: the source text, its located spans,
/// markup, hierarchy graph, force layout and highlight coordinator, all
/// owned together so nothing leaks between render passes.
///
/// Every `analyze` call rebuilds the whole pass off to the side and swaps
/// it in at once; callers never observe a half-applied highlight state, and
/// the previous pass's simulation is discarded rather than merged.
pub struct ReviewSession {
    width: f32,
    height: f32,
    text: String,
    annotations: Vec<BiasAnnotation>,
    spans: Vec<LocatedSpan>,
    markup: AnnotatedText,
    graph: HierarchyGraph,
    layout: Option<ForceLayout>,
    coordinator: HighlightCoordinator,
}

impl ReviewSession {
    /// Creates an empty session for a canvas of the given size. A zero-size
    /// canvas is tolerated here; the layout simply declines to start until
    /// a resize provides usable dimensions.
    pub fn new(width: f32, height: f32) -> Self {
        let mut session = Self {
            width,
            height,
            text: String::new(),
            annotations: Vec::new(),
            spans: Vec::new(),
            markup: AnnotatedText::render("", &[]),
            graph: HierarchyGraph::build(&[]),
            layout: None,
            coordinator: HighlightCoordinator::new(),
        };
        session.rebuild();
        session
    }

    /// Runs one full render pass over new input. An empty annotation list is
    /// success: plain text, a root-only graph, no highlights.
    pub fn analyze(&mut self, text: &str, annotations: Vec<BiasAnnotation>) {
        self.text = text.to_string();
        self.annotations = annotations;
        self.rebuild();
        self.coordinator.reset();
        debug!(
            spans = self.spans.len(),
            nodes = self.graph.nodes.len(),
            "render pass complete"
        );
    }

    fn rebuild(&mut self) {
        let spans = locate(&self.text, &self.annotations);
        let markup = AnnotatedText::render(&self.text, &spans);
        let graph = HierarchyGraph::build(&self.annotations);
        let layout = match ForceLayout::new(&graph, self.width, self.height) {
            Ok(layout) => Some(layout),
            Err(err) => {
                warn!(%err, "layout declined to start");
                None
            }
        };

        self.spans = spans;
        self.markup = markup;
        self.graph = graph;
        self.layout = layout;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[LocatedSpan] {
        &self.spans
    }

    pub fn markup(&self) -> &AnnotatedText {
        &self.markup
    }

    pub fn graph(&self) -> &HierarchyGraph {
        &self.graph
    }

    pub fn layout(&self) -> Option<&ForceLayout> {
        self.layout.as_ref()
    }

    pub fn layout_mut(&mut self) -> Option<&mut ForceLayout> {
        self.layout.as_mut()
    }

    pub fn coordinator_mut(&mut self) -> &mut HighlightCoordinator {
        &mut self.coordinator
    }

    /// Pointer entered a span or node with this hierarchy key.
    pub fn activate(&mut self, hierarchy_key: &str) {
        self.coordinator.activate(hierarchy_key);
    }

    /// Pointer left; both views return to neutral.
    pub fn reset(&mut self) {
        self.coordinator.reset();
    }

    /// Visual emphasis for the graph view under the current coordination
    /// state.
    pub fn emphasis(&self) -> EmphasisMap {
        EmphasisMap::for_state(&self.graph, self.coordinator.current())
    }

    /// Active flags for the text view, parallel to `spans()`.
    pub fn span_active_flags(&self) -> Vec<bool> {
        match self.coordinator.current() {
            Some(HighlightEvent::Activate { hierarchy_key }) => self
                .spans
                .iter()
                .map(|span| span.hierarchy_key == *hierarchy_key)
                .collect(),
            _ => vec![false; self.spans.len()],
        }
    }

    /// Advances the layout simulation one step, if it is running.
    pub fn tick(&mut self) -> bool {
        self.layout.as_mut().is_some_and(ForceLayout::tick)
    }

    /// Applies the suggestion of the first span with this hierarchy key,
    /// then re-renders the edited text so the replacement becomes ground
    /// truth for any further pass.
    pub fn apply_edit(&mut self, hierarchy_key: &str) -> Result<EditReceipt, AnnotateError> {
        let span = self
            .spans
            .iter()
            .find(|span| span.hierarchy_key == hierarchy_key)
            .cloned()
            .ok_or_else(|| AnnotateError::StaleEdit {
                expected: hierarchy_key.to_string(),
                start: 0,
                end: 0,
            })?;

        let receipt = apply_edit(&self.text, &span, &span.suggestion)?;

        // Transfer the annotation's identity to the replacement before the
        // re-render, so the edited span keeps matching.
        if let Some(annotation) = self
            .annotations
            .iter_mut()
            .find(|annotation| annotation.phrase == span.phrase)
        {
            annotation.phrase = receipt.replacement.clone();
        }

        self.text = receipt.text.clone();
        self.rebuild();
        self.coordinator.reset();
        Ok(receipt)
    }

    /// Adopts a new canvas size and restarts the layout for it.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.layout = match ForceLayout::new(&self.graph, width, height) {
            Ok(layout) => Some(layout),
            Err(err) => {
                warn!(%err, "layout declined to start");
                None
            }
        };
    }
}

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::graph::HierarchyGraph;
use crate::{DIM_EDGE_OPACITY, DIM_NODE_OPACITY, FULL_OPACITY, NEUTRAL_EDGE_OPACITY};

/// A highlight coordination event, published whenever the pointer enters or
/// leaves a text span or graph node.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HighlightEvent {
    Activate { hierarchy_key: String },
    Reset,
}

type Listener = Box<dyn FnMut(&HighlightEvent) + Send>;

/// In-process pub/sub relay keeping the text view and the graph view in
/// sync. Delivery is synchronous and in subscription order; the last event
/// published is the authoritative state, so a reset issued after any number
/// of activations always leaves every listener in the neutral state.
#[derive(Default)]
pub struct HighlightCoordinator {
    listeners: Vec<Listener>,
    current: Option<HighlightEvent>,
}

impl std::fmt::Debug for HighlightCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightCoordinator")
            .field("listeners", &self.listeners.len())
            .field("current", &self.current)
            .finish()
    }
}

impl HighlightCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. It is immediately brought up to date with the
    /// current state, if any event has been published.
    pub fn subscribe(&mut self, mut listener: impl FnMut(&HighlightEvent) + Send + 'static) {
        if let Some(current) = &self.current {
            listener(current);
        }
        self.listeners.push(Box::new(listener));
    }

    pub fn activate(&mut self, hierarchy_key: &str) {
        self.publish(HighlightEvent::Activate {
            hierarchy_key: hierarchy_key.to_string(),
        });
    }

    pub fn reset(&mut self) {
        self.publish(HighlightEvent::Reset);
    }

    fn publish(&mut self, event: HighlightEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
        self.current = Some(event);
    }

    /// The authoritative current state. `None` until the first event.
    pub fn current(&self) -> Option<&HighlightEvent> {
        self.current.as_ref()
    }

    /// The hierarchy key of the active highlight, if any.
    pub fn active_key(&self) -> Option<&str> {
        match &self.current {
            Some(HighlightEvent::Activate { hierarchy_key }) => Some(hierarchy_key),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeEmphasis {
    pub opacity: f32,
    pub outlined: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeEmphasis {
    pub opacity: f32,
}

/// Per-node and per-edge visual emphasis for one coordination state. Edge
/// entries are parallel to the graph's edge list.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmphasisMap {
    pub nodes: HashMap<String, NodeEmphasis>,
    pub edges: Vec<EdgeEmphasis>,
}

impl EmphasisMap {
    /// Neutral state: every node at full opacity with no outline, edges at
    /// their resting opacity.
    pub fn neutral(graph: &HierarchyGraph) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .map(|node| {
                (
                    node.id.clone(),
                    NodeEmphasis {
                        opacity: FULL_OPACITY,
                        outlined: false,
                    },
                )
            })
            .collect();
        let edges = graph
            .edges
            .iter()
            .map(|_| EdgeEmphasis {
                opacity: NEUTRAL_EDGE_OPACITY,
            })
            .collect();
        Self { nodes, edges }
    }

    /// Activation state for `hierarchy_key`: the matching node, every
    /// ancestor up to the root, and the edges connecting that chain keep
    /// full opacity (nodes also gain an outline); everything else is dimmed.
    /// An unknown key yields the neutral state.
    pub fn for_activation(graph: &HierarchyGraph, hierarchy_key: &str) -> Self {
        let chain = graph.ancestor_chain(hierarchy_key);
        if chain.is_empty() {
            return Self::neutral(graph);
        }
        let chain_set: HashSet<&str> = chain.iter().map(String::as_str).collect();

        let nodes = graph
            .nodes
            .iter()
            .map(|node| {
                let on_chain = chain_set.contains(node.id.as_str());
                (
                    node.id.clone(),
                    NodeEmphasis {
                        opacity: if on_chain { FULL_OPACITY } else { DIM_NODE_OPACITY },
                        outlined: on_chain,
                    },
                )
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .map(|edge| {
                let on_chain = chain_set.contains(edge.source.as_str())
                    && chain_set.contains(edge.target.as_str());
                EdgeEmphasis {
                    opacity: if on_chain { FULL_OPACITY } else { DIM_EDGE_OPACITY },
                }
            })
            .collect();

        Self { nodes, edges }
    }

    /// Emphasis for whatever state the coordinator last published.
    pub fn for_state(graph: &HierarchyGraph, state: Option<&HighlightEvent>) -> Self {
        match state {
            Some(HighlightEvent::Activate { hierarchy_key }) => {
                Self::for_activation(graph, hierarchy_key)
            }
            _ => Self::neutral(graph),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn reset_is_the_terminal_state() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut coordinator = HighlightCoordinator::new();
        coordinator.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        coordinator.activate("human-bias-cognitive-implicit-bias");
        coordinator.activate("systemic-bias-historical-redlining");
        coordinator.reset();

        assert_eq!(coordinator.current(), Some(&HighlightEvent::Reset));
        assert_eq!(coordinator.active_key(), None);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.last(), Some(&HighlightEvent::Reset));
    }

    #[test]
    fn late_subscribers_catch_up() {
        let mut coordinator = HighlightCoordinator::new();
        coordinator.activate("human-bias-general-general");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        coordinator.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        assert_eq!(
            seen.lock().unwrap().first(),
            Some(&HighlightEvent::Activate {
                hierarchy_key: "human-bias-general-general".to_string()
            })
        );
    }
}

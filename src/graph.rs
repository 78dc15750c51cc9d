use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::annotation::BiasAnnotation;

pub const ROOT_ID: &str = "root";
pub const ROOT_LABEL: &str = "Biases";

/// One node in the category → subcategory → type hierarchy. Interior levels
/// carry a rolled-up annotation count; leaf type nodes instead accumulate
/// the phrases and suggestions filed under them.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub id: String,
    pub label: String,
    pub level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phrases: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl HierarchyNode {
    fn interior(id: String, label: String, level: u8, parent_id: Option<String>) -> Self {
        Self {
            id,
            label,
            level,
            parent_id,
            count: Some(0),
            phrases: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    fn leaf(id: String, label: String, parent_id: String) -> Self {
        Self {
            id,
            label,
            level: 3,
            parent_id: Some(parent_id),
            count: None,
            phrases: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// The full hierarchy graph for one render pass. Rebuilt wholesale on every
/// build; node identity across passes exists only through recomputed ids.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyGraph {
    pub nodes: Vec<HierarchyNode>,
    pub edges: Vec<GraphEdge>,
}

impl HierarchyGraph {
    /// Folds a flat annotation list into the root → category → subcategory
    /// → type tree. Shared ancestors are inserted once; counts accumulate on
    /// the root, category and subcategory levels; leaf nodes collect every
    /// phrase and suggestion that rolls up to them. Annotations without a
    /// usable category are reported and skipped.
    pub fn build(annotations: &[BiasAnnotation]) -> Self {
        let mut builder = GraphBuilder::new();

        for annotation in annotations {
            let Some(hierarchy) = annotation.resolved_hierarchy() else {
                warn!(phrase = %annotation.phrase, "annotation missing hierarchy category; skipping");
                continue;
            };

            let category_id = hierarchy.category_id();
            let subcategory_id = hierarchy.subcategory_id();
            let kind_id = hierarchy.kind_id();

            builder.upsert_interior(&category_id, &hierarchy.category, 1, ROOT_ID);
            builder.increment(&category_id);

            builder.upsert_interior(&subcategory_id, &hierarchy.subcategory, 2, &category_id);
            builder.increment(&subcategory_id);

            builder.upsert_leaf(&kind_id, &hierarchy.kind, &subcategory_id);
            builder.push_instance(&kind_id, &annotation.phrase, &annotation.suggestion);

            builder.increment(ROOT_ID);
        }

        builder.finish()
    }

    pub fn node(&self, id: &str) -> Option<&HierarchyNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Ids on the path from `id` up to the root, starting with `id` itself.
    /// Empty when `id` is not in the graph.
    pub fn ancestor_chain(&self, id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            chain.push(node.id.clone());
            current = node.parent_id.as_deref().and_then(|parent| self.node(parent));
        }
        chain
    }

    /// Number of distinct bias categories found.
    pub fn category_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.level == 1).count()
    }

    /// Total number of bias instances rolled up under the root.
    pub fn instance_count(&self) -> u32 {
        self.node(ROOT_ID).and_then(|root| root.count).unwrap_or(0)
    }
}

struct GraphBuilder {
    nodes: Vec<HierarchyNode>,
    index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    edge_seen: HashSet<(String, String)>,
}

impl GraphBuilder {
    fn new() -> Self {
        let root = HierarchyNode::interior(ROOT_ID.to_string(), ROOT_LABEL.to_string(), 0, None);
        let mut index = HashMap::new();
        index.insert(ROOT_ID.to_string(), 0);
        Self {
            nodes: vec![root],
            index,
            edges: Vec::new(),
            edge_seen: HashSet::new(),
        }
    }

    fn upsert_interior(&mut self, id: &str, label: &str, level: u8, parent_id: &str) {
        if !self.index.contains_key(id) {
            self.index.insert(id.to_string(), self.nodes.len());
            self.nodes.push(HierarchyNode::interior(
                id.to_string(),
                label.to_string(),
                level,
                Some(parent_id.to_string()),
            ));
        }
        self.link(parent_id, id);
    }

    fn upsert_leaf(&mut self, id: &str, label: &str, parent_id: &str) {
        if !self.index.contains_key(id) {
            self.index.insert(id.to_string(), self.nodes.len());
            self.nodes.push(HierarchyNode::leaf(
                id.to_string(),
                label.to_string(),
                parent_id.to_string(),
            ));
        }
        self.link(parent_id, id);
    }

    fn link(&mut self, source: &str, target: &str) {
        let key = (source.to_string(), target.to_string());
        if self.edge_seen.insert(key) {
            self.edges.push(GraphEdge {
                source: source.to_string(),
                target: target.to_string(),
            });
        }
    }

    fn increment(&mut self, id: &str) {
        if let Some(&at) = self.index.get(id) {
            if let Some(count) = self.nodes[at].count.as_mut() {
                *count += 1;
            }
        }
    }

    fn push_instance(&mut self, id: &str, phrase: &str, suggestion: &str) {
        if let Some(&at) = self.index.get(id) {
            let node = &mut self.nodes[at];
            node.phrases.push(phrase.to_string());
            node.suggestions.push(suggestion.to_string());
        }
    }

    fn finish(self) -> HierarchyGraph {
        HierarchyGraph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

use std::collections::HashMap;

use serde::Serialize;

use crate::graph::HierarchyGraph;
use crate::*;

const GOLDEN_ANGLE: f32 = 2.399_963_2; // radians
const SEED_RADIUS_STEP: f32 = 18.0;
const MIN_DISTANCE2: f32 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone)]
struct Body {
    id: String,
    level: u8,
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    fx: Option<f32>,
    fy: Option<f32>,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    source: usize,
    target: usize,
    distance: f32,
}

/// Iterative force-directed layout for one hierarchy graph.
///
/// The simulation is discrete-time: the host calls [`ForceLayout::tick`] on
/// a fixed cadence and stops once [`ForceLayout::is_idle`] reports that the
/// alpha cooling parameter has decayed below threshold. External mutations
/// (drags, resizes) reheat it so the layout can adapt. All state here is
/// transient and rebuilt whenever the graph changes.
#[derive(Debug, Clone)]
pub struct ForceLayout {
    bodies: Vec<Body>,
    index: HashMap<String, usize>,
    links: Vec<Link>,
    width: f32,
    height: f32,
    alpha: f32,
    alpha_target: f32,
}

fn collide_radius(level: u8) -> f32 {
    match level {
        0 => COLLIDE_RADIUS_ROOT,
        1 => COLLIDE_RADIUS_CATEGORY,
        2 => COLLIDE_RADIUS_SUBCATEGORY,
        _ => COLLIDE_RADIUS_TYPE,
    }
}

fn link_distance(upper_level: u8) -> f32 {
    match upper_level {
        0 => LINK_DISTANCE_ROOT,
        1 => LINK_DISTANCE_CATEGORY,
        _ => LINK_DISTANCE_DEFAULT,
    }
}

impl ForceLayout {
    /// Builds a layout over `graph` for a canvas of the given size. The root
    /// node is pinned at the canvas center for the life of the layout; other
    /// nodes are seeded deterministically on an outward spiral.
    pub fn new(graph: &HierarchyGraph, width: f32, height: f32) -> Result<Self, AnnotateError> {
        if !(width > 0.0) || !(height > 0.0) {
            return Err(AnnotateError::EmptyCanvas { width, height });
        }

        let cx = width / 2.0;
        let cy = height / 2.0;

        let mut bodies = Vec::with_capacity(graph.nodes.len());
        let mut index = HashMap::with_capacity(graph.nodes.len());
        let mut placed = 0usize;

        for node in &graph.nodes {
            let (x, y, fx, fy) = if node.level == 0 {
                (cx, cy, Some(cx), Some(cy))
            } else {
                let radius = SEED_RADIUS_STEP * ((placed + 1) as f32).sqrt();
                let angle = placed as f32 * GOLDEN_ANGLE;
                placed += 1;
                (cx + radius * angle.cos(), cy + radius * angle.sin(), None, None)
            };
            index.insert(node.id.clone(), bodies.len());
            bodies.push(Body {
                id: node.id.clone(),
                level: node.level,
                x,
                y,
                vx: 0.0,
                vy: 0.0,
                fx,
                fy,
            });
        }

        let mut links = Vec::with_capacity(graph.edges.len());
        for edge in &graph.edges {
            let (Some(&source), Some(&target)) =
                (index.get(&edge.source), index.get(&edge.target))
            else {
                continue;
            };
            let upper_level = bodies[source].level.min(bodies[target].level);
            links.push(Link {
                source,
                target,
                distance: link_distance(upper_level),
            });
        }

        Ok(Self {
            bodies,
            index,
            links,
            width,
            height,
            alpha: ALPHA_INITIAL,
            alpha_target: 0.0,
        })
    }

    pub fn canvas_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn is_idle(&self) -> bool {
        self.alpha < ALPHA_MIN && self.alpha_target < ALPHA_MIN
    }

    /// Warms the simulation back up after an external mutation.
    pub fn reheat(&mut self) {
        self.alpha = self.alpha.max(REHEAT_ALPHA);
    }

    /// Advances the simulation by one step. Returns `false` without touching
    /// any positions when the simulation has already cooled to idle.
    pub fn tick(&mut self) -> bool {
        if self.is_idle() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * ALPHA_DECAY;

        self.apply_link_springs();
        self.apply_many_body();
        self.apply_axis_pull();
        self.integrate();
        self.recenter();
        self.resolve_collisions();

        true
    }

    /// Ticks until the simulation idles, bounded by `max_ticks`. Returns the
    /// number of ticks actually run.
    pub fn run_to_idle(&mut self, max_ticks: usize) -> usize {
        let mut ran = 0;
        while ran < max_ticks && self.tick() {
            ran += 1;
        }
        ran
    }

    fn apply_link_springs(&mut self) {
        for link in &self.links {
            let source = &self.bodies[link.source];
            let target = &self.bodies[link.target];
            let dx = (target.x + target.vx) - (source.x + source.vx);
            let dy = (target.y + target.vy) - (source.y + source.vy);
            let len = (dx * dx + dy * dy).sqrt().max(1e-3);
            let push = (len - link.distance) / len * self.alpha * LINK_STRENGTH;
            let fx = dx * push * 0.5;
            let fy = dy * push * 0.5;

            let target = &mut self.bodies[link.target];
            target.vx -= fx;
            target.vy -= fy;
            let source = &mut self.bodies[link.source];
            source.vx += fx;
            source.vy += fy;
        }
    }

    fn apply_many_body(&mut self) {
        for i in 0..self.bodies.len() {
            for j in (i + 1)..self.bodies.len() {
                let dx = self.bodies[j].x - self.bodies[i].x;
                let dy = self.bodies[j].y - self.bodies[i].y;
                let dist2 = (dx * dx + dy * dy).max(MIN_DISTANCE2);
                let weight = CHARGE_STRENGTH * self.alpha / dist2;
                self.bodies[i].vx += dx * weight;
                self.bodies[i].vy += dy * weight;
                self.bodies[j].vx -= dx * weight;
                self.bodies[j].vy -= dy * weight;
            }
        }
    }

    fn apply_axis_pull(&mut self) {
        let cx = self.width / 2.0;
        let cy = self.height / 2.0;
        for body in &mut self.bodies {
            body.vx += (cx - body.x) * AXIS_STRENGTH * self.alpha;
            body.vy += (cy - body.y) * AXIS_STRENGTH * self.alpha;
        }
    }

    fn integrate(&mut self) {
        for body in &mut self.bodies {
            if let (Some(fx), Some(fy)) = (body.fx, body.fy) {
                body.x = fx;
                body.y = fy;
                body.vx = 0.0;
                body.vy = 0.0;
                continue;
            }
            body.vx *= VELOCITY_RETENTION;
            body.vy *= VELOCITY_RETENTION;
            body.x += body.vx;
            body.y += body.vy;
        }
    }

    fn recenter(&mut self) {
        if self.bodies.is_empty() {
            return;
        }
        let count = self.bodies.len() as f32;
        let shift_x = self.bodies.iter().map(|b| b.x).sum::<f32>() / count - self.width / 2.0;
        let shift_y = self.bodies.iter().map(|b| b.y).sum::<f32>() / count - self.height / 2.0;
        for body in &mut self.bodies {
            if body.fx.is_none() && body.fy.is_none() {
                body.x -= shift_x;
                body.y -= shift_y;
            }
        }
    }

    fn resolve_collisions(&mut self) {
        for i in 0..self.bodies.len() {
            for j in (i + 1)..self.bodies.len() {
                let radius = collide_radius(self.bodies[i].level) + collide_radius(self.bodies[j].level);
                let mut dx = self.bodies[j].x - self.bodies[i].x;
                let mut dy = self.bodies[j].y - self.bodies[i].y;
                let mut dist = (dx * dx + dy * dy).sqrt();
                if dist >= radius {
                    continue;
                }
                if dist < 1e-3 {
                    // Coincident nodes get a deterministic nudge apart.
                    dx = 0.1 * (i as f32 + 1.0);
                    dy = 0.1;
                    dist = (dx * dx + dy * dy).sqrt();
                }
                let overlap = (radius - dist) / dist;
                let i_pinned = self.bodies[i].fx.is_some();
                let j_pinned = self.bodies[j].fx.is_some();
                let (push_i, push_j) = match (i_pinned, j_pinned) {
                    (true, true) => (0.0, 0.0),
                    (true, false) => (0.0, 1.0),
                    (false, true) => (1.0, 0.0),
                    (false, false) => (0.5, 0.5),
                };
                self.bodies[i].x -= dx * overlap * push_i;
                self.bodies[i].y -= dy * overlap * push_i;
                self.bodies[j].x += dx * overlap * push_j;
                self.bodies[j].y += dy * overlap * push_j;
            }
        }
    }

    /// Pins a node at its current position and holds the simulation warm for
    /// the duration of the drag. Returns `false` for unknown ids.
    pub fn begin_drag(&mut self, id: &str) -> bool {
        let Some(&at) = self.index.get(id) else {
            return false;
        };
        let body = &mut self.bodies[at];
        body.fx = Some(body.x);
        body.fy = Some(body.y);
        self.alpha_target = DRAG_ALPHA_TARGET;
        self.reheat();
        true
    }

    pub fn drag_to(&mut self, id: &str, x: f32, y: f32) -> bool {
        let Some(&at) = self.index.get(id) else {
            return false;
        };
        let body = &mut self.bodies[at];
        body.fx = Some(x);
        body.fy = Some(y);
        body.x = x;
        body.y = y;
        true
    }

    /// Releases a dragged node back to the simulation. The root stays pinned
    /// at the canvas center for the life of the layout.
    pub fn end_drag(&mut self, id: &str) -> bool {
        let Some(&at) = self.index.get(id) else {
            return false;
        };
        self.alpha_target = 0.0;
        let body = &mut self.bodies[at];
        if body.level != 0 {
            body.fx = None;
            body.fy = None;
        }
        true
    }

    pub fn position(&self, id: &str) -> Option<NodePosition> {
        self.index.get(id).map(|&at| NodePosition {
            x: self.bodies[at].x,
            y: self.bodies[at].y,
        })
    }

    pub fn positions(&self) -> HashMap<String, NodePosition> {
        self.bodies
            .iter()
            .map(|body| (body.id.clone(), NodePosition { x: body.x, y: body.y }))
            .collect()
    }
}

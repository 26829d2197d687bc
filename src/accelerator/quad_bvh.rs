use crate::accelerator::builder::{build_tree, BuildNode};
use crate::accelerator::{Accelerator, TokenBound};
use crate::math::bbox::{BBox3, BBox3x4};
use crate::math::ray::Ray;
use crate::prepare::pack::PreparedPack;
use crate::scene::query::{OccludeQuery, TraceQuery};
use crate::scene::token::{EntityToken, TokenKind};

use arrayvec::ArrayVec;

// Up to three pushes per level instead of one; sized accordingly.
const STACK_DEPTH: usize = 256;

struct QuadNode {
    bounds: BBox3x4,
    /// Child slots: `Node` tokens index back into the node array, `Empty`
    /// pads unused lanes, anything else is a primitive handed to the pack.
    children: [EntityToken; 4],
}

/// Four-wide collapse of the binary hierarchy: each node tests the boxes
/// of up to four grandchildren in one SIMD sweep. The preferred structure
/// once packs grow into the hundreds of primitives.
pub struct QuadBvh {
    nodes: Vec<QuadNode>,
    bounds: BBox3,
}

impl QuadBvh {
    pub fn new(pairs: Vec<TokenBound>) -> Self {
        let tree = build_tree(pairs);
        let bounds = tree.as_ref().map_or_else(BBox3::new, |t| t.bounds());

        let mut nodes = Vec::new();
        if let Some(tree) = tree {
            collapse(&tree, &mut nodes);
        }

        QuadBvh { nodes, bounds }
    }
}

// Collapses a binary node into a four-way one by pulling its grandchildren
// up; a leaf child occupies a lane directly.
fn collapse(node: &BuildNode, nodes: &mut Vec<QuadNode>) -> u32 {
    let mut slots: ArrayVec<&BuildNode, 4> = ArrayVec::new();
    match node {
        BuildNode::Leaf { .. } => slots.push(node),
        BuildNode::Inner { children, .. } => {
            for child in children {
                match child.as_ref() {
                    leaf @ BuildNode::Leaf { .. } => slots.push(leaf),
                    BuildNode::Inner { children, .. } => {
                        slots.push(children[0].as_ref());
                        slots.push(children[1].as_ref());
                    }
                }
            }
        }
    }

    let index = nodes.len();
    let mut boxes = [BBox3::new(); 4];
    for (lane, &slot) in slots.iter().enumerate() {
        boxes[lane] = slot.bounds();
    }
    nodes.push(QuadNode {
        bounds: BBox3x4::new(boxes),
        children: [EntityToken::empty(); 4],
    });

    let mut children = [EntityToken::empty(); 4];
    for (lane, &slot) in slots.iter().enumerate() {
        children[lane] = match slot {
            BuildNode::Leaf { token, .. } => *token,
            BuildNode::Inner { .. } => {
                let child_index = collapse(slot, nodes);
                EntityToken::new(TokenKind::Node, child_index as usize)
            }
        };
    }
    nodes[index].children = children;

    index as u32
}

// The four lane distances ordered ascending, ties by lane. Insertion sort;
// four elements do not deserve more.
fn ordered_lanes(entries: [f32; 4]) -> [(f32, usize); 4] {
    let mut order = [
        (entries[0], 0),
        (entries[1], 1),
        (entries[2], 2),
        (entries[3], 3),
    ];
    for i in 1..4 {
        let mut j = i;
        while j > 0 && order[j - 1].0 > order[j].0 {
            order.swap(j - 1, j);
            j -= 1;
        }
    }
    order
}

impl Accelerator for QuadBvh {
    fn trace(&self, pack: &PreparedPack, query: &mut TraceQuery) {
        if self.nodes.is_empty() {
            return;
        }
        let inv_dir = query.ray.inv_dir();

        let mut stack: ArrayVec<u32, STACK_DEPTH> = ArrayVec::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            let entries = node.bounds.intersect4(query.ray, inv_dir, query.distance);

            // Nearest lane first; each lane re-checks against the distance
            // the previous lanes may have tightened.
            for (entry, lane) in ordered_lanes(entries) {
                if entry >= query.distance {
                    break;
                }
                let child = node.children[lane];
                match child.kind() {
                    TokenKind::Empty => {}
                    TokenKind::Node => stack.push(child.index() as u32),
                    _ => pack.trace_token(child, query),
                }
            }
        }
    }

    fn occlude(&self, pack: &PreparedPack, query: &mut OccludeQuery) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let inv_dir = query.ray.inv_dir();

        let mut stack: ArrayVec<u32, STACK_DEPTH> = ArrayVec::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            let entries = node.bounds.intersect4(query.ray, inv_dir, query.travel);

            for (lane, &entry) in entries.iter().enumerate() {
                if entry >= query.travel {
                    continue;
                }
                let child = node.children[lane];
                match child.kind() {
                    TokenKind::Empty => {}
                    TokenKind::Node => stack.push(child.index() as u32),
                    _ => {
                        if pack.occlude_token(child, query) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }

    fn trace_cost(&self, pack: &PreparedPack, ray: Ray, distance: &mut f32) -> u32 {
        if self.nodes.is_empty() {
            return 0;
        }
        let inv_dir = ray.inv_dir();
        let mut cost = 0u32;

        let mut stack: ArrayVec<u32, STACK_DEPTH> = ArrayVec::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            cost += 4;
            let entries = node.bounds.intersect4(ray, inv_dir, *distance);

            for (entry, lane) in ordered_lanes(entries) {
                if entry >= *distance {
                    break;
                }
                let child = node.children[lane];
                match child.kind() {
                    TokenKind::Empty => {}
                    TokenKind::Node => stack.push(child.index() as u32),
                    _ => cost += pack.cost_token(child, ray, distance),
                }
            }
        }
        cost
    }

    fn bounds(&self) -> BBox3 {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_order_by_distance_with_stable_ties() {
        let order = ordered_lanes([3., 1., f32::INFINITY, 1.]);
        assert_eq!(order[0], (1., 1));
        assert_eq!(order[1], (1., 3));
        assert_eq!(order[2], (3., 0));
        assert_eq!(order[3].1, 2);
    }
}

use crate::accelerator::builder::{build_tree, BuildNode};
use crate::accelerator::{Accelerator, TokenBound};
use crate::math::bbox::BBox3;
use crate::math::ray::Ray;
use crate::prepare::pack::PreparedPack;
use crate::scene::query::{OccludeQuery, TraceQuery};
use crate::scene::token::EntityToken;

use arrayvec::ArrayVec;

// Generous for a height-capped tree; traversal pushes at most one entry
// per level.
const STACK_DEPTH: usize = 128;

enum Node {
    Leaf {
        token: EntityToken,
    },
    Inner {
        children: [u32; 2],
        child_bounds: [BBox3; 2],
    },
}

/// Binary bounding-volume hierarchy with one primitive per leaf. Inner
/// nodes carry their children's boxes so a visit tests both in one step
/// and descends the nearer side first.
pub struct Bvh {
    nodes: Vec<Node>,
    bounds: BBox3,
}

impl Bvh {
    pub fn new(pairs: Vec<TokenBound>) -> Self {
        let tree = build_tree(pairs);
        let bounds = tree.as_ref().map_or_else(BBox3::new, |t| t.bounds());

        let mut nodes = Vec::new();
        if let Some(tree) = tree {
            flatten(&tree, &mut nodes);
        }

        Bvh { nodes, bounds }
    }
}

// Depth-first flatten; children of a node always land after it, so index
// zero is the root.
fn flatten(node: &BuildNode, nodes: &mut Vec<Node>) -> u32 {
    let index = nodes.len() as u32;
    match node {
        BuildNode::Leaf { token, .. } => {
            nodes.push(Node::Leaf { token: *token });
        }
        BuildNode::Inner { children, .. } => {
            nodes.push(Node::Inner {
                children: [0; 2],
                child_bounds: [children[0].bounds(), children[1].bounds()],
            });
            let left = flatten(&children[0], nodes);
            let right = flatten(&children[1], nodes);
            if let Node::Inner { children, .. } = &mut nodes[index as usize] {
                *children = [left, right];
            }
        }
    }
    index
}

impl Accelerator for Bvh {
    fn trace(&self, pack: &PreparedPack, query: &mut TraceQuery) {
        if self.nodes.is_empty() {
            return;
        }
        let inv_dir = query.ray.inv_dir();
        if self
            .bounds
            .intersect(query.ray, inv_dir, query.distance)
            .is_infinite()
        {
            return;
        }

        let mut stack: ArrayVec<u32, STACK_DEPTH> = ArrayVec::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            match &self.nodes[index as usize] {
                Node::Leaf { token } => pack.trace_token(*token, query),
                Node::Inner {
                    children,
                    child_bounds,
                } => {
                    let t0 = child_bounds[0].intersect(query.ray, inv_dir, query.distance);
                    let t1 = child_bounds[1].intersect(query.ray, inv_dir, query.distance);

                    // Nearer child first; the farther one is pushed and
                    // pruned against the tightened distance when popped.
                    let (near, far, t_far) = if t0 <= t1 {
                        (children[0], children[1], t1)
                    } else {
                        (children[1], children[0], t0)
                    };

                    if t_far < query.distance {
                        stack.push(far);
                    }
                    let t_near = t0.min(t1);
                    if t_near < query.distance {
                        stack.push(near);
                    }
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
            match &self.nodes[index as usize] {
                Node::Leaf { token } => {
                    if pack.occlude_token(*token, query) {
                        return true;
                    }
                }
                Node::Inner {
                    children,
                    child_bounds,
                } => {
                    for (child, bound) in children.iter().zip(child_bounds.iter()) {
                        if bound.intersect(query.ray, inv_dir, query.travel) < query.travel {
                            stack.push(*child);
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
        let mut cost = 1u32;
        if self.bounds.intersect(ray, inv_dir, *distance).is_infinite() {
            return cost;
        }

        let mut stack: ArrayVec<u32, STACK_DEPTH> = ArrayVec::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            match &self.nodes[index as usize] {
                Node::Leaf { token } => cost += pack.cost_token(*token, ray, distance),
                Node::Inner {
                    children,
                    child_bounds,
                } => {
                    cost += 2;
                    let t0 = child_bounds[0].intersect(ray, inv_dir, *distance);
                    let t1 = child_bounds[1].intersect(ray, inv_dir, *distance);
                    let (near, far, t_far) = if t0 <= t1 {
                        (children[0], children[1], t1)
                    } else {
                        (children[1], children[0], t0)
                    };
                    if t_far < *distance {
                        stack.push(far);
                    }
                    if t0.min(t1) < *distance {
                        stack.push(near);
                    }
                }
            }
        }
        cost
    }

    fn bounds(&self) -> BBox3 {
        self.bounds
    }
}

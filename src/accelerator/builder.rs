// Shared top-down surface-area-heuristic construction. Both hierarchy
// variants consume the same binary tree; they differ only in how they
// flatten it.

use crate::accelerator::TokenBound;
use crate::math::bbox::BBox3;

use order_stat::kth_by;

pub enum BuildNode {
    Leaf {
        bounds: BBox3,
        token: crate::scene::token::EntityToken,
    },
    Inner {
        bounds: BBox3,
        children: [Box<BuildNode>; 2],
    },
}

impl BuildNode {
    pub fn bounds(&self) -> BBox3 {
        match self {
            BuildNode::Leaf { bounds, .. } | BuildNode::Inner { bounds, .. } => *bounds,
        }
    }
}

// Number of stride-sampled split candidates evaluated per node.
const SPLIT_CANDIDATES: usize = 7;

// Past this depth the heuristic is abandoned for median splits, which
// bounds the tree height (and with it every traversal stack).
const SAH_DEPTH_LIMIT: usize = 32;

pub fn build_tree(mut pairs: Vec<TokenBound>) -> Option<BuildNode> {
    if pairs.is_empty() {
        return None;
    }
    Some(build_recursive(&mut pairs, 0))
}

fn build_recursive(pairs: &mut [TokenBound], depth: usize) -> BuildNode {
    let bounds = pairs
        .iter()
        .fold(BBox3::new(), |all, (_, bound)| all.combine_bnd(*bound));

    if pairs.len() == 1 {
        return BuildNode::Leaf {
            bounds,
            token: pairs[0].0,
        };
    }

    let centroid_bounds = pairs.iter().fold(BBox3::new(), |all, (_, bound)| {
        all.combine_pnt(bound.centroid())
    });
    let axis = centroid_bounds.max_dim();

    let mid = if centroid_bounds.diagonal()[axis] == 0. || depth > SAH_DEPTH_LIMIT {
        // Degenerate spread (or a pathologically deep recursion): split
        // into equal halves by the centroid median.
        let mid = pairs.len() / 2;
        kth_by(pairs, mid, |a, b| {
            a.1.centroid()[axis]
                .partial_cmp(&b.1.centroid()[axis])
                .unwrap()
        });
        mid
    } else {
        pairs.sort_unstable_by(|a, b| {
            a.1.centroid()[axis]
                .partial_cmp(&b.1.centroid()[axis])
                .unwrap()
        });
        best_split(pairs)
    };

    let (left, right) = pairs.split_at_mut(mid);
    BuildNode::Inner {
        bounds,
        children: [
            Box::new(build_recursive(left, depth + 1)),
            Box::new(build_recursive(right, depth + 1)),
        ],
    }
}

// Evaluates `cost = A_L * n_L + A_R * n_R` at up to SPLIT_CANDIDATES
// evenly strided positions over the sorted primitives and returns the
// split index with the cheapest cost.
fn best_split(pairs: &[TokenBound]) -> usize {
    let count = pairs.len();

    // Suffix bounds so each candidate's right area is O(1).
    let mut suffix = vec![BBox3::new(); count + 1];
    for i in (0..count).rev() {
        suffix[i] = suffix[i + 1].combine_bnd(pairs[i].1);
    }

    let candidates = SPLIT_CANDIDATES.min(count - 1);
    let mut best_mid = count / 2;
    let mut best_cost = f32::INFINITY;

    let mut prefix = BBox3::new();
    let mut next_index = 0usize;
    for c in 1..=candidates {
        let mid = (count * c) / (candidates + 1);
        let mid = mid.clamp(1, count - 1);

        while next_index < mid {
            prefix = prefix.combine_bnd(pairs[next_index].1);
            next_index += 1;
        }

        let cost = prefix.surface_area() * mid as f32
            + suffix[mid].surface_area() * (count - mid) as f32;
        if cost < best_cost {
            best_cost = cost;
            best_mid = mid;
        }
    }

    best_mid
}

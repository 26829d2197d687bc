use crate::accelerator::{Accelerator, TokenBound};
use crate::math::bbox::{BBox3, BBox3x4};
use crate::math::ray::Ray;
use crate::prepare::pack::PreparedPack;
use crate::scene::query::{OccludeQuery, TraceQuery};
use crate::scene::token::EntityToken;

/// Exhaustive scan over primitives packed four to a group. No hierarchy to
/// descend means no ordering guarantee; ties resolve to whichever hit
/// tightened the distance first. The right structure for a handful of
/// primitives, where box tests dominate a tree's bookkeeping.
pub struct LinearAccelerator {
    groups: Vec<BBox3x4>,
    tokens: Vec<[EntityToken; 4]>,
    bounds: BBox3,
}

impl LinearAccelerator {
    pub fn new(pairs: Vec<TokenBound>) -> Self {
        let bounds = pairs
            .iter()
            .fold(BBox3::new(), |all, (_, bound)| all.combine_bnd(*bound));

        let mut groups = Vec::with_capacity(pairs.len().div_ceil(4));
        let mut tokens = Vec::with_capacity(groups.capacity());

        for chunk in pairs.chunks(4) {
            let mut boxes = [BBox3::new(); 4];
            let mut group_tokens = [EntityToken::empty(); 4];
            for (lane, (token, bound)) in chunk.iter().enumerate() {
                boxes[lane] = *bound;
                group_tokens[lane] = *token;
            }
            groups.push(BBox3x4::new(boxes));
            tokens.push(group_tokens);
        }

        LinearAccelerator {
            groups,
            tokens,
            bounds,
        }
    }
}

impl Accelerator for LinearAccelerator {
    fn trace(&self, pack: &PreparedPack, query: &mut TraceQuery) {
        let inv_dir = query.ray.inv_dir();
        for (group, tokens) in self.groups.iter().zip(self.tokens.iter()) {
            let entries = group.intersect4(query.ray, inv_dir, query.distance);
            for (lane, &entry) in entries.iter().enumerate() {
                if entry < query.distance {
                    pack.trace_token(tokens[lane], query);
                }
            }
        }
    }

    fn occlude(&self, pack: &PreparedPack, query: &mut OccludeQuery) -> bool {
        let inv_dir = query.ray.inv_dir();
        for (group, tokens) in self.groups.iter().zip(self.tokens.iter()) {
            let entries = group.intersect4(query.ray, inv_dir, query.travel);
            for (lane, &entry) in entries.iter().enumerate() {
                if entry < query.travel && pack.occlude_token(tokens[lane], query) {
                    return true;
                }
            }
        }
        false
    }

    fn trace_cost(&self, pack: &PreparedPack, ray: Ray, distance: &mut f32) -> u32 {
        let inv_dir = ray.inv_dir();
        let mut cost = 0u32;
        for (group, tokens) in self.groups.iter().zip(self.tokens.iter()) {
            cost += 4;
            let entries = group.intersect4(ray, inv_dir, *distance);
            for (lane, &entry) in entries.iter().enumerate() {
                if entry < *distance {
                    cost += pack.cost_token(tokens[lane], ray, distance);
                }
            }
        }
        cost
    }

    fn bounds(&self) -> BBox3 {
        self.bounds
    }
}

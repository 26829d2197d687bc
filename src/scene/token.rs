// Compact identifiers for everything an accelerator can point at. A token
// is a 4-bit kind plus a 28-bit index; a hierarchy is the chain of instance
// tokens leading to a leaf primitive.

use arrayvec::ArrayVec;

use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    Triangle = 0,
    Sphere = 1,
    Instance = 2,
    Node = 3,
    Empty = 4,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntityToken(u32);

impl EntityToken {
    pub const INDEX_BITS: u32 = 28;
    pub const INDEX_MASK: u32 = (1 << Self::INDEX_BITS) - 1;

    pub fn new(kind: TokenKind, index: usize) -> Self {
        debug_assert!(index as u32 <= Self::INDEX_MASK);
        EntityToken(((kind as u32) << Self::INDEX_BITS) | (index as u32 & Self::INDEX_MASK))
    }

    pub fn empty() -> Self {
        EntityToken::new(TokenKind::Empty, 0)
    }

    pub fn kind(self) -> TokenKind {
        match self.0 >> Self::INDEX_BITS {
            0 => TokenKind::Triangle,
            1 => TokenKind::Sphere,
            2 => TokenKind::Instance,
            3 => TokenKind::Node,
            _ => TokenKind::Empty,
        }
    }

    pub fn index(self) -> usize {
        (self.0 & Self::INDEX_MASK) as usize
    }

    pub fn is_empty(self) -> bool {
        self.kind() == TokenKind::Empty
    }
}

impl fmt::Debug for EntityToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}#{}", self.kind(), self.index())
    }
}

const MAX_DEPTH: usize = 8;

/// The instance path to a primitive: zero or more instance tokens followed
/// by the leaf geometry token. Depth is capped; preparation rejects scenes
/// that would nest deeper.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenHierarchy {
    stack: ArrayVec<EntityToken, MAX_DEPTH>,
}

impl TokenHierarchy {
    pub const MAX_DEPTH: usize = MAX_DEPTH;

    pub fn new() -> Self {
        TokenHierarchy {
            stack: ArrayVec::new(),
        }
    }

    pub fn push(&mut self, token: EntityToken) {
        self.stack.push(token);
    }

    pub fn pop(&mut self) -> Option<EntityToken> {
        self.stack.pop()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn leaf(&self) -> Option<EntityToken> {
        self.stack.last().copied()
    }

    pub fn tokens(&self) -> &[EntityToken] {
        &self.stack
    }

    /// Whether this hierarchy names exactly `current` extended by `leaf`.
    /// Shadow rays carry their origin's full path here so that the same
    /// emitter is not re-hit through any instance route.
    pub fn matches(&self, current: &TokenHierarchy, leaf: EntityToken) -> bool {
        self.stack.len() == current.stack.len() + 1
            && self.stack[..current.stack.len()] == current.stack[..]
            && self.stack[current.stack.len()] == leaf
    }

    /// `current` extended by `leaf`, for recording a hit.
    pub fn extended(current: &TokenHierarchy, leaf: EntityToken) -> Self {
        let mut result = current.clone();
        result.push(leaf);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_kind_and_index() {
        let token = EntityToken::new(TokenKind::Sphere, 123_456);
        assert_eq!(token.kind(), TokenKind::Sphere);
        assert_eq!(token.index(), 123_456);

        let max = EntityToken::new(TokenKind::Node, EntityToken::INDEX_MASK as usize);
        assert_eq!(max.index(), EntityToken::INDEX_MASK as usize);
    }

    #[test]
    fn empty_token_is_empty() {
        assert!(EntityToken::empty().is_empty());
        assert!(!EntityToken::new(TokenKind::Triangle, 0).is_empty());
    }

    #[test]
    fn hierarchy_matching_requires_full_path() {
        let instance = EntityToken::new(TokenKind::Instance, 4);
        let leaf = EntityToken::new(TokenKind::Triangle, 7);

        let mut current = TokenHierarchy::new();
        current.push(instance);

        let ignore = TokenHierarchy::extended(&current, leaf);
        assert!(ignore.matches(&current, leaf));

        // Same leaf through a different instance path is a different entity.
        let mut other = TokenHierarchy::new();
        other.push(EntityToken::new(TokenKind::Instance, 5));
        assert!(!ignore.matches(&other, leaf));

        // Same path, different leaf.
        assert!(!ignore.matches(&current, EntityToken::new(TokenKind::Triangle, 8)));
    }
}

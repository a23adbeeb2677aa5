use core::cmp::Ordering;

use crate::gfx::TextureId;

/// Stable sort key for batch geometry.
///
/// Ordering rules:
/// 1) `depth`: ascending (higher depth is drawn later, in front)
/// 2) `group`: ascending
/// 3) `texture`: ascending id, so equal-state geometry shares a bind
/// 4) `order`: registration order
///
/// A NaN depth sorts as `0.0`, so `f32::NEG_INFINITY` is always the back.
#[derive(Debug, Copy, Clone)]
pub struct BatchKey {
    pub depth: f32,
    pub group: i32,
    pub texture: TextureId,
    pub order: u64,
}

impl BatchKey {
    #[inline]
    pub const fn new(depth: f32, group: i32, texture: TextureId, order: u64) -> Self {
        let depth = if depth.is_nan() { 0.0 } else { depth };
        Self { depth, group, texture, order }
    }
}

impl Ord for BatchKey {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth
            .total_cmp(&other.depth)
            .then(self.group.cmp(&other.group))
            .then(self.texture.cmp(&other.texture))
            .then(self.order.cmp(&other.order))
    }
}

impl PartialOrd for BatchKey {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BatchKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BatchKey {}

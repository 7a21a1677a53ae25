//! Traversal constraints attached to a path request.

/// What a path request is allowed to traverse.
///
/// Passed through the broker to the search engine unchanged and reused by
/// surface queries (`nearest_on_surface`) so that clamping agrees with the
/// path that was searched.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathConstraints {
    /// Bit `n` set ⇒ edges tagged `n` may be traversed.  Default: all tags.
    pub traversable_tags: u32,

    /// Maximum distance from a requested endpoint to the nearest node the
    /// engine may snap to.  Default: unbounded.
    pub max_snap_distance: f32,
}

impl PathConstraints {
    /// Constraints that only allow the tags set in `mask`.
    pub fn with_tags(mask: u32) -> Self {
        Self { traversable_tags: mask, ..Self::default() }
    }

    /// `true` if edges carrying `tag` (0–31) may be traversed.
    #[inline]
    pub fn allows_tag(&self, tag: u8) -> bool {
        tag < 32 && self.traversable_tags & (1 << tag) != 0
    }
}

impl Default for PathConstraints {
    fn default() -> Self {
        Self {
            traversable_tags:  u32::MAX,
            max_snap_distance: f32::INFINITY,
        }
    }
}

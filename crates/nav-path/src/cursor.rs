//! The `PathCursor`: a position along a waypoint polyline.

use glam::Vec3;

use nav_core::MovementPlane;
use nav_core::geom::{closest_point_on_segment_factor, line_circle_intersection_factor};

/// A travelled distance along a bound waypoint sequence.
///
/// The cursor owns a copy of the waypoints plus their prefix arc lengths, so
/// the request that produced them can be recycled as soon as the path is
/// installed.  The buffers are reused across [`bind`](Self::bind) calls.
///
/// # Invariants
///
/// - A bound cursor always has at least two points.  A one-point sequence is
///   stored twice, giving a single zero-length segment, so no query divides
///   by a zero segment length.
/// - `distance ∈ [0, total_length]`.
/// - `segment` is the segment containing `distance`:
///   `cumulative[segment] <= distance <= cumulative[segment + 1]`.
///
/// Queries on an unbound cursor return zero vectors / zero distances; check
/// [`is_valid`](Self::is_valid) first where that matters.
#[derive(Clone, Debug, Default)]
pub struct PathCursor {
    points:     Vec<Vec3>,
    /// `cumulative[i]` = arc length from `points[0]` to `points[i]`.
    cumulative: Vec<f32>,
    distance:   f32,
    segment:    usize,
}

impl PathCursor {
    /// An unbound cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cursor bound to `sequence`.
    pub fn bound(sequence: &[Vec3]) -> Self {
        let mut cursor = Self::new();
        cursor.bind(sequence);
        cursor
    }

    // ── Binding ───────────────────────────────────────────────────────────

    /// Bind to `sequence`, resetting the distance to 0.
    ///
    /// An empty sequence leaves the cursor unbound.
    pub fn bind(&mut self, sequence: &[Vec3]) {
        self.points.clear();
        self.cumulative.clear();
        self.distance = 0.0;
        self.segment = 0;

        let Some(&first) = sequence.first() else {
            return;
        };
        self.points.extend_from_slice(sequence);
        if self.points.len() == 1 {
            self.points.push(first);
        }

        let mut acc = 0.0;
        self.cumulative.push(0.0);
        for pair in self.points.windows(2) {
            acc += pair[0].distance(pair[1]);
            self.cumulative.push(acc);
        }
    }

    /// Drop the bound sequence.
    pub fn unbind(&mut self) {
        self.bind(&[]);
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// `false` if no sequence is bound.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 2
    }

    /// The bound waypoints (empty when unbound).
    #[inline]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Travelled distance from the start of the path.
    #[inline]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Arc length of the whole path.
    #[inline]
    pub fn total_length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Distance left to the end of the path.
    #[inline]
    pub fn remaining_distance(&self) -> f32 {
        (self.total_length() - self.distance).max(0.0)
    }

    /// Index of the segment `points[i] .. points[i + 1]` the cursor is on.
    #[inline]
    pub fn segment_index(&self) -> usize {
        self.segment
    }

    /// World position at the travelled distance.
    pub fn current_point(&self) -> Vec3 {
        if !self.is_valid() {
            return Vec3::ZERO;
        }
        let s = self.segment;
        let start = self.cumulative[s];
        let length = self.cumulative[s + 1] - start;
        let t = if length > f32::EPSILON { (self.distance - start) / length } else { 0.0 };
        self.points[s].lerp(self.points[s + 1], t.clamp(0.0, 1.0))
    }

    /// Direction of travel on the current segment (not normalised).
    ///
    /// Zero on a zero-length segment, including the duplicated single point
    /// of a one-point path.
    pub fn tangent(&self) -> Vec3 {
        if !self.is_valid() {
            return Vec3::ZERO;
        }
        self.points[self.segment + 1] - self.points[self.segment]
    }

    /// First waypoint.
    pub fn start_point(&self) -> Vec3 {
        self.points.first().copied().unwrap_or(Vec3::ZERO)
    }

    /// Last waypoint.
    pub fn end_point(&self) -> Vec3 {
        self.points.last().copied().unwrap_or(Vec3::ZERO)
    }

    /// Fill `buffer` with the current point followed by every waypoint still
    /// ahead of the cursor.
    pub fn remaining_path(&self, buffer: &mut Vec<Vec3>) {
        buffer.clear();
        if !self.is_valid() {
            return;
        }
        buffer.push(self.current_point());
        buffer.extend_from_slice(&self.points[self.segment + 1..]);
    }

    // ── Movement ──────────────────────────────────────────────────────────

    /// Set the travelled distance, clamped to `[0, total_length]`.
    pub fn move_to(&mut self, distance: f32) {
        if !self.is_valid() {
            return;
        }
        self.distance = distance.clamp(0.0, self.total_length());

        // Walk outward from the cached segment.
        let last = self.points.len() - 2;
        while self.segment < last && self.cumulative[self.segment + 1] < self.distance {
            self.segment += 1;
        }
        while self.segment > 0 && self.cumulative[self.segment] > self.distance {
            self.segment -= 1;
        }
    }

    /// Move to the point on the whole path closest to `point`.
    ///
    /// Ties go to the earliest segment.  Returns the new current point.
    pub fn snap_to_closest_point(&mut self, point: Vec3) -> Vec3 {
        if !self.is_valid() {
            return Vec3::ZERO;
        }
        let mut best = (0, 0.0, f32::INFINITY);
        for s in 0..self.points.len() - 1 {
            let (a, b) = (self.points[s], self.points[s + 1]);
            let t = closest_point_on_segment_factor(a, b, point);
            let d = a.lerp(b, t).distance_squared(point);
            if d < best.2 {
                best = (s, t, d);
            }
        }
        self.move_to_segment(best.0, best.1);
        self.current_point()
    }

    /// Local variant of [`snap_to_closest_point`](Self::snap_to_closest_point):
    /// walk vertex by vertex from the current segment while that gets closer
    /// to `point`, then settle on the best position on the two segments
    /// meeting at the reached vertex.
    pub fn move_to_locally_closest_point(
        &mut self,
        point:           Vec3,
        allow_forwards:  bool,
        allow_backwards: bool,
    ) {
        if !self.is_valid() {
            return;
        }
        let last = self.points.len() - 2;
        let mut s = self.segment;
        let mut current = self.current_point();

        if allow_forwards {
            while s < last
                && self.points[s + 1].distance_squared(point) <= current.distance_squared(point)
            {
                s += 1;
                current = self.points[s];
            }
        }
        if allow_backwards {
            while s > 0 && self.points[s].distance_squared(point) < current.distance_squared(point) {
                current = self.points[s];
                s -= 1;
            }
        }

        // Segment ending at vertex `s` versus segment starting at it.
        let mut choice = (s, 0.0, f32::INFINITY);
        if s > 0 {
            let (a, b) = (self.points[s - 1], self.points[s]);
            let t = closest_point_on_segment_factor(a, b, point);
            choice = (s - 1, t, a.lerp(b, t).distance_squared(point));
        }
        let (a, b) = (self.points[s], self.points[s + 1]);
        let t = closest_point_on_segment_factor(a, b, point);
        let d = a.lerp(b, t).distance_squared(point);
        if d <= choice.2 {
            choice = (s, t, d);
        }
        self.move_to_segment(choice.0, choice.1);
    }

    /// Advance to the furthest point, starting at the current position, that
    /// lies within `radius` of `center` measured in `plane`.
    ///
    /// Never moves backwards.  If the whole remainder of the path is inside
    /// the circle the cursor ends up at the end of the path.  Returns the new
    /// current point (the steering target).
    pub fn advance_to_circle_intersection(
        &mut self,
        center: Vec3,
        radius: f32,
        plane:  MovementPlane,
    ) -> Vec3 {
        if !self.is_valid() {
            return Vec3::ZERO;
        }
        let c = plane.to_plane(center);
        let radius_sq = radius * radius;
        let last = self.points.len() - 2;

        let mut s = self.segment;
        while s < last && plane.to_plane(self.points[s + 1]).distance_squared(c) <= radius_sq {
            s += 1;
        }

        let t = line_circle_intersection_factor(
            c,
            plane.to_plane(self.points[s]),
            plane.to_plane(self.points[s + 1]),
            radius,
        )
        .clamp(0.0, 1.0);

        let candidate = self.cumulative[s] + t * (self.cumulative[s + 1] - self.cumulative[s]);
        if candidate > self.distance {
            self.distance = candidate;
            self.segment = s;
        }
        self.current_point()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    fn move_to_segment(&mut self, segment: usize, factor: f32) {
        let start = self.cumulative[segment];
        let length = self.cumulative[segment + 1] - start;
        self.segment = segment;
        self.distance = start + factor.clamp(0.0, 1.0) * length;
    }
}

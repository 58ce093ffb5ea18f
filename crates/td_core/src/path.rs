//! The fixed enemy path.
//!
//! Enemies walk an ordered list of waypoints from spawn to base. There is no
//! pathfinding: the route is authored data and never changes mid-session.

use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec2Fixed};

/// Immutable ordered waypoint list with cached segment lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    waypoints: Vec<Vec2Fixed>,
    segment_lengths: Vec<Fixed>,
    min: Vec2Fixed,
    max: Vec2Fixed,
}

impl Path {
    /// Build a path.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] if there are fewer than two waypoints or
    /// two consecutive waypoints coincide.
    pub fn new(waypoints: Vec<Vec2Fixed>) -> Result<Self> {
        if waypoints.len() < 2 {
            return Err(GameError::InvalidConfig(format!(
                "path needs at least 2 waypoints, got {}",
                waypoints.len()
            )));
        }

        let mut segment_lengths = Vec::with_capacity(waypoints.len() - 1);
        for (index, pair) in waypoints.windows(2).enumerate() {
            let length = pair[0].distance(pair[1]);
            if length == Fixed::ZERO {
                return Err(GameError::InvalidConfig(format!(
                    "path segment {index} has zero length"
                )));
            }
            segment_lengths.push(length);
        }

        let (min, max) = waypoints.iter().fold(
            (waypoints[0], waypoints[0]),
            |(min, max), point| {
                (
                    Vec2Fixed::new(min.x.min(point.x), min.y.min(point.y)),
                    Vec2Fixed::new(max.x.max(point.x), max.y.max(point.y)),
                )
            },
        );

        Ok(Self {
            waypoints,
            segment_lengths,
            min,
            max,
        })
    }

    /// Waypoints in order.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec2Fixed] {
        &self.waypoints
    }

    /// Number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false; a path has at least two waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Spawn point.
    #[must_use]
    pub fn start(&self) -> Vec2Fixed {
        self.waypoints[0]
    }

    /// Waypoint `index`, if it exists.
    #[must_use]
    pub fn waypoint(&self, index: usize) -> Option<Vec2Fixed> {
        self.waypoints.get(index).copied()
    }

    /// Length of the segment starting at waypoint `index`.
    #[must_use]
    pub fn segment_length(&self, index: usize) -> Option<Fixed> {
        self.segment_lengths.get(index).copied()
    }

    /// Check if `index` is the final waypoint.
    #[must_use]
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 >= self.waypoints.len()
    }

    /// Point at `progress` along the segment starting at `index`.
    ///
    /// Indices at or past the end clamp to the final waypoint.
    #[must_use]
    pub fn point_at(&self, index: usize, progress: Fixed) -> Vec2Fixed {
        match (self.waypoints.get(index), self.waypoints.get(index + 1)) {
            (Some(from), Some(to)) => from.lerp(*to, progress),
            _ => self.waypoints[self.waypoints.len() - 1],
        }
    }

    /// Corners of the waypoints' bounding box.
    #[must_use]
    pub fn bounds(&self) -> (Vec2Fixed, Vec2Fixed) {
        (self.min, self.max)
    }

    /// Check if `point` lies within `margin` of the bounding box.
    #[must_use]
    pub fn within_bounds(&self, point: Vec2Fixed, margin: Fixed) -> bool {
        let low = Vec2Fixed::new(self.min.x.saturating_sub(margin), self.min.y.saturating_sub(margin));
        let high = Vec2Fixed::new(self.max.x.saturating_add(margin), self.max.y.saturating_add(margin));
        (low.x..=high.x).contains(&point.x) && (low.y..=high.y).contains(&point.y)
    }

    /// Squared distance from `point` to the nearest point on any segment.
    #[must_use]
    pub fn distance_squared_to(&self, point: Vec2Fixed) -> Fixed {
        self.waypoints
            .windows(2)
            .map(|pair| segment_distance_squared(point, pair[0], pair[1]))
            .min()
            .unwrap_or(Fixed::MAX)
    }
}

fn segment_distance_squared(point: Vec2Fixed, from: Vec2Fixed, to: Vec2Fixed) -> Fixed {
    let segment = to - from;
    let length_sq = segment.dot(segment);
    if length_sq == Fixed::ZERO {
        return point.distance_squared(from);
    }

    let t = (point - from)
        .dot(segment)
        .saturating_div(length_sq)
        .clamp(Fixed::ZERO, Fixed::ONE);
    point.distance_squared(from.lerp(to, t))
}

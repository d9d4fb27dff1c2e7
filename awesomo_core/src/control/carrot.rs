// awesomo_core/src/control/carrot.rs

//! Carrot-chasing path follower.
//!
//! The vehicle never aims at a waypoint directly. Instead it chases a point
//! `look_ahead_dist` ahead of its projection onto the current segment, which
//! keeps the position controller's setpoint moving smoothly along the path.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::debug;

use crate::config::{CarrotConfig, ConfigError};
use crate::types::Vec3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("a route needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),
    #[error("waypoint {0} coincides with the one after it")]
    DegenerateSegment(usize),
}

/// One directed leg of a route. `start` and `end` never coincide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointSegment {
    start: Vec3,
    end: Vec3,
}

impl WaypointSegment {
    /// Returns `None` for a zero-length segment.
    pub fn new(start: Vec3, end: Vec3) -> Option<Self> {
        if (end - start).norm_squared() > 0.0 {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    pub fn end(&self) -> Vec3 {
        self.end
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    pub fn closest_point(&self, position: &Vec3) -> Vec3 {
        closest_point(position, &self.start, &self.end)
    }

    pub fn carrot_point(&self, position: &Vec3, look_ahead_dist: f64) -> Vec3 {
        carrot_point(position, look_ahead_dist, &self.start, &self.end)
    }
}

/// Projection parameter of `position` onto the line through `start` and
/// `end`, clamped to the segment.
fn segment_parameter(position: &Vec3, start: &Vec3, end: &Vec3) -> f64 {
    let direction = end - start;
    let length_sq = direction.norm_squared();
    if length_sq == 0.0 {
        return 0.0;
    }
    ((position - start).dot(&direction) / length_sq).clamp(0.0, 1.0)
}

/// Closest point to `position` on the segment `start..end`.
pub fn closest_point(position: &Vec3, start: &Vec3, end: &Vec3) -> Vec3 {
    start + (end - start) * segment_parameter(position, start, end)
}

/// The point `look_ahead_dist` further along the segment than the closest
/// point to `position`, never past `end`.
pub fn carrot_point(position: &Vec3, look_ahead_dist: f64, start: &Vec3, end: &Vec3) -> Vec3 {
    let length = (end - start).norm();
    if length == 0.0 {
        return *end;
    }
    let t = segment_parameter(position, start, end) + look_ahead_dist.max(0.0) / length;
    start + (end - start) * t.min(1.0)
}

/// Inclusive: a distance of exactly `threshold` counts as reached.
pub fn waypoint_reached(position: &Vec3, waypoint: &Vec3, threshold: f64) -> bool {
    (position - waypoint).norm() <= threshold
}

/// Result of one follower update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteStatus {
    /// Chase this point.
    Following(Vec3),
    /// The last waypoint has been reached; hold it.
    Finished(Vec3),
}

impl RouteStatus {
    pub fn setpoint(&self) -> Vec3 {
        match self {
            RouteStatus::Following(point) | RouteStatus::Finished(point) => *point,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, RouteStatus::Finished(_))
    }
}

/// Walks an ordered list of waypoints one segment at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct CarrotFollower {
    config: CarrotConfig,
    current: Option<WaypointSegment>,
    queue: VecDeque<WaypointSegment>,
    finished: bool,
}

impl CarrotFollower {
    pub fn new(config: CarrotConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            current: None,
            queue: VecDeque::new(),
            finished: false,
        })
    }

    /// Replaces the route. On error the previous route is kept.
    pub fn load_waypoints(&mut self, waypoints: &[Vec3]) -> Result<(), RouteError> {
        if waypoints.len() < 2 {
            return Err(RouteError::TooFewWaypoints(waypoints.len()));
        }
        let mut segments = waypoints
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                WaypointSegment::new(pair[0], pair[1]).ok_or(RouteError::DegenerateSegment(i))
            })
            .collect::<Result<VecDeque<_>, _>>()?;

        debug!(segments = segments.len(), "loaded waypoint route");
        self.current = segments.pop_front();
        self.queue = segments;
        self.finished = false;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.queue.clear();
        self.finished = false;
    }

    /// A route is loaded and not yet finished.
    pub fn is_active(&self) -> bool {
        self.current.is_some() && !self.finished
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_segment(&self) -> Option<&WaypointSegment> {
        self.current.as_ref()
    }

    /// Segments still queued after the current one.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Advances the route for the vehicle at `position`. Returns `None` when
    /// no route is loaded.
    pub fn update(&mut self, position: &Vec3) -> Option<RouteStatus> {
        let mut segment = self.current?;
        if self.finished {
            return Some(RouteStatus::Finished(segment.end));
        }

        if waypoint_reached(position, &segment.end, self.config.wp_threshold) {
            match self.queue.pop_front() {
                Some(next) => {
                    debug!(end = ?next.end, remaining = self.queue.len(), "advancing to next segment");
                    self.current = Some(next);
                    segment = next;
                }
                None => {
                    debug!(end = ?segment.end, "route finished");
                    self.finished = true;
                    return Some(RouteStatus::Finished(segment.end));
                }
            }
        }

        Some(RouteStatus::Following(
            segment.carrot_point(position, self.config.look_ahead_dist),
        ))
    }
}

//! Camera flights and orbit controls.
//!
//! [`CameraDirector`] moves the [`Camera`] towards a selected node over a
//! fixed duration with easing. A new flight replaces the running one and
//! starts from wherever the camera currently is.

use std::time::Duration;

use glam::{Vec2, Vec3};

use crate::camera::Camera;

/// Closest the camera may dolly towards its target.
const MIN_ORBIT_DISTANCE: f32 = 1.0;
/// Farthest the camera may dolly away from its target.
const MAX_ORBIT_DISTANCE: f32 = 5_000.0;
/// Pitch limit keeping the orbit away from the poles.
const MAX_PITCH: f32 = 1.5;

/// Easing curves for camera flights.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EasingFunction {
    /// Constant speed, no acceleration.
    Linear,
    /// Slow start, fast end.
    EaseIn,
    /// Fast start, slow end.
    EaseOut,
    /// Slow start, fast middle, slow end.
    #[default]
    EaseInOut,
}

impl EasingFunction {
    /// Map a linear progress value (0.0..=1.0) to an eased value.
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            EasingFunction::Linear => t,
            EasingFunction::EaseIn => t * t,
            EasingFunction::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            EasingFunction::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Camera position and look-at point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSnapshot {
    pub position: Vec3,
    pub focus: Vec3,
}

impl CameraSnapshot {
    pub fn of(camera: &Camera) -> Self {
        Self {
            position: camera.position,
            focus: camera.target,
        }
    }
}

/// Parameters of a flight towards a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlyTo {
    /// World position of the node; also the final look-at point.
    pub target: Vec3,
    /// How far from the node the camera stops.
    pub distance: f32,
    pub duration: Duration,
    /// Added to the destination's x coordinate.
    pub lateral_offset: f32,
}

impl FlyTo {
    /// Where the camera ends up.
    ///
    /// The node is scaled outward from the origin by `1 + distance / |target|`.
    /// A node at the origin has no outward direction, so the camera stops
    /// `distance` along +Z instead.
    pub fn destination(&self) -> Vec3 {
        let length = self.target.length();
        let mut destination = if length > f32::EPSILON {
            self.target * (1.0 + self.distance / length)
        } else {
            self.target + Vec3::Z * self.distance
        };
        destination.x += self.lateral_offset;
        destination
    }
}

/// A flight in progress.
#[derive(Clone, Copy, Debug)]
pub struct CameraFlight {
    pub from: CameraSnapshot,
    pub to: CameraSnapshot,
    pub started: Duration,
    pub duration: Duration,
    pub easing: EasingFunction,
}

impl CameraFlight {
    /// Linear progress in `[0, 1]` at `now`.
    pub fn progress(&self, now: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.started);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0) as f32
    }

    /// Interpolated camera state at `now`.
    pub fn sample(&self, now: Duration) -> CameraSnapshot {
        let t = self.easing.apply(self.progress(now));
        CameraSnapshot {
            position: self.from.position.lerp(self.to.position, t),
            focus: self.from.focus.lerp(self.to.focus, t),
        }
    }
}

/// Drives camera flights and user orbiting.
#[derive(Debug, Default)]
pub struct CameraDirector {
    flight: Option<CameraFlight>,
    easing: EasingFunction,
}

impl CameraDirector {
    pub fn new(easing: EasingFunction) -> Self {
        Self {
            flight: None,
            easing,
        }
    }

    /// Start flying towards `request.target`, replacing any running flight.
    pub fn fly_to(&mut self, camera: &Camera, request: FlyTo, now: Duration) {
        let to = CameraSnapshot {
            position: request.destination(),
            focus: request.target,
        };
        log::debug!(
            "Camera flight to {:?} over {} ms",
            to.position,
            request.duration.as_millis()
        );
        self.flight = Some(CameraFlight {
            from: CameraSnapshot::of(camera),
            to,
            started: now,
            duration: request.duration,
            easing: self.easing,
        });
    }

    /// Advance the flight. Returns `true` while a flight is still running.
    pub fn update(&mut self, camera: &mut Camera, now: Duration) -> bool {
        let Some(flight) = self.flight else {
            return false;
        };
        let state = flight.sample(now);
        camera.position = state.position;
        camera.target = state.focus;

        if flight.progress(now) >= 1.0 {
            self.flight = None;
            return false;
        }
        true
    }

    pub fn cancel(&mut self) {
        self.flight = None;
    }

    #[must_use]
    pub fn is_flying(&self) -> bool {
        self.flight.is_some()
    }

    #[must_use]
    pub fn flight(&self) -> Option<&CameraFlight> {
        self.flight.as_ref()
    }

    /// Orbit around the target by `delta` radians (x = yaw, y = pitch).
    /// Cancels any running flight.
    pub fn orbit(&mut self, camera: &mut Camera, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        self.flight = None;

        let offset = camera.position - camera.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }
        let yaw = offset.x.atan2(offset.z) - delta.x;
        let pitch = ((offset.y / radius).clamp(-1.0, 1.0).asin() + delta.y)
            .clamp(-MAX_PITCH, MAX_PITCH);

        camera.position = camera.target
            + Vec3::new(
                pitch.cos() * yaw.sin(),
                pitch.sin(),
                pitch.cos() * yaw.cos(),
            ) * radius;
    }

    /// Move towards (positive `lines`) or away from the target.
    /// Cancels any running flight.
    pub fn dolly(&mut self, camera: &mut Camera, lines: f32, sensitivity: f32) {
        if lines == 0.0 {
            return;
        }
        self.flight = None;

        let offset = camera.position - camera.target;
        let Some(direction) = offset.try_normalize() else {
            return;
        };
        let factor = (1.0 - sensitivity.clamp(0.0, 0.9)).powf(lines);
        let distance = (offset.length() * factor).clamp(MIN_ORBIT_DISTANCE, MAX_ORBIT_DISTANCE);
        camera.position = camera.target + direction * distance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn request(target: Vec3) -> FlyTo {
        FlyTo {
            target,
            distance: 40.0,
            duration: ms(3000),
            lateral_offset: 0.0,
        }
    }

    #[test]
    fn test_easing_endpoints() {
        for easing in [
            EasingFunction::Linear,
            EasingFunction::EaseIn,
            EasingFunction::EaseOut,
            EasingFunction::EaseInOut,
        ] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6);
        }
        assert!((EasingFunction::EaseInOut.apply(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_destination_pushes_outward() {
        let destination = request(Vec3::new(30.0, 40.0, 0.0)).destination();
        // |target| = 50, ratio = 1 + 40 / 50
        assert!((destination - Vec3::new(54.0, 72.0, 0.0)).length() < 1e-4);
        assert!((destination.length() - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_destination_at_origin_uses_fallback() {
        let destination = request(Vec3::ZERO).destination();
        assert_eq!(destination, Vec3::new(0.0, 0.0, 40.0));
        assert!(destination.is_finite());
    }

    #[test]
    fn test_lateral_offset_applied_after_scaling() {
        let mut fly = request(Vec3::new(0.0, 0.0, 10.0));
        fly.lateral_offset = 5.0;
        assert_eq!(fly.destination(), Vec3::new(5.0, 0.0, 50.0));
    }

    #[test]
    fn test_flight_reaches_destination() {
        let mut camera = Camera::default();
        let mut director = CameraDirector::default();
        let node = Vec3::new(0.0, 100.0, 0.0);

        director.fly_to(&camera, request(node), ms(1000));
        assert!(director.update(&mut camera, ms(2500)));
        assert!(director.is_flying());

        assert!(!director.update(&mut camera, ms(4000)));
        assert!(!director.is_flying());
        assert!((camera.position - Vec3::new(0.0, 140.0, 0.0)).length() < 1e-3);
        assert_eq!(camera.target, node);
    }

    #[test]
    fn test_flight_starts_from_current_camera() {
        let mut camera = Camera::default();
        let start = camera.position;
        let mut director = CameraDirector::new(EasingFunction::Linear);
        director.fly_to(&camera, request(Vec3::X * 10.0), ms(0));
        director.update(&mut camera, ms(0));
        assert!((camera.position - start).length() < 1e-5);
    }

    #[test]
    fn test_new_flight_supersedes_running_one() {
        let mut camera = Camera::default();
        let mut director = CameraDirector::new(EasingFunction::Linear);

        director.fly_to(&camera, request(Vec3::X * 100.0), ms(0));
        director.update(&mut camera, ms(1500));
        let midway = camera.position;

        let second = Vec3::NEG_Y * 60.0;
        director.fly_to(&camera, request(second), ms(1500));
        let flight = director.flight().unwrap();
        assert_eq!(flight.from.position, midway);
        assert_eq!(flight.to.focus, second);

        director.update(&mut camera, ms(4500));
        assert!((camera.position - Vec3::NEG_Y * 100.0).length() < 1e-3);
    }

    #[test]
    fn test_zero_duration_snaps() {
        let mut camera = Camera::default();
        let mut director = CameraDirector::default();
        let mut fly = request(Vec3::Z * 10.0);
        fly.duration = Duration::ZERO;
        director.fly_to(&camera, fly, ms(0));
        assert!(!director.update(&mut camera, ms(0)));
        assert!((camera.position - Vec3::Z * 50.0).length() < 1e-4);
    }

    #[test]
    fn test_orbit_keeps_distance_and_cancels_flight() {
        let mut camera = Camera::default();
        let mut director = CameraDirector::default();
        director.fly_to(&camera, request(Vec3::X), ms(0));

        let before = camera.distance();
        director.orbit(&mut camera, Vec2::new(0.4, 0.2));
        assert!(!director.is_flying());
        assert!((camera.distance() - before).abs() < 1e-3);
        assert!(camera.position.y > 0.0);
    }

    #[test]
    fn test_orbit_pitch_is_clamped() {
        let mut camera = Camera::default();
        let mut director = CameraDirector::default();
        director.orbit(&mut camera, Vec2::new(0.0, 10.0));
        let pitch = (camera.position.y / camera.distance()).asin();
        assert!(pitch <= MAX_PITCH + 1e-4);
    }

    #[test]
    fn test_dolly_moves_toward_target_within_bounds() {
        let mut camera = Camera::default();
        let mut director = CameraDirector::default();
        director.dolly(&mut camera, 1.0, 0.1);
        assert!((camera.distance() - 270.0).abs() < 1e-2);

        director.dolly(&mut camera, 500.0, 0.5);
        assert!((camera.distance() - MIN_ORBIT_DISTANCE).abs() < 1e-4);
    }
}

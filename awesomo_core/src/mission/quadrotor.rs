// awesomo_core/src/mission/quadrotor.rs

use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::transitions::{command_transition, next_mode, Guards};
use super::{MissionError, MissionMode, Transition, TransitionReason};
use crate::clock::{elapsed_secs, Clock, SystemClock};
use crate::config::QuadrotorConfig;
use crate::control::{
    CarrotFollower, LandingController, PositionController, RouteStatus, TrackingController,
};
use crate::tracking::LandingTarget;
use crate::types::{AttitudeCommand, Pose, TargetObservation, Vec3};

/// What one call to [`Quadrotor::step`] produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// The command to hand to the actuation layer.
    pub command: AttitudeCommand,
    /// Mode after this step's transitions.
    pub mode: MissionMode,
    /// The automatic transition taken during this step, if any.
    pub transition: Option<Transition>,
}

/// The mission sequencer.
///
/// Owns the target tracker, the three attitude controllers and the waypoint
/// follower, and decides every step which of them produces the command.
/// Nothing works until [`configure`](Self::configure) has been called.
#[derive(Debug)]
pub struct Quadrotor {
    clock: Box<dyn Clock>,
    state: Option<MissionState>,
}

impl Default for Quadrotor {
    fn default() -> Self {
        Self::new()
    }
}

impl Quadrotor {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            state: None,
        }
    }

    /// Builds every component from `config` and restarts the mission in
    /// Discover. On error the previous configuration stays in place.
    pub fn configure(&mut self, config: QuadrotorConfig) -> Result<(), MissionError> {
        config.validate()?;
        self.state = Some(MissionState::new(config)?);
        info!(mode = %MissionMode::Discover, "quadrotor configured");
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.state.is_some()
    }

    fn state_mut(&mut self) -> Result<&mut MissionState, MissionError> {
        self.state.as_mut().ok_or(MissionError::NotConfigured)
    }

    pub fn set_pose(&mut self, pose: Pose) -> Result<(), MissionError> {
        self.state_mut()?.pose = pose;
        Ok(())
    }

    /// Vehicle velocity in the inertial frame. Without it the climb rate is
    /// differentiated from successive poses.
    pub fn set_velocity(&mut self, velocity: Vec3) -> Result<(), MissionError> {
        self.state_mut()?.velocity = Some(velocity);
        Ok(())
    }

    pub fn set_heading(&mut self, heading: f64) -> Result<(), MissionError> {
        self.state_mut()?.heading = heading;
        Ok(())
    }

    /// Latest detector output. It is used on every step until replaced.
    pub fn set_target_observation(
        &mut self,
        observation: TargetObservation,
    ) -> Result<(), MissionError> {
        self.state_mut()?.observation = observation;
        Ok(())
    }

    pub fn set_target_detected(&mut self, detected: bool) -> Result<(), MissionError> {
        self.state_mut()?.observation.detected = detected;
        Ok(())
    }

    pub fn set_hover_position(&mut self, position: Vec3) -> Result<(), MissionError> {
        self.state_mut()?.hover_position = position;
        Ok(())
    }

    /// Loads a route for Hover mode to follow.
    pub fn load_waypoints(&mut self, waypoints: &[Vec3]) -> Result<(), MissionError> {
        self.state_mut()?.carrot.load_waypoints(waypoints)?;
        Ok(())
    }

    /// Requests a mode change from outside the mission logic.
    pub fn set_mode(&mut self, mode: MissionMode) -> Result<Transition, MissionError> {
        let now = self.clock.now();
        let state = self.state_mut()?;
        let transition = command_transition(state.mode, mode)?;
        state.apply(transition, now);
        Ok(transition)
    }

    /// Same as [`set_mode`](Self::set_mode) with a numeric mode code. An
    /// unknown code puts the vehicle in Hover and is reported as
    /// [`MissionError::InvalidMode`].
    pub fn set_mode_code(&mut self, code: u8) -> Result<Transition, MissionError> {
        self.state_mut()?;
        match MissionMode::try_from(code) {
            Ok(mode) => self.set_mode(mode),
            Err(err) => {
                error!(code, "unknown mode code, falling back to {}", MissionMode::Hover);
                if let Err(fallback) = self.set_mode(MissionMode::Hover) {
                    warn!(%fallback, "fallback to hover refused");
                }
                Err(err)
            }
        }
    }

    /// Runs one control cycle of `dt` seconds.
    pub fn step(&mut self, dt: f64) -> Result<StepOutcome, MissionError> {
        let now = self.clock.now();
        self.state_mut()?.step(dt, now)
    }

    pub fn mode(&self) -> Option<MissionMode> {
        self.state.as_ref().map(|s| s.mode)
    }

    pub fn attitude_command(&self) -> Option<AttitudeCommand> {
        self.state.as_ref().map(|s| s.att_cmd)
    }

    pub fn is_target_losted(&self) -> Option<bool> {
        let now = self.clock.now();
        self.state.as_ref().map(|s| s.target.is_target_losted(now))
    }

    pub fn hover_position(&self) -> Option<Vec3> {
        self.state.as_ref().map(|s| s.hover_position)
    }

    pub fn landing_belief(&self) -> Option<u32> {
        self.state.as_ref().map(|s| s.landing_belief)
    }

    pub fn landing_height(&self) -> Option<f64> {
        self.state.as_ref().map(|s| s.landing_height)
    }

    /// How many times Track or Land fell back to Discover.
    pub fn target_losses(&self) -> Option<u32> {
        self.state.as_ref().map(|s| s.target_losses)
    }

    pub fn target(&self) -> Option<&LandingTarget> {
        self.state.as_ref().map(|s| &s.target)
    }

    /// Estimated target position in the inertial frame.
    pub fn target_inertial_position(&self) -> Option<Vec3> {
        let state = self.state.as_ref()?;
        state.target.inertial_position(&state.pose)
    }

    pub fn config(&self) -> Option<&QuadrotorConfig> {
        self.state.as_ref().map(|s| &s.config)
    }
}

/// Everything that exists only once the sequencer is configured.
#[derive(Debug, Clone)]
struct MissionState {
    config: QuadrotorConfig,
    mode: MissionMode,

    // inputs
    pose: Pose,
    velocity: Option<Vec3>,
    heading: f64,
    observation: TargetObservation,
    prev_altitude: Option<f64>,

    // components
    target: LandingTarget,
    position_controller: PositionController,
    tracking_controller: TrackingController,
    landing_controller: LandingController,
    carrot: CarrotFollower,

    // mission bookkeeping
    hover_position: Vec3,
    mode_timer: Option<Instant>,
    height_timer: Option<Instant>,
    landing_height: f64,
    landing_belief: u32,
    target_losses: u32,
    att_cmd: AttitudeCommand,
}

impl MissionState {
    fn new(config: QuadrotorConfig) -> Result<Self, MissionError> {
        Ok(Self {
            mode: MissionMode::Discover,
            pose: Pose::default(),
            velocity: None,
            heading: config.mission.heading,
            observation: TargetObservation::missing(),
            prev_altitude: None,
            target: LandingTarget::new(config.target)?,
            position_controller: PositionController::new(config.position_controller)?,
            tracking_controller: TrackingController::new(config.tracking_controller)?,
            landing_controller: LandingController::new(config.landing_controller)?,
            carrot: CarrotFollower::new(config.carrot)?,
            hover_position: config.mission.hover_position(),
            mode_timer: None,
            height_timer: None,
            landing_height: config.mission.hover_position[2],
            landing_belief: 0,
            target_losses: 0,
            att_cmd: AttitudeCommand::neutral(),
            config,
        })
    }

    fn step(&mut self, dt: f64, now: Instant) -> Result<StepOutcome, MissionError> {
        self.target.update(&self.observation, &self.pose, dt, now)?;
        let climb_rate = self.climb_rate(dt);

        let mut route_finished = false;
        self.att_cmd = match self.mode {
            MissionMode::Disarm => AttitudeCommand::neutral(),
            MissionMode::Hover => {
                let (command, finished) = self.step_hover(dt);
                route_finished = finished;
                command
            }
            MissionMode::Discover => self.step_discover(dt, now),
            MissionMode::Track => self.step_track(dt, now),
            MissionMode::Land => self.step_land(climb_rate, dt, now),
            MissionMode::Accomplished => self.hold_hover_position(dt),
        };

        let guards = Guards {
            detected: self.target.detected(),
            losted: self.target.losted(),
            mode_elapsed: elapsed_secs(self.mode_timer, now),
            landing_belief: self.landing_belief,
            route_finished,
        };
        let transition = next_mode(self.mode, &guards, &self.config.mission);
        if let Some(transition) = transition {
            self.apply(transition, now);
        }

        self.prev_altitude = Some(self.pose.position.z);
        Ok(StepOutcome {
            command: self.att_cmd,
            mode: self.mode,
            transition,
        })
    }

    /// Vertical speed from the velocity input, or differentiated from the
    /// pose when no velocity has been supplied.
    fn climb_rate(&self, dt: f64) -> f64 {
        if let Some(velocity) = self.velocity {
            return velocity.z;
        }
        match self.prev_altitude {
            Some(prev) if dt > 0.0 => (self.pose.position.z - prev) / dt,
            _ => 0.0,
        }
    }

    fn hold_hover_position(&mut self, dt: f64) -> AttitudeCommand {
        self.position_controller
            .calculate(&self.hover_position, &self.pose, self.heading, dt)
    }

    /// Follows the route when one is loaded, else holds the hover position.
    /// The flag is set once the route has been completed.
    fn step_hover(&mut self, dt: f64) -> (AttitudeCommand, bool) {
        let status = self.carrot.update(&self.pose.position);
        let setpoint = status.map_or(self.hover_position, |s| s.setpoint());
        let command = self
            .position_controller
            .calculate(&setpoint, &self.pose, self.heading, dt);
        (command, matches!(status, Some(RouteStatus::Finished(_))))
    }

    fn step_discover(&mut self, dt: f64, now: Instant) -> AttitudeCommand {
        self.mode_timer.get_or_insert(now);
        self.hold_hover_position(dt)
    }

    fn tracking_errors(&self, altitude_setpoint: f64) -> (Vec3, Vec3) {
        let position_bf = self.target.position_bf();
        let velocity_bf = self.target.velocity_bf();
        let position_errors = Vec3::new(
            position_bf.x,
            position_bf.y,
            altitude_setpoint - self.pose.position.z,
        );
        let velocity_errors = Vec3::new(velocity_bf.x, velocity_bf.y, 0.0);
        (position_errors, velocity_errors)
    }

    fn step_track(&mut self, dt: f64, now: Instant) -> AttitudeCommand {
        self.mode_timer.get_or_insert(now);
        let (position_errors, velocity_errors) = self.tracking_errors(self.hover_position.z);
        let command = self.tracking_controller.calculate(
            &position_errors,
            &velocity_errors,
            self.heading,
            dt,
        );

        self.hover_position.x = self.pose.position.x;
        self.hover_position.y = self.pose.position.y;
        command
    }

    fn step_land(&mut self, climb_rate: f64, dt: f64, now: Instant) -> AttitudeCommand {
        self.update_landing_height(now);

        let (position_errors, velocity_errors) = self.tracking_errors(self.landing_height);
        let command = self.landing_controller.calculate(
            &position_errors,
            &velocity_errors,
            climb_rate,
            self.heading,
            dt,
        );
        self.hover_position = self.pose.position;

        if self.within_landing_zone() {
            self.landing_belief += 1;
            debug!(belief = self.landing_belief, "inside landing zone");
        }
        command
    }

    /// Every landing period with the target in view, lower the landing height
    /// if the vehicle is centred over the target, else climb back up.
    fn update_landing_height(&mut self, now: Instant) {
        let landing = self.config.mission.landing;
        let due = elapsed_secs(self.height_timer, now).is_some_and(|t| t > landing.period);
        if !due || !self.target.detected() {
            return;
        }

        let cutoff = landing.cutoff();
        let measured = self.target.measured_position_bf();
        let centred = measured.x.abs() < cutoff.x && measured.y.abs() < cutoff.y;
        let ceiling = self.config.mission.hover_position[2];
        self.landing_height = if centred {
            self.landing_height * landing.descend_multiplier
        } else {
            (self.landing_height * landing.recover_multiplier).min(ceiling)
        };
        self.height_timer = Some(now);
        debug!(height = self.landing_height, centred, "landing height updated");
    }

    /// The latest measurement, or failing that the estimate, lies inside the
    /// cutoff box on every axis.
    fn within_landing_zone(&self) -> bool {
        let cutoff = self.config.mission.landing.cutoff();
        let inside = |p: Vec3| (0..3).all(|i| p[i].abs() < cutoff[i]);

        (self.target.detected() && inside(self.target.measured_position_bf()))
            || (self.target.is_estimating() && inside(self.target.position_bf()))
    }

    fn apply(&mut self, transition: Transition, now: Instant) {
        let Transition { from, to, reason } = transition;
        self.mode = to;
        self.mode_timer = None;

        match to {
            MissionMode::Disarm => self.att_cmd = AttitudeCommand::neutral(),
            MissionMode::Hover => self.position_controller.reset(),
            MissionMode::Discover => {
                if from == MissionMode::Land {
                    self.hover_position.z = self.config.mission.hover_position[2];
                }
                self.landing_belief = 0;
                self.position_controller.reset();
            }
            MissionMode::Track => {
                let (position_errors, _) = self.tracking_errors(self.hover_position.z);
                self.tracking_controller.reset();
                self.tracking_controller.prime(&position_errors);
            }
            MissionMode::Land => {
                self.landing_height = self.pose.position.z;
                self.height_timer = Some(now);
                self.landing_belief = 0;
                let (position_errors, _) = self.tracking_errors(self.landing_height);
                self.landing_controller.reset();
                self.landing_controller.prime(&position_errors);
            }
            MissionMode::Accomplished => {
                if let Some(segment) = self.carrot.current_segment() {
                    self.hover_position = segment.end();
                }
                self.position_controller.reset();
            }
        }

        if reason == TransitionReason::TargetLost {
            self.target_losses += 1;
        }
        info!(%from, %to, ?reason, "mission mode changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::Quaternion;
    use approx::assert_abs_diff_eq;

    fn configured() -> (Quadrotor, ManualClock) {
        let clock = ManualClock::new();
        let mut quad = Quadrotor::with_clock(clock.clone());
        quad.configure(QuadrotorConfig::default()).unwrap();
        (quad, clock)
    }

    #[test]
    fn test_everything_fails_before_configure() {
        let mut quad = Quadrotor::new();
        assert_eq!(quad.step(0.1), Err(MissionError::NotConfigured));
        assert_eq!(quad.set_pose(Pose::default()), Err(MissionError::NotConfigured));
        assert_eq!(
            quad.set_mode(MissionMode::Hover),
            Err(MissionError::NotConfigured)
        );
        assert_eq!(quad.set_mode_code(42), Err(MissionError::NotConfigured));
        assert_eq!(quad.mode(), None);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut quad = Quadrotor::new();
        let mut config = QuadrotorConfig::default();
        config.carrot.look_ahead_dist = 0.0;
        assert!(matches!(
            quad.configure(config),
            Err(MissionError::Config(_))
        ));
        assert!(!quad.is_configured());
    }

    #[test]
    fn test_starts_in_discover_holding_hover_position() {
        let (mut quad, _) = configured();
        assert_eq!(quad.mode(), Some(MissionMode::Discover));
        quad.set_pose(Pose::new(Vec3::new(0.0, 0.0, 3.0), Quaternion::identity()))
            .unwrap();

        let outcome = quad.step(0.02).unwrap();
        assert_eq!(outcome.mode, MissionMode::Discover);
        assert_eq!(outcome.transition, None);
        assert_abs_diff_eq!(outcome.command.roll, 0.0);
        assert_abs_diff_eq!(outcome.command.pitch, 0.0);
        assert_abs_diff_eq!(outcome.command.throttle, 0.5);
    }

    #[test]
    fn test_unknown_mode_code_falls_back_to_hover() {
        let (mut quad, _) = configured();
        assert_eq!(quad.set_mode_code(9), Err(MissionError::InvalidMode(9)));
        assert_eq!(quad.mode(), Some(MissionMode::Hover));

        let t = quad.set_mode_code(MissionMode::Discover.code()).unwrap();
        assert_eq!((t.from, t.to), (MissionMode::Hover, MissionMode::Discover));
    }

    #[test]
    fn test_disarm_is_final_and_neutral() {
        let (mut quad, _) = configured();
        quad.set_mode(MissionMode::Disarm).unwrap();
        let outcome = quad.step(0.02).unwrap();
        assert_eq!(outcome.command, AttitudeCommand::neutral());

        assert_eq!(
            quad.set_mode(MissionMode::Hover),
            Err(MissionError::InvalidCommand {
                from: MissionMode::Disarm,
                to: MissionMode::Hover
            })
        );
        assert_eq!(quad.mode(), Some(MissionMode::Disarm));
    }

    #[test]
    fn test_route_in_hover_ends_accomplished() {
        let (mut quad, clock) = configured();
        let start = Vec3::new(0.0, 0.0, 3.0);
        let end = Vec3::new(2.0, 0.0, 3.0);
        quad.load_waypoints(&[start, end]).unwrap();
        quad.set_mode(MissionMode::Hover).unwrap();

        quad.set_pose(Pose::new(start, Quaternion::identity())).unwrap();
        let outcome = quad.step(0.02).unwrap();
        assert_eq!(outcome.mode, MissionMode::Hover);
        // chasing a carrot ahead on +x
        assert!(outcome.command.pitch > 0.0);

        clock.advance_secs(0.02);
        quad.set_pose(Pose::new(Vec3::new(1.9, 0.0, 3.0), Quaternion::identity()))
            .unwrap();
        let outcome = quad.step(0.02).unwrap();
        assert_eq!(outcome.mode, MissionMode::Accomplished);
        assert_eq!(
            outcome.transition.map(|t| t.reason),
            Some(TransitionReason::RouteComplete)
        );
        assert_eq!(quad.hover_position(), Some(end));
    }

    #[test]
    fn test_bad_route_keeps_previous_one() {
        let (mut quad, _) = configured();
        let err = quad.load_waypoints(&[Vec3::zeros()]).unwrap_err();
        assert_eq!(err, MissionError::Route(crate::control::RouteError::TooFewWaypoints(1)));
    }
}

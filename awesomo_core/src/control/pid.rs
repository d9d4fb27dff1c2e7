// awesomo_core/src/control/pid.rs

use crate::config::{ConfigError, PidConfig};

/// A single PID loop with output clamping, integral anti-windup and a
/// dead-zone around zero error.
#[derive(Debug, Clone, PartialEq)]
pub struct Pid {
    config: PidConfig,
    integral_bound: f64,

    pub setpoint: f64,
    pub prev_error: f64,
    pub integral_error: f64,
    pub output: f64,
}

impl Pid {
    pub fn new(config: PidConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let integral_bound = match config.integral_limit {
            Some(limit) => limit,
            None if config.k_i > 0.0 => {
                config.output_min.abs().max(config.output_max.abs()) / config.k_i
            }
            None => f64::INFINITY,
        };

        Ok(Self {
            config,
            integral_bound,
            setpoint: 0.0,
            prev_error: 0.0,
            integral_error: 0.0,
            output: 0.0,
        })
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    /// Advances the loop by `dt` seconds with the given error and returns the
    /// new output. A non-positive `dt` leaves the loop untouched and returns
    /// the previous output.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        if dt.is_nan() || dt <= 0.0 || !error.is_finite() {
            return self.output;
        }

        let error = if error.abs() <= self.config.dead_zone {
            0.0
        } else {
            error
        };

        self.integral_error = (self.integral_error + error * dt)
            .clamp(-self.integral_bound, self.integral_bound);
        let derivative = (error - self.prev_error) / dt;

        let raw = self.config.k_p * error
            + self.config.k_i * self.integral_error
            + self.config.k_d * derivative;
        self.output = raw.clamp(self.config.output_min, self.config.output_max);
        self.prev_error = error;

        self.output
    }

    /// Convenience wrapper computing `error = setpoint - actual`.
    pub fn update_setpoint(&mut self, setpoint: f64, actual: f64, dt: f64) -> f64 {
        self.setpoint = setpoint;
        self.update(setpoint - actual, dt)
    }

    pub fn reset(&mut self) {
        self.prev_error = 0.0;
        self.integral_error = 0.0;
        self.output = 0.0;
    }
}

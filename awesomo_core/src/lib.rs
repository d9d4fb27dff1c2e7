// awesomo_core/src/lib.rs

// Estimation, control and mission sequencing for an autonomous
// discover -> track -> land quadrotor mission. No I/O happens here.
pub mod clock;
pub mod config;
pub mod control;
pub mod estimation;
pub mod mission;
pub mod prelude;
pub mod tracking;
pub mod types;

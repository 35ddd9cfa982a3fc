//! Presence configuration.

/// Tunables for presence tracking and room reclamation.
///
/// The defaults match what browser clients expect: they heartbeat every
/// few seconds, so 30 seconds of silence means the peer is gone.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// Seconds since `last_seen` after which a member is considered gone.
    pub liveness_timeout_secs: f64,

    /// Rooms older than this (seconds) are reclaimed even with members.
    pub max_room_age_secs: f64,

    /// Chance that a heartbeat also runs a sweep. `0.0` disables the
    /// trigger; the janitor's timer sweep stays authoritative.
    pub heartbeat_sweep_probability: f64,

    /// Length of generated room and peer ids.
    pub id_length: usize,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            liveness_timeout_secs: 30.0,
            max_room_age_secs: 3600.0,
            heartbeat_sweep_probability: 0.01,
            id_length: 8,
        }
    }
}

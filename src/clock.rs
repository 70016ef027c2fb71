use rand::Rng;
use rand::distr::OpenClosed01;

/// Simulated time of one trajectory.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulationClock {
    time: f64,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Draws the exponential waiting time for exit rate `total_propensity`
    /// and moves the clock forward by it.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R, total_propensity: f64) -> f64 {
        let dt = Self::sample(rng, total_propensity);
        self.advance_by(dt);
        dt
    }

    /// Draws a waiting time without moving the clock.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R, total_propensity: f64) -> f64 {
        let u: f64 = rng.sample(OpenClosed01);
        waiting_time(u, total_propensity)
    }

    /// Moves the clock forward by an already drawn `dt`.
    pub fn advance_by(&mut self, dt: f64) -> f64 {
        debug_assert!(dt >= 0.0);
        self.time += dt;
        self.time
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
    }
}

/// `-ln(u) / total_propensity` for `u ∈ (0, 1]`.
#[inline]
pub fn waiting_time(u: f64, total_propensity: f64) -> f64 {
    debug_assert!(u > 0.0 && u <= 1.0);
    debug_assert!(total_propensity > 0.0);
    -u.ln() / total_propensity
}

//! Leader motion and timed random redirection.

use flock_config::{SimulationConfig, Viewport};
use flock_core::{clamp_length, Agent, Vec2};
use log::debug;
use rand::Rng;

use crate::boundary::BoundaryPolicy;

#[derive(Debug, Clone)]
pub struct LeaderController {
    max_speed: f32,
    adjustment_delay_ms: u64,
    /// `None` until the first redirection, which happens on the first update.
    last_redirect_ms: Option<u64>,
    redirects: u64,
}

impl LeaderController {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            max_speed: config.leader_max_speed,
            adjustment_delay_ms: config.leader_adjustment_delay_ms,
            last_redirect_ms: None,
            redirects: 0,
        }
    }

    /// Treats `now_ms` as the time of a previous redirection, so the next
    /// one waits a full delay.
    pub fn with_last_redirect(mut self, now_ms: u64) -> Self {
        self.last_redirect_ms = Some(now_ms);
        self
    }

    pub fn last_redirect_ms(&self) -> Option<u64> {
        self.last_redirect_ms
    }

    pub fn redirects(&self) -> u64 {
        self.redirects
    }

    /// True if the leader has never been redirected, or once at least
    /// `adjustment_delay_ms` has passed since the last redirection.
    #[inline]
    pub fn redirect_due(&self, now_ms: u64) -> bool {
        match self.last_redirect_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.adjustment_delay_ms,
        }
    }

    /// Advances the leader by one tick. Returns true if it was redirected.
    pub fn update<R: Rng>(
        &mut self,
        leader: &mut Agent,
        boundary: &BoundaryPolicy,
        viewport: Viewport,
        now_ms: u64,
        rng: &mut R,
    ) -> bool {
        let previous = leader.position;
        leader.position += leader.velocity;
        if !leader.position.is_finite() {
            leader.position = previous;
            leader.velocity = Vec2::ZERO;
        }

        boundary.apply(leader.position, &mut leader.velocity, viewport);

        let redirected = self.redirect_due(now_ms);
        if redirected {
            let kick = Vec2::new(
                rng.gen_range(-self.max_speed..=self.max_speed),
                rng.gen_range(-self.max_speed..=self.max_speed),
            );
            leader.velocity += kick;
            self.last_redirect_ms = Some(now_ms);
            self.redirects += 1;
            debug!(
                "Leader redirected at {} ms by ({:.3}, {:.3})",
                now_ms, kick.x, kick.y
            );
        }

        leader.velocity = clamp_length(leader.velocity, self.max_speed);
        redirected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_core::{AgentId, AgentKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn leader_at(x: f32, y: f32, vx: f32, vy: f32) -> Agent {
        Agent::new(AgentId(0), AgentKind::Leader, Vec2::new(x, y), Vec2::new(vx, vy))
    }

    fn setup() -> (LeaderController, BoundaryPolicy, Viewport, StdRng) {
        let config = SimulationConfig::default();
        (
            LeaderController::new(&config).with_last_redirect(0),
            BoundaryPolicy::from_config(&config),
            Viewport::new(1000.0, 1000.0),
            StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn no_redirect_before_delay() {
        let (mut controller, boundary, viewport, mut rng) = setup();
        let mut leader = leader_at(500.0, 500.0, 1.0, 0.0);
        assert!(!controller.update(&mut leader, &boundary, viewport, 3_999, &mut rng));
        assert_eq!(controller.redirects(), 0);
        assert_eq!(leader.position, Vec2::new(501.0, 500.0));
        assert_eq!(leader.velocity, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn redirect_at_delay() {
        let (mut controller, boundary, viewport, mut rng) = setup();
        let mut leader = leader_at(500.0, 500.0, 0.0, 0.0);
        assert!(controller.update(&mut leader, &boundary, viewport, 4_000, &mut rng));
        assert_eq!(controller.last_redirect_ms(), Some(4_000));
        assert!(leader.speed() <= 2.0 + 1e-5);

        // The timer restarts from the redirection
        assert!(!controller.update(&mut leader, &boundary, viewport, 7_999, &mut rng));
        assert!(controller.update(&mut leader, &boundary, viewport, 8_000, &mut rng));
        assert_eq!(controller.redirects(), 2);
    }

    #[test]
    fn first_update_redirects() {
        let config = SimulationConfig::default();
        let mut controller = LeaderController::new(&config);
        let boundary = BoundaryPolicy::from_config(&config);
        let viewport = Viewport::new(1000.0, 1000.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut leader = leader_at(500.0, 500.0, 0.0, 0.0);

        assert_eq!(controller.last_redirect_ms(), None);
        assert!(controller.redirect_due(0));
        assert!(controller.update(&mut leader, &boundary, viewport, 16, &mut rng));
        assert_eq!(controller.last_redirect_ms(), Some(16));

        // Later redirections follow the delay measured from the first one
        assert!(!controller.update(&mut leader, &boundary, viewport, 4_015, &mut rng));
        assert!(controller.update(&mut leader, &boundary, viewport, 4_016, &mut rng));
        assert_eq!(controller.redirects(), 2);
    }

    #[test]
    fn speed_is_clamped_to_leader_max() {
        let (mut controller, boundary, viewport, mut rng) = setup();
        let mut leader = leader_at(500.0, 500.0, 30.0, -40.0);
        controller.update(&mut leader, &boundary, viewport, 10, &mut rng);
        assert!((leader.speed() - 2.0).abs() < 1e-5);
        // Position advanced by the pre-clamp velocity
        assert_eq!(leader.position, Vec2::new(530.0, 460.0));
    }

    #[test]
    fn boundary_nudges_leader() {
        let (mut controller, boundary, viewport, mut rng) = setup();
        let mut leader = leader_at(50.0, 500.0, 0.0, 0.0);
        controller.update(&mut leader, &boundary, viewport, 10, &mut rng);
        assert!((leader.velocity - Vec2::new(0.05, 0.0)).length() < 1e-6);
    }

    #[test]
    fn clock_going_backwards_does_not_redirect() {
        let config = SimulationConfig::default();
        let mut controller = LeaderController::new(&config).with_last_redirect(10_000);
        let boundary = BoundaryPolicy::from_config(&config);
        let mut rng = StdRng::seed_from_u64(1);
        let mut leader = leader_at(500.0, 500.0, 0.0, 0.0);
        let viewport = Viewport::new(1000.0, 1000.0);
        assert!(!controller.update(&mut leader, &boundary, viewport, 5, &mut rng));
    }
}

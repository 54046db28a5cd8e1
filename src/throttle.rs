use std::time::Duration;

use rand::Rng;

use crate::run_config::{AdaptiveThrottle, Politeness};

/// Delay bookkeeping for one host.
#[derive(Debug, Clone)]
pub struct HostDelay {
    current: Duration,
    floor: Duration,
    randomization: f64,
    adaptive: Option<AdaptiveThrottle>,
}

impl HostDelay {
    pub fn new(politeness: &Politeness, adaptive: Option<&AdaptiveThrottle>) -> Self {
        let floor = politeness.request_delay;
        let current = match adaptive {
            Some(throttle) => floor.max(throttle.start_delay),
            None => floor,
        };
        Self {
            current,
            floor,
            randomization: politeness.delay_randomization_factor,
            adaptive: adaptive.cloned(),
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// The wait before the next request, with jitter applied.
    pub fn next_wait(&self) -> Duration {
        jittered(self.current, self.randomization)
    }

    /// Feeds one observed response back into the adaptive delay.
    pub fn observe(&mut self, latency: Duration, status: u16) {
        let Some(throttle) = &self.adaptive else {
            return;
        };
        let target =
            Duration::try_from_secs_f64(latency.as_secs_f64() / throttle.target_concurrency)
                .unwrap_or(Duration::MAX);
        let mut next = (self.current.saturating_add(target) / 2).max(target);
        next = next.clamp(self.floor, throttle.max_delay.max(self.floor));
        if !(200..300).contains(&status) && next < self.current {
            return;
        }
        tracing::trace!(
            ?latency,
            status,
            from = ?self.current,
            to = ?next,
            "adjusting host delay"
        );
        self.current = next;
    }
}

/// Uniform in `[(1 - factor) * delay, (1 + factor) * delay]`.
pub fn jittered(delay: Duration, factor: f64) -> Duration {
    if delay.is_zero() || factor <= 0.0 {
        return delay;
    }
    let factor = factor.min(1.0);
    let scale = rand::rng().random_range((1.0 - factor)..=(1.0 + factor));
    delay.mul_f64(scale)
}

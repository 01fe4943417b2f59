use std::thread;
use std::time::Duration;

use rand::Rng;

/// Flat politeness delay between requests: `delay` plus a uniformly random
/// share of `jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
	pub delay: Duration,
	pub jitter: Duration,
}

impl Default for Pacing {
	fn default() -> Self {
		Self {
			delay: Duration::from_secs(1),
			jitter: Duration::from_secs(1),
		}
	}
}

impl Pacing {
	pub fn none() -> Self {
		Self {
			delay: Duration::ZERO,
			jitter: Duration::ZERO,
		}
	}

	/// Pause without jitter, used between photo downloads.
	pub fn flat(delay: Duration) -> Self {
		Self {
			delay,
			jitter: Duration::ZERO,
		}
	}

	pub fn next_pause(&self) -> Duration {
		if self.jitter.is_zero() {
			return self.delay;
		}
		let extra = rand::rng().random_range(Duration::ZERO..self.jitter);
		self.delay + extra
	}

	pub fn pause(&self) {
		let pause = self.next_pause();
		if !pause.is_zero() {
			thread::sleep(pause);
		}
	}
}

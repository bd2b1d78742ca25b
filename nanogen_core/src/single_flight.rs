use std::sync::Mutex;
use std::sync::PoisonError;

#[derive(Debug, Default)]
struct FlightState {
	running: bool,
	pending: bool,
}

/// Allows at most one generation at a time.
///
/// A request arriving while a run is active is not interleaved with it.
/// Instead it is remembered, and the active run performs one more pass when it
/// finishes, however many requests arrived in between.
#[derive(Debug, Default)]
pub struct SingleFlight {
	state: Mutex<FlightState>,
}

impl SingleFlight {
	pub fn new() -> Self {
		Self::default()
	}

	/// Start a run. Returns `None` and records a pending rerun when another
	/// run is active.
	pub fn try_begin(&self) -> Option<FlightGuard<'_>> {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		if state.running {
			state.pending = true;
			return None;
		}

		state.running = true;
		state.pending = false;
		Some(FlightGuard {
			flight: self,
			released: false,
		})
	}

	pub fn is_running(&self) -> bool {
		self.state
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.running
	}

	fn release(&self) {
		let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
		state.running = false;
	}
}

/// Held for the duration of a run. Dropping it releases the flight.
#[derive(Debug)]
pub struct FlightGuard<'a> {
	flight: &'a SingleFlight,
	released: bool,
}

impl FlightGuard<'_> {
	/// Finish one pass. Returns `true` and keeps the flight when a rerun was
	/// requested during the pass, otherwise releases it and returns `false`.
	///
	/// The check and the release happen under the same lock as
	/// [`SingleFlight::try_begin`], so no request is lost in between.
	pub fn finish_pass(&mut self) -> bool {
		let mut state = self
			.flight
			.state
			.lock()
			.unwrap_or_else(PoisonError::into_inner);

		if std::mem::take(&mut state.pending) {
			return true;
		}

		state.running = false;
		self.released = true;
		false
	}
}

impl Drop for FlightGuard<'_> {
	fn drop(&mut self) {
		if !self.released {
			self.flight.release();
		}
	}
}

//! Request sequencing for asynchronous work whose results may arrive late.
//!
//! Every layout run or fetch takes a [`Ticket`]. When the work completes the
//! result is committed only if its ticket is still the latest one issued.

use std::sync::atomic::{AtomicU64, Ordering};

/// Token identifying one asynchronous request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Issues monotonically increasing tickets and remembers the latest.
#[derive(Debug, Default)]
pub struct RequestSequencer {
	latest: AtomicU64,
}

impl RequestSequencer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a new request, superseding every earlier ticket.
	pub fn issue(&self) -> Ticket {
		Ticket(self.latest.fetch_add(1, Ordering::Relaxed) + 1)
	}

	pub fn is_current(&self, ticket: Ticket) -> bool {
		self.latest.load(Ordering::Relaxed) == ticket.0
	}

	/// Supersedes every outstanding ticket without starting a new request.
	pub fn invalidate(&self) {
		self.latest.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_latest_ticket_is_current() {
		let seq = RequestSequencer::new();
		let first = seq.issue();
		assert!(seq.is_current(first));

		let second = seq.issue();
		assert!(!seq.is_current(first));
		assert!(seq.is_current(second));
		assert_ne!(first, second);
	}

	#[test]
	fn invalidate_supersedes_outstanding_tickets() {
		let seq = RequestSequencer::new();
		let ticket = seq.issue();
		seq.invalidate();
		assert!(!seq.is_current(ticket));
		assert!(seq.is_current(seq.issue()));
	}
}

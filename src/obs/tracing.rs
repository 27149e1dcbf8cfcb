//! Span plumbing for a verification run.
//!
//! Each [`Phase`] gets one `info` span named `idp_selector_verifier.phase`. Probe events are
//! emitted inside whichever phase span is current, so a subscriber can group per-URL results by
//! the step that produced them. Without the `tracing` feature every type here is zero-sized.

// self
use crate::{
	_prelude::*,
	obs::{Phase, ProbeOutcome},
};

/// Future returned by [`PhaseSpan::instrument`]; the bare future when `tracing` is off.
#[cfg(feature = "tracing")]
pub type PhaseFuture<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`PhaseSpan::instrument`]; the bare future when `tracing` is off.
#[cfg(not(feature = "tracing"))]
pub type PhaseFuture<F> = F;

/// Span covering a single [`Phase`] of the run.
#[derive(Clone, Debug)]
pub struct PhaseSpan {
	phase: Phase,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl PhaseSpan {
	/// Opens the span for `phase`. It only becomes current once entered or attached to a future.
	pub fn new(phase: Phase) -> Self {
		Self {
			phase,
			#[cfg(feature = "tracing")]
			span: tracing::info_span!("idp_selector_verifier.phase", phase = phase.as_str()),
		}
	}

	/// Phase covered by this span.
	pub fn phase(&self) -> Phase {
		self.phase
	}

	/// Makes the span current until the returned guard drops.
	///
	/// Only for phases that never await; async phases go through [`PhaseSpan::instrument`].
	pub fn entered(self) -> PhaseGuard {
		PhaseGuard {
			phase: self.phase,
			#[cfg(feature = "tracing")]
			_entered: self.span.entered(),
		}
	}

	/// Attaches the span to a probing future so it is current on every poll.
	pub fn instrument<F>(&self, fut: F) -> PhaseFuture<F>
	where
		F: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Keeps a synchronous phase current; logs `phase finished` at `trace` on drop.
#[derive(Debug)]
pub struct PhaseGuard {
	phase: Phase,
	#[cfg(feature = "tracing")]
	_entered: tracing::span::EnteredSpan,
}
impl PhaseGuard {
	/// Phase held current by this guard.
	pub fn phase(&self) -> Phase {
		self.phase
	}
}
impl Drop for PhaseGuard {
	fn drop(&mut self) {
		#[cfg(feature = "tracing")]
		{
			tracing::trace!(phase = self.phase.as_str(), "phase finished");
		}
	}
}

/// Emits one event per probe; mismatches and transport errors log at `warn`.
pub fn trace_probe(url: &str, outcome: ProbeOutcome) {
	#[cfg(feature = "tracing")]
	{
		match outcome {
			ProbeOutcome::Pass => tracing::debug!(url, outcome = outcome.as_str(), "probe passed"),
			_ => tracing::warn!(url, outcome = outcome.as_str(), "probe failed"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (url, outcome);
	}
}

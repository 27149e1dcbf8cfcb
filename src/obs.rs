//! Optional observability helpers for verification runs.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `idp_selector_verifier.phase` with the
//!   `phase` field, plus one event per probe.
//! - Enable `metrics` to increment the `idp_selector_verifier_probe_total` counter for every
//!   probe, labeled by `phase` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Orchestrator states; each runs exactly once per verification run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
	/// Configuration accepted, nothing derived yet.
	Init,
	/// Expectations and link patterns are being derived.
	BuildExpectations,
	/// The selection page is probed and its links matched.
	ProbeSelectionPage,
	/// Every mapped URL is probed.
	ProbeMappedUrls,
	/// Failures are aggregated into the final report.
	Report,
}
impl Phase {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Phase::Init => "init",
			Phase::BuildExpectations => "build_expectations",
			Phase::ProbeSelectionPage => "probe_selection_page",
			Phase::ProbeMappedUrls => "probe_mapped_urls",
			Phase::Report => "report",
		}
	}
}
impl Display for Phase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProbeOutcome {
	/// Every assertion held.
	Pass,
	/// A response arrived but differed from the expectation.
	Mismatch,
	/// No response was obtained.
	TransportError,
}
impl ProbeOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ProbeOutcome::Pass => "pass",
			ProbeOutcome::Mismatch => "mismatch",
			ProbeOutcome::TransportError => "transport_error",
		}
	}
}
impl Display for ProbeOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

// self
use crate::obs::{Phase, ProbeOutcome};

/// Records a probe outcome via the global metrics recorder (when enabled).
pub fn record_probe_outcome(phase: Phase, outcome: ProbeOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"idp_selector_verifier_probe_total",
			"phase" => phase.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (phase, outcome);
	}
}

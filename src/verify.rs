//! Verification orchestrator.
//!
//! A run walks `Init → BuildExpectations → ProbeSelectionPage → ProbeMappedUrls → Report`
//! exactly once. Probes are issued sequentially and each response is fully consumed before the
//! next one. Only fatal faults (broken escaping oracle, invalid configuration, colliding probe
//! URLs) end the run early; everything observed while probing is recorded and reported
//! together.

// self
use crate::{
	_prelude::*,
	config::VerifierConfig,
	escape::{AttributeRenderer, HrefRenderer},
	expect::{ExpectationBuilder, ExpectationPlan, LinkPattern, STATUS_OK},
	http::{ProbeResult, TargetProbe},
	obs::{self, Phase, PhaseSpan, ProbeOutcome},
	report::{Failure, ProbeVerdict, VerificationReport, body_excerpt},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestProbe;

#[cfg(feature = "reqwest")]
/// Verifier specialized for the crate's default reqwest probe.
pub type ReqwestVerifier = Verifier<ReqwestProbe>;

/// Drives one verification run against a target server.
///
/// The verifier owns the probe transport and the configuration so every run derives fresh
/// expectations. The transport is shared read-only across probes.
#[derive(Clone)]
pub struct Verifier<P>
where
	P: ?Sized + TargetProbe,
{
	/// Transport used for every probe.
	pub probe: Arc<P>,
	/// Run configuration.
	pub config: VerifierConfig,
	renderer: Arc<dyn AttributeRenderer>,
}
impl<P> Verifier<P>
where
	P: ?Sized + TargetProbe,
{
	/// Creates a verifier after validating `config`.
	pub fn new(config: VerifierConfig, probe: Arc<P>) -> Result<Self> {
		config.validate()?;

		Ok(Self { probe, config, renderer: Arc::new(HrefRenderer) })
	}

	/// Overrides the renderer used to predict attribute escaping.
	pub fn with_renderer(mut self, renderer: Arc<dyn AttributeRenderer>) -> Self {
		self.renderer = renderer;

		self
	}

	/// Derives the expectation plan for the configured providers.
	pub fn plan(&self) -> Result<ExpectationPlan> {
		ExpectationBuilder::new(self.config.client.clone())
			.with_renderer(self.renderer.clone())
			.with_collision_policy(self.config.collision_policy)
			.build(
				&self.config.providers,
				&self.config.master_public_url,
				&self.config.asset_public_url,
			)
	}

	/// Runs every phase once and returns the consolidated report.
	///
	/// `Ok` is returned even when probes failed; use [`VerificationReport::into_result`] to turn
	/// recorded failures into an error.
	pub async fn run(&self) -> Result<VerificationReport> {
		let started_at = OffsetDateTime::now_utc();

		{
			let _guard = PhaseSpan::new(Phase::Init).entered();

			self.config.validate()?;
		}

		let plan = {
			let _guard = PhaseSpan::new(Phase::BuildExpectations).entered();

			self.plan()?
		};
		let mut recorder = Recorder::default();

		PhaseSpan::new(Phase::ProbeSelectionPage)
			.instrument(self.probe_selection_page(&plan, &mut recorder))
			.await;
		PhaseSpan::new(Phase::ProbeMappedUrls)
			.instrument(self.probe_mapped_urls(&plan, &mut recorder))
			.await;

		let _guard = PhaseSpan::new(Phase::Report).entered();

		Ok(VerificationReport {
			started_at,
			finished_at: OffsetDateTime::now_utc(),
			verdicts: recorder.verdicts,
			failures: recorder.failures,
		})
	}

	async fn probe_selection_page(&self, plan: &ExpectationPlan, recorder: &mut Recorder) {
		let url = plan.selection_page_url.as_str();
		let failures = match self.probe.probe(url).await {
			Ok(result) => assess(url, &result, STATUS_OK, "", &plan.link_patterns),
			Err(e) => return recorder.transport(Phase::ProbeSelectionPage, Failure::transport(url, &e)),
		};

		recorder.record(Phase::ProbeSelectionPage, url, failures);
	}

	async fn probe_mapped_urls(&self, plan: &ExpectationPlan, recorder: &mut Recorder) {
		for expectation in &plan.expectations {
			let url = expectation.url.as_str();

			match self.probe.probe(url).await {
				Ok(result) => recorder.record(
					Phase::ProbeMappedUrls,
					url,
					assess(
						url,
						&result,
						expectation.expected_status,
						&expectation.expected_location,
						&[],
					),
				),
				Err(e) => recorder.transport(Phase::ProbeMappedUrls, Failure::transport(url, &e)),
			}
		}
	}
}
impl<P> Debug for Verifier<P>
where
	P: ?Sized + TargetProbe,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Verifier").field("config", &self.config).finish_non_exhaustive()
	}
}

#[derive(Default)]
struct Recorder {
	verdicts: Vec<ProbeVerdict>,
	failures: Vec<Failure>,
}
impl Recorder {
	fn record(&mut self, phase: Phase, url: &str, failures: Vec<Failure>) {
		let outcome = if failures.is_empty() { ProbeOutcome::Pass } else { ProbeOutcome::Mismatch };

		self.push(phase, url, outcome, failures);
	}

	fn transport(&mut self, phase: Phase, failure: Failure) {
		let url = failure.url().to_owned();

		self.push(phase, &url, ProbeOutcome::TransportError, vec![failure]);
	}

	fn push(&mut self, phase: Phase, url: &str, outcome: ProbeOutcome, failures: Vec<Failure>) {
		obs::trace_probe(url, outcome);
		obs::record_probe_outcome(phase, outcome);

		self.verdicts.push(ProbeVerdict { url: url.to_owned(), passed: outcome == ProbeOutcome::Pass });
		self.failures.extend(failures);
	}
}

/// Compares one probe result against its expectation and required link patterns.
pub fn assess(
	url: &str,
	result: &ProbeResult,
	expected_status: u16,
	expected_location: &str,
	patterns: &[LinkPattern],
) -> Vec<Failure> {
	let mut failures = Vec::new();

	if result.status != expected_status {
		failures.push(Failure::Status {
			url: url.to_owned(),
			expected: expected_status,
			actual: result.status,
		});
	}
	if result.location != expected_location {
		failures.push(Failure::Location {
			url: url.to_owned(),
			expected: expected_location.to_owned(),
			actual: result.location.clone(),
		});
	}

	for pattern in patterns.iter().filter(|pattern| !pattern.is_match(&result.body)) {
		failures.push(Failure::PatternNotFound {
			url: url.to_owned(),
			provider: pattern.provider.clone(),
			pattern: pattern.as_str().to_owned(),
			excerpt: body_excerpt(&result.body),
		});
	}

	failures
}

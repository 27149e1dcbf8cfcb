//! Verification results: per-URL verdicts plus the consolidated failure list.

// self
use crate::{_prelude::*, error::TransportError};

/// Maximum number of body bytes quoted in a [`Failure::PatternNotFound`] entry.
pub const BODY_EXCERPT_LIMIT: usize = 1024;

/// One recorded, non-fatal failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
	/// No response was obtained.
	Transport {
		/// Probed URL.
		url: String,
		/// Rendered transport error.
		message: String,
	},
	/// The status code differs from the expectation.
	Status {
		/// Probed URL.
		url: String,
		/// Expected status.
		expected: u16,
		/// Observed status.
		actual: u16,
	},
	/// The `Location` path differs from the expectation.
	Location {
		/// Probed URL.
		url: String,
		/// Expected location path.
		expected: String,
		/// Observed location path.
		actual: String,
	},
	/// The selection page body lacks a provider link.
	PatternNotFound {
		/// Probed URL.
		url: String,
		/// Provider whose link is missing.
		provider: String,
		/// Pattern that failed to match.
		pattern: String,
		/// Leading part of the body for diagnosis.
		excerpt: String,
	},
}
impl Failure {
	/// Records a transport failure for `url`.
	pub fn transport(url: &str, err: &TransportError) -> Self {
		Self::Transport { url: url.to_owned(), message: err.to_string() }
	}

	/// URL the failure is attributed to.
	pub fn url(&self) -> &str {
		match self {
			Self::Transport { url, .. }
			| Self::Status { url, .. }
			| Self::Location { url, .. }
			| Self::PatternNotFound { url, .. } => url,
		}
	}
}
impl Display for Failure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Transport { url, message } =>
				write!(f, "Unexpected error while accessing {url:?}: {message}"),
			Self::Status { url, expected, actual } =>
				write!(f, "Expected status {expected} for {url:?}, got {actual}"),
			Self::Location { url, expected, actual } => write!(
				f,
				"Expected redirection to {expected:?} for {url:?}, got {actual:?} instead"
			),
			Self::PatternNotFound { url, provider, pattern, excerpt } => write!(
				f,
				"Expected response body of {url:?} to match {pattern} for provider {provider:?}; body began with {excerpt:?}"
			),
		}
	}
}

/// Pass/fail verdict for one probed URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeVerdict {
	/// Probed URL.
	pub url: String,
	/// Whether every assertion against the URL held.
	pub passed: bool,
}

/// Outcome of a complete verification run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
	/// When the run started.
	pub started_at: OffsetDateTime,
	/// When the run finished.
	pub finished_at: OffsetDateTime,
	/// Verdicts in probe order.
	pub verdicts: Vec<ProbeVerdict>,
	/// Every recorded failure in probe order.
	pub failures: Vec<Failure>,
}
impl VerificationReport {
	/// Returns true when no failure was recorded.
	pub fn is_success(&self) -> bool {
		self.failures.is_empty()
	}

	/// Failures attributed to `url`.
	pub fn failures_for<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a Failure> {
		self.failures.iter().filter(move |failure| failure.url() == url)
	}

	/// Converts a failing report into [`Error::Verification`].
	pub fn into_result(self) -> Result<Self> {
		if self.is_success() { Ok(self) } else { Err(Error::Verification(Box::new(self))) }
	}
}
impl Display for VerificationReport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let failed = self.verdicts.iter().filter(|verdict| !verdict.passed).count();

		write!(f, "{failed} of {} probed URLs failed verification.", self.verdicts.len())?;

		for failure in &self.failures {
			write!(f, "\n- {failure}")?;
		}

		Ok(())
	}
}

/// Returns at most [`BODY_EXCERPT_LIMIT`] bytes of `body`, cut on a char boundary.
pub fn body_excerpt(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	if text.len() <= BODY_EXCERPT_LIMIT {
		return text.into_owned();
	}

	let mut end = BODY_EXCERPT_LIMIT;

	while !text.is_char_boundary(end) {
		end -= 1;
	}

	text[..end].to_owned()
}

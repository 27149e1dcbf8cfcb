//! Verifier-level error types shared by the escaper, expectation builder, probes, and
//! orchestrator.

// self
use crate::{_prelude::*, report::VerificationReport};

/// Verifier-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical verifier error exposed by public APIs.
///
/// Only [`Error::Environment`], [`Error::Config`], [`Error::Provider`], and
/// [`Error::Expectation`] stop a run. Transport failures and mismatches observed while probing
/// are collected into a [`VerificationReport`] instead.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The escaping oracle is broken; no further result can be trusted.
	#[error(transparent)]
	Environment(#[from] EnvironmentError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity provider descriptor failed validation.
	#[error(transparent)]
	Provider(#[from] crate::provider::ProviderDescriptorError),
	/// Expectations could not be assembled.
	#[error(transparent)]
	Expectation(#[from] ExpectationError),
	/// Transport failure (DNS, TCP, TLS, body read).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The run completed and recorded at least one failure.
	#[error("{0}")]
	Verification(Box<VerificationReport>),
}

/// Fatal faults in the local rendering environment.
#[derive(Debug, ThisError)]
pub enum EnvironmentError {
	/// The attribute template failed to render.
	#[error("Attribute template failed to render.")]
	Render {
		/// Underlying renderer failure.
		#[source]
		source: BoxError,
	},
	/// Rendered output lost its static prefix or suffix.
	#[error("Attribute template rendered unexpected text: {rendered}.")]
	UnexpectedRendering {
		/// Full rendered output.
		rendered: String,
	},
	/// A link pattern built from quoted input failed to compile.
	#[error("Link pattern `{pattern}` failed to compile.")]
	InvalidPattern {
		/// Offending pattern.
		pattern: String,
		/// Underlying regex failure.
		#[source]
		source: regex::Error,
	},
}
impl EnvironmentError {
	/// Wraps a renderer failure inside [`EnvironmentError`].
	pub fn render(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Render { source: Box::new(src) }
	}
}

/// Configuration and validation failures raised before any probe is issued.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration is malformed at `{}`.", .source.path())]
	Parse {
		/// Structured parsing failure including the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A configured public URL cannot be parsed.
	#[error("The {field} `{value}` is not a valid URL.")]
	InvalidUrl {
		/// Configuration field name.
		field: &'static str,
		/// Configured value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured public URL uses a scheme other than http or https.
	#[error("The {field} must use http or https: {value}.")]
	UnsupportedScheme {
		/// Configuration field name.
		field: &'static str,
		/// Configured value.
		value: String,
	},
	/// Fewer than two identity providers are configured.
	#[error("At least two identity providers are required, found {count}.")]
	TooFewProviders {
		/// Number of configured providers.
		count: usize,
	},
	/// An OAuth client setting is empty.
	#[error("OAuth client setting `{field}` must not be empty.")]
	EmptyClientField {
		/// Setting name.
		field: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(source: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::Parse { source }
	}
}

/// Failures raised while assembling the expectation mapping.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ExpectationError {
	/// Two expectations resolved to the same probe URL.
	#[error("Probe URL `{url}` is produced more than once.")]
	DuplicateUrl {
		/// Colliding URL.
		url: String,
	},
}

/// Transport-level failures. Recorded per URL, never fatal.
///
/// Custom [`TargetProbe`](crate::http::TargetProbe) implementations report connection-level
/// failures through [`TransportError::network`] and truncated bodies through
/// [`TransportError::body`].
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while probing: {source}")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The response arrived but its body could not be read.
	#[error("Response body could not be read: {source}")]
	Body {
		/// Transport-specific read error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific body read error.
	pub fn body(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Body { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

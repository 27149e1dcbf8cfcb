//! Probe primitives for issuing single GET requests against the server under test.
//!
//! The module exposes [`TargetProbe`] alongside [`ProbeResult`] so the orchestrator never
//! depends on server internals. [`ReqwestProbe`] is the default transport: it skips TLS
//! certificate verification and never follows redirects, because the raw 3xx response is the
//! object under test.

// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")]
use {
	crate::error::ConfigError,
	reqwest::{
		header::{ACCEPT, LOCATION},
		redirect::Policy,
	},
	std::time::Duration,
};

/// Boxed future returned by [`TargetProbe::probe`].
pub type ProbeFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ProbeResult, TransportError>> + 'a + Send>>;

/// Media type requested by every probe.
pub const ACCEPT_HTML: &str = "text/html";

/// Outcome of a single probe, consumed by assertions and then discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeResult {
	/// HTTP status code.
	pub status: u16,
	/// `Location` header with the query removed; empty when the header is absent.
	pub location: String,
	/// Full response body.
	pub body: Vec<u8>,
}
impl ProbeResult {
	/// Builds a result, normalizing `location` with [`strip_query`].
	pub fn new(status: u16, location: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
		Self {
			status,
			location: location.map(strip_query).unwrap_or_default().to_owned(),
			body: body.into(),
		}
	}

	/// Returns the body decoded lossily as UTF-8.
	pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}
}

/// Abstraction over transports able to GET an absolute URL without following redirects.
///
/// Implementations send `Accept: text/html`, read the body fully, and report a
/// [`TransportError`] only when no response was obtained.
pub trait TargetProbe
where
	Self: Send + Sync,
{
	/// Probes `url` once.
	fn probe<'a>(&'a self, url: &'a str) -> ProbeFuture<'a>;
}
impl<P> TargetProbe for Arc<P>
where
	P: ?Sized + TargetProbe,
{
	fn probe<'a>(&'a self, url: &'a str) -> ProbeFuture<'a> {
		(**self).probe(url)
	}
}

/// Discards everything from the first `?` onward.
pub fn strip_query(location: &str) -> &str {
	location.split_once('?').map_or(location, |(path, _)| path)
}

/// Thin wrapper around [`ReqwestClient`] configured for black-box probing.
///
/// Any client supplied through [`ReqwestProbe::with_client`] must disable redirect following;
/// otherwise the probe observes the redirect target instead of the 3xx response.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestProbe(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestProbe {
	/// Builds a probe that accepts any certificate and never follows redirects.
	pub fn insecure() -> Result<Self, ConfigError> {
		Self::insecure_with_timeout(None)
	}

	/// Same as [`ReqwestProbe::insecure`], with an overall per-request ceiling.
	pub fn insecure_with_timeout(timeout: Option<Duration>) -> Result<Self, ConfigError> {
		let mut builder =
			ReqwestClient::builder().danger_accept_invalid_certs(true).redirect(Policy::none());

		if let Some(timeout) = timeout {
			builder = builder.timeout(timeout);
		}

		Ok(Self(builder.build()?))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestProbe {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TargetProbe for ReqwestProbe {
	fn probe<'a>(&'a self, url: &'a str) -> ProbeFuture<'a> {
		Box::pin(async move {
			let response = self.0.get(url).header(ACCEPT, ACCEPT_HTML).send().await?;
			let status = response.status().as_u16();
			let location = response
				.headers()
				.get(LOCATION)
				.map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
			let body = response.bytes().await.map_err(TransportError::body)?;

			Ok(ProbeResult::new(status, location.as_deref(), body.to_vec()))
		})
	}
}

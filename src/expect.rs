//! Expected redirect targets and selection-page link patterns, derived per identity provider.
//!
//! Two distinct encodings are in play. A provider name placed in the `idp` query value is
//! query-escaped; the same name placed in the `/login/<name>` redirect is path-segment
//! escaped. Both are reversible with standard percent-decoding, so awkward names never
//! produce ambiguous URLs.

// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::bytes::Regex;
// self
use crate::{
	_prelude::*,
	config::OAuthClientSettings,
	error::{EnvironmentError, ExpectationError},
	escape::{AttributeRenderer, HrefRenderer, escape_with},
	provider::IdentityProviderDescriptor,
};

/// Authorization endpoint hosting the login selection page.
pub const AUTHORIZE_PATH: &str = "/oauth/authorize";
/// Bare login path; unavailable whenever several providers are configured.
pub const LOGIN_PATH: &str = "/login";
/// Query parameter selecting a provider.
pub const IDP_PARAM: &str = "idp";
/// Expected status for the selection page and provider login pages.
pub const STATUS_OK: u16 = 200;
/// Expected status for provider selection redirects.
pub const STATUS_FOUND: u16 = 302;
/// Expected status for the bare login path.
pub const STATUS_NOT_FOUND: u16 = 404;

// Only RFC 3986 unreserved bytes pass through a query value.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');
// Unreserved bytes plus the sub-delimiters a single path segment may carry verbatim.
const PATH_SEGMENT: &AsciiSet = &QUERY_VALUE
	.remove(b'$')
	.remove(b'&')
	.remove(b'+')
	.remove(b',')
	.remove(b';')
	.remove(b'=')
	.remove(b':')
	.remove(b'@');

/// Query-escapes a single value; spaces become `+`.
pub fn query_escape(raw: &str) -> String {
	raw.split(' ')
		.map(|part| utf8_percent_encode(part, QUERY_VALUE).to_string())
		.collect::<Vec<_>>()
		.join("+")
}

/// Encodes `key=value` pairs in order, joined by `&`.
pub fn query_encode_pairs<'a, I>(pairs: I) -> String
where
	I: IntoIterator<Item = (&'a str, &'a str)>,
{
	pairs
		.into_iter()
		.map(|(key, value)| format!("{}={}", query_escape(key), query_escape(value)))
		.collect::<Vec<_>>()
		.join("&")
}

/// Path-segment-escapes a single segment; `/` is always escaped.
pub fn path_segment_escape(raw: &str) -> String {
	utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

/// Returns the login page path for `provider_name`.
pub fn login_path(provider_name: &str) -> String {
	format!("{LOGIN_PATH}/{}", path_segment_escape(provider_name))
}

/// How [`ExpectationSet`] treats two entries resolving to the same URL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
	#[default]
	/// Fail the build with [`ExpectationError::DuplicateUrl`].
	Reject,
	/// Replace the earlier entry in place.
	LastWriteWins,
}

/// Expected outcome for one probe URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
	/// Absolute probe URL.
	pub url: String,
	/// Expected HTTP status code.
	pub expected_status: u16,
	/// Expected `Location` path; empty means no redirect.
	pub expected_location: String,
}
impl Expectation {
	/// Creates an expectation.
	pub fn new(url: impl Into<String>, expected_status: u16, expected_location: impl Into<String>) -> Self {
		Self { url: url.into(), expected_status, expected_location: expected_location.into() }
	}
}

/// Insertion-ordered association list of expectations keyed by URL.
#[derive(Clone, Debug, Default)]
pub struct ExpectationSet {
	entries: Vec<Expectation>,
	policy: CollisionPolicy,
}
impl ExpectationSet {
	/// Creates an empty set using `policy` on collisions.
	pub fn new(policy: CollisionPolicy) -> Self {
		Self { entries: Vec::new(), policy }
	}

	/// Adds an expectation, applying the collision policy.
	pub fn insert(&mut self, expectation: Expectation) -> Result<(), ExpectationError> {
		match self.entries.iter_mut().find(|entry| entry.url == expectation.url) {
			None => self.entries.push(expectation),
			Some(existing) => match self.policy {
				CollisionPolicy::Reject =>
					return Err(ExpectationError::DuplicateUrl { url: expectation.url }),
				CollisionPolicy::LastWriteWins => *existing = expectation,
			},
		}

		Ok(())
	}

	/// Looks up the expectation for `url`.
	pub fn get(&self, url: &str) -> Option<&Expectation> {
		self.entries.iter().find(|entry| entry.url == url)
	}

	/// Iterates in insertion order.
	pub fn iter(&self) -> std::slice::Iter<'_, Expectation> {
		self.entries.iter()
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true when the set holds no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
impl<'a> IntoIterator for &'a ExpectationSet {
	type IntoIter = std::slice::Iter<'a, Expectation>;
	type Item = &'a Expectation;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Compiled pattern that the selection page body must match for one provider.
#[derive(Clone, Debug)]
pub struct LinkPattern {
	/// Provider the pattern was derived from.
	pub provider: String,
	regex: Regex,
}
impl LinkPattern {
	/// Builds the pattern for an already query-encoded `idp` parameter.
	///
	/// The anchor href must carry the parameter, optionally preceded by other parameters joined
	/// with an escaped ampersand, and followed by another escaped ampersand or the closing quote.
	pub fn new<R>(
		renderer: &R,
		provider: &str,
		idp_query_param: &str,
	) -> Result<Self, EnvironmentError>
	where
		R: ?Sized + AttributeRenderer,
	{
		let escaped = escape_with(renderer, idp_query_param)?;
		let pattern = format!(
			r#"{}\?(.*&amp;)?{}(&amp;|")"#,
			regex::escape(AUTHORIZE_PATH),
			regex::escape(&escaped)
		);
		let regex = Regex::new(&pattern)
			.map_err(|source| EnvironmentError::InvalidPattern { pattern: pattern.clone(), source })?;

		Ok(Self { provider: provider.to_owned(), regex })
	}

	/// Regular expression source.
	pub fn as_str(&self) -> &str {
		self.regex.as_str()
	}

	/// Returns true when the pattern matches anywhere in `body`.
	pub fn is_match(&self, body: &[u8]) -> bool {
		self.regex.is_match(body)
	}
}
impl Display for LinkPattern {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Everything a verification run asserts.
#[derive(Clone, Debug)]
pub struct ExpectationPlan {
	/// Absolute URL of the selection page (the login selector base without `idp`).
	pub selection_page_url: String,
	/// Probe URL mapping.
	pub expectations: ExpectationSet,
	/// One pattern per provider, in provider order.
	pub link_patterns: Vec<LinkPattern>,
}

/// Derives an [`ExpectationPlan`] from provider descriptors.
#[derive(Clone)]
pub struct ExpectationBuilder {
	client: OAuthClientSettings,
	renderer: Arc<dyn AttributeRenderer>,
	policy: CollisionPolicy,
}
impl ExpectationBuilder {
	/// Creates a builder using the askama-backed [`HrefRenderer`].
	pub fn new(client: OAuthClientSettings) -> Self {
		Self { client, renderer: Arc::new(HrefRenderer), policy: CollisionPolicy::default() }
	}

	/// Overrides the attribute renderer used to predict link escaping.
	pub fn with_renderer(mut self, renderer: Arc<dyn AttributeRenderer>) -> Self {
		self.renderer = renderer;

		self
	}

	/// Overrides the URL collision policy.
	pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Path and query of the selection page, without any `idp` parameter.
	pub fn login_selector_base(&self, asset_public_url: &str) -> String {
		let query = query_encode_pairs([
			("client_id", self.client.client_id.as_str()),
			("response_type", self.client.response_type.as_str()),
			("state", self.client.state.as_str()),
			("redirect_uri", asset_public_url),
		]);

		format!("{AUTHORIZE_PATH}?{query}")
	}

	/// Builds expectations and link patterns for `providers`.
	pub fn build(
		&self,
		providers: &[IdentityProviderDescriptor],
		master_public_url: &str,
		asset_public_url: &str,
	) -> Result<ExpectationPlan> {
		let master = master_public_url.trim_end_matches('/');
		let base = self.login_selector_base(asset_public_url);
		let then = query_encode_pairs([("then", self.client.then.as_str())]);
		let mut expectations = ExpectationSet::new(self.policy);
		let mut link_patterns = Vec::with_capacity(providers.len());

		expectations.insert(Expectation::new(format!("{master}{LOGIN_PATH}"), STATUS_NOT_FOUND, ""))?;

		for provider in providers {
			let idp_query_param = query_encode_pairs([(IDP_PARAM, provider.name.as_str())]);
			let login = login_path(&provider.name);

			expectations.insert(Expectation::new(
				format!("{master}{base}&{idp_query_param}"),
				STATUS_FOUND,
				login.as_str(),
			))?;
			expectations.insert(Expectation::new(format!("{master}{login}?{then}"), STATUS_OK, ""))?;
			link_patterns.push(LinkPattern::new(
				self.renderer.as_ref(),
				&provider.name,
				&idp_query_param,
			)?);
		}

		Ok(ExpectationPlan { selection_page_url: format!("{master}{base}"), expectations, link_patterns })
	}
}
impl Debug for ExpectationBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ExpectationBuilder")
			.field("client", &self.client)
			.field("policy", &self.policy)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use percent_encoding::percent_decode_str;
	// self
	use super::*;
	use crate::_preludet::{TEST_ASSET_URL, TEST_MASTER_URL, TEST_UNICODE_PROVIDER, test_providers};

	const UNICODE_QUERY: &str =
		"I%C3%B1t%C3%ABrn%C3%A2ti%C3%B4n%C3%A0liz%C3%A6ti%C3%B8n%2C+%21%40%23%24%5E%26%2A%28%29";
	const UNICODE_PATH: &str =
		"/login/I%C3%B1t%C3%ABrn%C3%A2ti%C3%B4n%C3%A0liz%C3%A6ti%C3%B8n,%20%21@%23$%5E&%2A%28%29";

	fn plan(providers: &[IdentityProviderDescriptor]) -> ExpectationPlan {
		ExpectationBuilder::new(OAuthClientSettings::default())
			.build(providers, TEST_MASTER_URL, TEST_ASSET_URL)
			.expect("Expectation plan should build.")
	}

	fn descriptor(name: &str) -> IdentityProviderDescriptor {
		IdentityProviderDescriptor::builder(name).build().expect("Descriptor should be valid.")
	}

	#[test]
	fn query_and_path_encodings_differ_and_reverse() {
		assert_eq!(query_escape(TEST_UNICODE_PROVIDER), UNICODE_QUERY);
		assert_eq!(login_path(TEST_UNICODE_PROVIDER), UNICODE_PATH);
		assert_eq!(path_segment_escape("a/b c+d"), "a%2Fb%20c+d");
		assert_eq!(login_path("a/b"), "/login/a%2Fb");

		let segment = UNICODE_PATH.trim_start_matches("/login/");
		let decoded =
			percent_decode_str(segment).decode_utf8().expect("Path segment should be UTF-8.");

		assert_eq!(decoded, TEST_UNICODE_PROVIDER);

		let query = query_encode_pairs([(IDP_PARAM, TEST_UNICODE_PROVIDER)]);
		let pairs: Vec<(String, String)> =
			url::form_urlencoded::parse(query.as_bytes()).into_owned().collect();

		assert_eq!(pairs, vec![(IDP_PARAM.to_owned(), TEST_UNICODE_PROVIDER.to_owned())]);
	}

	#[test]
	fn selector_base_escapes_the_redirect_uri() {
		let builder = ExpectationBuilder::new(OAuthClientSettings::default());

		assert_eq!(
			builder.login_selector_base(TEST_ASSET_URL),
			"/oauth/authorize?client_id=web-console&response_type=token&state=%2F&redirect_uri=https%3A%2F%2Fmaster.example.com%3A8443%2Fconsole%2F"
		);
	}

	#[test]
	fn three_providers_yield_static_entry_plus_two_per_provider() {
		let plan = plan(&test_providers());
		let base = ExpectationBuilder::new(OAuthClientSettings::default())
			.login_selector_base(TEST_ASSET_URL);

		assert_eq!(plan.expectations.len(), 7);
		assert_eq!(plan.link_patterns.len(), 3);
		assert_eq!(plan.selection_page_url, format!("{TEST_MASTER_URL}{base}"));

		let first = plan.expectations.iter().next().expect("Static entry should come first.");

		assert_eq!(first, &Expectation::new(format!("{TEST_MASTER_URL}/login"), 404, ""));

		let selection = plan
			.expectations
			.get(&format!("{TEST_MASTER_URL}{base}&idp={UNICODE_QUERY}"))
			.expect("Unicode provider selection URL should be mapped.");

		assert_eq!(selection.expected_status, 302);
		assert_eq!(selection.expected_location, UNICODE_PATH);

		let login = plan
			.expectations
			.get(&format!("{TEST_MASTER_URL}/login/foo?then=%2F"))
			.expect("Login page URL should be mapped.");

		assert_eq!(login.expected_status, 200);
		assert_eq!(login.expected_location, "");
	}

	#[test]
	fn trailing_slash_on_master_url_is_ignored() {
		let plan = ExpectationBuilder::new(OAuthClientSettings::default())
			.build(&[descriptor("foo"), descriptor("bar")], "https://m.example.com/", TEST_ASSET_URL)
			.expect("Expectation plan should build.");

		assert!(plan.expectations.get("https://m.example.com/login").is_some());
	}

	#[test]
	fn link_patterns_require_a_parameter_boundary() {
		let plan = plan(&[descriptor("foo"), descriptor("bar")]);
		let foo = &plan.link_patterns[0];

		assert_eq!(foo.provider, "foo");
		assert_eq!(foo.as_str(), r#"/oauth/authorize\?(.*&amp;)?idp=foo(&amp;|")"#);
		assert!(foo.is_match(
			br#"<a href="/oauth/authorize?client_id=web-console&amp;idp=foo&amp;state=%2F">"#
		));
		assert!(foo.is_match(br#"<a href="/oauth/authorize?idp=foo">"#));
		assert!(!foo.is_match(br#"<a href="/oauth/authorize?idp=foobar">"#));
		assert!(!foo.is_match(br#"<a href="/oauth/authorize?client_id=x&idp=foo">"#));
	}

	#[test]
	fn unicode_pattern_escapes_once() {
		let plan = plan(&test_providers());
		let pattern = plan.link_patterns[2].as_str();

		assert!(pattern.contains("%26"), "Ampersand in the name stays query-encoded: {pattern}.");
		assert!(!pattern.contains("&amp;amp;"));
		assert!(
			pattern.contains(r"%2C\&\#43;%21"),
			"Space-as-plus must be attribute-escaped: {pattern}."
		);
		assert!(!plan.link_patterns[2].is_match(
			format!(r#"<a href="/oauth/authorize?state=%2F&amp;idp={UNICODE_QUERY}">"#).as_bytes()
		));
	}

	#[test]
	fn unicode_pattern_matches_a_rendered_selection_page() {
		let plan = plan(&test_providers());
		let page = concat!(
			r#"<a href="/oauth/authorize?client_id=web-console&amp;idp="#,
			"I%C3%B1t%C3%ABrn%C3%A2ti%C3%B4n%C3%A0liz%C3%A6ti%C3%B8n%2C&#43;%21%40%23%24%5E%26%2A%28%29",
			r#"&amp;redirect_uri=https%3A%2F%2Fmaster.example.com%3A8443%2Fconsole%2F">"#,
		);

		assert!(plan.link_patterns[2].is_match(page.as_bytes()), "{}", plan.link_patterns[2]);
		assert!(!plan.link_patterns[0].is_match(page.as_bytes()));
	}

	#[test]
	fn duplicate_names_follow_the_collision_policy() {
		let providers = [descriptor("foo"), descriptor("foo"), descriptor("bar")];
		let err = ExpectationBuilder::new(OAuthClientSettings::default())
			.build(&providers, TEST_MASTER_URL, TEST_ASSET_URL)
			.expect_err("Duplicate provider names should be rejected by default.");

		assert!(matches!(err, Error::Expectation(ExpectationError::DuplicateUrl { .. })));

		let plan = ExpectationBuilder::new(OAuthClientSettings::default())
			.with_collision_policy(CollisionPolicy::LastWriteWins)
			.build(&providers, TEST_MASTER_URL, TEST_ASSET_URL)
			.expect("Last write wins should tolerate duplicates.");

		assert_eq!(plan.expectations.len(), 5);
		assert_eq!(plan.link_patterns.len(), 3);
	}

	#[test]
	fn last_write_wins_replaces_in_place() {
		let mut set = ExpectationSet::new(CollisionPolicy::LastWriteWins);

		set.insert(Expectation::new("a", 200, "")).expect("Insert should succeed.");
		set.insert(Expectation::new("b", 200, "")).expect("Insert should succeed.");
		set.insert(Expectation::new("a", 404, "")).expect("Insert should succeed.");

		let urls: Vec<_> = set.iter().map(|entry| (entry.url.as_str(), entry.expected_status)).collect();

		assert_eq!(urls, vec![("a", 404), ("b", 200)]);
	}
}

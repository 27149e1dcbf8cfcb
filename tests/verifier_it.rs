// std
use std::{io, sync::Mutex};
// self
use idp_selector_verifier::{
	_preludet::*,
	error::{ExpectationError, TransportError},
	expect::CollisionPolicy,
	http::{ProbeFuture, ProbeResult, TargetProbe},
	provider::IdentityProviderDescriptor,
	report::Failure,
	verify::Verifier,
};

// (name, `idp` value as rendered inside an href, login path) as a conforming server produces
// them. The href form is query-encoded first, then attribute-escaped, so the `+` standing in for
// the space reaches the page as `&#43;`.
const ROUTES: [(&str, &str, &str); 3] = [
	("foo", "foo", "/login/foo"),
	("bar", "bar", "/login/bar"),
	(
		TEST_UNICODE_PROVIDER,
		"I%C3%B1t%C3%ABrn%C3%A2ti%C3%B4n%C3%A0liz%C3%A6ti%C3%B8n%2C&#43;%21%40%23%24%5E%26%2A%28%29",
		"/login/I%C3%B1t%C3%ABrn%C3%A2ti%C3%B4n%C3%A0liz%C3%A6ti%C3%B8n,%20%21@%23$%5E&%2A%28%29",
	),
];

/// In-memory login server; the defaults describe a conforming one.
struct FakeTarget {
	bare_login_status: u16,
	omitted_link: Option<&'static str>,
	unescaped_plus: bool,
	unreachable_path: Option<&'static str>,
	requests: Mutex<Vec<String>>,
}
impl Default for FakeTarget {
	fn default() -> Self {
		Self {
			bare_login_status: 404,
			omitted_link: None,
			unescaped_plus: false,
			unreachable_path: None,
			requests: Mutex::new(Vec::new()),
		}
	}
}
impl FakeTarget {
	fn requests(&self) -> Vec<String> {
		self.requests.lock().expect("Request log lock should not be poisoned.").clone()
	}

	fn respond(&self, url: &str) -> Result<ProbeResult, TransportError> {
		let url = Url::parse(url).expect("Probe URLs should be absolute.");
		let path = url.path();

		if Some(path) == self.unreachable_path {
			return Err(TransportError::network(io::Error::from(io::ErrorKind::ConnectionRefused)));
		}

		let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

		if path == "/login" {
			return Ok(ProbeResult::new(self.bare_login_status, None, "not found"));
		}
		if path == "/oauth/authorize" {
			return Ok(match query.get("idp") {
				Some(idp) => match ROUTES.iter().find(|(name, ..)| *name == idp.as_str()) {
					Some((.., login)) =>
						ProbeResult::new(302, Some(format!("{login}?then=%2F").as_str()), Vec::new()),
					None => ProbeResult::new(400, None, "unknown idp"),
				},
				None => ProbeResult::new(200, None, self.selection_page()),
			});
		}
		if ROUTES.iter().any(|(.., login)| *login == path) {
			let status = if query.get("then").map(String::as_str) == Some("/") { 200 } else { 400 };

			return Ok(ProbeResult::new(status, None, "login form"));
		}

		Ok(ProbeResult::new(404, None, "not found"))
	}

	fn selection_page(&self) -> String {
		let links = ROUTES
			.iter()
			.filter(|(name, ..)| Some(*name) != self.omitted_link)
			.map(|(_, href_idp, _)| {
				format!(
					r#"<li><a href="/oauth/authorize?client_id=web-console&amp;idp={href_idp}&amp;redirect_uri=x&amp;response_type=token">x</a></li>"#
				)
			})
			.collect::<String>();
		let links = if self.unescaped_plus { links.replace("&#43;", "+") } else { links };

		format!("<html><body><ul>{links}</ul></body></html>")
	}
}
impl TargetProbe for FakeTarget {
	fn probe<'a>(&'a self, url: &'a str) -> ProbeFuture<'a> {
		self.requests.lock().expect("Request log lock should not be poisoned.").push(url.to_owned());

		let response = self.respond(url);

		Box::pin(async move { response })
	}
}

fn verifier(target: FakeTarget) -> (Verifier<FakeTarget>, Arc<FakeTarget>) {
	let target = Arc::new(target);
	let verifier = Verifier::new(test_config(TEST_MASTER_URL), target.clone())
		.expect("Fixture configuration should validate.");

	(verifier, target)
}

#[tokio::test]
async fn conforming_target_passes_every_probe() {
	let (verifier, target) = verifier(FakeTarget::default());
	let report = verifier.run().await.expect("Run should complete.");

	assert!(report.is_success(), "Unexpected failures: {report}");
	assert_eq!(report.verdicts.len(), 8);
	assert!(report.verdicts.iter().all(|verdict| verdict.passed));
	assert!(report.finished_at >= report.started_at);

	let requests = target.requests();
	let plan = verifier.plan().expect("Plan should build.");

	assert_eq!(requests.first(), Some(&plan.selection_page_url));
	assert_eq!(requests.len(), 8);
	assert!(requests.contains(&format!("{TEST_MASTER_URL}/login")));
	assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn every_mismatch_is_reported_without_stopping() {
	let (verifier, target) = verifier(FakeTarget {
		bare_login_status: 200,
		omitted_link: Some("bar"),
		unreachable_path: Some(ROUTES[2].2),
		..FakeTarget::default()
	});
	let report = verifier.run().await.expect("Mismatches must not abort the run.");

	assert_eq!(target.requests().len(), 8);
	assert_eq!(report.failures.len(), 3, "Unexpected failures: {report}");
	assert_eq!(report.verdicts.iter().filter(|verdict| !verdict.passed).count(), 3);
	assert!(matches!(
		&report.failures[0],
		Failure::PatternNotFound { provider, .. } if provider == "bar"
	));
	assert!(report.failures.contains(&Failure::Status {
		url: format!("{TEST_MASTER_URL}/login"),
		expected: 404,
		actual: 200,
	}));
	assert!(report.failures.iter().any(|failure| matches!(
		failure,
		Failure::Transport { url, .. } if url.ends_with(&format!("{}?then=%2F", ROUTES[2].2))
	)));

	let err = report.into_result().expect_err("Failures should surface as an error.");

	assert!(matches!(err, Error::Verification(_)));
}

#[tokio::test]
async fn link_with_unescaped_plus_is_reported_missing() {
	let (verifier, _) = verifier(FakeTarget { unescaped_plus: true, ..FakeTarget::default() });
	let report = verifier.run().await.expect("Mismatches must not abort the run.");

	assert_eq!(report.failures.len(), 1, "Unexpected failures: {report}");
	assert!(matches!(
		&report.failures[0],
		Failure::PatternNotFound { provider, .. } if provider == TEST_UNICODE_PROVIDER
	));
}

#[tokio::test]
async fn duplicate_providers_abort_before_probing() {
	let target = Arc::new(FakeTarget::default());
	let mut config = test_config(TEST_MASTER_URL);

	config.providers.push(
		IdentityProviderDescriptor::builder("foo").build().expect("Descriptor should be valid."),
	);

	let verifier =
		Verifier::new(config.clone(), target.clone()).expect("Duplicates pass config validation.");
	let err = verifier.run().await.expect_err("Colliding probe URLs should be rejected.");

	assert!(matches!(err, Error::Expectation(ExpectationError::DuplicateUrl { .. })));
	assert!(target.requests().is_empty());

	config.collision_policy = CollisionPolicy::LastWriteWins;

	let report = Verifier::new(config, target.clone())
		.expect("Configuration should validate.")
		.run()
		.await
		.expect("Last write wins should tolerate duplicates.");

	assert!(report.is_success(), "Unexpected failures: {report}");
	assert_eq!(report.verdicts.len(), 8);
}

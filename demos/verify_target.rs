//! Loads a JSON run configuration and verifies a live login server against it.
//!
//! Without an argument the demo prints the expectation plan for a sample configuration instead
//! of probing anything.

// std
use std::{env, fs, sync::Arc};
// crates.io
use color_eyre::Result;
// self
use idp_selector_verifier::{config::VerifierConfig, http::ReqwestProbe, verify::Verifier};

const SAMPLE_CONFIG: &str = r#"{
	"master_public_url": "https://127.0.0.1:8443",
	"asset_public_url": "https://127.0.0.1:8443/console/",
	"providers": [
		{ "name": "foo" },
		{ "name": "bar" },
		{ "name": "Iñtërnâtiônàlizætiøn, !@#$^&*()" }
	]
}"#;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let Some(path) = env::args().nth(1) else {
		let config = VerifierConfig::from_json_str(SAMPLE_CONFIG)?;
		let verifier = Verifier::new(config, Arc::new(ReqwestProbe::insecure()?))?;
		let plan = verifier.plan()?;

		println!("Selection page: {}.", plan.selection_page_url);

		for expectation in &plan.expectations {
			println!(
				"{} -> {} {:?}.",
				expectation.url, expectation.expected_status, expectation.expected_location
			);
		}
		for pattern in &plan.link_patterns {
			println!("Link for {:?}: {pattern}.", pattern.provider);
		}

		return Ok(());
	};
	let config = VerifierConfig::from_json_slice(&fs::read(&path)?)?;
	let verifier = Verifier::new(config, Arc::new(ReqwestProbe::insecure()?))?;
	let report = verifier.run().await?;

	println!("{}", serde_json::to_string_pretty(&report)?);

	report.into_result()?;

	Ok(())
}

//! Black-box verifier for multi-provider OAuth login selection pages.
//!
//! Predicts how each identity provider link is escaped and where each provider's login
//! redirect lands, then probes a live server and reports every mismatch in one pass.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod error;
pub mod escape;
pub mod expect;
pub mod http;
pub mod obs;
pub mod provider;
pub mod report;
pub mod verify;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::{OAuthClientSettings, VerifierConfig},
		expect::CollisionPolicy,
		provider::IdentityProviderDescriptor,
	};
	#[cfg(feature = "reqwest")] use crate::http::ReqwestProbe;

	/// Master URL shared by the fixtures below.
	pub const TEST_MASTER_URL: &str = "https://master.example.com:8443";
	/// Asset URL shared by the fixtures below.
	pub const TEST_ASSET_URL: &str = "https://master.example.com:8443/console/";
	/// Provider name exercising Unicode, spaces, and punctuation.
	pub const TEST_UNICODE_PROVIDER: &str = "Iñtërnâtiônàlizætiøn, !@#$^&*()";

	/// Builds a reqwest probe that accepts the self-signed certificates produced by `httpmock`
	/// during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_probe() -> ReqwestProbe {
		ReqwestProbe::insecure().expect("Failed to build insecure reqwest probe for tests.")
	}

	/// Three login + challenge providers: two plain names and one awkward name.
	pub fn test_providers() -> Vec<IdentityProviderDescriptor> {
		["foo", "bar", TEST_UNICODE_PROVIDER]
			.into_iter()
			.map(|name| {
				IdentityProviderDescriptor::builder(name)
					.build()
					.expect("Test provider descriptor should be valid.")
			})
			.collect()
	}

	/// Builds a verifier configuration pointing at `master_public_url`.
	pub fn test_config(master_public_url: &str) -> VerifierConfig {
		VerifierConfig {
			master_public_url: master_public_url.into(),
			asset_public_url: TEST_ASSET_URL.into(),
			client: OAuthClientSettings::default(),
			providers: test_providers(),
			collision_policy: CollisionPolicy::default(),
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, idp_selector_verifier as _};

//! Verification run configuration supplied by the configuration collaborator.

// self
use crate::{
	_prelude::*, error::ConfigError, expect::CollisionPolicy, provider::IdentityProviderDescriptor,
};

/// OAuth client parameters placed on the login selector URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthClientSettings {
	/// Client identifier the selection page is requested for.
	pub client_id: String,
	/// OAuth response type.
	pub response_type: String,
	/// Raw `state` value; query-escaped before use.
	pub state: String,
	/// Raw post-login destination passed to provider login pages as `then`.
	pub then: String,
}
impl Default for OAuthClientSettings {
	fn default() -> Self {
		Self {
			client_id: "web-console".into(),
			response_type: "token".into(),
			state: "/".into(),
			then: "/".into(),
		}
	}
}

/// Complete input for one verification run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
	/// Public URL of the server under test; probe paths are appended to it.
	pub master_public_url: String,
	/// Public URL of the web console, sent as the `redirect_uri`.
	pub asset_public_url: String,
	/// OAuth client parameters.
	#[serde(default)]
	pub client: OAuthClientSettings,
	/// Configured identity providers, in selection page order.
	pub providers: Vec<IdentityProviderDescriptor>,
	/// Policy applied when two expectations share a URL.
	#[serde(default)]
	pub collision_policy: CollisionPolicy,
}
impl VerifierConfig {
	/// Parses and validates a JSON document.
	pub fn from_json_str(json: &str) -> Result<Self> {
		Self::from_deserializer(&mut serde_json::Deserializer::from_str(json))
	}

	/// Parses and validates a JSON document from raw bytes.
	pub fn from_json_slice(json: &[u8]) -> Result<Self> {
		Self::from_deserializer(&mut serde_json::Deserializer::from_slice(json))
	}

	fn from_deserializer<'de, R>(de: &mut serde_json::Deserializer<R>) -> Result<Self>
	where
		R: serde_json::de::Read<'de>,
	{
		let config: Self = serde_path_to_error::deserialize(de).map_err(ConfigError::from)?;

		config.validate()?;

		Ok(config)
	}

	/// Validates URLs, client settings, and providers.
	pub fn validate(&self) -> Result<()> {
		validate_public_url("master_public_url", &self.master_public_url)?;
		validate_public_url("asset_public_url", &self.asset_public_url)?;

		for (field, value) in [
			("client_id", &self.client.client_id),
			("response_type", &self.client.response_type),
			("state", &self.client.state),
			("then", &self.client.then),
		] {
			if value.is_empty() {
				return Err(ConfigError::EmptyClientField { field }.into());
			}
		}

		if self.providers.len() < 2 {
			return Err(ConfigError::TooFewProviders { count: self.providers.len() }.into());
		}

		for provider in &self.providers {
			provider.validate()?;
		}

		Ok(())
	}
}

fn validate_public_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
	let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
		field,
		value: value.to_owned(),
		source,
	})?;

	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(ConfigError::UnsupportedScheme { field, value: value.to_owned() }),
	}
}

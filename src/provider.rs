//! Identity provider descriptors supplied by the configuration collaborator.
//!
//! A descriptor is immutable once built. Names may carry spaces, Unicode, and punctuation;
//! the builder only rejects names that cannot survive being placed in a URL path segment.

// self
use crate::_prelude::*;

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Provider names must not be empty.
	#[error("Identity provider name must not be empty.")]
	EmptyName,
	/// Provider names must not contain control characters.
	#[error("Identity provider name `{name}` contains a control character.")]
	ControlCharacter {
		/// Offending name, debug-escaped.
		name: String,
	},
	/// `.` and `..` collapse when joined onto the login path.
	#[error("Identity provider name `{name}` is a dot-segment.")]
	DotSegment {
		/// Offending name.
		name: String,
	},
}

/// Named authentication backend offered on the login selection page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct IdentityProviderDescriptor {
	/// Display and routing name of the provider.
	pub name: String,
	/// Whether the provider is offered for interactive login.
	pub used_for_login: bool,
	/// Whether the provider answers authentication challenges.
	pub used_for_challenge: bool,
}
impl IdentityProviderDescriptor {
	/// Creates a new builder for the provided name.
	pub fn builder(name: impl Into<String>) -> IdentityProviderDescriptorBuilder {
		IdentityProviderDescriptorBuilder::new(name)
	}

	/// Validates invariants for the descriptor.
	pub fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_name(&self.name)
	}
}

#[derive(Deserialize)]
struct RawDescriptor {
	name: String,
	#[serde(default = "enabled")]
	used_for_login: bool,
	#[serde(default = "enabled")]
	used_for_challenge: bool,
}
impl TryFrom<RawDescriptor> for IdentityProviderDescriptor {
	type Error = ProviderDescriptorError;

	fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
		IdentityProviderDescriptor::builder(raw.name)
			.used_for_login(raw.used_for_login)
			.used_for_challenge(raw.used_for_challenge)
			.build()
	}
}

fn enabled() -> bool {
	true
}

/// Builder for [`IdentityProviderDescriptor`] values.
///
/// Both usage flags default to `true`, mirroring the common login + challenge setup.
#[derive(Debug)]
pub struct IdentityProviderDescriptorBuilder {
	/// Name for the descriptor being constructed.
	pub name: String,
	/// Interactive login flag.
	pub used_for_login: bool,
	/// Challenge flag.
	pub used_for_challenge: bool,
}
impl IdentityProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided name.
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into(), used_for_login: true, used_for_challenge: true }
	}

	/// Overrides the interactive login flag.
	pub fn used_for_login(mut self, enabled: bool) -> Self {
		self.used_for_login = enabled;

		self
	}

	/// Overrides the challenge flag.
	pub fn used_for_challenge(mut self, enabled: bool) -> Self {
		self.used_for_challenge = enabled;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<IdentityProviderDescriptor, ProviderDescriptorError> {
		let descriptor = IdentityProviderDescriptor {
			name: self.name,
			used_for_login: self.used_for_login,
			used_for_challenge: self.used_for_challenge,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

fn validate_name(name: &str) -> Result<(), ProviderDescriptorError> {
	if name.is_empty() {
		return Err(ProviderDescriptorError::EmptyName);
	}
	if name.chars().any(char::is_control) {
		return Err(ProviderDescriptorError::ControlCharacter {
			name: name.escape_debug().to_string(),
		});
	}
	if matches!(name, "." | "..") {
		return Err(ProviderDescriptorError::DotSegment { name: name.to_owned() });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_defaults_to_login_and_challenge() {
		let descriptor = IdentityProviderDescriptor::builder("Iñtërnâtiônàlizætiøn, !@#$^&*()")
			.build()
			.expect("Unicode and punctuation should be accepted.");

		assert!(descriptor.used_for_login);
		assert!(descriptor.used_for_challenge);

		let descriptor = IdentityProviderDescriptor::builder("challenge-only")
			.used_for_login(false)
			.build()
			.expect("Flags should not affect validation.");

		assert!(!descriptor.used_for_login);
		assert!(descriptor.used_for_challenge);
	}

	#[test]
	fn builder_rejects_unroutable_names() {
		assert_eq!(
			IdentityProviderDescriptor::builder("").build(),
			Err(ProviderDescriptorError::EmptyName)
		);
		assert!(matches!(
			IdentityProviderDescriptor::builder("tab\there").build(),
			Err(ProviderDescriptorError::ControlCharacter { .. })
		));
		assert!(matches!(
			IdentityProviderDescriptor::builder("..").build(),
			Err(ProviderDescriptorError::DotSegment { .. })
		));
		assert!(IdentityProviderDescriptor::builder("...").build().is_ok());
	}

	#[test]
	fn deserialization_validates_and_defaults_flags() {
		let descriptor: IdentityProviderDescriptor =
			serde_json::from_str(r#"{"name":"foo","used_for_challenge":false}"#)
				.expect("Descriptor JSON should deserialize.");

		assert_eq!(descriptor.name, "foo");
		assert!(descriptor.used_for_login);
		assert!(!descriptor.used_for_challenge);
		assert!(serde_json::from_str::<IdentityProviderDescriptor>(r#"{"name":""}"#).is_err());
	}
}

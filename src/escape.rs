//! Attribute-context escaping oracle.
//!
//! Expected link text is never escaped inline. The raw value is rendered through an askama
//! template whose only dynamic content sits inside an `href="..."` attribute, and the known
//! static prefix and suffix are stripped to recover the escaped value. The template's escaper,
//! [`HrefAttribute`], applies the attribute table of the server under test, which differs from
//! askama's stock HTML escaper (`&amp;` rather than `&#38;`, and `+` is escaped). Swapping the
//! [`AttributeRenderer`] lets callers point the oracle at another renderer.

// std
use std::fmt::Write;
// crates.io
use askama::{Template, filters::Escaper};
// self
use crate::{_prelude::*, error::EnvironmentError};

/// Static text preceding the dynamic value in the anchor template.
pub const HREF_PREFIX: &str = r#"<a href=""#;
/// Static text following the dynamic value in the anchor template.
pub const HREF_SUFFIX: &str = r#"">"#;

/// Capability to render a raw string into an HTML-attribute context.
pub trait AttributeRenderer
where
	Self: Send + Sync,
{
	/// Renders `<a href="{raw}">` with `raw` escaped for the attribute context.
	///
	/// Output must start with [`HREF_PREFIX`] and end with [`HREF_SUFFIX`].
	fn render_href(&self, raw: &str) -> Result<String, EnvironmentError>;
}

/// askama escaper for quoted attribute values, registered for the `href` extension in
/// `askama.toml`.
///
/// | input | output |
/// |---|---|
/// | `&` | `&amp;` |
/// | `<` / `>` | `&lt;` / `&gt;` |
/// | `"` / `'` | `&#34;` / `&#39;` |
/// | `+` | `&#43;` |
/// | NUL | U+FFFD |
///
/// Everything else, Unicode included, is written verbatim.
#[derive(Clone, Copy, Debug, Default)]
pub struct HrefAttribute;
impl HrefAttribute {
	const fn replacement(c: char) -> Option<&'static str> {
		match c {
			'\0' => Some("\u{FFFD}"),
			'"' => Some("&#34;"),
			'&' => Some("&amp;"),
			'\'' => Some("&#39;"),
			'+' => Some("&#43;"),
			'<' => Some("&lt;"),
			'>' => Some("&gt;"),
			_ => None,
		}
	}
}
impl Escaper for HrefAttribute {
	fn write_escaped_str<W>(&self, mut dest: W, string: &str) -> FmtResult
	where
		W: Write,
	{
		let mut flushed = 0;

		for (i, c) in string.char_indices() {
			if let Some(replacement) = Self::replacement(c) {
				dest.write_str(&string[flushed..i])?;
				dest.write_str(replacement)?;

				flushed = i + c.len_utf8();
			}
		}

		dest.write_str(&string[flushed..])
	}

	fn write_escaped_char<W>(&self, mut dest: W, c: char) -> FmtResult
	where
		W: Write,
	{
		match Self::replacement(c) {
			Some(replacement) => dest.write_str(replacement),
			None => dest.write_char(c),
		}
	}
}

#[derive(Template)]
#[template(source = r#"<a href="{{ value }}">"#, ext = "href")]
struct HrefTemplate<'a> {
	value: &'a str,
}

/// Default renderer backed by a compiled askama template using [`HrefAttribute`].
#[derive(Clone, Copy, Debug, Default)]
pub struct HrefRenderer;
impl AttributeRenderer for HrefRenderer {
	fn render_href(&self, raw: &str) -> Result<String, EnvironmentError> {
		HrefTemplate { value: raw }.render().map_err(EnvironmentError::render)
	}
}

/// Escapes `raw` the way [`HrefRenderer`] embeds it in an attribute value.
pub fn escape_attribute(raw: &str) -> Result<String, EnvironmentError> {
	escape_with(&HrefRenderer, raw)
}

/// Escapes `raw` through the provided renderer, stripping the static anchor text.
pub fn escape_with<R>(renderer: &R, raw: &str) -> Result<String, EnvironmentError>
where
	R: ?Sized + AttributeRenderer,
{
	let rendered = renderer.render_href(raw)?;
	let escaped = rendered.strip_prefix(HREF_PREFIX).and_then(|rest| rest.strip_suffix(HREF_SUFFIX));

	match escaped {
		Some(escaped) => Ok(escaped.to_owned()),
		None => Err(EnvironmentError::UnexpectedRendering { rendered }),
	}
}

//! Share URL generation.
//!
//! Emits `<base>?text=..&btn=<title>%7C<url>&btn=..`. The title/url separator
//! is always written as `%7C`; [`super::links::parse_buttons`] accepts it as
//! well as a literal `|`, so every generated URL parses back to the same list.

use url::form_urlencoded;

use super::links::{BTN_PARAM, LinkButton, TEXT_PARAM};

const ENCODED_SEPARATOR: &str = "%7C";

/// One `btn=` parameter for `button`.
#[must_use]
pub fn encode_button(button: &LinkButton) -> String {
    format!(
        "{BTN_PARAM}={}{ENCODED_SEPARATOR}{}",
        urlencoding::encode(&button.title),
        urlencoding::encode(&button.url)
    )
}

/// Build a share URL from `base`, optional memo `text`, and `buttons`.
///
/// The base is trimmed and an empty base yields an empty string. Blank text
/// and invalid buttons are left out; `?` is only added when at least one
/// parameter remains.
#[must_use]
pub fn build_share_url(base: &str, text: Option<&str>, buttons: &[LinkButton]) -> String {
    let base = base.trim();
    if base.is_empty() {
        return String::new();
    }

    let text_params = text
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| {
            form_urlencoded::Serializer::new(String::new())
                .append_pair(TEXT_PARAM, text)
                .finish()
        });

    let btn_params = buttons
        .iter()
        .filter(|button| button.is_valid())
        .map(encode_button)
        .collect::<Vec<_>>();

    let mut params = Vec::with_capacity(btn_params.len() + 1);
    params.extend(text_params);
    params.extend(btn_params);

    if params.is_empty() {
        return base.to_owned();
    }
    format!("{base}?{}", params.join("&"))
}

#[cfg(test)]
#[path = "share_test.rs"]
mod tests;

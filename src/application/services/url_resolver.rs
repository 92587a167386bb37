//! Resolution of image references against the page they appear on.

use url::Url;

use crate::domain::errors::InlineError;

/// Scheme given to protocol-relative references.
pub const PROTOCOL_RELATIVE_SCHEME: &str = "http:";

/// Returns the folder of a page: the page URL without query, fragment, and
/// last path segment. A trailing `/` does not count as a segment.
///
/// `https://x/doc/articles/` and `https://x/doc/articles` both yield
/// `https://x/doc`.
#[must_use]
pub fn folder_url(page_url: &Url) -> String {
    let mut folder = page_url.clone();
    folder.set_query(None);
    folder.set_fragment(None);

    let path = folder.path().trim_end_matches('/');
    let parent = path.rfind('/').map_or("", |idx| &path[..idx]).to_string();
    folder.set_path(&parent);

    folder.to_string()
}

/// Resolves an image reference to an absolute URL.
///
/// Absolute references are returned as they are, `//host/...` references get
/// the `http:` scheme, and everything else is appended to `folder_url` with
/// exactly one `/` between the two.
///
/// # Errors
/// Returns a client error if the reference is not a well-formed URL reference
/// or the joined result is not a valid URL.
pub fn resolve(reference: &str, folder_url: &str) -> Result<Url, InlineError> {
    let reference = reference.trim_matches(|c: char| c.is_ascii_whitespace());
    check_reference(reference)?;

    match Url::parse(reference) {
        Ok(absolute) => return Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => {}
        Err(e) => return Err(InlineError::invalid_source(reference, e.to_string())),
    }

    let joined = if reference.starts_with("//") {
        format!("{PROTOCOL_RELATIVE_SCHEME}{reference}")
    } else {
        format!(
            "{}/{}",
            folder_url.trim_end_matches('/'),
            reference.trim_start_matches('/')
        )
    };

    Url::parse(&joined).map_err(|source| InlineError::InvalidImageUrl {
        url: joined,
        source,
    })
}

/// Rejects references no URL parser would accept: empty values, control
/// characters, and `%` not followed by two hex digits.
fn check_reference(reference: &str) -> Result<(), InlineError> {
    if reference.is_empty() {
        return Err(InlineError::invalid_source(reference, "empty reference"));
    }

    if reference.chars().any(|c| c.is_ascii_control()) {
        return Err(InlineError::invalid_source(
            reference,
            "control character in reference",
        ));
    }

    let bytes = reference.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let escape = bytes.get(idx + 1..idx + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return Err(InlineError::invalid_source(
                    reference,
                    "invalid percent escape",
                ));
            }
            idx += 3;
        } else {
            idx += 1;
        }
    }

    Ok(())
}

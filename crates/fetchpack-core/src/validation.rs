//! Pure URL checks shared by the admission surface and the pipeline.
//!
//! Archive entry names and the extension allow-list both key off the last
//! path segment of the submitted URL, with query string and fragment
//! stripped first.

fn strip_params(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// The last path segment of a URL, if it has a non-empty one.
///
/// `https://host` and `https://host/dir/` have none.
pub fn url_file_name(url: &str) -> Option<&str> {
    let path = strip_params(url);
    let rest = match path.find("://") {
        Some(i) => &path[i + 3..],
        None => path,
    };
    // Everything before the first '/' is the authority, not a path.
    let (_, path) = rest.split_once('/')?;
    let name = path.rsplit('/').next().unwrap_or("");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// The extension of the URL's file name, leading dot included.
pub fn url_extension(url: &str) -> Option<&str> {
    let name = url_file_name(url)?;
    let dot = name.rfind('.')?;
    if dot == 0 || dot == name.len() - 1 {
        return None;
    }
    Some(&name[dot..])
}

/// Whether the URL's extension is in `allowed`. ASCII case-insensitive.
pub fn extension_allowed(url: &str, allowed: &[String]) -> bool {
    match url_extension(url) {
        Some(ext) => allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

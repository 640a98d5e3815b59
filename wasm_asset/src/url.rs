use std::path::Path;

use path_slash::PathExt as _;

/// Path of `target` relative to the directory holding `asset_path`, with
/// forward slashes.
pub fn relative_dependency(asset_path: &Path, target: &Path) -> String {
    let base = asset_path.parent().unwrap_or_else(|| Path::new(""));
    let relative = pathdiff::diff_paths(target, base).unwrap_or_else(|| target.to_path_buf());
    relative.to_slash_lossy().into_owned()
}

/// Joins a public URL (`/`, `/static`, `https://cdn.example.com/app`) with a
/// served path fragment. Path segments are normalized posix-style; the
/// fragment's query and hash are kept.
pub fn url_join(public_url: &str, fragment: &str) -> String {
    let (origin, base_path) = split_origin(public_url);
    let (fragment_path, suffix) = fragment
        .find(['?', '#'])
        .map(|idx| fragment.split_at(idx))
        .unwrap_or((fragment, ""));
    let absolute = !origin.is_empty() || base_path.starts_with('/');
    let joined = normalize_posix(&format!("{base_path}/{fragment_path}"), absolute);
    format!("{origin}{joined}{suffix}")
}

fn split_origin(url: &str) -> (&str, &str) {
    let Some(scheme_end) = url.find("://") else {
        return ("", url);
    };
    let authority_start = scheme_end + 3;
    match url[authority_start..].find('/') {
        Some(idx) => url.split_at(authority_start + idx),
        None => (url, ""),
    }
}

fn normalize_posix(path: &str, absolute: bool) -> String {
    let mut segments: Vec<&str> = vec![];
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let body = segments.join("/");
    if absolute {
        format!("/{body}")
    } else if body.is_empty() {
        ".".to_string()
    } else {
        body
    }
}

//! Helpers for `nuclide://host/path` style URIs. Anything that does not match
//! the remote form is treated as a plain local path.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

const REMOTE_SCHEME: &str = "nuclide";

static RE_REMOTE_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<scheme>[a-z][a-z0-9+.\-]*)://(?P<host>[^/]+)(?P<path>/.*)?$").unwrap()
});

/// URI of the root directory on a remote host
pub fn remote_root(hostname: &str) -> String {
    format!("{}://{}/", REMOTE_SCHEME, hostname)
}

/// Root URI of the host that owns `uri`; "" for local paths
pub fn root_of(uri: &str) -> String {
    hostname(uri).map(remote_root).unwrap_or_default()
}

pub fn hostname(uri: &str) -> Option<&str> {
    RE_REMOTE_URI
        .captures(uri)
        .and_then(|caps| caps.name("host"))
        .map(|m| m.as_str())
}

/// Path portion of a URI, as seen on the host that owns it
pub fn local_path(uri: &str) -> &str {
    match RE_REMOTE_URI.captures(uri) {
        Some(caps) => caps.name("path").map(|m| m.as_str()).unwrap_or("/"),
        None => uri,
    }
}

/// Parent directory, keeping the scheme and host of remote URIs
pub fn dirname(uri: &str) -> String {
    let parent = |path: &str| {
        Path::new(path)
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string())
    };

    match split_remote(uri) {
        Some((prefix, path)) => format!("{}{}", prefix, parent(path)),
        None => parent(uri),
    }
}

/// Append a relative segment to a URI or path
pub fn join(uri: &str, segment: &str) -> String {
    let segment = segment.trim_start_matches('/');
    if uri.is_empty() {
        return segment.to_string();
    }
    format!("{}/{}", uri.trim_end_matches('/'), segment)
}

fn split_remote(uri: &str) -> Option<(&str, &str)> {
    let caps = RE_REMOTE_URI.captures(uri)?;
    let path = caps.name("path")?;
    Some((&uri[..path.start()], path.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_parts() {
        let uri = "nuclide://devbox/home/me/app.par";
        assert_eq!(hostname(uri), Some("devbox"));
        assert_eq!(local_path(uri), "/home/me/app.par");
        assert_eq!(dirname(uri), "nuclide://devbox/home/me");
        assert_eq!(root_of(uri), "nuclide://devbox/");
        assert_eq!(root_of("/home/me/app.py"), "");
    }

    #[test]
    fn test_local_paths_pass_through() {
        assert_eq!(hostname("/tmp/app.py"), None);
        assert_eq!(local_path("/tmp/app.py"), "/tmp/app.py");
        assert_eq!(dirname("/tmp/app.py"), "/tmp");
    }

    #[test]
    fn test_root_and_join() {
        let root = remote_root("devbox");
        assert_eq!(root, "nuclide://devbox/");
        assert_eq!(local_path(&root), "/");
        assert_eq!(
            join("nuclide://devbox/ws", ".vscode/launchReactNative.js"),
            "nuclide://devbox/ws/.vscode/launchReactNative.js"
        );
        assert_eq!(join("/ws/", "/a.js"), "/ws/a.js");
    }
}

//! Path helpers for remote stores. Remote paths always use `/`, start
//! with a single `/` and never end with one (except the root itself).

pub const ROOT: &str = "/";

/// Normalize a remote path: backslashes become `/`, empty and `.`
/// segments are dropped, `..` pops a segment and never climbs above the
/// root, and the result is rooted.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        ROOT.to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Join a child name (or relative path) onto a parent.
pub fn join(parent: &str, name: &str) -> String {
    normalize(&format!("{}/{}", parent, name))
}

/// Last segment of the path, `None` for the root.
pub fn file_name(path: &str) -> Option<String> {
    let path = normalize(path);
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parent directory, `None` for the root.
pub fn parent(path: &str) -> Option<String> {
    let path = normalize(path);
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT.to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => None,
    }
}

pub fn is_root(path: &str) -> bool {
    normalize(path) == ROOT
}

//! Path helpers for declaration keys
//!
//! Declaration keys, dependency values and artifact names are plain
//! `/`-separated strings relative to the project root. They are compared
//! as strings (the planner reports them the same way), so all
//! manipulation here is lexical and never touches the filesystem.

/// Characters that may not appear in a declared file name
pub const WILDCARD_CHARS: &[char] = &['*', '?', '[', ']', '{', '}', '\\'];

/// Joins two relative paths, skipping empty components
pub fn join(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}/{}", base.trim_end_matches('/'), rest),
    }
}

/// Returns everything before the last `/`, or `""` for a bare name
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Returns everything after the last `/`
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Returns the extension of the final component, without the dot
pub fn extension(path: &str) -> Option<&str> {
    let name = basename(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// Strips the extension of the final component (`code/a.Rmd` -> `code/a`)
pub fn strip_extension(path: &str) -> &str {
    match extension(path) {
        Some(ext) => &path[..path.len() - ext.len() - 1],
        None => path,
    }
}

/// File stem of the final component (`code/a.Rmd` -> `a`)
pub fn stem(path: &str) -> &str {
    basename(strip_extension(path))
}

/// Lexically normalizes a relative path: drops `.` and empty components
/// and folds `..` into its parent where possible.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Deepest directory shared by every path in `dirs` (`""` is the root)
pub fn common_dir<'a>(dirs: impl IntoIterator<Item = &'a str>) -> String {
    let mut common: Option<Vec<&str>> = None;
    for dir in dirs {
        let parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
        common = Some(match common {
            None => parts,
            Some(prev) => prev
                .iter()
                .zip(parts.iter())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect(),
        });
    }
    common.map(|parts| parts.join("/")).unwrap_or_default()
}

/// Removes the directory prefix `dir` from `path` (`""` when they are equal)
pub fn strip_dir<'a>(path: &'a str, dir: &str) -> &'a str {
    if dir.is_empty() {
        return path;
    }
    match path.strip_prefix(dir) {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => &rest[1..],
        _ => path,
    }
}

/// True when the name contains a glob or escape character
pub fn has_wildcard(path: &str) -> bool {
    path.contains(WILDCARD_CHARS)
}

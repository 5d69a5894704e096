//! Document model and derived artifact naming
//!
//! A document is a declared source file (script or notebook) that the
//! external executor turns into a rendered markdown artifact, which the
//! renderer turns into a presentation page. Artifact names are derived,
//! never stored:
//!
//! | Name | Form |
//! |------|------|
//! | output key | source path without extension (`index` for the homepage) |
//! | rendered | `{root}/out_md/{key}.md` |
//! | presentation | `{root}/out_html/{key}.html` |
//! | sidecar | `{root}/out_md/{key}.knitmeta.RDS` |
//! | media dir | `{root}/out_md/{key dir}/output/{key name}` |

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::paths;

/// Extensions (compared case-insensitively) accepted as documents
pub const SUPPORTED_EXTENSIONS: &[&str] = &["R", "Rmd", "ipynb"];

/// Directory under the artifact root holding rendered markdown
pub const RENDERED_DIR: &str = "out_md";

/// Directory under the artifact root holding presentation pages
pub const PRESENTATION_DIR: &str = "out_html";

/// Subdirectory (next to a rendered artifact) holding generated media
pub const MEDIA_DIR: &str = "output";

/// Suffix of the executor's side-effect metadata file
pub const SIDECAR_SUFFIX: &str = ".knitmeta.RDS";

/// File stem that marks a document as the homepage candidate
pub const INDEX_STEM: &str = "index";

/// Returns true if `path` has a document extension
pub fn is_supported(path: &str) -> bool {
    paths::extension(path)
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Returns true if the file stem is `index`
pub fn is_index_name(path: &str) -> bool {
    paths::stem(path) == INDEX_STEM
}

/// Role of a document in the site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    Regular,
    /// The homepage. At most one declared document has this kind.
    Index,
}

/// The full set of names derived from one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifacts {
    pub source: String,
    pub output_key: String,
    pub rendered: String,
    pub presentation: String,
    pub kind: DocumentKind,
}

impl Artifacts {
    /// Derives artifact names for `source` under `artifact_root`
    pub fn derive(source: &str, kind: DocumentKind, artifact_root: &str) -> Self {
        let output_key = match kind {
            DocumentKind::Index => INDEX_STEM.to_string(),
            DocumentKind::Regular => paths::strip_extension(source).to_string(),
        };
        let rendered = paths::join(
            &paths::join(artifact_root, RENDERED_DIR),
            &format!("{}.md", output_key),
        );
        let presentation = paths::join(
            &paths::join(artifact_root, PRESENTATION_DIR),
            &format!("{}.html", output_key),
        );

        Self {
            source: source.to_string(),
            output_key,
            rendered,
            presentation,
            kind,
        }
    }

    /// True if `reference` names this document by any of its identifiers
    pub fn matches(&self, reference: &str) -> bool {
        reference == self.source
            || reference == self.rendered
            || reference == self.presentation
            || reference == self.output_key
    }

    /// File name of the rendered artifact
    pub fn rendered_name(&self) -> &str {
        paths::basename(&self.rendered)
    }

    /// Side-effect metadata written next to the rendered artifact
    pub fn sidecar(&self) -> String {
        format!("{}{}", paths::strip_extension(&self.rendered), SIDECAR_SUFFIX)
    }

    /// Last component of the output key; names the media directory
    pub fn media_name(&self) -> &str {
        paths::basename(&self.output_key)
    }

    /// Directory holding figures generated while executing the document
    pub fn media_dir(&self) -> String {
        paths::join(
            &paths::join(paths::dirname(&self.rendered), MEDIA_DIR),
            self.media_name(),
        )
    }
}

/// Ordered dependency list of one document
///
/// Serialized as `null` when empty, matching hand-written declarations
/// where a document without dependencies has no value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyList(Vec<String>);

impl DependencyList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, dep: &str) -> bool {
        self.0.iter().any(|d| d == dep)
    }

    /// Appends a dependency. Returns false if already present.
    pub fn push(&mut self, dep: impl Into<String>) -> bool {
        let dep = dep.into();
        if self.contains(&dep) {
            return false;
        }
        self.0.push(dep);
        true
    }

    /// Removes a dependency. Returns false if it was not present.
    pub fn remove(&mut self, dep: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|d| d != dep);
        self.0.len() != before
    }

    /// Renames `old` in place. When `new` is already listed the old entry
    /// is dropped instead, so the list never holds a value twice. Returns
    /// true if `old` was present.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        if !self.contains(old) {
            return false;
        }
        if old != new && self.contains(new) {
            return self.remove(old);
        }
        for dep in self.0.iter_mut().filter(|d| d.as_str() == old) {
            *dep = new.to_string();
        }
        true
    }
}

impl<S: Into<String>> FromIterator<S> for DependencyList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        for dep in iter {
            list.push(dep);
        }
        list
    }
}

impl Serialize for DependencyList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            serializer.serialize_none()
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for DependencyList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let deps = Option::<Vec<String>>::deserialize(deserializer)?;
        Ok(Self(deps.unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions_ignore_case() {
        assert!(is_supported("code/a.Rmd"));
        assert!(is_supported("code/a.rmd"));
        assert!(is_supported("a.r"));
        assert!(is_supported("nb/a.IPYNB"));
        assert!(!is_supported("a.py"));
        assert!(!is_supported("Makefile"));
    }

    #[test]
    fn derive_regular_artifacts() {
        let a = Artifacts::derive("code/sub/plot.Rmd", DocumentKind::Regular, "report");
        assert_eq!(a.output_key, "code/sub/plot");
        assert_eq!(a.rendered, "report/out_md/code/sub/plot.md");
        assert_eq!(a.presentation, "report/out_html/code/sub/plot.html");
        assert_eq!(a.sidecar(), "report/out_md/code/sub/plot.knitmeta.RDS");
        assert_eq!(a.media_dir(), "report/out_md/code/sub/output/plot");
        assert_eq!(a.rendered_name(), "plot.md");
    }

    #[test]
    fn derive_index_artifacts() {
        let a = Artifacts::derive("code/index.Rmd", DocumentKind::Index, "");
        assert_eq!(a.output_key, "index");
        assert_eq!(a.rendered, "out_md/index.md");
        assert_eq!(a.presentation, "out_html/index.html");
        assert_eq!(a.media_dir(), "out_md/output/index");
    }

    #[test]
    fn matches_any_identifier() {
        let a = Artifacts::derive("a.R", DocumentKind::Regular, "report");
        assert!(a.matches("a.R"));
        assert!(a.matches("a"));
        assert!(a.matches("report/out_md/a.md"));
        assert!(a.matches("report/out_html/a.html"));
        assert!(!a.matches("b.R"));
    }

    #[test]
    fn dependency_list_keeps_order_and_uniqueness() {
        let mut deps = DependencyList::new();
        assert!(deps.push("b.txt"));
        assert!(deps.push("a.txt"));
        assert!(!deps.push("b.txt"));
        assert_eq!(deps.as_slice(), &["b.txt".to_string(), "a.txt".to_string()]);

        assert!(deps.rename("b.txt", "c.txt"));
        assert_eq!(deps.as_slice()[0], "c.txt");
        assert!(deps.remove("a.txt"));
        assert!(!deps.remove("a.txt"));
    }

    #[test]
    fn rename_onto_listed_value_merges() {
        let mut deps: DependencyList = ["x.csv", "lib.R", "y.csv"].into_iter().collect();
        assert!(deps.rename("x.csv", "y.csv"));
        assert_eq!(deps.as_slice(), &["lib.R".to_string(), "y.csv".to_string()]);
        assert!(!deps.rename("x.csv", "z.csv"));
    }

    #[test]
    fn empty_dependency_list_is_null() {
        let deps: DependencyList = serde_yaml::from_str("~").unwrap();
        assert!(deps.is_empty());
        assert_eq!(serde_yaml::to_string(&deps).unwrap().trim(), "null");
    }
}

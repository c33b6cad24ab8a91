//! Image reference classification
//!
//! Classification is by substring on purpose: it has to agree with what the
//! pull-policy override and the pull-necessity check consider "mutable",
//! including for references with registry ports or digests.

/// How an image reference pins its content
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageTag {
    /// No tag and no digest; the runtime resolves it to `latest`
    ImplicitLatest,
    /// Explicit `:latest` tag
    Latest,
    /// Explicit non-latest tag or a content digest
    Pinned,
}

impl ImageTag {
    /// Classify an image reference
    pub fn classify(image: &str) -> Self {
        if image.contains(":latest") {
            ImageTag::Latest
        } else if !image.contains(':') && !image.contains("@sha") {
            ImageTag::ImplicitLatest
        } else {
            ImageTag::Pinned
        }
    }

    /// Whether the reference can point at different content over time.
    ///
    /// A mutable reference being present on a node says nothing about
    /// whether the node's copy is current.
    pub fn is_mutable(self) -> bool {
        !matches!(self, ImageTag::Pinned)
    }
}

/// Directory name for an image's host-side cache.
///
/// Keeps `[A-Za-z0-9._-]` and maps everything else (`/`, `:`, `@`) to `_`,
/// so the result is a single safe path segment.
pub fn cache_dir_name(image: &str) -> String {
    image
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

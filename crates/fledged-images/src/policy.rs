//! Pull policy and the pull-necessity check
//!
//! `needs_pull` is a cheap, conservative filter the controller runs before
//! scheduling a pull Job. It may report a pull as needed when it isn't; it
//! must never skip a pull that is needed.

use std::fmt;

use k8s_openapi::api::core::v1::{ContainerImage, Node};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fledged_common::{Error, Result};

use crate::reference::ImageTag;

/// Kubernetes container image pull policy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullPolicy {
    /// Always contact the registry
    Always,
    /// Pull only when the image is not on the node
    #[default]
    IfNotPresent,
}

impl PullPolicy {
    /// Kubernetes spelling of the policy
    pub fn as_str(self) -> &'static str {
        match self {
            PullPolicy::Always => "Always",
            PullPolicy::IfNotPresent => "IfNotPresent",
        }
    }

    /// Parse a policy from a flag or config value.
    ///
    /// Only the exact Kubernetes spellings are recognized; anything else is
    /// `None` and callers must not treat it as `IfNotPresent`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Always" => Some(PullPolicy::Always),
            "IfNotPresent" => Some(PullPolicy::IfNotPresent),
            _ => None,
        }
    }

    /// Policy to put on a container that pulls `image`.
    ///
    /// `IfNotPresent` is upgraded to `Always` for untagged and `:latest`
    /// references.
    pub fn effective_for(self, image: &str) -> Self {
        match self {
            PullPolicy::IfNotPresent if ImageTag::classify(image).is_mutable() => {
                PullPolicy::Always
            }
            policy => policy,
        }
    }

    /// Container policy for a requested policy that may be unrecognized.
    ///
    /// An unrecognized request falls back to plain `IfNotPresent`, without
    /// the mutable-tag upgrade.
    pub fn resolve(requested: Option<Self>, image: &str) -> Self {
        match requested {
            Some(policy) => policy.effective_for(image),
            None => {
                warn!(image = %image, "Unrecognized image pull policy, using IfNotPresent");
                PullPolicy::IfNotPresent
            }
        }
    }
}

impl fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide whether `image` has to be pulled onto `node`.
///
/// Returns `true` for `Always` or an unrecognized policy (`None`), for
/// mutable references, and when the image does not appear in the node's
/// resident image list. Presence is a
/// substring match over the serialized list, so a reference matches any of
/// its registry-qualified forms.
pub fn needs_pull(policy: Option<PullPolicy>, image: &str, node: &Node) -> Result<bool> {
    if policy != Some(PullPolicy::IfNotPresent) {
        return Ok(true);
    }
    if ImageTag::classify(image).is_mutable() {
        return Ok(true);
    }

    let present = image_present_on_node(image, node)?;
    debug!(image = %image, present, "Checked node for resident image");
    Ok(!present)
}

fn image_present_on_node(image: &str, node: &Node) -> Result<bool> {
    let images: &[ContainerImage] = node
        .status
        .as_ref()
        .and_then(|s| s.images.as_deref())
        .unwrap_or_default();

    let serialized = serde_json::to_string(images)
        .map_err(|e| Error::serialization_for_kind("ContainerImage", e.to_string()))?;
    Ok(serialized.contains(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::NodeStatus;
    use rstest::rstest;

    const PINNED: &str = "nginx:1.27.2";
    const DIGEST: &str =
        "nginx@sha256:0d17b565c37bcbd895e9d92315a05c1c3c9a29f762b011a10c54a66cd53c9b31";

    fn node_with_images(names: &[&str]) -> Node {
        Node {
            status: Some(NodeStatus {
                images: Some(vec![ContainerImage {
                    names: Some(names.iter().map(|n| n.to_string()).collect()),
                    size_bytes: Some(67_000_000),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn parse_recognizes_kubernetes_spellings() {
        assert_eq!(PullPolicy::parse("Always"), Some(PullPolicy::Always));
        assert_eq!(PullPolicy::parse("IfNotPresent"), Some(PullPolicy::IfNotPresent));
    }

    #[rstest]
    #[case::never("Never")]
    #[case::lowercase("always")]
    #[case::empty("")]
    fn parse_rejects_other_values(#[case] value: &str) {
        assert_eq!(PullPolicy::parse(value), None);
    }

    #[rstest]
    #[case::pinned(PINNED)]
    #[case::latest("nginx:latest")]
    #[case::untagged("nginx")]
    fn unrecognized_policy_resolves_to_plain_if_not_present(#[case] image: &str) {
        assert_eq!(PullPolicy::resolve(None, image), PullPolicy::IfNotPresent);
    }

    #[test]
    fn recognized_policy_resolves_with_upgrade() {
        assert_eq!(
            PullPolicy::resolve(Some(PullPolicy::IfNotPresent), "nginx:latest"),
            PullPolicy::Always
        );
        assert_eq!(
            PullPolicy::resolve(Some(PullPolicy::IfNotPresent), PINNED),
            PullPolicy::IfNotPresent
        );
    }

    #[rstest]
    #[case::untagged("nginx", PullPolicy::Always)]
    #[case::latest("nginx:latest", PullPolicy::Always)]
    #[case::pinned(PINNED, PullPolicy::IfNotPresent)]
    #[case::digest(DIGEST, PullPolicy::IfNotPresent)]
    fn effective_policy_upgrades_mutable_images(
        #[case] image: &str,
        #[case] expected: PullPolicy,
    ) {
        assert_eq!(PullPolicy::IfNotPresent.effective_for(image), expected);
    }

    #[test]
    fn always_is_never_downgraded() {
        assert_eq!(PullPolicy::Always.effective_for(PINNED), PullPolicy::Always);
    }

    #[test]
    fn serde_uses_kubernetes_spelling() {
        assert_eq!(
            serde_json::to_string(&PullPolicy::IfNotPresent).unwrap(),
            "\"IfNotPresent\""
        );
        assert_eq!(PullPolicy::Always.to_string(), "Always");
    }

    #[test]
    fn always_policy_needs_pull_even_when_present() {
        let node = node_with_images(&[PINNED]);
        assert!(needs_pull(Some(PullPolicy::Always), PINNED, &node).unwrap());
    }

    #[rstest]
    #[case::untagged("nginx")]
    #[case::latest("nginx:latest")]
    fn mutable_images_always_need_pull(#[case] image: &str) {
        let node = node_with_images(&["docker.io/library/nginx:latest", "nginx"]);
        assert!(needs_pull(Some(PullPolicy::IfNotPresent), image, &node).unwrap());
    }

    #[test]
    fn resident_pinned_image_skips_pull() {
        let node = node_with_images(&["docker.io/library/nginx:1.27.2"]);
        assert!(!needs_pull(Some(PullPolicy::IfNotPresent), PINNED, &node).unwrap());
    }

    #[test]
    fn resident_digest_skips_pull() {
        let qualified = format!("docker.io/library/{}", DIGEST);
        let node = node_with_images(&[qualified.as_str(), "nginx:1.27.2"]);
        assert!(!needs_pull(Some(PullPolicy::IfNotPresent), DIGEST, &node).unwrap());
    }

    #[test]
    fn missing_pinned_image_needs_pull() {
        let node = node_with_images(&["docker.io/library/redis:7.4"]);
        assert!(needs_pull(Some(PullPolicy::IfNotPresent), PINNED, &node).unwrap());
    }

    #[test]
    fn node_without_status_needs_pull() {
        assert!(needs_pull(Some(PullPolicy::IfNotPresent), PINNED, &Node::default()).unwrap());
    }

    #[test]
    fn unrecognized_policy_needs_pull_even_when_present() {
        let node = node_with_images(&["docker.io/library/nginx:1.27.2"]);
        let policy = PullPolicy::parse("always");
        assert_eq!(policy, None);
        assert!(needs_pull(policy, PINNED, &node).unwrap());
    }
}

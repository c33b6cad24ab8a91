//! ImageCache CRD types
//!
//! An `ImageCache` lists images that should be kept resident on the nodes
//! matched by each entry's node selector. The controller turns every
//! (image, node) pair into a pull Job, and into a delete Job when an image
//! is removed from the list. Jobs are owned by the ImageCache so they are
//! garbage collected with it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::LocalObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired set of cached images
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "kubefledged.io",
    version = "v1alpha3",
    kind = "ImageCache",
    plural = "imagecaches",
    shortname = "ic",
    namespaced,
    status = "ImageCacheStatus",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ImageCacheSpec {
    /// Images to cache, grouped by the nodes they should land on
    pub cache_spec: Vec<CacheSpecImages>,

    /// Secrets used to pull private images
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<ImagePullSecretRef>,
}

/// A list of images and the nodes they are cached on
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheSpecImages {
    /// Image references (`repo[:tag][@digest]`)
    pub images: Vec<String>,

    /// Label selector for target nodes; empty selects every node
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
}

/// Reference to an image pull secret in the ImageCache's namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ImagePullSecretRef {
    /// Secret name
    pub name: String,
}

impl From<&ImagePullSecretRef> for LocalObjectReference {
    fn from(secret: &ImagePullSecretRef) -> Self {
        LocalObjectReference {
            name: secret.name.clone(),
        }
    }
}

impl ImageCacheSpec {
    /// Pull secrets in the shape a PodSpec expects
    ///
    /// Returns `None` when no secrets are configured so the field is omitted
    /// from the rendered pod.
    pub fn pod_image_pull_secrets(&self) -> Option<Vec<LocalObjectReference>> {
        if self.image_pull_secrets.is_empty() {
            return None;
        }
        Some(self.image_pull_secrets.iter().map(Into::into).collect())
    }
}

/// Observed state of an ImageCache
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageCacheStatus {
    /// Current phase
    pub phase: ImageCachePhase,

    /// Machine-readable reason for the current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable detail for the current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// When the current round of jobs started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    /// When the current round of jobs finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
}

/// Phase of an ImageCache
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub enum ImageCachePhase {
    /// Not yet processed
    #[default]
    Unknown,
    /// Pull or delete jobs are running
    Processing,
    /// Every job succeeded
    Succeeded,
    /// At least one job failed
    Failed,
    /// Processing was interrupted (e.g. controller restart)
    Aborted,
}

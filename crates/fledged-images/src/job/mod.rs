//! Image Job construction
//!
//! Pull and delete Jobs share one skeleton:
//! - `generateName` derived from the owning ImageCache, in its namespace
//! - a controller `ownerReference` to the ImageCache (garbage collection)
//! - the image-manager label set on both the Job and its pod template
//! - `backoffLimit: 0` and a one hour `activeDeadlineSeconds`
//! - a pod pinned to one node via `kubernetes.io/hostname`, never
//!   restarted, tolerating every taint
//!
//! Each builder only supplies the containers and volumes of its pod.

mod delete;
mod pull;

use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{LocalObjectReference, Node, PodSpec, PodTemplateSpec, Toleration};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use tracing::error;

use fledged_common::crd::ImageCache;
use fledged_common::error::UNKNOWN_CONTEXT;
use fledged_common::{
    Error, Result, APP_LABEL_VALUE, COMPONENT_LABEL_KEY, CONTROLLER_AGENT_NAME,
    HOSTNAME_LABEL_KEY, IMAGE_CACHE_LABEL_KEY, IMAGE_MANAGER_COMPONENT,
};

use crate::config::JobConfig;

pub use delete::{build_delete_job, DeleteJobRequest, DELETE_CONTAINER_NAME};
pub use pull::{
    build_pull_job, JobVariant, PullJobRequest, CACHE_MOUNT_PATH, DIRECTORY_SCOPED_MARKER,
    DIRECTORY_SCOPED_PATHS,
};

/// Image Jobs are never retried by the Job controller
pub const BACKOFF_LIMIT: i32 = 0;

/// Hard deadline for an image Job (one hour)
pub const ACTIVE_DEADLINE_SECONDS: i64 = 3600;

/// Label set stamped on every image Job and its pods
pub fn job_labels(cache_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), APP_LABEL_VALUE.to_string()),
        (
            COMPONENT_LABEL_KEY.to_string(),
            IMAGE_MANAGER_COMPONENT.to_string(),
        ),
        (IMAGE_CACHE_LABEL_KEY.to_string(), cache_name.to_string()),
        ("controller".to_string(), CONTROLLER_AGENT_NAME.to_string()),
    ])
}

/// Validated owner and node inputs for one Job
struct JobTarget {
    cache_name: String,
    namespace: String,
    hostname: String,
    owner: OwnerReference,
    pull_secrets: Option<Vec<LocalObjectReference>>,
}

impl JobTarget {
    /// Check the inputs every Job needs before anything is built
    fn resolve(image_cache: Option<&ImageCache>, node: &Node) -> Result<Self> {
        let Some(cache) = image_cache else {
            error!("ImageCache is missing, no job will be built");
            return Err(Error::validation("image cache is missing"));
        };

        let cache_name = cache.metadata.name.clone().ok_or_else(|| {
            Error::validation_for_field(UNKNOWN_CONTEXT, "metadata.name", "ImageCache has no name")
        })?;
        let namespace = cache.namespace().ok_or_else(|| {
            Error::validation_for_field(
                &cache_name,
                "metadata.namespace",
                "ImageCache must be namespaced",
            )
        })?;
        let uid = cache.uid().ok_or_else(|| {
            Error::validation_for_field(&cache_name, "metadata.uid", "ImageCache has no UID")
        })?;
        let owner = OwnerReference {
            api_version: ImageCache::api_version(&()).to_string(),
            kind: ImageCache::kind(&()).to_string(),
            name: cache_name.clone(),
            uid,
            controller: Some(true),
            block_owner_deletion: Some(true),
        };
        let hostname = node
            .labels()
            .get(HOSTNAME_LABEL_KEY)
            .cloned()
            .ok_or_else(|| {
                Error::validation_for_field(
                    &cache_name,
                    "metadata.labels",
                    format!(
                        "node {} has no {} label",
                        node.name_any(),
                        HOSTNAME_LABEL_KEY
                    ),
                )
            })?;

        Ok(Self {
            cache_name,
            namespace,
            hostname,
            owner,
            pull_secrets: cache.spec.pod_image_pull_secrets(),
        })
    }

    /// Wrap a variant's pod in the shared Job skeleton.
    ///
    /// Config overrides go on last so no variant can drop them.
    fn into_job(self, mut pod: PodSpec, config: &JobConfig) -> Job {
        pod.node_selector = Some(BTreeMap::from([(
            HOSTNAME_LABEL_KEY.to_string(),
            self.hostname,
        )]));
        pod.restart_policy = Some("Never".to_string());
        pod.tolerations = Some(vec![Toleration {
            operator: Some("Exists".to_string()),
            ..Default::default()
        }]);
        pod.image_pull_secrets = self.pull_secrets;
        apply_pod_overrides(&mut pod, config);

        let labels = job_labels(&self.cache_name);

        Job {
            metadata: ObjectMeta {
                generate_name: Some(format!("{}-", self.cache_name)),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels.clone()),
                owner_references: Some(vec![self.owner]),
                ..Default::default()
            },
            spec: Some(JobSpec {
                backoff_limit: Some(BACKOFF_LIMIT),
                active_deadline_seconds: Some(ACTIVE_DEADLINE_SECONDS),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        namespace: Some(self.namespace),
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(pod),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn apply_pod_overrides(pod: &mut PodSpec, config: &JobConfig) {
    if let Some(sa) = config.service_account() {
        pod.service_account_name = Some(sa.to_string());
    }
    if let Some(pc) = config.priority_class() {
        pod.priority_class_name = Some(pc.to_string());
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{sample_cache, sample_node};
    use super::*;
    use k8s_openapi::api::core::v1::Container;

    fn sample_pod() -> PodSpec {
        PodSpec {
            containers: vec![Container {
                name: "main".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn resolve_sample() -> JobTarget {
        JobTarget::resolve(Some(&sample_cache()), &sample_node()).unwrap()
    }

    #[test]
    fn missing_cache_is_rejected() {
        let err = JobTarget::resolve(None, &sample_node()).err().unwrap();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(err.to_string().contains("image cache is missing"));
    }

    #[test]
    fn cache_without_uid_is_rejected() {
        let mut cache = sample_cache();
        cache.metadata.uid = None;
        let err = JobTarget::resolve(Some(&cache), &sample_node()).err().unwrap();
        assert_eq!(err.field(), Some("metadata.uid"));
        assert_eq!(err.cache(), Some("ml-images"));
    }

    #[test]
    fn cache_without_namespace_is_rejected() {
        let mut cache = sample_cache();
        cache.metadata.namespace = None;
        let err = JobTarget::resolve(Some(&cache), &sample_node()).err().unwrap();
        assert_eq!(err.field(), Some("metadata.namespace"));
    }

    #[test]
    fn node_without_hostname_is_rejected() {
        let mut node = sample_node();
        node.metadata.labels = None;
        let err = JobTarget::resolve(Some(&sample_cache()), &node).err().unwrap();
        assert_eq!(err.field(), Some("metadata.labels"));
        assert!(err.to_string().contains("worker-1"));
    }

    #[test]
    fn job_has_owner_reference() {
        let job = resolve_sample().into_job(sample_pod(), &JobConfig::default());
        let refs = job.metadata.owner_references.as_ref().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].api_version, "kubefledged.io/v1alpha3");
        assert_eq!(refs[0].kind, "ImageCache");
        assert_eq!(refs[0].name, "ml-images");
        assert_eq!(refs[0].uid, "3f1c2a9e-uid");
        assert_eq!(refs[0].controller, Some(true));
        assert_eq!(refs[0].block_owner_deletion, Some(true));
    }

    #[test]
    fn job_metadata_derives_from_cache() {
        let job = resolve_sample().into_job(sample_pod(), &JobConfig::default());
        assert_eq!(job.metadata.generate_name.as_deref(), Some("ml-images-"));
        assert_eq!(job.metadata.namespace.as_deref(), Some("kube-fledged"));
        assert_eq!(job.metadata.name, None);
    }

    #[test]
    fn job_and_pod_share_labels() {
        let job = resolve_sample().into_job(sample_pod(), &JobConfig::default());
        let labels = job.metadata.labels.as_ref().unwrap();
        assert_eq!(labels.get("app"), Some(&"kubefledged".to_string()));
        assert_eq!(
            labels.get("kubefledged"),
            Some(&"kubefledged-image-manager".to_string())
        );
        assert_eq!(labels.get("imagecache"), Some(&"ml-images".to_string()));
        assert_eq!(
            labels.get("controller"),
            Some(&"kubefledged-controller".to_string())
        );

        let template = &job.spec.as_ref().unwrap().template;
        let pod_meta = template.metadata.as_ref().unwrap();
        assert_eq!(pod_meta.labels.as_ref(), Some(labels));
        assert_eq!(pod_meta.namespace.as_deref(), Some("kube-fledged"));
    }

    #[test]
    fn job_has_backoff_and_deadline() {
        let job = resolve_sample().into_job(sample_pod(), &JobConfig::default());
        let spec = job.spec.as_ref().unwrap();
        assert_eq!(spec.backoff_limit, Some(0));
        assert_eq!(spec.active_deadline_seconds, Some(3600));
    }

    #[test]
    fn pod_is_pinned_never_restarted_and_tolerates_all() {
        let job = resolve_sample().into_job(sample_pod(), &JobConfig::default());
        let pod = job.spec.unwrap().template.spec.unwrap();
        assert_eq!(
            pod.node_selector.unwrap().get(HOSTNAME_LABEL_KEY),
            Some(&"worker-1.local".to_string())
        );
        assert_eq!(pod.restart_policy.as_deref(), Some("Never"));
        let tolerations = pod.tolerations.unwrap();
        assert_eq!(tolerations.len(), 1);
        assert_eq!(tolerations[0].operator.as_deref(), Some("Exists"));
        assert_eq!(tolerations[0].key, None);
        assert_eq!(pod.image_pull_secrets.unwrap()[0].name, "regcred");
    }

    #[test]
    fn overrides_are_applied_when_set() {
        let config = JobConfig {
            service_account_name: Some("fledged-jobs".to_string()),
            priority_class_name: Some("system-node-critical".to_string()),
            ..Default::default()
        };
        let pod = resolve_sample()
            .into_job(sample_pod(), &config)
            .spec
            .unwrap()
            .template
            .spec
            .unwrap();
        assert_eq!(pod.service_account_name.as_deref(), Some("fledged-jobs"));
        assert_eq!(
            pod.priority_class_name.as_deref(),
            Some("system-node-critical")
        );
    }

    #[test]
    fn overrides_are_omitted_when_unset() {
        let pod = resolve_sample()
            .into_job(sample_pod(), &JobConfig::default())
            .spec
            .unwrap()
            .template
            .spec
            .unwrap();
        assert_eq!(pod.service_account_name, None);
        assert_eq!(pod.priority_class_name, None);
    }
}

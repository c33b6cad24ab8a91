//! Pull Job construction
//!
//! Three pod bodies, chosen by [`JobVariant::select`]:
//! - full cache: archives the image's root filesystem into a host directory
//! - directory-scoped cache: archives only a fixed set of path prefixes
//! - common pull: runs the image just long enough for the kubelet to pull it

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, HostPathVolumeSource, Node, PodSpec, Volume, VolumeMount,
};
use tracing::debug;

use fledged_common::crd::ImageCache;
use fledged_common::Result;

use super::JobTarget;
use crate::config::JobConfig;
use crate::policy::PullPolicy;
use crate::reference::cache_dir_name;

/// Image name fragment selecting the directory-scoped cache
pub const DIRECTORY_SCOPED_MARKER: &str = "modelzai";

/// Path prefixes archived for directory-scoped images
pub const DIRECTORY_SCOPED_PATHS: &[&str] = &["/opt/conda/bin/", "/opt/conda/lib/"];

/// Mount point of the host cache directory inside cache containers
pub const CACHE_MOUNT_PATH: &str = "/cache";

const ECHO_MOUNT_PATH: &str = "/tmp/bin";

/// Inputs for one pull Job
#[derive(Clone, Debug)]
pub struct PullJobRequest<'a> {
    /// Owning ImageCache; required
    pub image_cache: Option<&'a ImageCache>,
    /// Image to pull
    pub image: &'a str,
    /// Node to pull onto
    pub node: &'a Node,
    /// Archive the whole image regardless of its name
    pub force_full_cache: bool,
    /// Requested pull policy, before the mutable-tag upgrade; `None` when
    /// the configured value was not a recognized policy
    pub pull_policy: Option<PullPolicy>,
}

/// Pod body of a pull Job
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobVariant {
    /// Archive the image's entire filesystem
    FullCache,
    /// Archive only the listed path prefixes
    DirectoryScopedCache(&'static [&'static str]),
    /// Plain pull via a helper-staged `echo`
    CommonPull,
}

impl JobVariant {
    /// Pick the variant for an image.
    ///
    /// `force_full_cache` beats the name match, which beats the default.
    pub fn select(image: &str, force_full_cache: bool) -> Self {
        if force_full_cache {
            JobVariant::FullCache
        } else if image.contains(DIRECTORY_SCOPED_MARKER) {
            JobVariant::DirectoryScopedCache(DIRECTORY_SCOPED_PATHS)
        } else {
            JobVariant::CommonPull
        }
    }
}

/// Build a Job that pulls `request.image` onto `request.node`.
pub fn build_pull_job(request: &PullJobRequest<'_>, config: &JobConfig) -> Result<Job> {
    let target = JobTarget::resolve(request.image_cache, request.node)?;
    let policy = PullPolicy::resolve(request.pull_policy, request.image);
    let variant = JobVariant::select(request.image, request.force_full_cache);

    debug!(
        image = %request.image,
        node = %target.hostname,
        ?variant,
        %policy,
        "Building image pull job"
    );

    let pod = match variant {
        JobVariant::FullCache => full_cache_pod(request.image, policy, &config.cache_root),
        JobVariant::DirectoryScopedCache(paths) => {
            directory_cache_pod(request.image, policy, &config.cache_root, paths)
        }
        JobVariant::CommonPull => common_pull_pod(request.image, policy, &config.busybox_image),
    };

    Ok(target.into_job(pod, config))
}

fn full_cache_pod(image: &str, policy: PullPolicy, cache_root: &str) -> PodSpec {
    let script = format!(
        "mkdir -p {dest} && tar -cf - -C / --exclude=./proc --exclude=./sys --exclude=./dev \
         --exclude=.{dest} . | tar -xf - -C {dest}",
        dest = CACHE_MOUNT_PATH,
    );
    cache_pod(image, policy, cache_root, script)
}

fn directory_cache_pod(
    image: &str,
    policy: PullPolicy,
    cache_root: &str,
    paths: &[&str],
) -> PodSpec {
    let relative: Vec<&str> = paths.iter().map(|p| p.trim_start_matches('/')).collect();
    let script = format!(
        "mkdir -p {dest} && tar -cf - -C / {paths} | tar -xf - -C {dest}",
        dest = CACHE_MOUNT_PATH,
        paths = relative.join(" "),
    );
    cache_pod(image, policy, cache_root, script)
}

/// Runs the target image itself and streams its content into a per-image
/// host directory.
fn cache_pod(image: &str, policy: PullPolicy, cache_root: &str, script: String) -> PodSpec {
    let host_dir = format!(
        "{}/{}",
        cache_root.trim_end_matches('/'),
        cache_dir_name(image)
    );

    PodSpec {
        containers: vec![Container {
            name: "image-cacher".to_string(),
            image: Some(image.to_string()),
            command: Some(vec!["/bin/sh".to_string()]),
            args: Some(vec!["-c".to_string(), script]),
            image_pull_policy: Some(policy.to_string()),
            volume_mounts: Some(vec![VolumeMount {
                name: "image-cache".to_string(),
                mount_path: CACHE_MOUNT_PATH.to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }],
        volumes: Some(vec![Volume {
            name: "image-cache".to_string(),
            host_path: Some(HostPathVolumeSource {
                path: host_dir,
                type_: Some("DirectoryOrCreate".to_string()),
            }),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

/// A helper container stages a static `echo` in a shared volume so the
/// target image needs no binaries of its own.
fn common_pull_pod(image: &str, policy: PullPolicy, busybox_image: &str) -> PodSpec {
    let mount = VolumeMount {
        name: "tmp-bin".to_string(),
        mount_path: ECHO_MOUNT_PATH.to_string(),
        ..Default::default()
    };

    PodSpec {
        init_containers: Some(vec![Container {
            name: "busybox".to_string(),
            image: Some(busybox_image.to_string()),
            command: Some(vec![
                "cp".to_string(),
                "/bin/echo".to_string(),
                ECHO_MOUNT_PATH.to_string(),
            ]),
            image_pull_policy: Some(PullPolicy::IfNotPresent.to_string()),
            volume_mounts: Some(vec![mount.clone()]),
            ..Default::default()
        }]),
        containers: vec![Container {
            name: "image-puller".to_string(),
            image: Some(image.to_string()),
            command: Some(vec![
                format!("{}/echo", ECHO_MOUNT_PATH),
                "Image pulled successfully!".to_string(),
            ]),
            image_pull_policy: Some(policy.to_string()),
            volume_mounts: Some(vec![mount]),
            ..Default::default()
        }],
        volumes: Some(vec![Volume {
            name: "tmp-bin".to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

//! Delete Job construction
//!
//! The delete Job runs the runtime's own CLI against the node's runtime
//! socket, mounted from the host. Command and socket come from
//! [`RuntimeFamily::delete_invocation`].

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    Container, HostPathVolumeSource, Node, PodSpec, Volume, VolumeMount,
};
use tracing::{debug, warn};

use fledged_common::crd::ImageCache;
use fledged_common::Result;

use super::JobTarget;
use crate::config::JobConfig;
use crate::policy::PullPolicy;
use crate::runtime::RuntimeFamily;

/// Name of the container that runs the delete command
pub const DELETE_CONTAINER_NAME: &str = "docker-cri-client";

/// Inputs for one delete Job
#[derive(Clone, Debug)]
pub struct DeleteJobRequest<'a> {
    /// Owning ImageCache; required
    pub image_cache: Option<&'a ImageCache>,
    /// Image to remove
    pub image: &'a str,
    /// Node to remove it from
    pub node: &'a Node,
    /// The node's reported container runtime version
    pub runtime_version: &'a str,
}

/// Build a Job that removes `request.image` from `request.node`.
///
/// Output of the runtime CLI goes to the termination log, so a failed
/// delete surfaces its reason in the pod status.
pub fn build_delete_job(request: &DeleteJobRequest<'_>, config: &JobConfig) -> Result<Job> {
    let target = JobTarget::resolve(request.image_cache, request.node)?;

    let runtime = RuntimeFamily::detect(request.runtime_version);
    if runtime == RuntimeFamily::Unknown {
        warn!(
            runtime_version = %request.runtime_version,
            node = %target.hostname,
            "Unrecognized container runtime, deleting via the docker socket"
        );
    }
    let invocation = runtime.delete_invocation(request.image, config.socket_path());

    debug!(
        image = %request.image,
        node = %target.hostname,
        %runtime,
        socket = %invocation.socket_path,
        "Building image delete job"
    );

    let pod = PodSpec {
        containers: vec![Container {
            name: DELETE_CONTAINER_NAME.to_string(),
            image: Some(config.cri_client_image.clone()),
            command: Some(vec!["/bin/bash".to_string()]),
            args: Some(vec![
                "-c".to_string(),
                format!("exec {} > /dev/termination-log 2>&1", invocation.command),
            ]),
            image_pull_policy: Some(PullPolicy::IfNotPresent.to_string()),
            volume_mounts: Some(vec![VolumeMount {
                name: "runtime-sock".to_string(),
                mount_path: invocation.socket_path.clone(),
                ..Default::default()
            }]),
            ..Default::default()
        }],
        volumes: Some(vec![Volume {
            name: "runtime-sock".to_string(),
            host_path: Some(HostPathVolumeSource {
                path: invocation.socket_path,
                type_: Some("Socket".to_string()),
            }),
            ..Default::default()
        }]),
        host_network: Some(config.delete_job_host_network),
        ..Default::default()
    };

    Ok(target.into_job(pod, config))
}

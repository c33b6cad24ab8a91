//! Operator-level settings shared by every pull and delete Job

use serde::Deserialize;

/// Default helper image for the common pull Job
pub const DEFAULT_BUSYBOX_IMAGE: &str = "busybox:1.36.1";

/// Default helper image carrying `docker` and `crictl` for delete Jobs
pub const DEFAULT_CRI_CLIENT_IMAGE: &str = "docker.io/senthilrch/kubefledged-cri-client:v0.10.0";

/// Default host directory under which cache Jobs extract image content
pub const DEFAULT_CACHE_ROOT: &str = "/var/lib/kubefledged/cache";

/// Settings applied to every synthesized Job
///
/// Deserializes from a partial camelCase document; missing fields take the
/// defaults above. Empty strings count as unset.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct JobConfig {
    /// Helper image used to stage `echo` for the common pull Job
    pub busybox_image: String,
    /// Helper image that runs the runtime CLI in delete Jobs
    pub cri_client_image: String,
    /// Service account for Job pods
    pub service_account_name: Option<String>,
    /// Priority class for Job pods
    pub priority_class_name: Option<String>,
    /// Run delete Job pods on the host network
    pub delete_job_host_network: bool,
    /// Runtime socket path; overrides the detected runtime's default
    pub cri_socket_path: Option<String>,
    /// Host directory under which cache Jobs extract image content
    pub cache_root: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            busybox_image: DEFAULT_BUSYBOX_IMAGE.to_string(),
            cri_client_image: DEFAULT_CRI_CLIENT_IMAGE.to_string(),
            service_account_name: None,
            priority_class_name: None,
            delete_job_host_network: false,
            cri_socket_path: None,
            cache_root: DEFAULT_CACHE_ROOT.to_string(),
        }
    }
}

impl JobConfig {
    /// Service account override, if set
    pub fn service_account(&self) -> Option<&str> {
        non_empty(&self.service_account_name)
    }

    /// Priority class override, if set
    pub fn priority_class(&self) -> Option<&str> {
        non_empty(&self.priority_class_name)
    }

    /// Runtime socket override, if set
    pub fn socket_path(&self) -> Option<&str> {
        non_empty(&self.cri_socket_path)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

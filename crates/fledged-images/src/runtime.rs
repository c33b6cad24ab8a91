//! Container runtime detection for delete Jobs
//!
//! Nodes report their runtime as a free-form version string such as
//! `containerd://1.7.22` or `docker://27.3.1`. The family decides which CLI
//! the delete Job runs and which host socket it mounts.

use std::fmt;

/// Docker engine socket; also the baseline for unrecognized runtimes
pub const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// containerd CRI socket
pub const CONTAINERD_SOCKET: &str = "/run/containerd/containerd.sock";

/// CRI-O socket
pub const CRIO_SOCKET: &str = "/var/run/crio/crio.sock";

/// Container runtime family
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeFamily {
    /// Docker engine (dockershim or cri-dockerd)
    Docker,
    /// containerd
    Containerd,
    /// CRI-O
    CriO,
    /// Version string matched no known runtime
    Unknown,
}

/// Socket and shell command a delete Job uses to remove an image
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteInvocation {
    /// Host socket path, mounted at the same path in the container
    pub socket_path: String,
    /// Shell command that removes the image
    pub command: String,
}

impl RuntimeFamily {
    /// Detect the family from a node's container runtime version.
    ///
    /// Checked in order containerd, CRI-O, Docker; the first match wins.
    pub fn detect(version: &str) -> Self {
        if version.contains("containerd") {
            RuntimeFamily::Containerd
        } else if version.contains("crio") || version.contains("cri-o") {
            RuntimeFamily::CriO
        } else if version.contains("docker") {
            RuntimeFamily::Docker
        } else {
            RuntimeFamily::Unknown
        }
    }

    /// Well-known socket path for this family
    pub fn default_socket_path(self) -> &'static str {
        match self {
            RuntimeFamily::Containerd => CONTAINERD_SOCKET,
            RuntimeFamily::CriO => CRIO_SOCKET,
            RuntimeFamily::Docker | RuntimeFamily::Unknown => DOCKER_SOCKET,
        }
    }

    /// Build the delete invocation for `image`.
    ///
    /// `explicit_socket` overrides the family default for every known
    /// family. An unknown runtime keeps the baseline Docker command on the
    /// default Docker socket.
    pub fn delete_invocation(self, image: &str, explicit_socket: Option<&str>) -> DeleteInvocation {
        let socket_path = match self {
            RuntimeFamily::Unknown => DOCKER_SOCKET,
            family => explicit_socket.unwrap_or(family.default_socket_path()),
        }
        .to_string();

        let command = match self {
            RuntimeFamily::Containerd | RuntimeFamily::CriO => format!(
                "/usr/bin/crictl --runtime-endpoint=unix://{socket} --image-endpoint=unix://{socket} rmi {image}",
                socket = socket_path,
            ),
            RuntimeFamily::Docker => {
                format!("/usr/bin/docker -H unix://{} image rm -f {}", socket_path, image)
            }
            RuntimeFamily::Unknown => format!("/usr/bin/docker image rm -f {}", image),
        };

        DeleteInvocation {
            socket_path,
            command,
        }
    }
}

impl fmt::Display for RuntimeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeFamily::Docker => write!(f, "docker"),
            RuntimeFamily::Containerd => write!(f, "containerd"),
            RuntimeFamily::CriO => write!(f, "cri-o"),
            RuntimeFamily::Unknown => write!(f, "unknown"),
        }
    }
}

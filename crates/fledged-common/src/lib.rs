//! Common types for the image cache controller: the ImageCache CRD, errors,
//! and the labels stamped on every Job it creates

#![deny(missing_docs)]

pub mod crd;
pub mod error;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Name the controller identifies itself with in labels and events
pub const CONTROLLER_AGENT_NAME: &str = "kubefledged-controller";

/// Value of the `app` label on controller-owned resources
pub const APP_LABEL_VALUE: &str = "kubefledged";

/// Label key naming the controller component that owns a Job
pub const COMPONENT_LABEL_KEY: &str = "kubefledged";

/// Value of the component label for image pull/delete Jobs
pub const IMAGE_MANAGER_COMPONENT: &str = "kubefledged-image-manager";

/// Label key carrying the owning ImageCache's name
pub const IMAGE_CACHE_LABEL_KEY: &str = "imagecache";

/// Well-known node label used to pin a Job to a single node
pub const HOSTNAME_LABEL_KEY: &str = "kubernetes.io/hostname";

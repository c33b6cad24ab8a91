//! Custom Resource Definitions for the image cache controller

mod image_cache;

pub use image_cache::{
    CacheSpecImages, ImageCache, ImageCachePhase, ImageCacheSpec, ImageCacheStatus,
    ImagePullSecretRef,
};

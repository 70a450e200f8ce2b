//! Client code for shellcache.
//!
//! This crate provides the network boundary and the offline cache
//! controller that mediates between the page, the generation store and the
//! network.

pub mod controller;
pub mod fetch;

pub use controller::{
    ActivateReport, AssetFailure, CacheEvent, CacheObserver, ControllerConfig, Interception, Lifecycle,
    OfflineController, Phase, PurgeFailure, ResponseSource, SetupReport, TracingObserver, is_cacheable,
};

pub use fetch::{FetchClient, FetchConfig, Network};

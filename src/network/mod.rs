pub mod channel;
pub mod config;
pub mod flit;
pub mod gpunet;
pub mod hierarchy;
pub mod net;
pub mod policy;
pub mod router;
pub mod routing;
pub mod types;

#[cfg(test)]
mod unit_tests;

pub use channel::{ChannelPair, ChannelRef};
pub use config::{GpuPreset, NetworkConfig, TopologyKind};
pub use flit::{Flit, FlitKind};
pub use gpunet::GpuNet;
pub use hierarchy::{ConfigError, Hierarchy, RouterPosition, SubNet};
pub use net::{Network, NetworkError, TopologyError};
pub use router::Router;
pub use routing::{
    route_hierarchical, walk_route, RouteHint, RouteStep, RoutingFn, RoutingRegistry,
    HIERARCHICAL_GPUNET,
};
pub use types::{ChannelId, Cycle, RouterId};

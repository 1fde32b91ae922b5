use log::info;
use thiserror::Error;

use crate::network::config::{NetworkConfig, TopologyKind};
use crate::network::gpunet::GpuNet;
use crate::network::hierarchy::ConfigError;
use crate::network::router::Router;
use crate::network::types::RouterId;

/// An index computation escaped its range while wiring, or a router ended up with the wrong
/// number of ports. Either way the builder is at fault and construction is abandoned whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("router {router}: expected {expected} {direction} ports, wired {actual}")]
    PortWidth {
        router: String,
        direction: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("channel id {id} out of range ({limit} {kind} channels) while wiring {router}")]
    ChannelRange {
        id: usize,
        limit: usize,
        kind: &'static str,
        router: String,
    },
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Capability set every topology implementation exposes to the rest of the simulator.
pub trait Network {
    fn topology(&self) -> TopologyKind;
    fn num_routers(&self) -> usize;
    /// Internal router-to-router channels, both sub-networks.
    fn num_channels(&self) -> usize;
    fn num_terminals(&self) -> usize;
    fn router(&self, id: RouterId) -> &Router;
    /// Name the routing-function registry dispatches for this topology.
    fn routing_function(&self) -> &'static str;
}

/// Construct the network selected by the config's topology tag.
pub fn build(config: &NetworkConfig) -> Result<GpuNet, NetworkError> {
    match config.topology {
        TopologyKind::HierarchicalGpu => GpuNet::new(config),
    }
}

pub fn log_summary(net: &dyn Network) {
    info!(
        "built {:?}: {} routers, {} channels, {} terminals, routing function {}",
        net.topology(),
        net.num_routers(),
        net.num_channels(),
        net.num_terminals(),
        net.routing_function()
    );
}

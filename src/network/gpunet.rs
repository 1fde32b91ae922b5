/*
Topology builder for the hierarchical GPU on-chip network.

Allocates the request and reply sub-networks (two structurally identical trees of routers with a
fully-connected crossbar mesh at the top), binds every terminal's inject/eject channel pair, and
wires the inter-layer and inter-partition channels. Construction is all-or-nothing: any index
that escapes its range surfaces as a TopologyError and nothing of the partial network is
observable.

Wiring walks routers in id order and attaches channels in a fixed per-router order, because the
ordinal of each attach call *is* the port number the routing function assumes:

  request router, below top:  inputs = children bottom-up, output = the one upward channel
  request crossbar:           inputs = children then mesh (senders ascending),
                              outputs = L2 ejection (slice order) then mesh (self skipped)
  reply routers mirror the request side with channel ids offset by one sub-network.
*/

use log::debug;

use crate::network::channel::{ChannelPair, ChannelRef};
use crate::network::config::{NetworkConfig, TopologyKind};
use crate::network::hierarchy::{Hierarchy, RouterPosition, SubNet};
use crate::network::net::{Network, NetworkError, TopologyError};
use crate::network::policy;
use crate::network::router::Router;
use crate::network::routing::HIERARCHICAL_GPUNET;
use crate::network::types::{ChannelId, RouterId};

pub struct GpuNet {
    hierarchy: Hierarchy,
    /// All routers of both sub-networks, indexed by flat router id.
    routers: Vec<Router>,
    /// Terminal injection channels, indexed by node.
    inject: Vec<ChannelPair>,
    /// Terminal ejection channels, indexed by node.
    eject: Vec<ChannelPair>,
    /// Internal channels: request ids in `[0, C)`, reply ids in `[C, 2C)`.
    chan: Vec<ChannelPair>,
}

impl GpuNet {
    pub fn new(config: &NetworkConfig) -> Result<Self, NetworkError> {
        let hierarchy = Hierarchy::new(config)?;
        let mut net = Self::alloc(hierarchy);
        net.wire_request()?;
        net.wire_reply()?;
        net.apply_channel_policy();
        for router in &net.routers {
            router.check_port_widths()?;
        }
        debug!(
            "wired {} routers and {} internal channels",
            net.routers.len(),
            net.chan.len()
        );
        Ok(net)
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn inject(&self, node: usize) -> &ChannelPair {
        &self.inject[node]
    }

    pub fn eject(&self, node: usize) -> &ChannelPair {
        &self.eject[node]
    }

    pub fn channel(&self, id: ChannelId) -> &ChannelPair {
        &self.chan[id]
    }

    fn alloc(hierarchy: Hierarchy) -> Self {
        let mut routers = Vec::with_capacity(2 * hierarchy.routers_per_subnet());
        for subnet in [SubNet::Request, SubNet::Reply] {
            for layer in 0..hierarchy.layers {
                for address in 0..hierarchy.units[layer] {
                    let id = hierarchy.router_id(layer, address, subnet);
                    debug_assert_eq!(id, routers.len());
                    let (expect_in, expect_out) = hierarchy.port_widths(subnet, layer);
                    routers.push(Router::new(
                        id,
                        router_name(&hierarchy, subnet, layer, address),
                        RouterPosition {
                            subnet,
                            layer,
                            address,
                        },
                        expect_in,
                        expect_out,
                    ));
                }
            }
        }

        let nodes = hierarchy.nodes();
        let inject = (0..nodes)
            .map(|n| ChannelPair::new(n, format!("inject_{n}")))
            .collect();
        let eject = (0..nodes)
            .map(|n| ChannelPair::new(n, format!("eject_{n}")))
            .collect();
        let chan = (0..2 * hierarchy.channels_per_subnet())
            .map(|c| ChannelPair::new(c, format!("chan_{c}")))
            .collect();

        Self {
            hierarchy,
            routers,
            inject,
            eject,
            chan,
        }
    }

    fn wire_request(&mut self) -> Result<(), TopologyError> {
        let h = self.hierarchy.clone();
        let top = h.layers - 1;
        for layer in 0..h.layers {
            for address in 0..h.units[layer] {
                let rid = h.router_id(layer, address, SubNet::Request);
                let name = self.routers[rid].name().to_string();

                // children (at layer 0, the SM inject channels)
                for p in 0..h.ratio[layer] {
                    let child = address * h.ratio[layer] + p;
                    let pair = if layer == 0 {
                        self.inject_pair(child, &name)?
                    } else {
                        self.chan_pair(h.offset[layer - 1] + child, &name)?
                    };
                    self.routers[rid].add_input_channel(pair.flit, pair.credit);
                }

                if layer < top {
                    let pair = self.chan_pair(h.offset[layer] + address, &name)?;
                    self.routers[rid].add_output_channel(pair.flit, pair.credit);
                    continue;
                }

                // crossbar: mesh inputs, senders ascending
                for sender in 0..h.partitions() {
                    if sender == address {
                        continue;
                    }
                    let slot = sender * (h.partitions() - 1) + h.mesh_ordinal(sender, address);
                    let pair = self.chan_pair(h.offset[top] + slot, &name)?;
                    self.routers[rid].add_input_channel(pair.flit, pair.credit);
                }
                // L2 ejection in slice order, then mesh outputs
                for q in 0..h.l2_per_partition() {
                    let node = h.nodes_sm + address * h.l2_per_partition() + q;
                    let pair = self.eject_pair(node, &name)?;
                    self.routers[rid].add_output_channel(pair.flit, pair.credit);
                }
                for k in 0..h.partitions() - 1 {
                    let slot = address * (h.partitions() - 1) + k;
                    let pair = self.chan_pair(h.offset[top] + slot, &name)?;
                    self.routers[rid].add_output_channel(pair.flit, pair.credit);
                }
            }
        }
        Ok(())
    }

    fn wire_reply(&mut self) -> Result<(), TopologyError> {
        let h = self.hierarchy.clone();
        let top = h.layers - 1;
        let cbase = h.channels_per_subnet();
        for layer in 0..h.layers {
            for address in 0..h.units[layer] {
                let rid = h.router_id(layer, address, SubNet::Reply);
                let name = self.routers[rid].name().to_string();

                if layer < top {
                    let pair = self.chan_pair(cbase + h.offset[layer] + address, &name)?;
                    self.routers[rid].add_input_channel(pair.flit, pair.credit);
                } else {
                    // crossbar: L2 injection in slice order, then mesh inputs
                    for q in 0..h.l2_per_partition() {
                        let node = h.nodes_sm + address * h.l2_per_partition() + q;
                        let pair = self.inject_pair(node, &name)?;
                        self.routers[rid].add_input_channel(pair.flit, pair.credit);
                    }
                    for sender in 0..h.partitions() {
                        if sender == address {
                            continue;
                        }
                        let slot = sender * (h.partitions() - 1) + h.mesh_ordinal(sender, address);
                        let pair = self.chan_pair(cbase + h.offset[top] + slot, &name)?;
                        self.routers[rid].add_input_channel(pair.flit, pair.credit);
                    }
                }

                // children (at layer 0, the SM eject channels)
                for p in 0..h.ratio[layer] {
                    let child = address * h.ratio[layer] + p;
                    let pair = if layer == 0 {
                        self.eject_pair(child, &name)?
                    } else {
                        self.chan_pair(cbase + h.offset[layer - 1] + child, &name)?
                    };
                    self.routers[rid].add_output_channel(pair.flit, pair.credit);
                }
                if layer == top {
                    for k in 0..h.partitions() - 1 {
                        let slot = address * (h.partitions() - 1) + k;
                        let pair = self.chan_pair(cbase + h.offset[top] + slot, &name)?;
                        self.routers[rid].add_output_channel(pair.flit, pair.credit);
                    }
                }
            }
        }
        Ok(())
    }

    /// Latency and bandwidth of every channel pair, per the wire policy. Channel ids repeat the
    /// same layout in both sub-networks, so one pass covers request and reply at once.
    fn apply_channel_policy(&mut self) {
        let h = &self.hierarchy;
        for node in 0..h.nodes() {
            let bandwidth = if node < h.nodes_sm {
                h.speedup[0]
            } else {
                h.speedup[h.layers]
            };
            for pair in [&self.inject[node], &self.eject[node]] {
                pair.set_latency(policy::wire_latency(0, false));
                pair.set_bandwidth(bandwidth);
            }
        }

        for subnet_base in [0, h.channels_per_subnet()] {
            for layer in 1..h.layers {
                for below in 0..h.units[layer - 1] {
                    let pair = &self.chan[subnet_base + h.offset[layer - 1] + below];
                    pair.set_latency(policy::wire_latency(layer, false));
                    pair.set_bandwidth(policy::channel_bandwidth(h, layer, false));
                }
            }
            for slot in 0..h.mesh_channels() {
                let pair = &self.chan[subnet_base + h.offset[h.layers - 1] + slot];
                pair.set_latency(policy::wire_latency(h.layers - 1, true));
                pair.set_bandwidth(policy::channel_bandwidth(h, h.layers - 1, true));
            }
        }
    }

    fn chan_pair(&self, id: ChannelId, router: &str) -> Result<ChannelPair, TopologyError> {
        self.chan
            .get(id)
            .cloned()
            .ok_or_else(|| TopologyError::ChannelRange {
                id,
                limit: self.chan.len(),
                kind: "internal",
                router: router.to_string(),
            })
    }

    fn inject_pair(&self, node: usize, router: &str) -> Result<ChannelPair, TopologyError> {
        self.inject
            .get(node)
            .cloned()
            .ok_or_else(|| TopologyError::ChannelRange {
                id: node,
                limit: self.inject.len(),
                kind: "inject",
                router: router.to_string(),
            })
    }

    fn eject_pair(&self, node: usize, router: &str) -> Result<ChannelPair, TopologyError> {
        self.eject
            .get(node)
            .cloned()
            .ok_or_else(|| TopologyError::ChannelRange {
                id: node,
                limit: self.eject.len(),
                kind: "eject",
                router: router.to_string(),
            })
    }

    /// Router and input port a terminal's inject channel feeds: SMs enter the request tree at
    /// the bottom, L2 slices enter the reply tree at their partition crossbar.
    pub fn injection_point(&self, node: usize) -> (RouterId, usize) {
        let h = &self.hierarchy;
        if node < h.nodes_sm {
            let router = h.router_id(0, node / h.ratio[0], SubNet::Request);
            (router, node % h.ratio[0])
        } else {
            let slice = node - h.nodes_sm;
            let router = h.router_id(
                h.layers - 1,
                slice / h.l2_per_partition(),
                SubNet::Reply,
            );
            (router, slice % h.l2_per_partition())
        }
    }

    /// The router and input port consuming a flit channel, if any router does.
    pub fn channel_consumer(&self, flit: &ChannelRef) -> Option<(RouterId, usize)> {
        for router in &self.routers {
            for (port, pair) in router.inputs().iter().enumerate() {
                if pair.flit.same_endpoint(flit) {
                    return Some((router.id(), port));
                }
            }
        }
        None
    }

    /// The terminal node a flit channel ejects to, if it is an ejection channel.
    pub fn ejection_node(&self, flit: &ChannelRef) -> Option<usize> {
        self.eject
            .iter()
            .position(|pair| pair.flit.same_endpoint(flit))
    }
}

impl Network for GpuNet {
    fn topology(&self) -> TopologyKind {
        TopologyKind::HierarchicalGpu
    }

    fn num_routers(&self) -> usize {
        self.routers.len()
    }

    fn num_channels(&self) -> usize {
        self.chan.len()
    }

    fn num_terminals(&self) -> usize {
        self.inject.len()
    }

    fn router(&self, id: RouterId) -> &Router {
        &self.routers[id]
    }

    fn routing_function(&self) -> &'static str {
        HIERARCHICAL_GPUNET
    }
}

fn router_name(
    hierarchy: &Hierarchy,
    subnet: SubNet,
    layer: usize,
    address: usize,
) -> String {
    if layer == hierarchy.layers - 1 {
        format!("crossbar_{}_{}", subnet.short(), address)
    } else {
        format!("router_{}_{}_{}", subnet.short(), layer, address)
    }
}

/*
Hierarchy descriptor for the layered GPU on-chip network.

Normalizes the declarative configuration into per-layer router counts, cumulative id offsets and
per-layer channel speedups, and owns the addressing rules that the topology builder and the
routing function must agree on: the flat router-id space across the two sub-networks, and the
port layout of every router. Any port or index rule that both sides consume lives here, so the
two cannot drift apart.
*/

use thiserror::Error;

use crate::network::config::NetworkConfig;
use crate::network::types::RouterId;

/// Which of the two logically-independent sub-networks a router belongs to. Requests climb from
/// SMs to a partition crossbar; replies descend the mirrored tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubNet {
    Request,
    Reply,
}

impl SubNet {
    pub fn short(self) -> &'static str {
        match self {
            Self::Request => "req",
            Self::Reply => "rep",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterPosition {
    pub subnet: SubNet,
    pub layer: usize,
    pub address: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("hierarchy needs at least one layer, got {0}")]
    NoLayers(usize),
    #[error("fan-in ratio at layer {layer} must be positive")]
    ZeroRatio { layer: usize },
    #[error("{count} units below layer {layer} do not divide by fan-in {ratio}")]
    UnevenFanIn {
        layer: usize,
        count: usize,
        ratio: usize,
    },
    #[error("layer {layer} would hold no routers")]
    EmptyLayer { layer: usize },
    #[error("at least one L2 slice is required")]
    NoL2Slices,
    #[error("{nodes_l2} L2 slices do not divide across {partitions} partitions")]
    UnevenL2 { nodes_l2: usize, partitions: usize },
    #[error("partitioning is disabled but the top layer has {units} routers")]
    TopLayerNotSingular { units: usize },
    #[error("num_vcs must be even and non-zero, got {0}")]
    OddVcs(usize),
    #[error("SM inject/eject speedup is fixed at 1, got {0}")]
    SmSpeedup(u32),
    #[error("channel speedup at layer {layer} must be positive")]
    ZeroSpeedup { layer: usize },
    #[error("inter-partition speedup must be positive")]
    ZeroInterPartitionSpeedup,
}

/// Immutable description of the hierarchy. Layer 0 sits immediately above the SM nodes; layer
/// `layers - 1` is the partition-crossbar layer.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    pub layers: usize,
    pub nodes_sm: usize,
    pub nodes_l2: usize,
    /// Fan-in at each layer: `ratio[0]` SMs per layer-0 router, `ratio[l]` layer-(l-1) routers
    /// per layer-l router.
    pub ratio: Vec<usize>,
    /// Routers per layer in one sub-network.
    pub units: Vec<usize>,
    /// Cumulative router-id offset of each layer within one sub-network.
    pub offset: Vec<usize>,
    /// Bandwidth multiplier per inter-layer edge, length `layers + 1`. `speedup[l]` covers the
    /// edges entering layer `l`; `speedup[layers]` covers crossbar-to-L2 ejection.
    pub speedup: Vec<u32>,
    pub inter_partition_speedup: u32,
    pub partitioned: bool,
    pub num_vcs: usize,
}

impl Hierarchy {
    pub fn new(config: &NetworkConfig) -> Result<Self, ConfigError> {
        let layers = config.l;
        if layers < 1 {
            return Err(ConfigError::NoLayers(layers));
        }

        let mut ratio = config.units.clone();
        ratio.resize(layers, 1);
        for (layer, &r) in ratio.iter().enumerate() {
            if r == 0 {
                return Err(ConfigError::ZeroRatio { layer });
            }
        }

        let mut units = Vec::with_capacity(layers);
        let mut below = config.sm;
        for (layer, &r) in ratio.iter().enumerate() {
            if below % r != 0 {
                return Err(ConfigError::UnevenFanIn {
                    layer,
                    count: below,
                    ratio: r,
                });
            }
            below /= r;
            if below == 0 {
                return Err(ConfigError::EmptyLayer { layer });
            }
            units.push(below);
        }

        let partitions = units[layers - 1];
        if !config.partition && partitions != 1 {
            return Err(ConfigError::TopLayerNotSingular { units: partitions });
        }
        if config.l2slice == 0 {
            return Err(ConfigError::NoL2Slices);
        }
        if config.l2slice % partitions != 0 {
            return Err(ConfigError::UnevenL2 {
                nodes_l2: config.l2slice,
                partitions,
            });
        }

        if config.num_vcs == 0 || config.num_vcs % 2 != 0 {
            return Err(ConfigError::OddVcs(config.num_vcs));
        }

        // Short speedup vectors are right-padded with 1; entries past layers + 1 are ignored.
        let mut speedup = config.speedups.clone();
        if let Some(&sm) = speedup.first() {
            if sm != 1 {
                return Err(ConfigError::SmSpeedup(sm));
            }
        }
        speedup.resize(layers + 1, 1);
        for (layer, &s) in speedup.iter().enumerate() {
            if s == 0 {
                return Err(ConfigError::ZeroSpeedup { layer });
            }
        }
        if config.inter_partition_speedup == 0 {
            return Err(ConfigError::ZeroInterPartitionSpeedup);
        }

        let mut offset = Vec::with_capacity(layers);
        let mut acc = 0;
        for &u in &units {
            offset.push(acc);
            acc += u;
        }

        Ok(Self {
            layers,
            nodes_sm: config.sm,
            nodes_l2: config.l2slice,
            ratio,
            units,
            offset,
            speedup,
            inter_partition_speedup: config.inter_partition_speedup,
            partitioned: config.partition,
            num_vcs: config.num_vcs,
        })
    }

    pub fn nodes(&self) -> usize {
        self.nodes_sm + self.nodes_l2
    }

    pub fn partitions(&self) -> usize {
        self.units[self.layers - 1]
    }

    pub fn sm_per_partition(&self) -> usize {
        self.nodes_sm / self.partitions()
    }

    pub fn l2_per_partition(&self) -> usize {
        self.nodes_l2 / self.partitions()
    }

    /// Routers in one sub-network.
    pub fn routers_per_subnet(&self) -> usize {
        self.offset[self.layers - 1] + self.units[self.layers - 1]
    }

    /// Directed crossbar-to-crossbar channels in one sub-network.
    pub fn mesh_channels(&self) -> usize {
        let p = self.partitions();
        p * (p - 1)
    }

    /// Internal channels in one sub-network: one upward edge per non-top router plus the mesh.
    pub fn channels_per_subnet(&self) -> usize {
        self.offset[self.layers - 1] + self.mesh_channels()
    }

    /// Flat router id across both sub-networks.
    pub fn router_id(&self, layer: usize, address: usize, subnet: SubNet) -> RouterId {
        assert!(layer < self.layers, "layer {} out of range", layer);
        assert!(
            address < self.units[layer],
            "address {} out of range for layer {} ({} units)",
            address,
            layer,
            self.units[layer]
        );
        let base = match subnet {
            SubNet::Request => 0,
            SubNet::Reply => self.routers_per_subnet(),
        };
        base + self.offset[layer] + address
    }

    /// Inverse of [`Self::router_id`].
    pub fn router_position(&self, id: RouterId) -> RouterPosition {
        let per_subnet = self.routers_per_subnet();
        assert!(
            id < 2 * per_subnet,
            "router id {} out of range ({} routers)",
            id,
            2 * per_subnet
        );
        let (subnet, local) = if id < per_subnet {
            (SubNet::Request, id)
        } else {
            (SubNet::Reply, id - per_subnet)
        };
        let mut layer = self.layers - 1;
        while self.offset[layer] > local {
            layer -= 1;
        }
        RouterPosition {
            subnet,
            layer,
            address: local - self.offset[layer],
        }
    }

    /// Partition the terminal node hangs off of.
    pub fn node_partition(&self, node: usize) -> usize {
        assert!(node < self.nodes(), "terminal node {} out of range", node);
        if node < self.nodes_sm {
            node / self.sm_per_partition()
        } else {
            (node - self.nodes_sm) / self.l2_per_partition()
        }
    }

    /// Input and output port widths of a router, as the builder wires them and the routing
    /// function assumes them.
    pub fn port_widths(&self, subnet: SubNet, layer: usize) -> (usize, usize) {
        let mesh = self.partitions() - 1;
        let top = layer == self.layers - 1;
        match (subnet, top) {
            (SubNet::Request, false) => (self.ratio[layer], 1),
            (SubNet::Request, true) => {
                (self.ratio[layer] + mesh, self.l2_per_partition() + mesh)
            }
            (SubNet::Reply, false) => (1, self.ratio[layer]),
            (SubNet::Reply, true) => {
                (self.l2_per_partition() + mesh, self.ratio[layer] + mesh)
            }
        }
    }

    /// First mesh-output ordinal at a top-layer router. Ejection (request) or descent (reply)
    /// ports come first.
    pub fn mesh_out_base(&self, subnet: SubNet) -> usize {
        match subnet {
            SubNet::Request => self.l2_per_partition(),
            SubNet::Reply => self.ratio[self.layers - 1],
        }
    }

    /// Ordinal of the crossbar port facing `dest_partition`, as seen from `at_partition`. Self
    /// is skipped, so ordinals stay dense in `[0, partitions - 1)`.
    pub fn mesh_ordinal(&self, at_partition: usize, dest_partition: usize) -> usize {
        assert!(at_partition < self.partitions() && dest_partition < self.partitions());
        assert_ne!(
            at_partition, dest_partition,
            "no mesh port from partition {} to itself",
            at_partition
        );
        if dest_partition < at_partition {
            dest_partition
        } else {
            dest_partition - 1
        }
    }

    /// Ejection port of L2 slice `dest` at its partition's request crossbar.
    pub fn eject_port(&self, dest: usize) -> usize {
        assert!(
            dest >= self.nodes_sm && dest < self.nodes(),
            "terminal {} is not an L2 slice",
            dest
        );
        (dest - self.nodes_sm) % self.l2_per_partition()
    }

    /// Base-ratio digit of SM index `sm` at position `layer`: the bottom port of a layer-`layer`
    /// reply router that leads toward it.
    pub fn sm_digit(&self, sm: usize, layer: usize) -> usize {
        assert!(sm < self.nodes_sm && layer < self.layers);
        let group: usize = self.ratio[..layer].iter().product();
        (sm % (group * self.ratio[layer])) / group
    }

    /// Floorplan position of an L2 slice, in grid units of an 8-wide strip. Not part of the wire
    /// latency policy; see `policy::floorplan_latency`.
    pub fn l2slice_coord(&self, slice: usize) -> (usize, usize) {
        assert!(slice < self.nodes_l2, "L2 slice {} out of range", slice);
        (slice % 8, slice / 8)
    }
}

use serde::Deserialize;

use crate::sim::config::Config;

/// Which topology implementation to construct. Each variant has exactly one builder behind the
/// common network capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    HierarchicalGpu,
}

/// Declarative shape of the layered network, read from the `[network]` section. `units` is the
/// per-layer fan-in vector; missing vectors default to all-1 and are padded to length.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub topology: TopologyKind,
    /// Layers between an SM node and a partition crossbar.
    pub l: usize,
    pub sm: usize,
    pub l2slice: usize,
    pub units: Vec<usize>,
    pub speedups: Vec<u32>,
    pub inter_partition_speedup: u32,
    pub partition: bool,
    pub num_vcs: usize,
}

impl Config for NetworkConfig {}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            topology: TopologyKind::HierarchicalGpu,
            l: 2,
            sm: 8,
            l2slice: 8,
            units: vec![4, 2],
            speedups: Vec::new(),
            inter_partition_speedup: 1,
            partition: false,
            num_vcs: 4,
        }
    }
}

/// The rigid SM/TPC/CPC/GPC schema, kept as a preset that fills in the layered form. The CPC
/// layer is optional; per-layer speedups land on the edges entering the named layer, and the
/// L2-group speedup lands on crossbar-to-L2 ejection.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GpuPreset {
    pub use_cpc: bool,
    pub sm: usize,
    pub tpc: usize,
    pub cpc: usize,
    pub gpc: usize,
    pub partition: usize,
    pub l2slice: usize,
    pub tpc_speedup: u32,
    pub cpc_speedup: u32,
    pub gpc_speedup: u32,
    pub l2group_speedup: u32,
    pub inter_partition_speedup: u32,
    pub num_vcs: usize,
}

impl Config for GpuPreset {}

impl Default for GpuPreset {
    fn default() -> Self {
        Self {
            use_cpc: false,
            sm: 16,
            tpc: 8,
            cpc: 4,
            gpc: 4,
            partition: 2,
            l2slice: 16,
            tpc_speedup: 2,
            cpc_speedup: 2,
            gpc_speedup: 2,
            l2group_speedup: 2,
            inter_partition_speedup: 2,
            num_vcs: 4,
        }
    }
}

impl GpuPreset {
    fn exact_div(upper: usize, lower: usize, what: &str) -> usize {
        assert!(lower > 0, "{what} count must be positive");
        assert_eq!(upper % lower, 0, "{what}: {upper} does not divide by {lower}");
        upper / lower
    }

    pub fn into_network_config(&self) -> NetworkConfig {
        let mut units = vec![Self::exact_div(self.sm, self.tpc, "SMs per TPC")];
        let mut speedups = vec![1, self.tpc_speedup];
        if self.use_cpc {
            units.push(Self::exact_div(self.tpc, self.cpc, "TPCs per CPC"));
            speedups.push(self.cpc_speedup);
        }
        units.push(Self::exact_div(
            if self.use_cpc { self.cpc } else { self.tpc },
            self.gpc,
            "xPCs per GPC",
        ));
        units.push(Self::exact_div(self.gpc, self.partition, "GPCs per partition"));
        speedups.push(self.gpc_speedup);
        speedups.push(self.l2group_speedup);

        NetworkConfig {
            topology: TopologyKind::HierarchicalGpu,
            l: units.len(),
            sm: self.sm,
            l2slice: self.l2slice,
            units,
            speedups,
            inter_partition_speedup: self.inter_partition_speedup,
            partition: self.partition > 1,
            num_vcs: self.num_vcs,
        }
    }
}

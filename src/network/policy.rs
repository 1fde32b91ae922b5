use crate::network::hierarchy::Hierarchy;
use crate::network::types::Cycle;

/// Wire latency of an edge entering `layer`, monotone in depth to model the widening physical
/// distance up the hierarchy. Terminal inject/eject channels count as layer 0; crossbar-to-
/// crossbar wires pay one extra cycle.
pub fn wire_latency(layer: usize, inter_partition: bool) -> Cycle {
    1 + layer as Cycle + if inter_partition { 1 } else { 0 }
}

/// Bandwidth multiplier of an edge entering `layer`.
pub fn channel_bandwidth(hierarchy: &Hierarchy, layer: usize, inter_partition: bool) -> u32 {
    if inter_partition {
        hierarchy.inter_partition_speedup
    } else {
        hierarchy.speedup[layer]
    }
}

/// Manhattan distance between two L2-slice floorplan positions. Not consulted by
/// [`wire_latency`]; this is the hook for modeling ejection distance at the top layer.
pub fn floorplan_latency(src: (usize, usize), dst: (usize, usize)) -> Cycle {
    (src.0.abs_diff(dst.0) + src.1.abs_diff(dst.1)) as Cycle
}

/*
Deterministic hierarchical routing.

The routing decision is a pure function of the immutable hierarchy descriptor and the flit
header. Requests climb to their partition crossbar, hop the mesh when the destination partition
differs, and eject to the L2 slice; replies retrace the tree downward. VC admission splits the
even-sized VC space in half by read/write class, which together with the separate request and
reply sub-networks keeps the four traffic classes from sharing buffers.

Violated preconditions here mean the protocol state is corrupt, so they halt the simulation with
the offending flit and router named rather than routing anywhere at all.
*/

use std::collections::HashMap;

use log::trace;

use crate::network::flit::{Flit, FlitKind};
use crate::network::gpunet::GpuNet;
use crate::network::hierarchy::{Hierarchy, SubNet};
use crate::network::net::Network;
use crate::network::router::Router;
use crate::network::types::{Cycle, RouterId};

pub const HIERARCHICAL_GPUNET: &str = "hierarchical_gpunet";

/// One admissible routing choice. `out_port` is `None` only on injection, where the injection
/// arbiter owns the port decision; the VC bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteHint {
    pub out_port: Option<usize>,
    pub vc_lo: usize,
    pub vc_hi: usize,
}

pub type RoutingFn = fn(&Hierarchy, &Router, &Flit, usize, bool, Cycle) -> Vec<RouteHint>;

/// Initialize-once mapping from routing-function name to callable. The simulator resolves a
/// network's advertised function name through this table once per flit hop.
pub struct RoutingRegistry {
    funcs: HashMap<&'static str, RoutingFn>,
}

impl RoutingRegistry {
    pub fn new() -> Self {
        Self {
            funcs: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(HIERARCHICAL_GPUNET, route_hierarchical);
        registry
    }

    pub fn register(&mut self, name: &'static str, func: RoutingFn) {
        let replaced = self.funcs.insert(name, func);
        assert!(
            replaced.is_none(),
            "routing function {} registered twice",
            name
        );
    }

    pub fn lookup(&self, name: &str) -> Option<RoutingFn> {
        self.funcs.get(name).copied()
    }
}

impl Default for RoutingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// VC half admitted for a flit kind: reads in the lower half, writes in the upper.
pub fn vc_range(num_vcs: usize, kind: FlitKind) -> (usize, usize) {
    assert!(
        num_vcs >= 2 && num_vcs % 2 == 0,
        "VC space must be even to split by class, got {}",
        num_vcs
    );
    let half = num_vcs / 2;
    if kind.is_write() {
        (half, num_vcs - 1)
    } else {
        (0, half - 1)
    }
}

pub fn route_hierarchical(
    hierarchy: &Hierarchy,
    router: &Router,
    flit: &Flit,
    in_port: usize,
    inject: bool,
    now: Cycle,
) -> Vec<RouteHint> {
    let (vc_lo, vc_hi) = vc_range(hierarchy.num_vcs, flit.kind);
    match flit.vc {
        Some(vc) => assert!(
            vc_lo <= vc && vc <= vc_hi,
            "flit {} ({}) holds vc {} outside [{}, {}] at {}",
            flit.id,
            flit.kind.short(),
            vc,
            vc_lo,
            vc_hi,
            router.name()
        ),
        None => assert!(
            inject,
            "flit {} reached {} without a vc assigned",
            flit.id,
            router.name()
        ),
    }

    let out_port = if inject {
        None
    } else {
        Some(output_port(hierarchy, router, flit))
    };

    if flit.watch {
        trace!(
            "{} | {} | flit {} ({}) dest {} in {} -> out {} vc [{}, {}]",
            now,
            router.name(),
            flit.id,
            flit.kind.short(),
            flit.dest,
            in_port,
            out_port.map_or(-1, |p| p as i64),
            vc_lo,
            vc_hi
        );
    }

    vec![RouteHint {
        out_port,
        vc_lo,
        vc_hi,
    }]
}

fn output_port(hierarchy: &Hierarchy, router: &Router, flit: &Flit) -> usize {
    let is_request = flit.kind.is_request();
    // SM ids precede L2 ids, so direction is implied by the terminal ordering.
    assert_eq!(
        is_request,
        flit.dest > flit.src,
        "flit {} kind {} disagrees with src {} dest {}",
        flit.id,
        flit.kind.short(),
        flit.src,
        flit.dest
    );
    let position = router.position();
    assert_eq!(
        position.subnet,
        if is_request {
            SubNet::Request
        } else {
            SubNet::Reply
        },
        "flit {} ({}) is on the wrong sub-network at {}",
        flit.id,
        flit.kind.short(),
        router.name()
    );

    let src_partition = hierarchy.node_partition(flit.src);
    let dest_partition = hierarchy.node_partition(flit.dest);
    let remote = src_partition != dest_partition;
    let top = hierarchy.layers - 1;
    let total_hops = if remote {
        hierarchy.layers + 1
    } else {
        hierarchy.layers
    };
    assert!(
        flit.hops < total_hops,
        "flit {} overran its route at {}: hop {} of {}",
        flit.id,
        router.name(),
        flit.hops,
        total_hops
    );

    if is_request {
        let cur_layer = flit.hops;
        if cur_layer < top {
            assert_eq!(position.layer, cur_layer, "flit {} lost height", flit.id);
            return 0;
        }
        assert_eq!(position.layer, top, "flit {} lost height", flit.id);
        if remote && flit.hops == top {
            // first crossbar visit; hop the mesh toward the destination partition
            assert_eq!(position.address, src_partition);
            assert_eq!(
                router.num_outputs(),
                hierarchy.l2_per_partition() + hierarchy.partitions() - 1,
                "crossbar {} output width",
                router.name()
            );
            return hierarchy.mesh_out_base(SubNet::Request)
                + hierarchy.mesh_ordinal(src_partition, dest_partition);
        }
        hierarchy.eject_port(flit.dest)
    } else {
        let cur_layer = total_hops - flit.hops - 1;
        if cur_layer >= hierarchy.layers {
            // arrival crossbar of a remote reply; hop the mesh before descending
            assert_eq!(position.layer, top, "flit {} lost height", flit.id);
            assert_eq!(position.address, src_partition);
            assert_eq!(
                router.num_outputs(),
                hierarchy.ratio[top] + hierarchy.partitions() - 1,
                "crossbar {} output width",
                router.name()
            );
            return hierarchy.mesh_out_base(SubNet::Reply)
                + hierarchy.mesh_ordinal(src_partition, dest_partition);
        }
        assert_eq!(position.layer, cur_layer, "flit {} lost height", flit.id);
        hierarchy.sm_digit(flit.dest, cur_layer)
    }
}

/// One hop of a walked route: the router visited, the port the flit arrived on, the decision
/// taken there, and the terminal reached when the chosen channel ejects.
#[derive(Debug, Clone)]
pub struct RouteStep {
    pub router: RouterId,
    pub in_port: usize,
    pub hint: RouteHint,
    pub delivered: Option<usize>,
}

/// Walk one flit hop by hop through the built network, following the chosen output port along
/// the actual wiring. Diagnostics and tests use this to confirm that the routing function and
/// the builder agree on every port ordinal.
pub fn walk_route(net: &GpuNet, flit: &Flit, now: Cycle) -> Vec<RouteStep> {
    let hierarchy = net.hierarchy();
    let mut flit = flit.clone();
    if flit.vc.is_none() {
        let (vc_lo, _) = vc_range(hierarchy.num_vcs, flit.kind);
        flit.vc = Some(vc_lo);
    }
    flit.hops = 0;

    // requests enter at the source SM, replies at the L2 slice that served the request
    let (mut router, mut in_port) = net.injection_point(flit.src);

    let mut steps = Vec::new();
    for _ in 0..hierarchy.layers + 2 {
        let hints = route_hierarchical(hierarchy, net.router(router), &flit, in_port, false, now);
        let hint = hints[0];
        let out_port = hint.out_port.expect("non-injection hop chose a port");
        let out_channel = &net.router(router).output(out_port).flit;

        if let Some(node) = net.ejection_node(out_channel) {
            steps.push(RouteStep {
                router,
                in_port,
                hint,
                delivered: Some(node),
            });
            return steps;
        }

        steps.push(RouteStep {
            router,
            in_port,
            hint,
            delivered: None,
        });
        let (next_router, next_in) = net
            .channel_consumer(out_channel)
            .unwrap_or_else(|| panic!("channel {} has no consumer", out_channel.name()));
        router = next_router;
        in_port = next_in;
        flit.hops += 1;
    }
    panic!(
        "flit {} did not reach a terminal within {} hops",
        flit.id,
        hierarchy.layers + 2
    );
}

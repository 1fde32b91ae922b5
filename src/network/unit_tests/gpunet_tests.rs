use std::collections::HashMap;

use crate::network::config::NetworkConfig;
use crate::network::gpunet::GpuNet;
use crate::network::hierarchy::SubNet;
use crate::network::net::Network;
use crate::network::policy;

fn single_partition() -> GpuNet {
    GpuNet::new(&NetworkConfig {
        l: 2,
        sm: 8,
        l2slice: 8,
        units: vec![4, 2],
        speedups: vec![1, 2, 3],
        ..NetworkConfig::default()
    })
    .expect("config is balanced")
}

fn two_partitions() -> GpuNet {
    GpuNet::new(&NetworkConfig {
        l: 2,
        sm: 8,
        l2slice: 8,
        units: vec![2, 2],
        speedups: vec![1, 2, 2],
        inter_partition_speedup: 2,
        partition: true,
        ..NetworkConfig::default()
    })
    .expect("config is balanced")
}

#[test]
fn router_and_channel_totals() {
    let net = single_partition();
    let h = net.hierarchy();
    assert_eq!(net.num_routers(), 2 * h.units.iter().sum::<usize>());
    assert_eq!(net.num_routers(), 6);
    assert_eq!(net.num_channels(), 4);
    assert_eq!(net.num_terminals(), 16);

    let net = two_partitions();
    assert_eq!(net.num_routers(), 12);
    assert_eq!(net.num_channels(), 12);
}

#[test]
fn every_router_has_its_expected_port_widths() {
    for net in [single_partition(), two_partitions()] {
        let h = net.hierarchy();
        for id in 0..net.num_routers() {
            let router = net.router(id);
            let pos = router.position();
            let (expect_in, expect_out) = h.port_widths(pos.subnet, pos.layer);
            assert_eq!(router.num_inputs(), expect_in, "{} inputs", router.name());
            assert_eq!(router.num_outputs(), expect_out, "{} outputs", router.name());
        }
    }
}

#[test]
fn every_channel_is_referenced_exactly_twice() {
    for net in [single_partition(), two_partitions()] {
        let h = net.hierarchy();
        let mut as_input: HashMap<String, usize> = HashMap::new();
        let mut as_output: HashMap<String, usize> = HashMap::new();
        for id in 0..net.num_routers() {
            let router = net.router(id);
            for pair in router.inputs() {
                *as_input.entry(pair.flit.name().to_string()).or_default() += 1;
            }
            for pair in router.outputs() {
                *as_output.entry(pair.flit.name().to_string()).or_default() += 1;
            }
        }

        for id in 0..net.num_channels() {
            let name = net.channel(id).flit.name().to_string();
            assert_eq!(as_input.get(&name), Some(&1), "{name} consumers");
            assert_eq!(as_output.get(&name), Some(&1), "{name} producers");
        }
        for node in 0..h.nodes() {
            let inject = net.inject(node).flit.name().to_string();
            assert_eq!(as_input.get(&inject), Some(&1), "{inject} consumers");
            assert_eq!(as_output.get(&inject), None, "{inject} producers");
            let eject = net.eject(node).flit.name().to_string();
            assert_eq!(as_output.get(&eject), Some(&1), "{eject} producers");
            assert_eq!(as_input.get(&eject), None, "{eject} consumers");
        }
    }
}

#[test]
fn sm_terminals_attach_at_the_bottom_layer() {
    let net = two_partitions();
    let h = net.hierarchy();
    for sm in 0..h.nodes_sm {
        let request = net.router(h.router_id(0, sm / h.ratio[0], SubNet::Request));
        assert!(request
            .input(sm % h.ratio[0])
            .flit
            .same_endpoint(&net.inject(sm).flit));
        let reply = net.router(h.router_id(0, sm / h.ratio[0], SubNet::Reply));
        assert!(reply
            .output(sm % h.ratio[0])
            .flit
            .same_endpoint(&net.eject(sm).flit));
    }
}

#[test]
fn l2_terminals_attach_at_their_partition_crossbar() {
    let net = two_partitions();
    let h = net.hierarchy();
    let top = h.layers - 1;
    for node in h.nodes_sm..h.nodes() {
        let slice = node - h.nodes_sm;
        let partition = slice / h.l2_per_partition();
        let port = slice % h.l2_per_partition();
        let reply = net.router(h.router_id(top, partition, SubNet::Reply));
        assert!(reply.input(port).flit.same_endpoint(&net.inject(node).flit));
        let request = net.router(h.router_id(top, partition, SubNet::Request));
        assert!(request.output(port).flit.same_endpoint(&net.eject(node).flit));
    }
}

#[test]
fn inter_layer_channels_bind_child_to_parent() {
    let net = single_partition();
    let h = net.hierarchy();
    let cbase = h.channels_per_subnet();
    for layer in 1..h.layers {
        for below in 0..h.units[layer - 1] {
            let parent = below / h.ratio[layer];
            let port = below % h.ratio[layer];
            let up = &net.channel(h.offset[layer - 1] + below).flit;

            let lower = net.router(h.router_id(layer - 1, below, SubNet::Request));
            let upper = net.router(h.router_id(layer, parent, SubNet::Request));
            assert!(lower.output(0).flit.same_endpoint(up));
            assert!(upper.input(port).flit.same_endpoint(up));

            let down = &net.channel(cbase + h.offset[layer - 1] + below).flit;
            let lower = net.router(h.router_id(layer - 1, below, SubNet::Reply));
            let upper = net.router(h.router_id(layer, parent, SubNet::Reply));
            assert!(lower.input(0).flit.same_endpoint(down));
            assert!(upper.output(port).flit.same_endpoint(down));
        }
    }
}

#[test]
fn mesh_channels_connect_every_ordered_pair() {
    let net = two_partitions();
    let h = net.hierarchy();
    let top = h.layers - 1;
    let p = h.partitions();
    for subnet in [SubNet::Request, SubNet::Reply] {
        let cbase = match subnet {
            SubNet::Request => 0,
            SubNet::Reply => h.channels_per_subnet(),
        };
        for from in 0..p {
            for k in 0..p - 1 {
                let to = if k < from { k } else { k + 1 };
                let wire = &net.channel(cbase + h.offset[top] + from * (p - 1) + k).flit;

                let producer = net.router(h.router_id(top, from, subnet));
                assert!(producer
                    .output(h.mesh_out_base(subnet) + k)
                    .flit
                    .same_endpoint(wire));

                let consumer = net.router(h.router_id(top, to, subnet));
                let in_base = match subnet {
                    SubNet::Request => h.ratio[top],
                    SubNet::Reply => h.l2_per_partition(),
                };
                assert!(consumer
                    .input(in_base + h.mesh_ordinal(to, from))
                    .flit
                    .same_endpoint(wire));
            }
        }
    }
}

#[test]
fn channel_scalars_follow_the_wire_policy() {
    let net = two_partitions();
    let h = net.hierarchy();

    for node in 0..h.nodes() {
        assert_eq!(net.inject(node).flit.latency(), 1);
        assert_eq!(net.eject(node).flit.latency(), 1);
        let bandwidth = if node < h.nodes_sm { 1 } else { h.speedup[h.layers] };
        assert_eq!(net.inject(node).flit.bandwidth(), bandwidth);
        assert_eq!(net.eject(node).credit.bandwidth(), bandwidth);
    }

    let cbase = h.channels_per_subnet();
    for base in [0, cbase] {
        for below in 0..h.units[0] {
            let pair = net.channel(base + below);
            assert_eq!(pair.flit.latency(), policy::wire_latency(1, false));
            assert_eq!(pair.flit.bandwidth(), h.speedup[1]);
        }
        for slot in 0..h.mesh_channels() {
            let pair = net.channel(base + h.offset[h.layers - 1] + slot);
            assert_eq!(pair.flit.latency(), policy::wire_latency(h.layers - 1, true));
            assert_eq!(pair.flit.bandwidth(), h.inter_partition_speedup);
            assert_eq!(pair.credit.latency(), pair.flit.latency());
        }
    }
}

#[test]
fn single_layer_crossbar_touches_terminals_directly() {
    let net = GpuNet::new(&NetworkConfig {
        l: 1,
        sm: 4,
        l2slice: 4,
        units: vec![2],
        partition: true,
        ..NetworkConfig::default()
    })
    .expect("config is balanced");
    let h = net.hierarchy();
    assert_eq!(h.partitions(), 2);
    assert_eq!(net.num_routers(), 4);
    assert_eq!(net.num_channels(), 4);

    let request = net.router(h.router_id(0, 0, SubNet::Request));
    // two SM injects plus one mesh input; two L2 ejects plus one mesh output
    assert_eq!(request.num_inputs(), 3);
    assert_eq!(request.num_outputs(), 3);
    assert!(request.input(0).flit.same_endpoint(&net.inject(0).flit));
    assert!(request.output(0).flit.same_endpoint(&net.eject(4).flit));
}

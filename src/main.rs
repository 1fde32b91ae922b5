use std::fs;
use std::path::PathBuf;

use clap::Parser;
use gpunet::network::config::NetworkConfig;
use gpunet::network::flit::{Flit, FlitKind};
use gpunet::network::net::{self, Network};
use gpunet::network::routing::walk_route;
use gpunet::sim::config::{Config, SimConfig};
use gpunet::sim::top::GpunetTop;

#[derive(Parser)]
#[command(version, about)]
struct GpunetArgs {
    config_path: Option<PathBuf>,

    #[arg(long)]
    sm: Option<usize>,
    #[arg(long)]
    l2slice: Option<usize>,
    #[arg(long)]
    num_vcs: Option<usize>,

    /// Walk one flit from SRC to DEST and print the routing decision at every hop.
    #[arg(long, num_args = 2, value_names = ["SRC", "DEST"])]
    walk: Option<Vec<usize>>,
    /// Flit kind for --walk: read_request, read_reply, write_request or write_reply.
    #[arg(long, default_value = "read_request")]
    kind: String,
}

pub fn main() {
    let argv = GpunetArgs::parse();

    let doc: toml::Value = match &argv.config_path {
        Some(path) => fs::read_to_string(path)
            .expect("cannot read config file")
            .parse()
            .expect("cannot parse config file"),
        None => toml::Value::Table(Default::default()),
    };

    let sim_config = SimConfig::from_section(doc.get("sim"));
    env_logger::Builder::new()
        .parse_filters(&sim_config.log_level)
        .parse_default_env()
        .init();

    let mut net_config = NetworkConfig::from_section(doc.get("network"));
    net_config.sm = argv.sm.unwrap_or(net_config.sm);
    net_config.l2slice = argv.l2slice.unwrap_or(net_config.l2slice);
    net_config.num_vcs = argv.num_vcs.unwrap_or(net_config.num_vcs);

    let top =
        GpunetTop::new(&net_config).unwrap_or_else(|err| panic!("cannot build network: {err}"));
    net::log_summary(&top.net);

    if let Some(endpoints) = &argv.walk {
        let kind = FlitKind::parse(&argv.kind)
            .unwrap_or_else(|| panic!("unknown flit kind '{}'", argv.kind));
        let flit = Flit::new(0, kind, endpoints[0], endpoints[1]).watched();
        for step in walk_route(&top.net, &flit, 0) {
            let router = top.net.router(step.router);
            let out = step
                .hint
                .out_port
                .map_or("-".to_string(), |port| port.to_string());
            match step.delivered {
                Some(node) => println!(
                    "{}: in {} -> out {} (eject to terminal {})",
                    router.name(),
                    step.in_port,
                    out,
                    node
                ),
                None => println!(
                    "{}: in {} -> out {} vc [{}, {}]",
                    router.name(),
                    step.in_port,
                    out,
                    step.hint.vc_lo,
                    step.hint.vc_hi
                ),
            }
        }
    }
}

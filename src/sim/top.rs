use crate::network::config::NetworkConfig;
use crate::network::flit::Flit;
use crate::network::gpunet::GpuNet;
use crate::network::net::{self, Network, NetworkError};
use crate::network::routing::{RouteHint, RoutingRegistry};
use crate::network::types::{Cycle, RouterId};

/// Assembles the built network with the routing-function registry. The per-cycle router model
/// calls [`GpunetTop::route_flit`] once per arriving flit.
pub struct GpunetTop {
    pub net: GpuNet,
    registry: RoutingRegistry,
}

impl GpunetTop {
    pub fn new(config: &NetworkConfig) -> Result<GpunetTop, NetworkError> {
        let net = net::build(config)?;
        Ok(GpunetTop {
            net,
            registry: RoutingRegistry::with_builtins(),
        })
    }

    pub fn route_flit(
        &self,
        now: Cycle,
        router: RouterId,
        flit: &Flit,
        in_port: usize,
        inject: bool,
    ) -> Vec<RouteHint> {
        let func = self
            .registry
            .lookup(self.net.routing_function())
            .expect("network advertises an unregistered routing function");
        func(self.net.hierarchy(), self.net.router(router), flit, in_port, inject, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::flit::FlitKind;

    #[test]
    fn top_dispatches_through_the_registry() {
        let top = GpunetTop::new(&NetworkConfig::default()).unwrap();
        let flit = Flit::new(0, FlitKind::ReadRequest, 0, 8);
        let (router, in_port) = top.net.injection_point(0);
        let hints = top.route_flit(0, router, &flit, in_port, true);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].out_port, None);
    }
}

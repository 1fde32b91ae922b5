use crate::network::channel::{ChannelPair, ChannelRef};
use crate::network::hierarchy::RouterPosition;
use crate::network::net::TopologyError;
use crate::network::types::RouterId;

/// Shell of one router: its place in the hierarchy and the channels bound to its ports. The
/// per-cycle microarchitecture (buffers, allocators, crossbar) lives outside this crate; the
/// builder only needs the port table, and the routing function only reads it for assertions.
#[derive(Debug)]
pub struct Router {
    id: RouterId,
    name: String,
    position: RouterPosition,
    expect_inputs: usize,
    expect_outputs: usize,
    inputs: Vec<ChannelPair>,
    outputs: Vec<ChannelPair>,
}

impl Router {
    pub(crate) fn new(
        id: RouterId,
        name: impl Into<String>,
        position: RouterPosition,
        expect_inputs: usize,
        expect_outputs: usize,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            expect_inputs,
            expect_outputs,
            inputs: Vec::with_capacity(expect_inputs),
            outputs: Vec::with_capacity(expect_outputs),
        }
    }

    pub fn id(&self) -> RouterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> RouterPosition {
        self.position
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Bind a flit channel and its paired credit channel as the next input port. The ordinal of
    /// the call is the port number.
    pub fn add_input_channel(&mut self, flit: ChannelRef, credit: ChannelRef) -> usize {
        self.inputs.push(ChannelPair { flit, credit });
        self.inputs.len() - 1
    }

    /// Bind a flit channel and its paired credit channel as the next output port.
    pub fn add_output_channel(&mut self, flit: ChannelRef, credit: ChannelRef) -> usize {
        self.outputs.push(ChannelPair { flit, credit });
        self.outputs.len() - 1
    }

    pub fn input(&self, port: usize) -> &ChannelPair {
        &self.inputs[port]
    }

    pub fn output(&self, port: usize) -> &ChannelPair {
        &self.outputs[port]
    }

    pub fn inputs(&self) -> &[ChannelPair] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ChannelPair] {
        &self.outputs
    }

    pub(crate) fn check_port_widths(&self) -> Result<(), TopologyError> {
        if self.inputs.len() != self.expect_inputs {
            return Err(TopologyError::PortWidth {
                router: self.name.clone(),
                direction: "input",
                expected: self.expect_inputs,
                actual: self.inputs.len(),
            });
        }
        if self.outputs.len() != self.expect_outputs {
            return Err(TopologyError::PortWidth {
                router: self.name.clone(),
                direction: "output",
                expected: self.expect_outputs,
                actual: self.outputs.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::channel::ChannelPair;
    use crate::network::hierarchy::SubNet;

    fn test_router(expect_inputs: usize, expect_outputs: usize) -> Router {
        Router::new(
            0,
            "router_req_0_0",
            RouterPosition {
                subnet: SubNet::Request,
                layer: 0,
                address: 0,
            },
            expect_inputs,
            expect_outputs,
        )
    }

    #[test]
    fn attach_ordinal_is_the_port_number() {
        let mut router = test_router(2, 1);
        let a = ChannelPair::new(0, "chan_0");
        let b = ChannelPair::new(1, "chan_1");
        assert_eq!(router.add_input_channel(a.flit.clone(), a.credit.clone()), 0);
        assert_eq!(router.add_input_channel(b.flit.clone(), b.credit.clone()), 1);
        assert!(router.input(0).flit.same_endpoint(&a.flit));
        assert!(router.input(1).flit.same_endpoint(&b.flit));
    }

    #[test]
    fn width_check_flags_missing_ports() {
        let mut router = test_router(1, 1);
        let pair = ChannelPair::new(0, "chan_0");
        router.add_input_channel(pair.flit.clone(), pair.credit.clone());
        let err = router.check_port_widths().unwrap_err();
        assert!(err.to_string().contains("output"));

        router.add_output_channel(pair.flit.clone(), pair.credit.clone());
        assert!(router.check_port_widths().is_ok());
    }
}

use std::sync::{Arc, RwLock};

use crate::network::types::{ChannelId, Cycle};

#[derive(Debug)]
struct ChannelState {
    latency: Cycle,
    bandwidth: u32,
}

/// Shared handle to one uni-directional wire. Clones refer to the same endpoint; that is how the
/// producer router and the consumer router observe a single channel. The transport itself lives
/// outside this crate, so the endpoint only carries the two scalars the builder configures.
#[derive(Debug, Clone)]
pub struct ChannelRef {
    id: ChannelId,
    name: Arc<str>,
    state: Arc<RwLock<ChannelState>>,
}

impl ChannelRef {
    pub fn new(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into().into(),
            state: Arc::new(RwLock::new(ChannelState {
                latency: 1,
                bandwidth: 1,
            })),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latency(&self) -> Cycle {
        self.state.read().expect("channel lock poisoned").latency
    }

    pub fn bandwidth(&self) -> u32 {
        self.state.read().expect("channel lock poisoned").bandwidth
    }

    pub fn set_latency(&self, latency: Cycle) {
        assert!(latency > 0, "channel {} latency must be positive", self.name);
        self.state.write().expect("channel lock poisoned").latency = latency;
    }

    pub fn set_bandwidth(&self, bandwidth: u32) {
        assert!(
            bandwidth > 0,
            "channel {} bandwidth must be positive",
            self.name
        );
        self.state.write().expect("channel lock poisoned").bandwidth = bandwidth;
    }

    /// Whether two handles are views of the same wire.
    pub fn same_endpoint(&self, other: &ChannelRef) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// A flit channel and the credit channel running back along it. The two are always allocated and
/// configured together.
#[derive(Debug, Clone)]
pub struct ChannelPair {
    pub flit: ChannelRef,
    pub credit: ChannelRef,
}

impl ChannelPair {
    pub fn new(id: ChannelId, name: impl Into<String>) -> Self {
        let name = name.into();
        let credit_name = format!("{name}_cred");
        Self {
            flit: ChannelRef::new(id, name),
            credit: ChannelRef::new(id, credit_name),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.flit.id()
    }

    pub fn set_latency(&self, latency: Cycle) {
        self.flit.set_latency(latency);
        self.credit.set_latency(latency);
    }

    pub fn set_bandwidth(&self, bandwidth: u32) {
        self.flit.set_bandwidth(bandwidth);
        self.credit.set_bandwidth(bandwidth);
    }
}

pub type Cycle = u64;

pub type RouterId = usize;
pub type ChannelId = usize;

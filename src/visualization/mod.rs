pub mod live;

pub use live::{poll_interval, ChannelObserver, LiveMonitor};

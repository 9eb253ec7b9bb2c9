//! Local address discovery.
//!
//! Purely advisory: the addresses found here are shown to the operator so
//! they can tell the sending side where to connect. Nothing in the wire
//! protocol depends on them.

pub mod net;

pub use net::{PROBE_ADDR, get_hostname, get_local_ips, outbound_ip};

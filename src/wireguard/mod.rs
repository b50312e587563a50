//! WireGuard interface building blocks
//!
//! Names, configuration documents and their on-disk store, live state
//! probing and single-peer mutation. All host interaction goes through the
//! external `ip`, `wg` and `wg-quick` tools via a [`CommandExecutor`].
//!
//! [`CommandExecutor`]: crate::executor::CommandExecutor

mod interface;
mod peer;
mod probe;
mod store;

pub use interface::{count_peer_sections, InterfaceConfig, InterfaceName};
pub use peer::{PeerManager, PeerSpec};
pub use probe::{InterfaceSummary, RuntimeStatus, StateProbe};
pub use store::{derive_peers_only, ConfigStore};

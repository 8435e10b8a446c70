// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! The builder façade: a scoped session that owns one node's [`Builder`].

use std::fmt::Debug;

use log::warn;
use rustc_hash::FxHashMap;

use crate::builder::Builder;
use crate::config::LogConfig;
use crate::epr::EPRSocket;
use crate::error::Result;
use crate::subroutine::PreSubroutine;

/// Resolves a peer's node id to its human-readable name, used to back
/// `remote_entangled_node` on qubit handles. A capability rather than a
/// concrete type so a live deployment can back it with its own directory
/// service without this crate depending on it.
pub trait NetworkInfo: Debug {
    fn node_name(&self, node_id: u32) -> Option<&str>;
}

/// A [`NetworkInfo`] backed by a fixed `node_id -> node_name` table, for tests
/// and for [`DebugConnection`], which has no live runtime to query.
#[derive(Debug, Clone, Default)]
pub struct StaticNetworkInfo {
    node_ids: FxHashMap<u32, String>,
}

impl StaticNetworkInfo {
    #[must_use]
    pub fn new(node_ids: impl IntoIterator<Item = (u32, String)>) -> Self {
        Self {
            node_ids: node_ids.into_iter().collect(),
        }
    }
}

impl NetworkInfo for StaticNetworkInfo {
    fn node_name(&self, node_id: u32) -> Option<&str> {
        self.node_ids.get(&node_id).map(String::as_str)
    }
}

/// A scoped builder session for one node, requiring no live runtime: it only
/// retains the pending pre-subroutine and hands it off via
/// [`Self::pop_pending_subroutine`] or [`Self::close`].
#[derive(Debug)]
pub struct DebugConnection {
    app_name: String,
    builder: Builder,
    network_info: StaticNetworkInfo,
    epr_sockets: Vec<EPRSocket>,
    log_config: LogConfig,
    closed: bool,
}

impl DebugConnection {
    #[must_use]
    pub fn new(app_name: impl Into<String>, network_info: StaticNetworkInfo, epr_sockets: Vec<EPRSocket>, log_config: LogConfig) -> Self {
        Self {
            app_name: app_name.into(),
            builder: Builder::new(),
            network_info,
            epr_sockets,
            log_config,
            closed: false,
        }
    }

    /// Opens a session with no EPR sockets and default logging, for the
    /// common case of a single-node test fixture.
    #[must_use]
    pub fn with_nodes(app_name: impl Into<String>, node_ids: impl IntoIterator<Item = (u32, String)>) -> Self {
        Self::new(app_name, StaticNetworkInfo::new(node_ids), Vec::new(), LogConfig::default())
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        self.log_config
    }

    #[must_use]
    pub fn epr_sockets(&self) -> &[EPRSocket] {
        &self.epr_sockets
    }

    #[must_use]
    pub fn node_name(&self, node_id: u32) -> Option<&str> {
        self.network_info.node_name(node_id)
    }

    pub fn builder(&mut self) -> &mut Builder {
        &mut self.builder
    }

    /// Pops the pending pre-subroutine without closing the session: a new
    /// subroutine can still be built afterwards. Matches the teacher's
    /// explicit-flush pattern rather than an implicit drop-time one, so tests
    /// can inspect mid-session state.
    pub fn pop_pending_subroutine(&mut self) -> Result<PreSubroutine> {
        self.builder.pop_pending_subroutine()
    }

    /// Closes the session, flushing the final pending pre-subroutine. Logs a
    /// warning (rather than failing) if qubits were left active, per the
    /// relaxed leak-diagnostic policy.
    pub fn close(mut self) -> Result<PreSubroutine> {
        self.warn_on_leaked_qubits();
        self.closed = true;
        self.builder.pop_pending_subroutine()
    }

    fn warn_on_leaked_qubits(&self) {
        let leaked = self.builder.active_qubits();
        if !leaked.is_empty() {
            warn!(
                "session '{}' closing with {} qubit(s) still active: {:?}",
                self.app_name,
                leaked.len(),
                leaked
            );
        }
    }
}

impl Drop for DebugConnection {
    fn drop(&mut self) {
        if !self.closed {
            self.warn_on_leaked_qubits();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_flushes_pending_subroutine() {
        let mut conn = DebugConnection::with_nodes("alice", [(0, "alice".into()), (1, "bob".into())]);
        let id = conn.builder().new_qubit_id().unwrap();
        conn.builder().add_new_qubit_commands(id).unwrap();
        conn.builder().add_qfree_commands(id).unwrap();
        let sub = conn.close().unwrap();
        assert!(sub.contains(crate::ir::Opcode::QAlloc));
    }

    #[test]
    fn static_network_info_resolves_known_nodes() {
        let conn = DebugConnection::with_nodes("alice", [(0, "alice".into()), (1, "bob".into())]);
        assert_eq!(conn.node_name(1), Some("bob"));
        assert_eq!(conn.node_name(2), None);
    }
}

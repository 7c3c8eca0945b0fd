//! Connection handle and URI construction.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HypervisorError, Result};
use crate::transport::Transport;

/// SSH hop for remote connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshTarget {
    /// Remote user
    pub user: String,
    /// Remote host
    pub host: String,
}

/// Builder for the hypervisor connection URI.
///
/// Renders `<scheme>[+ssh]:///[<user>@<host>/]<daemon_mode>`, e.g.
/// `qemu+ssh:///admin@host1/system` or `qemu:///system`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionUri {
    /// Hypervisor scheme (e.g. "qemu", "xen")
    pub scheme: String,
    /// SSH hop, when connecting to a remote node
    pub ssh: Option<SshTarget>,
    /// Daemon mode segment (e.g. "system", "session")
    pub daemon_mode: String,
}

impl ConnectionUri {
    /// Local connection: `<scheme>:///<daemon_mode>`.
    pub fn local(scheme: impl Into<String>, daemon_mode: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            ssh: None,
            daemon_mode: daemon_mode.into(),
        }
    }

    /// Remote connection over SSH: `<scheme>+ssh:///<user>@<host>/<daemon_mode>`.
    pub fn over_ssh(
        scheme: impl Into<String>,
        user: impl Into<String>,
        host: impl Into<String>,
        daemon_mode: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            ssh: Some(SshTarget {
                user: user.into(),
                host: host.into(),
            }),
            daemon_mode: daemon_mode.into(),
        }
    }
}

impl fmt::Display for ConnectionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ssh {
            Some(ssh) => write!(
                f,
                "{}+ssh:///{}@{}/{}",
                self.scheme, ssh.user, ssh.host, self.daemon_mode
            ),
            None => write!(f, "{}:///{}", self.scheme, self.daemon_mode),
        }
    }
}

/// An established session to the hypervisor.
///
/// Owned by the orchestrator and shared read-only by every command executed
/// during the session's lifetime. Dropping the handle ends the session.
pub struct Connection {
    uri: ConnectionUri,
    transport: Arc<dyn Transport>,
}

impl Connection {
    /// Open a connection over the given transport.
    ///
    /// Fails with [`HypervisorError::NoConnection`] when the transport does
    /// not report a live session.
    pub async fn open(uri: ConnectionUri, transport: Arc<dyn Transport>) -> Result<Self> {
        if !transport.is_alive().await {
            return Err(HypervisorError::NoConnection);
        }

        info!(uri = %uri, "Hypervisor connection established");

        Ok(Self { uri, transport })
    }

    /// The URI this session was opened against.
    pub fn uri(&self) -> &ConnectionUri {
        &self.uri
    }

    /// The transport carrying this session.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_uri_renders_scheme_and_mode() {
        let uri = ConnectionUri::local("qemu", "system");
        assert_eq!(uri.to_string(), "qemu:///system");
    }

    #[test]
    fn ssh_uri_renders_user_and_host() {
        let uri = ConnectionUri::over_ssh("qemu", "admin", "host1", "system");
        assert_eq!(uri.to_string(), "qemu+ssh:///admin@host1/system");
    }

    #[test]
    fn xen_session_uri() {
        let uri = ConnectionUri::local("xen", "session");
        assert_eq!(uri.to_string(), "xen:///session");
    }
}

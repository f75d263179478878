//! Inbound request context handed to every core operation.

use crate::core::audit::resolve_client_ip;
use crate::entities::user;

/// Who is calling and from where.
///
/// Built by whatever surface receives the request; the core never inspects
/// transport details beyond the two address hints kept here.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    user: Option<user::Model>,
    forwarded_for: Option<String>,
    remote_addr: Option<String>,
}

impl RequestContext {
    /// Context for an authenticated user.
    #[must_use]
    pub fn authenticated(user: user::Model) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    /// Context without an authenticated user.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Sets the raw forwarded-for header value (comma-separated hop list).
    #[must_use]
    pub fn with_forwarded_for(mut self, header: impl Into<String>) -> Self {
        self.forwarded_for = Some(header.into());
        self
    }

    /// Sets the address of the directly connected peer.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// The authenticated user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&user::Model> {
        self.user.as_ref()
    }

    /// Client address recorded on audit entries.
    #[must_use]
    pub fn client_ip(&self) -> Option<String> {
        resolve_client_ip(self.forwarded_for.as_deref(), self.remote_addr.as_deref())
    }
}

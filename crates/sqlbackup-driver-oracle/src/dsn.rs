//! `user/password@connect_string` credential parsing

use sqlbackup_core::{Result, SqlBackupError};
use std::time::Duration;

/// Parsed Oracle credentials
#[derive(Clone, PartialEq, Eq)]
pub struct OracleConnectOptions {
    pub username: String,
    pub password: String,
    /// Easy Connect string or TNS alias; empty means the client default
    pub connect_string: String,
    /// Server round-trip limit applied to every call on the session
    pub call_timeout: Option<Duration>,
}

impl OracleConnectOptions {
    /// Parse `user/password@connect_string` (the `@connect_string` part is optional).
    ///
    /// The connect string is split off at the last `@`, so passwords may
    /// contain `@`.
    pub fn parse(dsn: &str) -> Result<Self> {
        let dsn = dsn.trim();
        let (credentials, connect_string) = match dsn.rsplit_once('@') {
            Some((credentials, connect)) => (credentials, connect),
            None => (dsn, ""),
        };
        let (username, password) = credentials.split_once('/').ok_or_else(|| {
            SqlBackupError::Credentials("expected user/password@connect_string".into())
        })?;
        if username.is_empty() {
            return Err(SqlBackupError::Credentials("username is empty".into()));
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
            connect_string: connect_string.to_string(),
            call_timeout: None,
        })
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}

impl std::fmt::Debug for OracleConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConnectOptions")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_string", &self.connect_string)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

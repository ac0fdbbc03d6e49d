use std::fmt;

use config::{Endpoint, MysqlConfig};
use serde::{Deserialize, Serialize};

/// Which server a connection talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Replica (slave) endpoint
    Read,
    /// Primary (master) endpoint
    Write,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Read, Role::Write];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Read => "read",
            Role::Write => "write",
        }
    }

    pub fn endpoint(&self, config: &MysqlConfig) -> Endpoint {
        match self {
            Role::Read => config.read_endpoint(),
            Role::Write => config.write_endpoint(),
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Role::Read => 0,
            Role::Write => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Identity database access
//!
//! Lookups go through [`UserDatabase`] so the resolver and the executor can
//! be exercised against an in-memory table.

use declarative::{Error, Result};
use nix::unistd::{Uid, User};
use std::path::PathBuf;

/// One entry of the identity database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

impl From<User> for Account {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home: user.dir,
        }
    }
}

/// Read access to the identity database
pub trait UserDatabase {
    /// Look up an account by name. `Ok(None)` means no such user.
    fn by_name(&self, name: &str) -> Result<Option<Account>>;

    /// Look up an account by UID. `Ok(None)` means no such user.
    fn by_uid(&self, uid: u32) -> Result<Option<Account>>;

    /// Look up an account by name, failing when it does not exist
    fn require(&self, name: &str) -> Result<Account> {
        self.by_name(name)?
            .ok_or_else(|| Error::precondition(format!("user '{name}' does not exist")))
    }
}

/// The host's identity database (passwd via NSS)
pub struct SystemUsers;

impl UserDatabase for SystemUsers {
    fn by_name(&self, name: &str) -> Result<Option<Account>> {
        User::from_name(name)
            .map(|u| u.map(Account::from))
            .map_err(|e| Error::state(format!("user:{name}"), e.to_string()))
    }

    fn by_uid(&self, uid: u32) -> Result<Option<Account>> {
        User::from_uid(Uid::from_raw(uid))
            .map(|u| u.map(Account::from))
            .map_err(|e| Error::state(format!("uid:{uid}"), e.to_string()))
    }
}

/// In-memory identity database
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct StaticUsers {
    accounts: Vec<Account>,
}

#[cfg(test)]
impl StaticUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account with home `/home/<name>`
    pub fn with(mut self, name: &str, uid: u32, gid: u32) -> Self {
        self.accounts.push(Account {
            name: name.to_string(),
            uid,
            gid,
            home: PathBuf::from("/home").join(name),
        });
        self
    }
}

#[cfg(test)]
impl UserDatabase for StaticUsers {
    fn by_name(&self, name: &str) -> Result<Option<Account>> {
        Ok(self.accounts.iter().find(|a| a.name == name).cloned())
    }

    fn by_uid(&self, uid: u32) -> Result<Option<Account>> {
        Ok(self.accounts.iter().find(|a| a.uid == uid).cloned())
    }
}

//! Command descriptions handed to a [`CommandRunner`](crate::CommandRunner)

use std::fmt;

/// Identity an external command runs under
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunAs {
    /// The identity of the current (root) process
    Root,
    /// Impersonate the named user: credentials are dropped before exec
    User(String),
}

/// A secret value that never shows up in logs or command lines
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw value
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub run_as: RunAs,
    /// Extra environment variables, applied on top of the inherited ones
    pub env: Vec<(String, String)>,
    /// Written to the child's stdin, then the pipe is closed
    pub stdin: Option<Secret>,
}

impl CommandSpec {
    /// A command run as root
    pub fn root<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            run_as: RunAs::Root,
            env: Vec::new(),
            stdin: None,
        }
    }

    /// A command run as the given user
    pub fn user<I, S>(username: &str, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            run_as: RunAs::User(username.to_string()),
            ..Self::root(program, args)
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_stdin(mut self, secret: Secret) -> Self {
        self.stdin = Some(secret);
        self
    }

    /// Program plus arguments, space separated (stdin is never rendered)
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.run_as {
            RunAs::Root => write!(f, "{}", self.command_line()),
            RunAs::User(user) => write!(f, "{} (as {user})", self.command_line()),
        }
    }
}

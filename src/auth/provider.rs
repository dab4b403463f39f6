//! Credential resolution chain
//!
//! Providers are consulted in order: explicit values, `~/.netrc`,
//! `SAS_USERNAME`/`SAS_PASSWORD`, then an interactive prompt when allowed.
//! Public releases need no credentials at all.

use std::env;
use std::path::PathBuf;

use tracing::debug;

use crate::constants::env as env_constants;
use crate::errors::{AuthError, AuthResult};

use super::credentials::{prompt_credentials, Credentials};
use super::netrc;

/// Source of credentials for a net location
pub trait CredentialProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Credentials for `netloc`, `None` if this provider has none
    fn lookup(&self, netloc: &str) -> AuthResult<Option<Credentials>>;
}

/// Credentials supplied by the caller
#[derive(Debug, Clone)]
pub struct StaticProvider(pub Credentials);

impl CredentialProvider for StaticProvider {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn lookup(&self, _netloc: &str) -> AuthResult<Option<Credentials>> {
        Ok(Some(self.0.clone()).filter(Credentials::is_ready))
    }
}

/// Entries of a netrc file
#[derive(Debug, Clone)]
pub struct NetrcProvider {
    path: PathBuf,
}

impl NetrcProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.netrc`, if a home directory is known
    pub fn user_default() -> Option<Self> {
        netrc::default_netrc_path().map(Self::new)
    }
}

impl CredentialProvider for NetrcProvider {
    fn name(&self) -> &'static str {
        "netrc"
    }

    fn lookup(&self, netloc: &str) -> AuthResult<Option<Credentials>> {
        netrc::lookup(&self.path, netloc)
    }
}

/// `SAS_USERNAME` and `SAS_PASSWORD` from the process environment
#[derive(Debug, Clone, Default)]
pub struct EnvProvider;

impl CredentialProvider for EnvProvider {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn lookup(&self, _netloc: &str) -> AuthResult<Option<Credentials>> {
        match (
            env::var(env_constants::USERNAME),
            env::var(env_constants::PASSWORD),
        ) {
            (Ok(username), Ok(password)) => {
                Ok(Some(Credentials::new(username, password)).filter(Credentials::is_ready))
            }
            _ => Ok(None),
        }
    }
}

/// Interactive terminal prompt
#[derive(Debug, Clone, Default)]
pub struct PromptProvider;

impl CredentialProvider for PromptProvider {
    fn name(&self) -> &'static str {
        "prompt"
    }

    fn lookup(&self, netloc: &str) -> AuthResult<Option<Credentials>> {
        println!("Credentials required for {}", netloc);
        prompt_credentials().map(Some)
    }
}

/// Ordered list of providers
#[derive(Default)]
pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl std::fmt::Debug for CredentialChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard order: explicit, netrc, environment, then prompt if `inquire`
    pub fn standard(explicit: Option<Credentials>, inquire: bool) -> Self {
        let mut chain = Self::new();
        if let Some(credentials) = explicit {
            chain = chain.with(StaticProvider(credentials));
        }
        if let Some(provider) = NetrcProvider::user_default() {
            chain = chain.with(provider);
        }
        chain = chain.with(EnvProvider);
        if inquire {
            chain = chain.with(PromptProvider);
        }
        chain
    }

    pub fn with(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// First credentials any provider has for `netloc`
    ///
    /// Public access resolves to `None` without consulting providers.
    pub fn resolve(&self, netloc: &str, public: bool) -> AuthResult<Option<Credentials>> {
        if public {
            return Ok(None);
        }
        for provider in &self.providers {
            if let Some(credentials) = provider.lookup(netloc)? {
                debug!(
                    "Authentication for {} set for user {} from {}",
                    netloc,
                    credentials.username,
                    provider.name()
                );
                return Ok(Some(credentials));
            }
        }
        Err(AuthError::MissingCredentials {
            netloc: netloc.to_string(),
        })
    }
}

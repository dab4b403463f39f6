//! Authentication for the SAS
//!
//! Proprietary releases need a username and password, resolved through a
//! [`CredentialChain`]. Public (`DR<n>`) releases need none.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sas_sync::auth::CredentialChain;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let chain = CredentialChain::standard(None, true);
//! if let Some(credentials) = chain.resolve("data.sdss.org", false)? {
//!     println!("Using account {}", credentials.username);
//! }
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod netrc;
pub mod provider;

pub use credentials::{
    get_auth_status, is_valid_username, prompt_credentials, save_credentials, AuthStatus,
    Credentials,
};
pub use provider::{
    CredentialChain, CredentialProvider, EnvProvider, NetrcProvider, PromptProvider,
    StaticProvider,
};

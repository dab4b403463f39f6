//! SAS credentials: storage, prompting and status
//!
//! Credentials can live in `~/.netrc`, in `SAS_USERNAME`/`SAS_PASSWORD`
//! (optionally loaded from a `.env` file) or be entered interactively.

use std::env;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::constants::env as env_constants;
use crate::errors::{AuthError, AuthResult};

/// Default user offered at the interactive prompt
pub const DEFAULT_USERNAME: &str = "sdss";

const MIN_USERNAME_LENGTH: usize = 2;
const MAX_USERNAME_LENGTH: usize = 64;

/// Username and password for one net location
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Both parts non-empty
    pub fn is_ready(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Authentication status information
#[derive(Debug, Clone)]
pub struct AuthStatus {
    /// Net location the status refers to
    pub netloc: String,
    /// Whether the username environment variable is set
    pub username_set: bool,
    /// Whether the password environment variable is set
    pub password_set: bool,
    /// Whether `~/.netrc` has an entry for the net location
    pub netrc_entry: bool,
    /// Whether a .env file exists in the current directory
    pub dotenv_file_exists: bool,
}

impl AuthStatus {
    /// Check if credentials are available without prompting
    pub fn has_credentials(&self) -> bool {
        (self.username_set && self.password_set) || self.netrc_entry
    }

    /// Get descriptive status message for display
    pub fn status_message(&self) -> String {
        match (self.netrc_entry, self.username_set && self.password_set) {
            (true, _) => format!("Credentials for {} found in ~/.netrc", self.netloc),
            (false, true) => "Credentials configured in environment".to_string(),
            (false, false) => {
                "Missing credentials - run 'auth setup' or add a ~/.netrc entry".to_string()
            }
        }
    }
}

/// Check current authentication status for `netloc`
pub fn get_auth_status(netloc: &str) -> AuthStatus {
    let netrc_entry = super::netrc::default_netrc_path()
        .and_then(|path| super::netrc::lookup(&path, netloc).ok().flatten())
        .is_some();
    AuthStatus {
        netloc: netloc.to_string(),
        username_set: env::var(env_constants::USERNAME).is_ok(),
        password_set: env::var(env_constants::PASSWORD).is_ok(),
        netrc_entry,
        dotenv_file_exists: Path::new(".env").exists(),
    }
}

/// Prompt user for credentials interactively
pub fn prompt_credentials() -> AuthResult<Credentials> {
    print!("user [{}]: ", DEFAULT_USERNAME);
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = match username.trim() {
        "" => DEFAULT_USERNAME.to_string(),
        name => name.to_string(),
    };

    if !is_valid_username(&username) {
        return Err(AuthError::InvalidUsername {
            reason: "Username should be alphanumeric with optional dots, hyphens, or underscores"
                .to_string(),
        });
    }

    let password = rpassword::prompt_password("password: ")?;
    if password.is_empty() {
        return Err(AuthError::InvalidUsername {
            reason: "Password cannot be empty".to_string(),
        });
    }

    Ok(Credentials::new(username, password))
}

/// Validate username format
pub fn is_valid_username(username: &str) -> bool {
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return false;
    }
    username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_')
}

/// Save credentials to a .env file with owner-only permissions
///
/// Existing `SAS_USERNAME`/`SAS_PASSWORD` lines are replaced, other lines kept.
pub fn save_credentials(env_path: &Path, credentials: &Credentials) -> AuthResult<()> {
    let mut lines = Vec::new();
    let mut username_found = false;
    let mut password_found = false;
    let username_line = format!("{}={}", env_constants::USERNAME, credentials.username);
    let password_line = format!("{}={}", env_constants::PASSWORD, credentials.password());

    if env_path.exists() {
        let reader = BufReader::new(File::open(env_path)?);
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.starts_with(&format!("{}=", env_constants::USERNAME)) {
                lines.push(username_line.clone());
                username_found = true;
            } else if trimmed.starts_with(&format!("{}=", env_constants::PASSWORD)) {
                lines.push(password_line.clone());
                password_found = true;
            } else {
                lines.push(line);
            }
        }
    }
    if !username_found {
        lines.push(username_line);
    }
    if !password_found {
        lines.push(password_line);
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(crate::constants::files::PRIVATE_FILE_PERMISSIONS);
    }
    let mut file = options.open(env_path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(crate::constants::files::PRIVATE_FILE_PERMISSIONS);
        file.set_permissions(perms)?;
    }
    Ok(())
}

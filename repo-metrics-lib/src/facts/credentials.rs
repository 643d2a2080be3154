use crate::Result;
use compact_str::CompactString;
use core::fmt::{Debug, Display, Formatter};
use ohno::bail;

/// Access token and repository coordinates, fixed for the lifetime of the process.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
    owner: CompactString,
    repo: CompactString,
}

impl Credentials {
    pub fn new(token: impl Into<String>, owner: &str, repo: &str) -> Result<Self> {
        let token = token.into();

        if token.trim().is_empty() {
            bail!("an access token is required (set GITHUB_TOKEN or pass --token)");
        }

        check_component("owner", "GITHUB_OWNER", owner)?;
        check_component("repository", "GITHUB_REPO", repo)?;

        Ok(Self {
            token,
            owner: owner.trim().into(),
            repo: repo.trim().into(),
        })
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

fn check_component(what: &str, env_var: &str, value: &str) -> Result<()> {
    let value = value.trim();

    if value.is_empty() {
        bail!("a repository {what} is required (set {env_var} or pass --{})", env_var.trim_start_matches("GITHUB_").to_lowercase());
    }

    if value.contains('/') || value.chars().any(char::is_whitespace) {
        bail!("invalid repository {what} '{value}'");
    }

    Ok(())
}

impl Display for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish()
    }
}

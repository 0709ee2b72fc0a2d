//! Credential store loaded from the environment.

use anyhow::{Context, Result, bail};
use sigil_auth::{Credential, Identity};

/// Parse `SIGIL_CREDENTIALS`: comma-separated `id:secret:identity` entries.
///
/// The id ends at the first `:` and the identity starts after the last, so a
/// secret may itself contain `:`.
pub fn parse_credentials(raw: &str) -> Result<Vec<Credential>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .enumerate()
        .map(|(index, entry)| {
            parse_entry(entry)
                .with_context(|| format!("invalid SIGIL_CREDENTIALS entry #{}", index + 1))
        })
        .collect()
}

fn parse_entry(entry: &str) -> Result<Credential> {
    let Some((id, rest)) = entry.split_once(':') else {
        bail!("expected id:secret:identity");
    };
    let Some((secret, identity)) = rest.rsplit_once(':') else {
        bail!("expected id:secret:identity");
    };
    if id.is_empty() || secret.is_empty() || identity.is_empty() {
        bail!("id, secret and identity must all be non-empty");
    }
    Ok(Credential::new(id, secret, Identity::new(identity)))
}

/// Read credentials from `SIGIL_CREDENTIALS`; unset means none.
pub fn load_credentials() -> Result<Vec<Credential>> {
    std::env::var("SIGIL_CREDENTIALS")
        .map_or_else(|_| Ok(Vec::new()), |raw| parse_credentials(&raw))
}

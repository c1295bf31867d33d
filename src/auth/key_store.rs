use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "mailgun_retriever";

/// Save the API key for a sending domain into the OS keyring
pub fn save_api_key(domain: &str, api_key: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, domain);
    entry?
        .set_password(api_key)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load the API key for a sending domain from the keyring
pub fn load_api_key(domain: &str) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, domain);
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

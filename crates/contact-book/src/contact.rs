/// Contact records and their JSON file format.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single address-book entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Contact {
    pub fn new(name: impl Into<String>, email: Option<String>, phone: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email,
            phone,
        }
    }

    /// Case-insensitive name match.
    pub fn is_named(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }
}

impl std::fmt::Display for Contact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(email) = &self.email {
            write!(f, " <{email}>")?;
        }
        if let Some(phone) = &self.phone {
            write!(f, " {phone}")?;
        }
        Ok(())
    }
}

/// Whether two names are equal ignoring surrounding whitespace and case.
///
/// Uses full Unicode lowercasing, so "Émile" matches "émile".
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub type ContactList = Vec<Contact>;

/// Reads a contact list written by [`save_contacts`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON contact list.
pub fn load_contacts(path: &Path) -> Result<ContactList> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read contacts: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse contacts: {}", path.display()))
}

/// Writes `contacts` to `path` as pretty-printed JSON, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_contacts(path: &Path, contacts: &[Contact]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(contacts).context("Failed to serialize contacts")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write contacts: {}", path.display()))
}

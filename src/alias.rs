//! Human-readable labels for meter addresses.
//!
//! Labels are a presentation concern: the registry never sees them. Meters
//! without a configured label are shown as `unnamed_<address>`.

use crate::address::RadioAddress;
use std::collections::BTreeMap;

/// Address-to-label mapping.
pub type AliasMap = BTreeMap<RadioAddress, String>;

/// A parsed alias mapping an address to a label.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub address: RadioAddress,
    pub name: String,
}

/// Parse an alias from a string in the format "ADDRESS=NAME".
///
/// # Example
/// ```
/// use switchbot_listener::alias::parse_alias;
///
/// let alias = parse_alias("F3:50:26:00:00:01=Office").unwrap();
/// assert_eq!(alias.address.to_string(), "F3:50:26:00:00:01");
/// assert_eq!(alias.name, "Office");
/// ```
pub fn parse_alias(src: &str) -> Result<Alias, String> {
    let (address, name) = src
        .split_once('=')
        .ok_or_else(|| "invalid alias: expected format ADDRESS=NAME".to_string())?;
    let name = name.trim();
    if name.is_empty() {
        return Err("invalid alias: name is empty".into());
    }

    Ok(Alias {
        address: address.parse().map_err(|e| format!("{e}"))?,
        name: name.into(),
    })
}

/// Collect aliases into a lookup map; later entries win.
pub fn to_map(aliases: &[Alias]) -> AliasMap {
    aliases
        .iter()
        .map(|a| (a.address, a.name.clone()))
        .collect()
}

/// Label for `address`, falling back to `unnamed_<address>`.
pub fn resolve_name(address: &RadioAddress, aliases: &AliasMap) -> String {
    aliases
        .get(address)
        .cloned()
        .unwrap_or_else(|| format!("unnamed_{address}"))
}

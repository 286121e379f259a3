//! ID resolver module
//!
//! Handles resolution of UUID prefixes to full UUIDs by querying the API.
//! This allows users to specify short, unambiguous prefixes instead of full UUIDs.

use anyhow::{Context, Result, anyhow};
use datawatch_client::DatawatchClient;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Resolve a trigger ID or prefix to a full UUID
///
/// If the input is already a full UUID, returns it immediately.
/// Otherwise, lists the server's triggers and finds the one matching the prefix.
///
/// # Errors
/// Returns an error if:
/// - No trigger matches the prefix
/// - Multiple triggers match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_trigger_id(
    client: &DatawatchClient,
    id_or_prefix: &IdOrPrefix,
) -> Result<Uuid> {
    // If it's already a full UUID, return it
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let triggers = client
        .list_triggers(None)
        .await
        .context("Failed to fetch triggers for ID resolution")?;

    match_prefix(triggers.iter().map(|t| t.id), &id_or_prefix.as_str())
}

/// Picks the single id starting with `prefix`
fn match_prefix(ids: impl Iterator<Item = Uuid>, prefix: &str) -> Result<Uuid> {
    let prefix = prefix.to_lowercase();
    let matches: Vec<Uuid> = ids
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!(
            "No trigger found with ID starting with '{}'",
            prefix
        )),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple triggers: {}",
                prefix,
                ids.join(", ")
            ))
        }
    }
}

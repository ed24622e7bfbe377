// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-play verification: clean, serialize, digest, verify against a
//! trusted key, then check the digest against the revocation set.

use {
    crate::{
        clean, digest, error::{PlaybookError, Result}, gpg, loader, scratch, serializer,
        value::Value,
    },
    log::{debug, info, warn},
    std::{collections::HashSet, path::Path},
};

/// Verifies every play in `playbook_text` against `key`, rejecting any play
/// whose digest is on the revocation list loaded from `revocation_text`. If
/// `revocation_text` is `None`, no revocation list is checked. Returns the
/// original playbook text unchanged on success.
pub fn verify_playbook(
    playbook_text: &str,
    key: &Path,
    revocation_text: Option<&str>,
) -> Result<String> {
    if playbook_text.trim().is_empty() {
        return Err(PlaybookError::EmptyPlaybookText);
    }

    let revocation_set = match revocation_text {
        Some(text) => verify_revocation_list(text, key)?,
        None => {
            warn!("no revocation list supplied, skipping revocation checks");
            HashSet::new()
        }
    };

    let plays = loader::parse_playbook(playbook_text)?;
    if plays.is_empty() {
        return Err(PlaybookError::EmptyPlaybook);
    }

    for play in &plays {
        verify_play(play, key, &revocation_set)?;
    }

    info!("verified {} play(s)", plays.len());
    Ok(playbook_text.to_string())
}

/// Verifies the single play in the revocation playbook and returns the set
/// of revoked digests it names.
fn verify_revocation_list(revocation_text: &str, key: &Path) -> Result<HashSet<[u8; 32]>> {
    let plays = loader::parse_playbook(revocation_text)?;
    if plays.len() != 1 {
        return Err(PlaybookError::Precondition(format!(
            "the revocation list must contain exactly one play, found {}",
            plays.len()
        )));
    }
    let play = &plays[0];
    verify_play(play, key, &HashSet::new())?;

    let mapping = play.as_mapping().ok_or_else(|| {
        PlaybookError::Precondition("revocation play is not a mapping".to_string())
    })?;
    let empty = Vec::new();
    let revoked = mapping
        .get("revoked_playbooks")
        .and_then(Value::as_sequence)
        .unwrap_or(&empty);

    let mut set = HashSet::with_capacity(revoked.len());
    for entry in revoked {
        let hash_str = entry
            .as_mapping()
            .and_then(|m| m.get("hash"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PlaybookError::Precondition(
                    "a 'revoked_playbooks' entry is missing its 'hash' field".to_string(),
                )
            })?;
        let bytes = hex::decode(hash_str)?;
        let digest: [u8; 32] = bytes.try_into().map_err(|_| {
            PlaybookError::Precondition(format!(
                "revoked playbook hash '{hash_str}' is not a 32-byte digest"
            ))
        })?;
        set.insert(digest);
    }
    debug!("loaded {} revoked digest(s)", set.len());
    Ok(set)
}

fn play_name(play: &Value) -> String {
    play.as_mapping()
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
        .to_string()
}

/// Verifies a single play: clean, serialize, digest, verify the detached
/// signature, then check the digest against the revocation set.
fn verify_play(play: &Value, key: &Path, revocation_set: &HashSet<[u8; 32]>) -> Result<()> {
    let name = play_name(play);

    let signature_b64 = play
        .as_mapping()
        .and_then(|m| m.get("vars"))
        .and_then(Value::as_mapping)
        .and_then(|vars| vars.get("insights_signature"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            PlaybookError::Precondition(format!(
                "play '{name}' has no 'vars/insights_signature' to verify"
            ))
        })?
        .to_string();
    let signature_bytes = base64::decode(&signature_b64)?;

    let cleaned = clean::clean_play(play)?;
    let serialized = serializer::serialize(&cleaned).into_bytes();
    let digest_bytes = digest::digest_bytes(&serialized);

    let scratch_dir = scratch::new_scratch_dir("insights-ansible-playbook-verifier-verify-")?;
    let digest_path = scratch_dir.path().join("digest");
    let signature_path = scratch_dir.path().join("signature.asc");
    std::fs::write(&digest_path, digest_bytes)?;
    std::fs::write(&signature_path, &signature_bytes)?;

    let outcome = gpg::verify_gpg_signed_file(&digest_path, &signature_path, key)?;
    if !outcome.ok {
        debug!("signature verification failed for play '{name}': {outcome}");
        return Err(PlaybookError::SignatureMismatch {
            play_name: name,
            serialized_play: serialized,
            digest: digest_bytes,
            signature: signature_bytes,
        });
    }

    if revocation_set.contains(&digest_bytes) {
        return Err(PlaybookError::Revoked {
            play_name: name,
            digest: hex::encode(digest_bytes),
        });
    }

    debug!("play '{name}' verified ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn play_without_signature() -> Value {
        let mut vars = IndexMap::new();
        vars.insert(
            "insights_signature_exclude".to_string(),
            Value::String("/hosts,/vars/insights_signature".to_string()),
        );
        let mut play = IndexMap::new();
        play.insert("name".to_string(), Value::String("demo".to_string()));
        play.insert("vars".to_string(), Value::Mapping(vars));
        Value::Mapping(play)
    }

    #[test]
    fn missing_signature_is_a_precondition_error() {
        let play = play_without_signature();
        let err = verify_play(&play, Path::new("/nonexistent"), &HashSet::new()).unwrap_err();
        assert!(matches!(err, PlaybookError::Precondition(_)));
    }

    #[test]
    fn revocation_list_requires_exactly_one_play() {
        let err = verify_revocation_list("[]", Path::new("/nonexistent")).unwrap_err();
        assert!(matches!(err, PlaybookError::Precondition(_)));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-play signing: normalize field order, clean, serialize, digest, sign,
//! then attach the base64-encoded signature back onto the play.

use {
    crate::{
        clean, digest, error::{PlaybookError, Result}, gpg, loader, remote_signing::RemoteSigner,
        scratch, serializer,
        value::{Mapping, Value},
    },
    indexmap::IndexMap,
    log::debug,
};

/// Where a play's detached signature over its digest comes from.
pub enum SigningKey<'a> {
    Local(&'a std::path::Path),
    Remote {
        signer: &'a dyn RemoteSigner,
        key_name: String,
    },
}

/// Signs every play in `playbook_text`, returning the signed sequence
/// rendered as YAML with key order preserved.
pub fn sign_playbook(
    playbook_text: &str,
    signing: &SigningKey,
    is_revocation_list: bool,
) -> Result<String> {
    let plays = loader::parse_playbook(playbook_text)?;
    if plays.is_empty() {
        return Err(PlaybookError::EmptyPlaybook);
    }

    let signed: Vec<Value> = plays
        .iter()
        .map(|play| sign_play(play, signing, is_revocation_list))
        .collect::<Result<_>>()?;

    Ok(serde_yaml::to_string(&signed)?)
}

/// Signs the single play of a revocation list, using the revocation play's
/// field-normalization defaults.
pub fn sign_revocation_list(playbook_text: &str, signing: &SigningKey) -> Result<String> {
    sign_playbook(playbook_text, signing, true)
}

fn sign_play(play: &Value, signing: &SigningKey, is_revocation_list: bool) -> Result<Value> {
    let mut normalized = normalize_play(play, is_revocation_list)?;

    let cleaned = clean::clean_play(&normalized)?;
    let serialized = serializer::serialize(&cleaned).into_bytes();
    let digest_bytes = digest::digest_bytes(&serialized);

    let scratch_dir = scratch::new_scratch_dir("insights-ansible-playbook-signer-sign-")?;
    let digest_path = scratch_dir.path().join("digest");
    std::fs::write(&digest_path, digest_bytes)?;

    let signature_bytes = match signing {
        SigningKey::Local(key) => {
            let outcome = gpg::sign_file(&digest_path, key)?;
            if !outcome.ok {
                return Err(PlaybookError::ExternalTool(format!(
                    "gpg failed to sign the digest: {outcome}"
                )));
            }
            std::fs::read(digest_path.with_extension("asc"))?
        }
        SigningKey::Remote { signer, key_name } => signer.sign_digest(&digest_path, key_name)?,
    };

    let signature_b64 = base64::encode(&signature_bytes);
    debug!(
        "signed play, digest {} signature {} bytes",
        hex::encode(digest_bytes),
        signature_bytes.len()
    );

    let map = normalized.as_mapping_mut().expect("normalize_play returns a mapping");
    let vars = map
        .get_mut("vars")
        .and_then(Value::as_mapping_mut)
        .expect("normalize_play ensures 'vars'");
    vars.insert(
        "insights_signature".to_string(),
        Value::String(signature_b64),
    );

    Ok(normalized)
}

/// Ensures `vars`, the exclusion directive, and a signature placeholder are
/// present, then moves the trailing field (`tasks` or `revoked_playbooks`)
/// to the last key position, matching the reference implementation's field
/// ordering so the cleaned/serialized form is stable across re-signs.
fn normalize_play(play: &Value, is_revocation_list: bool) -> Result<Value> {
    let mut normalized = play.clone();
    let map = normalized
        .as_mapping_mut()
        .ok_or_else(|| PlaybookError::Precondition("play is not a mapping".to_string()))?;

    if !map.contains_key("vars") {
        map.insert("vars".to_string(), Value::Mapping(IndexMap::new()));
    }
    let vars = map
        .get_mut("vars")
        .and_then(Value::as_mapping_mut)
        .expect("'vars' was just ensured");

    if !vars.contains_key("insights_signature_exclude") {
        let default = if is_revocation_list {
            "/vars/insights_signature"
        } else {
            "/hosts,/vars/insights_signature"
        };
        vars.insert(
            "insights_signature_exclude".to_string(),
            Value::String(default.to_string()),
        );
    }
    if !vars.contains_key("insights_signature") {
        vars.insert(
            "insights_signature".to_string(),
            Value::String(String::new()),
        );
    }

    let trailing_key = if is_revocation_list {
        "revoked_playbooks"
    } else {
        "tasks"
    };
    if !map.contains_key(trailing_key) {
        return Err(PlaybookError::Precondition(format!(
            "play is missing the required '{trailing_key}' field"
        )));
    }
    move_to_last(map, trailing_key);

    Ok(normalized)
}

fn move_to_last(map: &mut Mapping, key: &str) {
    if let Some(value) = map.shift_remove(key) {
        map.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_play() -> Value {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), Value::String("demo".to_string()));
        map.insert(
            "tasks".to_string(),
            Value::Sequence(vec![Value::String("debug:".to_string())]),
        );
        map.insert("hosts".to_string(), Value::String("all".to_string()));
        Value::Mapping(map)
    }

    #[test]
    fn normalize_installs_defaults_and_moves_tasks_last() {
        let normalized = normalize_play(&user_play(), false).unwrap();
        let map = normalized.as_mapping().unwrap();
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.last(), Some(&"tasks"));

        let vars = map.get("vars").unwrap().as_mapping().unwrap();
        assert_eq!(
            vars.get("insights_signature_exclude").and_then(Value::as_str),
            Some("/hosts,/vars/insights_signature")
        );
        assert_eq!(
            vars.get("insights_signature").and_then(Value::as_str),
            Some("")
        );
    }

    #[test]
    fn normalize_requires_tasks_for_user_plays() {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), Value::String("demo".to_string()));
        let err = normalize_play(&Value::Mapping(map), false).unwrap_err();
        assert!(matches!(err, PlaybookError::Precondition(_)));
    }

    #[test]
    fn normalize_uses_revocation_defaults() {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), Value::String("revocations".to_string()));
        map.insert("revoked_playbooks".to_string(), Value::Sequence(vec![]));
        let normalized = normalize_play(&Value::Mapping(map), true).unwrap();
        let outer = normalized.as_mapping().unwrap();
        let vars = outer.get("vars").unwrap().as_mapping().unwrap();
        assert_eq!(
            vars.get("insights_signature_exclude").and_then(Value::as_str),
            Some("/vars/insights_signature")
        );
        let keys: Vec<&str> = outer.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.last(), Some(&"revoked_playbooks"));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generates a disposable EdDSA/ed25519 OpenPGP keypair for local testing,
//! exporting `key.public.gpg`, `key.private.gpg`, and `key.fingerprint.txt`.

use {
    crate::{
        error::{PlaybookError, Result},
        scratch,
    },
    log::debug,
    regex::Regex,
    std::path::Path,
};

const IDENTITY_NAME: &str = "insights-ansible-playbook-verifier test";

const KEYGEN_INSTRUCTIONS: &str = "\
Key-Type: EDDSA
Key-Curve: ed25519
Subkey-Type: ECDH
Subkey-Curve: cv25519
Name-Real: insights-ansible-playbook-verifier test
Expire-Date: 0
%no-protection
%commit
";

fn run_gpg(gpg_binary: &Path, home: &Path, args: &[&str]) -> Result<std::process::Output> {
    let mut full_args: Vec<String> = vec![
        "--homedir".to_string(),
        home.to_string_lossy().into_owned(),
    ];
    full_args.extend(args.iter().map(|s| s.to_string()));

    Ok(duct::cmd(gpg_binary, &full_args)
        .full_env([("LC_ALL", "C.UTF-8")])
        .stdout_capture()
        .stderr_capture()
        .unchecked()
        .run()?)
}

/// Generates an ephemeral keypair and writes the exported public/private
/// keys and the fingerprint into `directory`.
pub fn generate_keypair(directory: &Path) -> Result<String> {
    let gpg_binary = which::which("gpg").map_err(PlaybookError::ToolNotFound)?;
    let home = scratch::new_scratch_dir("insights-ansible-playbook-verifier-gpg-")?;
    debug!("generating GPG keys into {}", home.path().display());

    let instructions_path = home.path().join("keygen");
    std::fs::write(&instructions_path, KEYGEN_INSTRUCTIONS)?;

    let generate = run_gpg(
        &gpg_binary,
        home.path(),
        &[
            "--batch",
            "--generate-key",
            &instructions_path.to_string_lossy(),
        ],
    )?;
    if !generate.status.success() {
        return Err(PlaybookError::ExternalTool(format!(
            "gpg --generate-key failed: {}",
            String::from_utf8_lossy(&generate.stderr)
        )));
    }

    std::fs::create_dir_all(directory)?;

    let public_path = directory.join("key.public.gpg");
    let export_public = run_gpg(
        &gpg_binary,
        home.path(),
        &[
            "--export",
            "--armor",
            "--yes",
            "--output",
            &public_path.to_string_lossy(),
        ],
    )?;
    if !export_public.status.success() {
        return Err(PlaybookError::ExternalTool(format!(
            "gpg --export failed: {}",
            String::from_utf8_lossy(&export_public.stderr)
        )));
    }
    debug!("public key written to {}", public_path.display());

    let private_path = directory.join("key.private.gpg");
    let export_private = run_gpg(
        &gpg_binary,
        home.path(),
        &[
            "--export-secret-keys",
            "--armor",
            "--yes",
            "--output",
            &private_path.to_string_lossy(),
        ],
    )?;
    if !export_private.status.success() {
        return Err(PlaybookError::ExternalTool(format!(
            "gpg --export-secret-keys failed: {}",
            String::from_utf8_lossy(&export_private.stderr)
        )));
    }
    debug!("private key written to {}", private_path.display());

    let fingerprint_output = run_gpg(&gpg_binary, home.path(), &["--fingerprint", IDENTITY_NAME])?;
    let fingerprint = extract_fingerprint(&String::from_utf8_lossy(&fingerprint_output.stdout));

    let fingerprint_path = directory.join("key.fingerprint.txt");
    std::fs::write(&fingerprint_path, &fingerprint)?;
    debug!("fingerprint written to {}", fingerprint_path.display());

    Ok(fingerprint)
}

fn extract_fingerprint(fingerprint_stdout: &str) -> String {
    let re = Regex::new(r"(?m)^\s+([A-F0-9\s]+)").expect("static regex is valid");
    re.captures(fingerprint_stdout)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fingerprint_line() {
        let stdout = "pub   ed25519 2024-01-01 [SC]\n      ABCD 1234 EF01 5678 9ABC  DEF0 1234 5678 9ABC DEF0\nuid\n";
        assert_eq!(
            extract_fingerprint(stdout),
            "ABCD 1234 EF01 5678 9ABC  DEF0 1234 5678 9ABC DEF0"
        );
    }

    #[test]
    fn missing_fingerprint_line_is_empty() {
        assert_eq!(extract_fingerprint("no match here"), "");
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The narrow interface through which the signer orchestrator requests a
//! detached signature from an external signing service, instead of a local
//! `gpg` private key. The concrete RPC/HTTP client living behind this trait
//! is an external collaborator; only the interface is specified here.

use crate::error::Result;
use std::path::Path;

/// Requests a detached signature of the digest staged at `digest_file` from
/// a named remote key.
pub trait RemoteSigner {
    fn sign_digest(&self, digest_file: &Path, key_name: &str) -> Result<Vec<u8>>;
}

/// A [`RemoteSigner`] that shells out to an external signing command,
/// mirroring the reference implementation's `rpm-sign --detachsign --key
/// <name> --nat <digest-file>` invocation, which writes the armored
/// signature alongside the input file as `<digest-file>.asc`.
pub struct CommandRemoteSigner {
    pub command: String,
}

impl Default for CommandRemoteSigner {
    fn default() -> Self {
        Self {
            command: "rpm-sign".to_string(),
        }
    }
}

impl RemoteSigner for CommandRemoteSigner {
    fn sign_digest(&self, digest_file: &Path, key_name: &str) -> Result<Vec<u8>> {
        duct::cmd(
            &self.command,
            [
                "--detachsign",
                "--key",
                key_name,
                "--nat",
                &digest_file.to_string_lossy(),
            ],
        )
        .stdout_capture()
        .stderr_capture()
        .run()?;

        let signature_path = digest_file.with_extension("asc");
        Ok(std::fs::read(signature_path)?)
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {std::path::PathBuf, thiserror::Error};

/// Unified error type for playbook signing and verification.
#[derive(Debug, Error)]
pub enum PlaybookError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] crate::loader::YamlParseError),

    #[error("YAML emission error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),

    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("{0}")]
    Precondition(String),

    #[error("play '{play_name}' failed signature verification")]
    SignatureMismatch {
        play_name: String,
        serialized_play: Vec<u8>,
        digest: [u8; 32],
        signature: Vec<u8>,
    },

    #[error("play '{play_name}' digest {digest} is on the revocation list")]
    Revoked { play_name: String, digest: String },

    #[error("OpenPGP tool failure: {0}")]
    ExternalTool(String),

    #[error("gpg binary not found: {0}")]
    ToolNotFound(#[from] which::Error),

    #[error("could not parse gpg version string: {0}")]
    VersionParse(String),

    #[error("playbook contains no plays")]
    EmptyPlaybook,

    #[error("playbook path does not exist: {0}")]
    MissingPlaybookPath(PathBuf),

    #[error("received empty playbook")]
    EmptyPlaybookText,
}

pub type Result<T> = std::result::Result<T, PlaybookError>;

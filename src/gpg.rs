// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ephemeral OpenPGP verification/signing driver: scratch home, key
//! import, detached verify/sign, and best-effort teardown.
//!
//! The external `gpg` binary is treated as a narrow collaborator — the
//! orchestrators in [`crate::verify`] and [`crate::sign`] only ever see
//! [`GpgOutcome`], never a raw [`std::process::Output`].

use {
    crate::error::{PlaybookError, Result},
    log::{debug, warn},
    semver::Version,
    std::path::{Path, PathBuf},
};

/// Result of one `gpg` invocation.
#[derive(Debug, Clone)]
pub struct GpgOutcome {
    pub ok: bool,
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl std::fmt::Display for GpgOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<GpgOutcome ok={} return_code={} stdout={:?} stderr={:?}>",
            self.ok, self.return_code, self.stdout, self.stderr
        )
    }
}

/// A single `gpg` operation run inside a freshly-created, process-private
/// home directory.
pub struct GpgCommand {
    gpg_binary: PathBuf,
    key: PathBuf,
    home: tempfile::TempDir,
}

impl GpgCommand {
    /// Creates the scratch home and imports `key` into it.
    pub fn setup(key: &Path) -> Result<(Self, GpgOutcome)> {
        let gpg_binary =
            which::which("gpg").map_err(PlaybookError::ToolNotFound)?;
        let home = crate::scratch::new_scratch_dir("insights-ansible-playbook-verifier-gpg-")?;
        debug!("using temporary GPG home {}", home.path().display());

        let command = GpgCommand {
            gpg_binary,
            key: key.to_path_buf(),
            home,
        };
        let import = command.run(&["--import", &command.key.to_string_lossy()])?;
        if !import.ok {
            warn!("failed to import key {}: {}", command.key.display(), import);
        }
        Ok((command, import))
    }

    fn run(&self, args: &[&str]) -> Result<GpgOutcome> {
        let mut full_args: Vec<String> = vec![
            "--homedir".to_string(),
            self.home.path().to_string_lossy().into_owned(),
        ];
        full_args.extend(args.iter().map(|s| s.to_string()));

        let output = duct::cmd(&self.gpg_binary, &full_args)
            .full_env([("LC_ALL", "C.UTF-8")])
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()?;

        let outcome = GpgOutcome {
            ok: output.status.success(),
            return_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if outcome.ok {
            debug!("gpg command {:?}: ok", args);
        } else {
            debug!("gpg command {:?} returned non-zero: {}", args, outcome);
        }
        Ok(outcome)
    }

    /// Queries `gpg --version` to decide whether `gpgconf --kill all` is
    /// supported (added in GnuPG 2.1.0-beta2; `--kill all` specifically
    /// since 2.1.18).
    fn supports_cleanup_socket(&self) -> bool {
        let Ok(result) = self.run(&["--version"]) else {
            return false;
        };
        if !result.ok {
            warn!("could not query gpg version:\n{}", result.stderr);
            return false;
        }

        let Some(line) = result
            .stdout
            .lines()
            .find(|line| line.starts_with("gpg (GnuPG) "))
        else {
            debug!("could not recognize gpg version output:\n{}", result.stdout);
            return false;
        };

        let Some(version_str) = line.rsplit(' ').next() else {
            return false;
        };

        match Version::parse(&normalize_version(version_str)) {
            Ok(version) => version >= Version::new(2, 1, 18),
            Err(e) => {
                let err = PlaybookError::VersionParse(format!("'{version_str}': {e}"));
                debug!("gpg version is not recognized: {err}");
                false
            }
        }
    }

    fn cleanup_socket(&self) {
        let output = duct::cmd("gpgconf", ["--kill", "all"])
            .full_env([
                ("GNUPGHOME", self.home.path().to_string_lossy().into_owned()),
                ("LC_ALL", "C.UTF-8".to_string()),
            ])
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run();

        match output {
            Ok(out) if out.status.success() => debug!("killed gpg agent"),
            Ok(out) => warn!(
                "could not kill the gpg agent, return code {:?}:\n{}",
                out.status.code(),
                String::from_utf8_lossy(&out.stderr)
            ),
            Err(e) => warn!("could not invoke gpgconf: {e}"),
        }
    }

    /// Best-effort teardown: optionally kill the agent socket, then remove
    /// the scratch home, tolerating races with the agent deleting its own
    /// socket file.
    fn teardown(&self) {
        if self.supports_cleanup_socket() {
            self.cleanup_socket();
        }

        const MAX_ATTEMPTS: u32 = 5;
        for attempt in 0..MAX_ATTEMPTS {
            match std::fs::remove_dir_all(self.home.path()) {
                Ok(()) => {
                    debug!("deleted temporary GPG home");
                    return;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    if attempt + 1 == MAX_ATTEMPTS {
                        debug!("could not clean up temporary GPG home: {e}");
                    }
                }
            }
        }
    }

    /// Runs `command`, tearing down the scratch home regardless of outcome.
    fn evaluate(self, command: &[&str]) -> Result<GpgOutcome> {
        let result = self.run(command);
        self.teardown();
        result
    }
}

fn normalize_version(raw: &str) -> String {
    let mut parts: Vec<&str> = raw.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    parts[..3].join(".")
}

/// Verify a detached signature of `file` against `key`.
pub fn verify_gpg_signed_file(file: &Path, signature: &Path, key: &Path) -> Result<GpgOutcome> {
    if !file.is_file() {
        return Err(PlaybookError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file '{}' not found", file.display()),
        )));
    }
    if !signature.is_file() {
        return Err(PlaybookError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("signature '{}' not found", signature.display()),
        )));
    }

    let (command, setup) = GpgCommand::setup(key)?;
    if !setup.ok {
        return Ok(setup);
    }

    command.evaluate(&[
        "--verify",
        &signature.to_string_lossy(),
        &file.to_string_lossy(),
    ])
}

/// Produce a detached, ASCII-armored signature of `file` using `key`.
pub fn sign_file(file: &Path, key: &Path) -> Result<GpgOutcome> {
    if !file.is_file() {
        return Err(PlaybookError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file '{}' not found", file.display()),
        )));
    }
    if !key.is_file() {
        return Err(PlaybookError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("key '{}' not found", key.display()),
        )));
    }

    let (command, setup) = GpgCommand::setup(key)?;
    if !setup.ok {
        return Ok(setup);
    }

    command.evaluate(&["--detach-sign", "--armor", &file.to_string_lossy()])
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process-wide scratch directory configuration.
//!
//! Which parent directory scratch subdirectories are created under is
//! computed once, from the effective user id and a filesystem probe, and
//! threaded through rather than re-probed on every invocation (per the
//! "Global state" design note).

use {once_cell::sync::Lazy, std::path::PathBuf};

const ROOT_STASH_DIRECTORY: &str = "/var/lib/insights-ansible-playbook-verifier/";

#[cfg(unix)]
fn effective_uid_is_root() -> bool {
    // SAFETY: geteuid() takes no arguments and never fails.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn effective_uid_is_root() -> bool {
    false
}

/// Parent directory under which every scratch subdirectory (GPG homes and
/// file-staging directories alike) is created.
static SCRATCH_PARENT: Lazy<PathBuf> = Lazy::new(|| {
    let root_stash = PathBuf::from(ROOT_STASH_DIRECTORY);
    if effective_uid_is_root() && root_stash.is_dir() {
        root_stash
    } else {
        std::env::temp_dir()
    }
});

/// Returns the process-wide scratch parent directory, computing it on first
/// use and reusing the cached value thereafter.
pub fn scratch_parent_directory() -> &'static std::path::Path {
    &SCRATCH_PARENT
}

/// Creates a fresh, uniquely-named scratch directory under the process-wide
/// parent, for staging digest/signature/key files ahead of a `gpg` call.
/// Cleaned up automatically when dropped.
pub fn new_scratch_dir(prefix: &str) -> std::io::Result<tempfile::TempDir> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(scratch_parent_directory())
}

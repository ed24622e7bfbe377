// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Detached OpenPGP signing and verification for individual plays inside
//! Ansible-style playbooks.
//!
//! Each play in a playbook is signed independently: a canonical, byte-exact
//! serialization of the play (with a small set of dynamic fields excluded)
//! is hashed with SHA-256, and the digest is signed with a detached OpenPGP
//! signature carried inline in the play under `vars/insights_signature`. A
//! separate revocation list, itself a signed play, names digests of plays
//! that must be rejected even if their signature verifies.
//!
//! # Getting started
//!
//! [`verify::verify_playbook`] is the entry point for verification;
//! [`sign::sign_playbook`] and [`sign::sign_revocation_list`] are the entry
//! points for signing. [`loader::parse_playbook`] and
//! [`serializer::serialize`] expose the playbook parser and the canonical
//! serializer independently, for callers that only need one half of the
//! protocol. [`keygen::generate_keypair`] provisions a disposable keypair
//! for local testing.
//!
//! All OpenPGP work is delegated to the external `gpg` binary (see
//! [`gpg`]); this crate implements no cryptographic primitives itself.

pub mod clean;
pub mod digest;
pub mod error;
pub mod gpg;
pub mod keygen;
pub mod loader;
pub mod remote_signing;
pub mod resolver;
pub mod scratch;
pub mod serializer;
pub mod sign;
pub mod value;
pub mod verify;

pub use error::{PlaybookError, Result};

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod clean;
mod digest;
mod error;
mod gpg;
mod keygen;
mod loader;
mod remote_signing;
mod resolver;
mod scratch;
mod serializer;
mod sign;
mod value;
mod verify;

use {
    crate::{error::PlaybookError, remote_signing::CommandRemoteSigner, sign::SigningKey},
    clap::{Arg, ArgGroup, ArgMatches, Command},
    log::LevelFilter,
    std::io::Read,
};

fn playbook_source_args() -> Vec<Arg<'static>> {
    vec![
        Arg::new("playbook")
            .long("playbook")
            .takes_value(true)
            .help("Path to the playbook to load"),
        Arg::new("stdin")
            .long("stdin")
            .takes_value(false)
            .help("Load the playbook from stdin (the default)"),
    ]
}

fn read_playbook_text(args: &ArgMatches) -> Result<String, PlaybookError> {
    let text = if let Some(path) = args.value_of("playbook") {
        let path = std::path::Path::new(path);
        if !path.is_file() {
            return Err(PlaybookError::MissingPlaybookPath(path.to_path_buf()));
        }
        std::fs::read_to_string(path)?
    } else {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    };

    if text.is_empty() {
        return Err(PlaybookError::EmptyPlaybookText);
    }
    Ok(text)
}

fn command_verify(args: &ArgMatches) -> Result<(), PlaybookError> {
    let key_path = args
        .value_of("key")
        .ok_or_else(|| PlaybookError::Precondition("--key is required".to_string()))?;
    let key = std::path::Path::new(key_path);

    let revocation_text = args
        .value_of("revocation_list")
        .map(std::fs::read_to_string)
        .transpose()?;

    let playbook_text = read_playbook_text(args)?;
    let verified = verify::verify_playbook(&playbook_text, key, revocation_text.as_deref())?;
    print!("{verified}");
    Ok(())
}

fn command_sign(args: &ArgMatches) -> Result<(), PlaybookError> {
    let playbook_text = read_playbook_text(args)?;
    let is_revocation_list = args.is_present("revocation_list");

    let remote_signer;
    let signing = if let Some(key_name) = args.value_of("remote_key") {
        remote_signer = CommandRemoteSigner::default();
        SigningKey::Remote {
            signer: &remote_signer,
            key_name: key_name.to_string(),
        }
    } else {
        let key_path = args
            .value_of("key")
            .ok_or_else(|| PlaybookError::Precondition("--key is required".to_string()))?;
        SigningKey::Local(std::path::Path::new(key_path))
    };

    let signed = if is_revocation_list {
        sign::sign_revocation_list(&playbook_text, &signing)?
    } else {
        sign::sign_playbook(&playbook_text, &signing, false)?
    };
    print!("{signed}");
    Ok(())
}

fn command_keygen(args: &ArgMatches) -> Result<(), PlaybookError> {
    let directory = args
        .value_of("directory")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().expect("cwd is accessible"));

    keygen::generate_keypair(&directory)?;
    println!(
        "GPG keys were generated to 'key.public.gpg', 'key.private.gpg', 'key.fingerprint.txt'."
    );
    Ok(())
}

fn main_impl() -> Result<(), PlaybookError> {
    let app = Command::new("playbook-sign")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Red Hat Insights")
        .about(
            "Sign and verify individual plays in Ansible playbooks with detached OpenPGP \
             signatures.",
        );

    let app = app.arg(
        Arg::new("debug")
            .long("debug")
            .global(true)
            .takes_value(false)
            .help("Display debug-level logs"),
    );

    let app = app.subcommand(
        Command::new("verify")
            .about("Verify every play in a playbook against a trusted key")
            .args(playbook_source_args())
            .group(
                ArgGroup::new("playbook_source")
                    .args(&["playbook", "stdin"])
                    .required(true),
            )
            .arg(
                Arg::new("key")
                    .long("key")
                    .takes_value(true)
                    .required(true)
                    .help("Path to the public GPG key to verify against"),
            )
            .arg(
                Arg::new("revocation_list")
                    .long("revocation-list")
                    .takes_value(true)
                    .help("Path to a signed revocation list playbook (default: treat as empty)"),
            ),
    );

    let app = app.subcommand(
        Command::new("sign")
            .about("Sign every play in a playbook with a detached OpenPGP signature")
            .args(playbook_source_args())
            .group(
                ArgGroup::new("playbook_source")
                    .args(&["playbook", "stdin"])
                    .required(true),
            )
            .arg(
                Arg::new("key")
                    .long("key")
                    .takes_value(true)
                    .help("Path to the private GPG key to sign with"),
            )
            .arg(
                Arg::new("remote_key")
                    .long("remote-key")
                    .takes_value(true)
                    .help("Name of a key on a remote signing server"),
            )
            .group(
                ArgGroup::new("signing_key")
                    .args(&["key", "remote_key"])
                    .required(true),
            )
            .arg(
                Arg::new("revocation_list")
                    .long("revocation-list")
                    .takes_value(false)
                    .help("Sign a revocation list instead of a playbook"),
            ),
    );

    let app = app.subcommand(
        Command::new("keygen")
            .about("Generate a disposable OpenPGP keypair for local testing")
            .arg(
                Arg::new("directory")
                    .long("directory")
                    .short('d')
                    .takes_value(true)
                    .help("Directory to store the key pair (default: current working directory)"),
            ),
    );

    let matches = app.get_matches();

    let debug = matches.is_present("debug")
        || matches
            .subcommand()
            .map(|(_, args)| args.is_present("debug"))
            .unwrap_or(false);
    configure_logging(debug);

    match matches.subcommand() {
        Some(("verify", args)) => command_verify(args),
        Some(("sign", args)) => command_sign(args),
        Some(("keygen", args)) => command_keygen(args),
        _ => Err(PlaybookError::Precondition(
            "no subcommand given; run with --help".to_string(),
        )),
    }
}

/// Mirrors the reference implementation's two logging modes: `--debug` gets
/// full, timestamped, per-module diagnostics at DEBUG level; the default
/// mode shows only warnings and above in a terse single-line form.
fn configure_logging(debug: bool) {
    let mut builder = env_logger::Builder::new();
    if debug {
        builder
            .filter_level(LevelFilter::Debug)
            .format_timestamp_secs();
    } else {
        builder
            .filter_level(LevelFilter::Warn)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false);
    }
    builder.init();
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            log::error!("unhandled error, aborting");
            eprintln!("{err}");
            1
        }
    };

    std::process::exit(exit_code)
}

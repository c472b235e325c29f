//! cryptmgr CLI - Password-based file encryption
//!
//! Command-line interface for encrypting and decrypting files using
//! AES-256-CBC with PBKDF2-HMAC-SHA256 key derivation.

use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use cryptmgr::error::{CryptError, ErrorCategory, ErrorKind, Result};
use cryptmgr::file_ops::{self, Overwrite};
use cryptmgr::passphrase::{
    ConstantPassphraseReader, PassphraseReader, PolicyPassphraseReader, ReaderPassphraseReader,
    TerminalPassphraseReader,
};

#[derive(Parser)]
#[command(name = "cryptmgr")]
#[command(version)]
#[command(about = "Password-based file encryption (AES-256-CBC, PBKDF2).", long_about = None)]
#[command(after_help = "Examples:\n  \
    cryptmgr encrypt document.txt document.txt.enc\n  \
    cryptmgr decrypt document.txt.enc document.txt")]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true, env = "CRYPTMGR_PASSPHRASE_STDIN")]
    passphrase_stdin: bool,

    /// Password on the command line (insecure; prompts if omitted)
    #[arg(short, long, global = true, conflicts_with = "passphrase_stdin")]
    password: Option<String>,

    /// Overwrite the output file without asking
    #[arg(short, long, global = true)]
    force: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Path to the file to write the encrypted container to
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the encrypted container
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Path to the file to write the decrypted contents to
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Replace the contents of an encrypted file, checking that the
    /// password is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Path to the existing container to replace
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },
}

/// Outcome of asking whether an existing output may be replaced.
enum Proceed {
    Yes(Overwrite),
    Cancelled,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e.chain_message());
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        passphrase_stdin,
        password,
        force,
        command,
        ..
    } = cli;

    match command {
        Commands::Encrypt { input, output } => {
            ensure_input_exists(&input)?;
            let overwrite = match confirm_overwrite(&output, force)? {
                Proceed::Yes(overwrite) => overwrite,
                Proceed::Cancelled => return Ok(()),
            };
            let mut reader = get_passphrase_reader(passphrase_stdin, password, true);
            debug!(input = %input.display(), output = %output.display(), "encrypting");
            file_ops::encrypt_file(&input, &output, overwrite, &mut *reader)
        }
        Commands::Decrypt { input, output } => {
            ensure_input_exists(&input)?;
            let overwrite = match confirm_overwrite(&output, force)? {
                Proceed::Yes(overwrite) => overwrite,
                Proceed::Cancelled => return Ok(()),
            };
            let mut reader = get_passphrase_reader(passphrase_stdin, password, false);
            debug!(input = %input.display(), output = %output.display(), "decrypting");
            file_ops::decrypt_file(&input, &output, overwrite, &mut *reader)
        }
        Commands::Update { input, output } => {
            let mut reader = get_passphrase_reader(passphrase_stdin, password, false);
            debug!(input = %input.display(), output = %output.display(), "updating");
            file_ops::update_file(&input, &output, &mut *reader)
        }
    }
}

/// Pick the password source. Typed and piped passwords must satisfy the
/// length policy; an inline `-p` password is taken as given so files
/// encrypted with a short one can still be opened.
fn get_passphrase_reader(
    use_stdin: bool,
    inline: Option<String>,
    confirm: bool,
) -> Box<dyn PassphraseReader> {
    if let Some(password) = inline {
        warn!("passing a password on the command line is insecure");
        return Box::new(ConstantPassphraseReader::new(password.into_bytes()));
    }

    let upstream: Box<dyn PassphraseReader> = if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(io::stdin())))
    } else if confirm {
        Box::new(TerminalPassphraseReader::confirming())
    } else {
        Box::new(TerminalPassphraseReader::new())
    };
    Box::new(PolicyPassphraseReader::new(upstream))
}

fn ensure_input_exists(input: &Path) -> Result<()> {
    if !input.exists() {
        return Err(CryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("input file {} does not exist", input.display()),
        ));
    }
    Ok(())
}

/// Decide whether an existing output may be replaced.
///
/// Only asks when stdin is a terminal; otherwise the file layer refuses.
fn confirm_overwrite(output: &Path, force: bool) -> Result<Proceed> {
    if force {
        return Ok(Proceed::Yes(Overwrite::Allow));
    }
    if !output.exists() || !io::stdin().is_terminal() {
        return Ok(Proceed::Yes(Overwrite::Refuse));
    }

    eprint!(
        "Output file '{}' already exists. Overwrite? (y/N): ",
        output.display()
    );
    io::stderr().flush().map_err(prompt_error)?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(prompt_error)?;

    if answer.trim().eq_ignore_ascii_case("y") {
        Ok(Proceed::Yes(Overwrite::Allow))
    } else {
        eprintln!("Operation cancelled.");
        Ok(Proceed::Cancelled)
    }
}

fn prompt_error(e: io::Error) -> CryptError {
    CryptError::with_kind_and_source(
        ErrorCategory::Internal,
        ErrorKind::Io,
        "failed to ask for overwrite confirmation",
        e,
    )
}

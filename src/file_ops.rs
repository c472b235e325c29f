//! File encryption/decryption operations
//!
//! This module reads whole files into memory, runs the cipher core over them
//! and writes the result. The core itself never touches the filesystem.

use crate::cipher;
use crate::error::{CryptError, ErrorCategory, ErrorKind, Result};
use crate::passphrase::PassphraseReader;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// What to do when the destination file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    /// Fail with [`ErrorKind::OutputExists`].
    Refuse,
    /// Replace the existing file.
    Allow,
}

/// Encrypt a file with a password
///
/// Reads plaintext from `input_path`, encrypts it using a password from
/// `passphrase_reader`, and writes the container to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    overwrite: Overwrite,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    check_destination(output_path, overwrite)?;
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    debug!(input = %input_path.display(), bytes = plaintext.len(), "read plaintext");

    let passphrase = passphrase_reader.read_passphrase()?;
    let container = cipher::encrypt(&passphrase, &plaintext)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, &container, overwrite)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(output = %output_path.display(), bytes = container.len(), "file encrypted");
    Ok(())
}

/// Decrypt a file with a password
///
/// Reads a container from `input_path`, decrypts it using a password from
/// `passphrase_reader`, and writes the plaintext to `output_path`. Nothing
/// is written when decryption fails.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    overwrite: Overwrite,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    check_destination(output_path, overwrite)?;
    let container = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    debug!(input = %input_path.display(), bytes = container.len(), "read container");

    let passphrase = passphrase_reader.read_passphrase()?;
    let plaintext = Zeroizing::new(
        cipher::decrypt(&passphrase, &container).map_err(|e| e.with_context("failed to decrypt"))?,
    );
    write_file_secure(output_path, &plaintext, overwrite)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(output = %output_path.display(), bytes = plaintext.len(), "file decrypted");
    Ok(())
}

/// Update an encrypted file with new plaintext using the same password
///
/// This function:
/// 1. Decrypts the existing file at `crypt_path` to validate the password
/// 2. Reads new plaintext from `plain_path`
/// 3. Encrypts the new plaintext with the validated password
/// 4. Atomically writes to `crypt_path` (tempfile + fsync + rename)
///
/// Either the old file or the new file exists afterwards, never a partial
/// one. Because there is no MAC, a wrong password is caught by the padding
/// check only with high probability, not with certainty.
pub fn update_file(
    plain_path: &Path,
    crypt_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let container = fs::read(crypt_path).map_err(|e| read_error(crypt_path, e))?;
    let passphrase = passphrase_reader.read_passphrase()?;

    // Validate the password by decrypting the existing file (discard plaintext)
    let _verified = Zeroizing::new(
        cipher::decrypt(&passphrase, &container).map_err(|e| e.with_context("failed to decrypt"))?,
    );
    debug!(path = %crypt_path.display(), "existing container verified");

    let new_plaintext = fs::read(plain_path).map_err(|e| read_error(plain_path, e))?;
    let new_container = cipher::encrypt(&passphrase, &new_plaintext)
        .map_err(|e| e.with_context("failed to encrypt"))?;

    replace_atomically(crypt_path, &new_container)?;

    info!(path = %crypt_path.display(), bytes = new_container.len(), "file updated");
    Ok(())
}

/// Fail early, before a password is asked for. The open in
/// [`write_file_secure`] enforces the policy again.
fn check_destination(path: &Path, overwrite: Overwrite) -> Result<()> {
    if overwrite == Overwrite::Refuse && path.exists() {
        return Err(output_exists(path));
    }
    Ok(())
}

fn replace_atomically(target: &Path, contents: &[u8]) -> Result<()> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| io_error("failed to create tempfile", e))?;

    temp_file
        .write_all(contents)
        .map_err(|e| io_error("failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| io_error("failed to flush tempfile", e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| io_error("failed to sync file prior to rename", e))?;

    // NamedTempFile is already created 0o600 on Unix; set it explicitly so
    // the result does not depend on that.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| io_error("failed to set tempfile permissions", e))?;
    }

    temp_file.persist(target).map_err(|e| {
        CryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", target.display()),
            e,
        )
    })?;
    Ok(())
}

/// Write file with secure permissions (0o600 on Unix)
///
/// An existing file replaced under [`Overwrite::Allow`] is reset to 0o600
/// before anything is written to it.
fn write_file_secure(path: &Path, contents: &[u8], overwrite: Overwrite) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true);
    match overwrite {
        Overwrite::Refuse => options.create_new(true),
        Overwrite::Allow => options.create(true).truncate(true),
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            output_exists(path)
        } else {
            open_error(path, e)
        }
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if overwrite == Overwrite::Allow {
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| {
                    io_error(format!("failed to set permissions on {}", path.display()), e)
                })?;
        }
    }

    file.write_all(contents)
        .map_err(|e| io_error(format!("failed to write {}", path.display()), e))?;
    Ok(())
}

fn output_exists(path: &Path) -> CryptError {
    CryptError::with_kind(
        ErrorCategory::User,
        ErrorKind::OutputExists,
        format!("output file {} already exists", path.display()),
    )
}

fn io_error(msg: impl Into<String>, err: io::Error) -> CryptError {
    CryptError::with_kind_and_source(ErrorCategory::Internal, ErrorKind::Io, msg, err)
}

fn open_error(path: &Path, err: io::Error) -> CryptError {
    let category = user_category(&err);
    CryptError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to open {}", path.display()),
        err,
    )
}

fn read_error(path: &Path, err: io::Error) -> CryptError {
    let category = user_category(&err);
    CryptError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

fn user_category(err: &io::Error) -> ErrorCategory {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => ErrorCategory::User,
        _ => ErrorCategory::Internal,
    }
}

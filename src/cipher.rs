//! Encryption/decryption using PBKDF2 + AES-256-CBC
//!
//! This module implements password-based encryption using:
//! - PBKDF2-HMAC-SHA256 (100,000 rounds) for key derivation
//! - AES-256 in CBC mode with PKCS#7 padding
//!
//! The binary format is described in [`crate::container`]. There is no
//! authentication tag: a wrong password and tampered ciphertext both show up
//! as invalid padding and cannot be told apart.

use crate::container::{BLOCK_LEN, Container, IV_LEN};
use crate::error::{CryptError, ErrorCategory, ErrorKind, Result};
use crate::kdf::{self, DerivedKey, SALT_LEN};
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes256Dec, Aes256Enc, Block};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Encrypt plaintext with a password using random salt and IV
///
/// Returns the container: salt(16) + iv(16) + ciphertext(padded length)
pub fn encrypt(password: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    encrypt_deterministic(password, plaintext, &salt, &iv)
}

/// Encrypt plaintext with a password using the provided salt and IV
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - reusing an IV under the same key leaks
/// equality of leading plaintext blocks. Use `encrypt()`.
pub fn encrypt_deterministic(
    password: &[u8],
    plaintext: &[u8],
    salt: &[u8; SALT_LEN],
    iv: &[u8; IV_LEN],
) -> Result<Vec<u8>> {
    let key = kdf::derive(password, salt)?;

    let mut buf = pad(plaintext);
    cbc_encrypt(&key, iv, &mut buf);

    let container = Container {
        salt,
        iv,
        ciphertext: &buf,
    };
    Ok(container.to_bytes())
}

/// Decrypt a container with a password
pub fn decrypt(password: &[u8], container: &[u8]) -> Result<Vec<u8>> {
    let container = Container::parse(container)?;

    let key = kdf::derive(password, container.salt)?;

    let mut buf = Zeroizing::new(container.ciphertext.to_vec());
    cbc_decrypt(&key, container.iv, &mut buf);

    let len = unpad(&buf).ok_or_else(|| {
        CryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::InvalidPasswordOrCorruptData,
            "corrupt input, tampered-with data, or bad password",
        )
    })?;

    Ok(buf[..len].to_vec())
}

/// Copy `plaintext` and append PKCS#7 padding. Always adds 1..=16 bytes.
fn pad(plaintext: &[u8]) -> Zeroizing<Vec<u8>> {
    let pad_len = BLOCK_LEN - plaintext.len() % BLOCK_LEN;
    let mut buf = Zeroizing::new(Vec::with_capacity(plaintext.len() + pad_len));
    buf.extend_from_slice(plaintext);
    buf.resize(plaintext.len() + pad_len, pad_len as u8);
    buf
}

/// Validate PKCS#7 padding and return the unpadded length.
///
/// The padding bytes are compared without an early exit.
fn unpad(padded: &[u8]) -> Option<usize> {
    let pad_len = *padded.last()? as usize;
    if pad_len == 0 || pad_len > BLOCK_LEN || pad_len > padded.len() {
        return None;
    }

    let start = padded.len() - pad_len;
    let diff = padded[start..]
        .iter()
        .fold(0u8, |acc, &b| acc | (b ^ pad_len as u8));
    if diff != 0 {
        return None;
    }

    Some(start)
}

/// CBC-encrypt `buf` in place. `buf` must be block aligned.
fn cbc_encrypt(key: &DerivedKey, iv: &[u8; IV_LEN], buf: &mut [u8]) {
    let cipher = Aes256Enc::new((&**key).into());
    let mut prev = *iv;

    for chunk in buf.chunks_exact_mut(BLOCK_LEN) {
        xor_in_place(chunk, &prev);
        let mut block = Block::clone_from_slice(chunk);
        cipher.encrypt_block(&mut block);
        chunk.copy_from_slice(&block);
        prev.copy_from_slice(chunk);
    }
}

/// CBC-decrypt `buf` in place. `buf` must be block aligned.
fn cbc_decrypt(key: &DerivedKey, iv: &[u8; IV_LEN], buf: &mut [u8]) {
    let cipher = Aes256Dec::new((&**key).into());
    let mut prev = *iv;

    for chunk in buf.chunks_exact_mut(BLOCK_LEN) {
        let mut saved = [0u8; BLOCK_LEN];
        saved.copy_from_slice(chunk);

        let mut block = Block::clone_from_slice(chunk);
        cipher.decrypt_block(&mut block);
        chunk.copy_from_slice(&block);
        xor_in_place(chunk, &prev);

        prev = saved;
    }
}

fn xor_in_place(block: &mut [u8], other: &[u8; BLOCK_LEN]) {
    for (b, o) in block.iter_mut().zip(other) {
        *b ^= o;
    }
}

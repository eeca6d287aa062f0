//! File content hashing.
//!
//! Streams file bytes through SHA-1 in fixed 128 KiB reads. On Linux the
//! file is opened with `O_NOATIME` so bulk hashing does not churn access
//! times; that flag needs ownership of the file, so `EPERM` falls back to
//! a plain open.
//!
//! Errors are returned, not logged. Callers decide: per-file failures in
//! the update pipeline are warnings, not fatal.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha1::{Digest, Sha1};

/// Read size for hashing.
pub const HASH_BUFFER_LEN: usize = 128 * 1024;

/// Raw SHA-1 digest length in bytes.
pub const SHA1_LEN: usize = 20;

/// Hashes the entire contents of the file at `path`.
pub fn hash_file(path: &Path) -> io::Result<[u8; SHA1_LEN]> {
    let mut file = open_noatime(path)?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; HASH_BUFFER_LEN];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize().into())
}

#[cfg(target_os = "linux")]
fn open_noatime(path: &Path) -> io::Result<File> {
    use std::fs::OpenOptions;
    use std::os::unix::fs::OpenOptionsExt;

    // O_NOATIME is only permitted for the file owner; others get EPERM.
    match OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NOATIME)
        .open(path)
    {
        Ok(file) => Ok(file),
        Err(err) if err.raw_os_error() == Some(libc::EPERM) => File::open(path),
        Err(err) => Err(err),
    }
}

#[cfg(not(target_os = "linux"))]
fn open_noatime(path: &Path) -> io::Result<File> {
    File::open(path)
}

/// Lowercase-hex rendering of a raw digest, the `sha1` attribute form.
pub fn to_hex(digest: &[u8; SHA1_LEN]) -> String {
    let mut out = String::with_capacity(SHA1_LEN * 2);
    for byte in digest {
        out.push(char::from_digit((byte >> 4) as u32, 16).expect("nibble in range"));
        out.push(char::from_digit((byte & 0xf) as u32, 16).expect("nibble in range"));
    }
    out
}

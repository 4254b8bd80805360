// Streaming download helpers: where the bytes go, which checksum guards
// them, and the single-pass copy loop that feeds both.

use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use md5::Md5;
use sha2::{Digest, Sha256};

use crate::models::Release;

/// Bytes read from the response per iteration.
pub const CHUNK_SIZE: usize = 1024;

/// Sentinel output path meaning "write to standard output".
pub const STDOUT_SENTINEL: &str = "-";

/// Checksum algorithms Splunkbase publishes for releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    Sha256,
    Md5,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
            Self::Md5 => f.write_str("md5"),
        }
    }
}

/// Expected digest of a release artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub kind: ChecksumKind,
    pub expected: String,
}

impl Checksum {
    /// Pick the checksum to verify a release with: sha256 when published,
    /// md5 otherwise. `None` means the release cannot be verified.
    pub fn for_release(release: &Release) -> Option<Self> {
        let usable = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|digest| !digest.is_empty())
                .map(str::to_string)
        };

        if let Some(expected) = usable(&release.sha256) {
            return Some(Self {
                kind: ChecksumKind::Sha256,
                expected,
            });
        }
        usable(&release.md5).map(|expected| Self {
            kind: ChecksumKind::Md5,
            expected,
        })
    }

    pub fn verifier(&self) -> Verifier {
        let hasher = match self.kind {
            ChecksumKind::Sha256 => Hasher::Sha256(Sha256::new()),
            ChecksumKind::Md5 => Hasher::Md5(Md5::new()),
        };
        Verifier { hasher }
    }

    /// Hex digests are compared without regard to case.
    pub fn matches(&self, actual: &str) -> bool {
        self.expected.eq_ignore_ascii_case(actual.trim())
    }
}

enum Hasher {
    Sha256(Sha256),
    Md5(Md5),
}

/// Incremental digest over the chunks of a download.
pub struct Verifier {
    hasher: Hasher,
}

impl Verifier {
    pub fn update(&mut self, chunk: &[u8]) {
        match &mut self.hasher {
            Hasher::Sha256(h) => h.update(chunk),
            Hasher::Md5(h) => h.update(chunk),
        }
    }

    /// Lowercase hex digest of everything fed so far.
    pub fn finalize(self) -> String {
        match self.hasher {
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Md5(h) => hex::encode(h.finalize()),
        }
    }
}

/// Where a downloaded artifact is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    /// Interpret a user-supplied output path; `-` is standard output.
    pub fn parse(path: &str) -> Self {
        if path == STDOUT_SENTINEL {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(path))
        }
    }

    /// Default destination when none was given: `<app>-<version>.tgz`.
    pub fn default_for(app_name: &str, version: &str) -> Self {
        Self::File(PathBuf::from(format!("{app_name}-{version}.tgz")))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Stdout => None,
            Self::File(path) => Some(path),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str(STDOUT_SENTINEL),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Copy `reader` into `writer` in `CHUNK_SIZE` pieces, feeding every chunk
/// to `verifier` as well. Returns the number of bytes copied.
pub fn stream_to<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    mut verifier: Option<&mut Verifier>,
    progress: &ProgressBar,
) -> io::Result<u64> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut copied: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = &buf[..n];
        writer.write_all(chunk)?;
        if let Some(v) = verifier.as_deref_mut() {
            v.update(chunk);
        }
        copied += n as u64;
        progress.inc(n as u64);
    }

    writer.flush()?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";

    fn release_with(sha256: Option<&str>, md5: Option<&str>) -> Release {
        serde_json::from_value(json!({
            "title": "1.0.0",
            "path": "/x",
            "sha256": sha256,
            "md5": md5,
        }))
        .unwrap()
    }

    #[test]
    fn test_sha256_preferred_over_md5() {
        let checksum = Checksum::for_release(&release_with(Some(HELLO_SHA256), Some(HELLO_MD5)))
            .unwrap();
        assert_eq!(checksum.kind, ChecksumKind::Sha256);
        assert_eq!(checksum.expected, HELLO_SHA256);
    }

    #[test]
    fn test_md5_fallback_and_unverifiable() {
        let checksum = Checksum::for_release(&release_with(None, Some(HELLO_MD5))).unwrap();
        assert_eq!(checksum.kind, ChecksumKind::Md5);

        assert!(Checksum::for_release(&release_with(None, None)).is_none());
        assert!(Checksum::for_release(&release_with(Some(""), None)).is_none());
    }

    #[test]
    fn test_verifier_digests() {
        for (kind, expected) in [
            (ChecksumKind::Sha256, HELLO_SHA256),
            (ChecksumKind::Md5, HELLO_MD5),
        ] {
            let checksum = Checksum {
                kind,
                expected: expected.to_uppercase(),
            };
            let mut verifier = checksum.verifier();
            verifier.update(b"hel");
            verifier.update(b"lo");
            let actual = verifier.finalize();
            assert_eq!(actual, expected);
            assert!(checksum.matches(&actual));
        }
    }

    #[test]
    fn test_stream_to_chunks_large_payload() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let checksum = Checksum {
            kind: ChecksumKind::Sha256,
            expected: hex::encode(Sha256::digest(&payload)),
        };
        let mut verifier = checksum.verifier();
        let mut out = Vec::new();

        let copied = stream_to(
            &mut Cursor::new(payload.clone()),
            &mut out,
            Some(&mut verifier),
            &ProgressBar::hidden(),
        )
        .unwrap();

        assert_eq!(copied, payload.len() as u64);
        assert_eq!(out, payload);
        assert!(checksum.matches(&verifier.finalize()));
    }

    #[test]
    fn test_destination_parse() {
        assert_eq!(Destination::parse("-"), Destination::Stdout);
        assert_eq!(
            Destination::parse("out.tgz"),
            Destination::File(PathBuf::from("out.tgz"))
        );
        assert_eq!(
            Destination::default_for("my_app", "2.0.1").to_string(),
            "my_app-2.0.1.tgz"
        );
        assert!(Destination::Stdout.as_path().is_none());
    }
}

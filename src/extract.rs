// Unpacking of downloaded `.tgz` app packages.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

/// Unpack the gzip-compressed tarball at `archive` into `dest`, then delete
/// the archive.
pub fn extract_archive(archive: &Path, dest: &Path) -> io::Result<()> {
    debug!(archive = %archive.display(), dest = %dest.display(), "extracting");
    {
        let file = File::open(archive)?;
        let mut tar = Archive::new(GzDecoder::new(file));
        tar.unpack(dest)?;
    }
    fs::remove_file(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn build_tgz(path: &Path) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let body = b"[launcher]\nversion = 1.2.3\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "my_app/default/app.conf", &body[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_extract_and_remove_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("my_app-1.2.3.tgz");
        build_tgz(&archive);

        let out = dir.path().join("apps");
        fs::create_dir(&out).unwrap();
        extract_archive(&archive, &out).unwrap();

        let conf = fs::read_to_string(out.join("my_app/default/app.conf")).unwrap();
        assert!(conf.contains("version = 1.2.3"));
        assert!(!archive.exists());
    }

    #[test]
    fn test_corrupt_archive_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.tgz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        assert!(extract_archive(&archive, dir.path()).is_err());
        assert!(archive.exists());
    }
}

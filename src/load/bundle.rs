use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use tar::Archive;

/// Unpack a `.tar.gz` bundle into `dest_dir`.
pub fn unpack_bundle(bundle_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(bundle_path)
        .with_context(|| format!("opening bundle {}", bundle_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive
        .unpack(dest_dir)
        .with_context(|| format!("unpacking bundle {}", bundle_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn unpacks_single_member_tarball() -> Result<()> {
        let dir = tempdir()?;

        let mut gz_bytes = Vec::new();
        {
            let enc = GzEncoder::new(&mut gz_bytes, Compression::default());
            let mut tar = tar::Builder::new(enc);
            let data = b"{\"metadata\": {}}";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            tar.append_data(&mut header, "run1.flent", &data[..])?;
            tar.into_inner()?.finish()?;
        }
        let bundle = dir.path().join("run1.tar.gz");
        fs::write(&bundle, gz_bytes)?;

        let dest = tempdir()?;
        unpack_bundle(&bundle, dest.path())?;

        let member = dest.path().join("run1.flent");
        assert!(member.is_file());
        assert_eq!(fs::read(member)?, b"{\"metadata\": {}}");
        Ok(())
    }

    #[test]
    fn garbage_input_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let bundle = dir.path().join("bad.tar.gz");
        fs::write(&bundle, b"not gzip at all")?;

        let dest = tempdir()?;
        assert!(unpack_bundle(&bundle, dest.path()).is_err());
        Ok(())
    }
}

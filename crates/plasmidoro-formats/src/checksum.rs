use std::path::Path;

/// Hex MD5 digest of `bytes`; 32 lowercase characters.
pub fn footprint(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Footprint of a file's raw, on-disk bytes.
pub fn file_footprint(path: &Path) -> std::io::Result<String> {
    Ok(footprint(&std::fs::read(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_is_md5_hex() {
        assert_eq!(footprint(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(footprint(b"ACGT").len(), 32);
        assert_ne!(footprint(b"ACGT"), footprint(b"ACGA"));
    }

    #[test]
    fn test_file_footprint_ignores_path() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.gb");
        let b = dir.path().join("b.fa");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();
        assert_eq!(file_footprint(&a).unwrap(), file_footprint(&b).unwrap());
    }
}

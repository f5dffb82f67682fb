use std::io::Write as _;
use std::path::Path;

/// Formats an optional f64 to 4 decimal places, or returns "—" if None or non-finite.
pub fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:.4}"),
        _ => "—".to_owned(),
    }
}

/// Writes `contents` to `path` so that readers never observe a partial file.
///
/// The bytes go to a sibling temporary file which is flushed and then
/// renamed over the destination. Parent directories are created as needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Not a file path: {}", path.display()),
            )
        })?;
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp_path);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_opt() {
        assert_eq!(fmt_opt(Some(1.5)), "1.5000");
        assert_eq!(fmt_opt(None), "—");
        assert_eq!(fmt_opt(Some(f64::NAN)), "—");
    }

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("report.html");

        write_atomic(&path, b"first")?;
        write_atomic(&path, b"second")?;

        assert_eq!(std::fs::read_to_string(&path)?, "second");
        let leftovers = std::fs::read_dir(path.parent().unwrap_or(dir.path()))?.count();
        assert_eq!(leftovers, 1, "temporary file should be gone");
        Ok(())
    }
}

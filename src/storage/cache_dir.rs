use std::path::{Path, PathBuf};

/// Default state directory, relative to the build root
pub const DEFAULT_STATE_DIR: &str = ".snb";

/// Resolve the state directory for a build root
///
/// Relative directories live under the build root; absolute ones are used as-is.
pub fn state_dir(build_root: &Path, dir: &str) -> PathBuf {
    let dir = Path::new(dir);
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        build_root.join(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_dir_under_build_root() {
        let dir = state_dir(Path::new("/work/project"), DEFAULT_STATE_DIR);
        assert_eq!(dir, PathBuf::from("/work/project/.snb"));
    }

    #[test]
    fn test_absolute_state_dir() {
        let dir = state_dir(Path::new("/work/project"), "/tmp/.snb-cache");
        assert_eq!(dir, PathBuf::from("/tmp/.snb-cache"));
    }
}

//! Configuration access port trait.

use std::path::{Path, PathBuf};

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Directory that relative paths are resolved against.
    fn base_dir(&self) -> Option<&Path> {
        None
    }

    /// A path value, resolved against [`ConfigPort::base_dir`] when relative.
    fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        let raw = PathBuf::from(self.get_string(section, key)?);
        match self.base_dir() {
            Some(base) if raw.is_relative() => Some(base.join(raw)),
            _ => Some(raw),
        }
    }
}

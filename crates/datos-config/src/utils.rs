use std::{env, path::PathBuf};

pub const DEFAULT_API_URL: &str = "http://datos.gob.es/apidata";

/// Returns the user's config directory, honouring `XDG_CONFIG_HOME` and
/// falling back to `$HOME/.config`.
pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

use std::path::PathBuf;

pub const DEFAULT_SERVER_PORT: u16 = 10101;
const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

pub fn default_server_address() -> String {
    format!("{}:{}", DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT)
}

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/mediatree/ (XDG standard)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("mediatree")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mediatree")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("mediatree")
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mediatree")
    }
}

pub fn log_path() -> PathBuf {
    data_dir().join("mediatree.log")
}

/// Default location of the coordination config, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/coordination.toml";

/// Parses the config file path from command-line arguments
pub fn get_config_path(default: &str) -> String {
    config_path_from(std::env::args().skip(1), default)
}

fn config_path_from<I: Iterator<Item = String>>(mut args: I, default: &str) -> String {
    match args.next() {
        Some(path) if !path.trim().is_empty() => path,
        _ => default.to_string(),
    }
}

use tracing::level_filters::LevelFilter;

const LOG_LEVEL: &str = "DOGAN_LOG_LEVEL";

const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

pub fn get_log_level() -> LevelFilter {
    let level_from_env = std::env::var(LOG_LEVEL);
    level_from_env.map_or(DEFAULT_LOG_LEVEL, |res| parse_log_level(&res))
}

fn parse_log_level(raw: &str) -> LevelFilter {
    raw.trim().parse().unwrap_or(DEFAULT_LOG_LEVEL)
}

const CONFIG_FILE: &str = "DOGAN_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "/etc/dogan/config.toml";

pub fn get_config_file() -> String {
    std::env::var(CONFIG_FILE).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
}

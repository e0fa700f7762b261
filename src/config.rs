use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const DEFAULT_JSON_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub practice_gen_enabled: bool,
    pub instruction_language_enabled: bool,
    pub json_body_limit: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let practice_gen_enabled = env_bool("PRACTICE_GEN_ENABLED").unwrap_or(true);
        let instruction_language_enabled =
            env_bool("FEATURE_INSTRUCTION_LANGUAGE").unwrap_or(true);

        let json_body_limit = std::env::var("JSON_BODY_LIMIT")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_JSON_BODY_LIMIT);

        Self {
            host,
            port,
            log_level,
            practice_gen_enabled,
            instruction_language_enabled,
            json_body_limit,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

pub fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return None;
    }
    match normalized.as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

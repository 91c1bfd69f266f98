use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

pub const DEFAULT_URL: &str = "https://www-genesis.destatis.de/genesisWS/rest/2020";

/// Connection settings, resolved once and handed to the [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the REST interface, typically [`DEFAULT_URL`].
    pub url: String,
    pub username: String,
    pub password: String,
    /// Where fetched data is cached. `None` disables the file cache.
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct RcConfig {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    cache_dir: Option<String>,
}

pub(crate) fn load_config(
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
) -> Result<ClientConfig> {
    let mut url = url.or_else(|| std::env::var("GENESIS_URL").ok());
    let mut username = username.or_else(|| std::env::var("GENESIS_USERNAME").ok());
    let mut password = password.or_else(|| std::env::var("GENESIS_PASSWORD").ok());
    let mut cache_dir = std::env::var("GENESIS_CACHE_DIR").ok();

    let rc_candidates = rc_candidates();

    if url.is_none() || username.is_none() || password.is_none() || cache_dir.is_none() {
        for rc_path in &rc_candidates {
            if rc_path.exists() {
                let cfg = read_rc(rc_path).with_context(|| {
                    format!("failed to read configuration file {}", rc_path.display())
                })?;

                url = url.or(cfg.url);
                username = username.or(cfg.username);
                password = password.or(cfg.password);
                cache_dir = cache_dir.or(cfg.cache_dir);
                break;
            }
        }
    }

    let searched = rc_candidates
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let Some(username) = username.filter(|v| !v.is_empty()) else {
        bail!(
            "Missing configuration: username (set GENESIS_USERNAME or put `username:` in one of: {})",
            searched
        );
    };
    let Some(password) = password.filter(|v| !v.is_empty()) else {
        bail!(
            "Missing configuration: password (set GENESIS_PASSWORD or put `password:` in one of: {})",
            searched
        );
    };

    let cache_dir = cache_dir
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".genesis").join("data")));

    Ok(ClientConfig {
        url: url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        username,
        password,
        cache_dir,
    })
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // Support formatting where `password:` is on one line and the value on the next.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            if !line.contains(':') {
                cfg.set(pk, strip_quotes(line));
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                pending_key = Some(k);
            } else {
                cfg.set(k, v);
            }
        }
    }

    cfg
}

impl RcConfig {
    fn set(&mut self, key: &str, value: &str) {
        let value = Some(value.to_string());
        match key {
            "url" => self.url = value,
            "username" | "user" => self.username = value,
            "password" => self.password = value,
            "cache_dir" => self.cache_dir = value,
            _ => {}
        }
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) GENESIS_RC (explicit)
    // 2) ./.genesisrc
    // 3) ~/.genesisrc
    if let Ok(p) = std::env::var("GENESIS_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".genesisrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".genesisrc"));
    }
    v
}

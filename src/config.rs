// elastic-health - Node inventory report for Elasticsearch clusters
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::node;
use anyhow::{Context, Result};
use dirs::config_dir;
use reqwest::Url;
use serde::Deserialize;
use std::{
    env, fmt, fs,
    net::Ipv6Addr,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 9200;
pub const CONFIG_DIR_ENV: &str = "ELASTIC_HEALTH_CONFIG_DIR";

/// Defaults read from the user and project config files.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub insecure: Option<bool>,
    pub verify_tls: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("a server name or address is required")]
    MissingServer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
        }
    }
}

/// Where and how to query for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub scheme: Scheme,
    pub server: String,
    pub port: u16,
    pub verify_tls: bool,
}

impl QueryTarget {
    /// `<scheme>://<server>:<port>/_nodes?human`
    pub fn nodes_url(&self) -> Result<Url> {
        let host = if self.server.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", self.server)
        } else {
            self.server.clone()
        };
        let base = format!("{}://{}:{}/", self.scheme, host, self.port);
        let mut url = Url::parse(&base)
            .and_then(|u| u.join("_nodes"))
            .with_context(|| format!("building nodes URL from `{base}`"))?;
        url.set_query(Some("human"));
        Ok(url)
    }

    pub fn domain_suffix(&self) -> &str {
        node::domain_suffix(&self.server)
    }
}

/// Config file path for `scope`, or `None` when the user has no config dir.
pub fn config_path(scope: Scope, cwd: &Path) -> Option<PathBuf> {
    match scope {
        Scope::Local => Some(cwd.join(".elastic-health.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var(CONFIG_DIR_ENV) {
                return Some(PathBuf::from(custom).join("config.yaml"));
            }
            config_dir().map(|base| base.join("elastic-health").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = load_scope(Scope::User, cwd)?;
    let local = load_scope(Scope::Local, cwd)?;
    Ok(merge(user, local))
}

pub fn load_scope(scope: Scope, cwd: &Path) -> Result<Config> {
    match config_path(scope, cwd) {
        Some(path) => Ok(read_if_exists(&path)?.unwrap_or_default()),
        None => Ok(Config::default()),
    }
}

/// Layers command-line values over the config files and fills in defaults.
pub fn resolve(cwd: &Path, overrides: Config) -> Result<QueryTarget> {
    let merged = merge(load(cwd)?, overrides);

    let server = merged
        .server
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::MissingServer)?;

    let scheme = if merged.insecure.unwrap_or(false) {
        Scheme::Http
    } else {
        Scheme::Https
    };

    Ok(QueryTarget {
        scheme,
        server,
        port: merged.port.unwrap_or(DEFAULT_PORT),
        verify_tls: merged.verify_tls.unwrap_or(true),
    })
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

/// Values in `over` win over values in `base`.
fn merge(base: Config, over: Config) -> Config {
    Config {
        server: over.server.or(base.server),
        port: over.port.or(base.port),
        insecure: over.insecure.or(base.insecure),
        verify_tls: over.verify_tls.or(base.verify_tls),
    }
}

//! Configuração do farmhand carregada a partir de `farmhand.toml`.
//!
//! A struct [`FarmhandConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `FARMHAND_TOKEN` e `FARMHAND_POLL_DELAY` têm
//! precedência sobre o arquivo e são resolvidas uma única vez no load — o
//! núcleo de polling recebe um [`WatchConfig`] explícito por injeção de
//! construtor, sem estado global.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

/// Parâmetros do loop de polling, injetados em cada watcher.
#[derive(Debug, Clone, Copy)]
pub struct WatchConfig {
    /// Teto em milissegundos do atraso aleatorizado entre polls.
    pub poll_delay_ms: u64,
    /// Teto de relógio de parede para um watch inteiro.
    pub timeout: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_delay_ms: default_poll_delay_ms(),
            timeout: Duration::from_secs(default_watch_timeout_mins() * 60),
        }
    }
}

/// Configuração de nível superior carregada de `farmhand.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct FarmhandConfig {
    /// URL base da API do compute farm.
    #[serde(default)]
    pub api_url: String,

    /// Token de autenticação enviado como bearer em toda requisição.
    #[serde(default)]
    pub token: String,

    /// Teto em milissegundos do atraso aleatorizado entre polls de status.
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,

    /// Teto em minutos de relógio de parede para um watch inteiro.
    #[serde(default = "default_watch_timeout_mins")]
    pub watch_timeout_mins: u64,
}

// Valor padrão para o teto de atraso entre polls: 30s.
fn default_poll_delay_ms() -> u64 {
    30_000
}

// Valor padrão para o teto de um watch: 180 minutos.
fn default_watch_timeout_mins() -> u64 {
    180
}

impl Default for FarmhandConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            token: String::new(),
            poll_delay_ms: default_poll_delay_ms(),
            watch_timeout_mins: default_watch_timeout_mins(),
        }
    }
}

impl FarmhandConfig {
    /// Carrega a configuração de `farmhand.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("farmhand.toml"))
    }

    /// Carrega a configuração do caminho dado, aplicando as variáveis
    /// de ambiente por cima.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<FarmhandConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variáveis de ambiente têm precedência sobre o arquivo de configuração.
        if let Ok(token) = std::env::var("FARMHAND_TOKEN")
            && !token.is_empty()
        {
            config.token = token;
        }
        if let Ok(delay) = std::env::var("FARMHAND_POLL_DELAY")
            && let Ok(ms) = delay.parse::<u64>()
        {
            config.poll_delay_ms = ms;
        }

        Ok(config)
    }

    /// Deriva o [`WatchConfig`] injetado nos watchers.
    pub fn watch(&self) -> WatchConfig {
        WatchConfig {
            poll_delay_ms: self.poll_delay_ms,
            timeout: Duration::from_secs(self.watch_timeout_mins * 60),
        }
    }
}

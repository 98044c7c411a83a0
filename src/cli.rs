//! Interface de linha de comando do farmhand baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, status)
//! e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// farmhand — cliente para submeter e acompanhar jobs em um compute farm.
#[derive(Debug, Parser)]
#[command(name = "farmhand", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho para o arquivo de configuração (padrão: ./farmhand.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submete os jobs definidos no arquivo e acompanha até o fim.
    Run {
        /// Arquivo TOML com as definições de job ([[jobs]]).
        #[arg(long)]
        file: PathBuf,
    },

    /// Consulta o status atual de uma submissão.
    Status {
        /// Chave atribuída pelo servidor na submissão.
        key: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_run_subcommand() {
        let cli = Cli::parse_from(["farmhand", "run", "--file", "jobs.toml"]);
        match cli.command {
            Command::Run { file } => {
                assert_eq!(file, PathBuf::from("jobs.toml"));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "farmhand",
            "--config",
            "/etc/farmhand.toml",
            "--verbose",
            "status",
            "k-42",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/farmhand.toml")));
        match cli.command {
            Command::Status { key } => assert_eq!(key, "k-42"),
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}

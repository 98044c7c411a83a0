//! Tipos de erro para o cliente da API do compute farm.
//!
//! Define [`ApiError`] com variantes para requisições inválidas (HTTP 400),
//! erros genéricos da API e erros de rede. Usa `thiserror` para derivar
//! `Display` e `Error` automaticamente a partir dos atributos `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com a API do farm.
///
/// As variantes cobrem os três cenários de falha do transporte:
/// - [`BadRequest`](ApiError::BadRequest) — o servidor retornou HTTP 400;
///   a entrada do chamador era inválida e a requisição nunca é retentada
/// - [`Api`](ApiError::Api) — qualquer outro erro HTTP (4xx/5xx)
/// - [`Network`](ApiError::Network) — falha na camada de rede
#[derive(Debug, Error)]
pub enum ApiError {
    /// O servidor rejeitou a requisição como malformada (HTTP 400).
    /// Contém a mensagem do corpo estruturado de erro.
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// Erro retornado pela API (ex.: 401 token inválido, 500 erro interno).
    /// Contém o código de status HTTP e o corpo da resposta.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    /// Encapsula o erro original do `reqwest` via `#[from]`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

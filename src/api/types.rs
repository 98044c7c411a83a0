//! Tipos de dados para requisições e respostas da API do compute farm.
//!
//! Todas as structs derivam `Serialize` e `Deserialize` para conversão JSON
//! conforme o formato esperado pelos endpoints `/jobs` e `/jobs/{key}/status`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::JobKind;

/// Corpo da requisição de submissão em lote para o endpoint `/jobs`.
///
/// Uma única requisição carrega todos os jobs do lote, independentemente
/// da quantidade — a submissão é sempre uma só viagem de rede.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Jobs a registrar, na ordem de submissão.
    pub jobs: Vec<JobPayload>,
}

/// Um job individual dentro de uma requisição de submissão.
///
/// O `client_token` é gerado pelo cliente e usado para casar cada entrada
/// da resposta com o job correspondente — nunca pela posição no array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    /// Token de idempotência gerado pelo cliente.
    pub client_token: Uuid,
    /// Tipo do job: "build" ou "test".
    pub kind: JobKind,
    /// URL do repositório git a construir.
    pub git_repo: String,
    /// Referência simbólica (ex.: "main"). Mutuamente exclusiva com `git_sha`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// Revisão exata. Mutuamente exclusiva com `git_ref`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
    /// Arquitetura alvo (ex.: "arm64").
    pub target_arch: String,
    /// Toolchain a usar (ex.: "gcc-12").
    pub toolchain: String,
    /// Variáveis de ambiente repassadas ao job, opacas para o cliente.
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub environment: std::collections::BTreeMap<String, String>,
}

/// Resposta do endpoint `/jobs` para uma submissão em lote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Uma entrada por job registrado. O servidor pode reordenar.
    pub jobs: Vec<SubmittedJob>,
}

/// Uma entrada da resposta de submissão: o token do cliente ecoado de volta
/// e a chave atribuída pelo servidor para consultas de status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedJob {
    /// Token de idempotência ecoado pelo servidor.
    pub client_token: Uuid,
    /// Chave atribuída pelo servidor, usada em todos os polls subsequentes.
    pub key: String,
}

/// Documento de status reportado pelo servidor para um job.
///
/// Substituído por inteiro a cada poll — nunca mesclado campo a campo.
/// Campos desconhecidos vão para o balde `extra` via `serde(flatten)`,
/// de modo que renomeações no servidor falham de forma previsível em vez
/// de sumirem silenciosamente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDocument {
    /// Estado atual reportado ("queued", "building", "complete", ...).
    pub state: String,
    /// Classificação do desfecho ("pass", "fail"), presente só ao terminar.
    #[serde(default)]
    pub result: Option<String>,
    /// Contagem de warnings reportada.
    #[serde(default)]
    pub warnings_count: u32,
    /// Contagem de erros reportada.
    #[serde(default)]
    pub errors_count: u32,
    /// Mensagem humana do servidor descrevendo o status.
    #[serde(default)]
    pub status_message: String,
    /// Campos extras não reconhecidos pelo cliente.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Corpo estruturado de erro retornado em respostas HTTP 400.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Mensagem de erro do servidor.
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> JobPayload {
        JobPayload {
            client_token: Uuid::new_v4(),
            kind: JobKind::Build,
            git_repo: "https://git.example.com/kernel.git".into(),
            git_ref: Some("main".into()),
            git_sha: None,
            target_arch: "arm64".into(),
            toolchain: "gcc-12".into(),
            environment: Default::default(),
        }
    }

    #[test]
    fn submit_request_roundtrip() {
        let req = SubmitRequest {
            jobs: vec![payload()],
        };
        let json = serde_json::to_string(&req).unwrap();
        let parsed: SubmitRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.jobs.len(), 1);
        assert_eq!(parsed.jobs[0].git_repo, "https://git.example.com/kernel.git");
        assert_eq!(parsed.jobs[0].toolchain, "gcc-12");
    }

    #[test]
    fn payload_omits_absent_revision_fields() {
        let json = serde_json::to_string(&payload()).unwrap();
        assert!(json.contains(r#""git_ref""#));
        assert!(!json.contains(r#""git_sha""#));
        assert!(json.contains(r#""kind":"build""#));
    }

    #[test]
    fn status_document_parses_api_format() {
        let api_json = r#"{
            "state": "complete",
            "result": "pass",
            "warnings_count": 2,
            "errors_count": 0,
            "status_message": "build completed"
        }"#;
        let doc: StatusDocument = serde_json::from_str(api_json).unwrap();
        assert_eq!(doc.state, "complete");
        assert_eq!(doc.result.as_deref(), Some("pass"));
        assert_eq!(doc.warnings_count, 2);
        assert!(doc.extra.is_empty());
    }

    #[test]
    fn status_document_collects_unknown_fields() {
        let api_json = r#"{
            "state": "building",
            "download_url": "https://farm.example.com/artifacts/abc",
            "duration": 912
        }"#;
        let doc: StatusDocument = serde_json::from_str(api_json).unwrap();
        assert_eq!(doc.state, "building");
        assert_eq!(doc.result, None);
        assert_eq!(doc.warnings_count, 0);
        assert_eq!(
            doc.extra.get("download_url").and_then(|v| v.as_str()),
            Some("https://farm.example.com/artifacts/abc")
        );
    }

    #[test]
    fn submit_response_roundtrip() {
        let token = Uuid::new_v4();
        let resp = SubmitResponse {
            jobs: vec![SubmittedJob {
                client_token: token,
                key: "k-123".into(),
            }],
        };
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: SubmitResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.jobs[0].client_token, token);
        assert_eq!(parsed.jobs[0].key, "k-123");
    }
}

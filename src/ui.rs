//! Interface de terminal do farmhand — spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner de progresso e `console` para
//! estilização com cores. O [`WatchProgress`] acompanha visualmente o
//! stream de eventos de um watch no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::event::{Outcome, StateEvent};

/// Indicador visual de progresso para um stream de eventos no terminal.
///
/// Exibe um spinner animado enquanto os jobs rodam e mensagens coloridas
/// por evento: sucesso (verde), falha (vermelho), retentativa e warnings
/// (amarelo).
pub struct WatchProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para desfechos de sucesso.
    green: Style,
    // Estilo vermelho para falhas.
    red: Style,
    // Estilo amarelo para retentativas e warnings.
    yellow: Style,
    // Estilo ciano para estados de execução.
    cyan: Style,
    // Estilo neutro para estados de espera.
    plain: Style,
}

impl WatchProgress {
    /// Inicia o spinner com uma descrição do lote e retorna a instância.
    pub fn start(description: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(description.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            cyan: Style::new().cyan(),
            plain: Style::new(),
        }
    }

    /// Exibe um evento observado. Eventos finais encerram a linha do job
    /// com o desfecho; os demais são impressos acima do spinner.
    pub fn event(&self, event: &StateEvent) {
        let style = self.style_for(event);
        if event.is_final {
            self.pb.println(format!(
                "  {} {}: {}",
                style.apply_to(event.icon),
                style.apply_to(&event.message),
                event.job
            ));
        } else {
            self.pb.println(format!(
                "  {} {}: {}",
                style.apply_to(event.icon),
                event.message,
                event.job
            ));
            self.pb.set_message(format!("{}: {}", event.message, event.job));
        }
    }

    /// Finaliza o spinner e imprime os desfechos em JSON formatado.
    pub fn finish(&self, finals: &[StateEvent]) {
        self.pb.finish_and_clear();
        let ok = finals
            .iter()
            .filter(|e| matches!(e.status, Some(Outcome::Pass) | Some(Outcome::Warning)))
            .count();
        let summary = format!("─── {ok}/{} jobs passed ───", finals.len());
        if ok == finals.len() {
            println!("{}", self.green.apply_to(summary));
        } else {
            println!("{}", self.red.apply_to(summary));
        }
        println!(
            "{}",
            serde_json::to_string_pretty(finals).unwrap_or_default()
        );
    }

    // Mapeia a dica de cor do evento para um estilo do terminal.
    fn style_for(&self, event: &StateEvent) -> &Style {
        match event.color {
            "green" => &self.green,
            "red" => &self.red,
            "yellow" => &self.yellow,
            "cyan" => &self.cyan,
            _ => &self.plain,
        }
    }
}

//! Intake Console
//!
//! Runs one intake conversation in the terminal. Prompts are printed instead of spoken
//! and every line typed on stdin is a text-fallback answer. Control lines:
//! `/restart`, `/mic`, `/status`, `/quit`.
//!
//! Set `INTAKE_OFFLINE=1` (or pass `--offline`) to issue local ticket ids instead of
//! posting to `INTAKE_SUBMISSION_URL`.

use intake_voice::{
    EventSender, HttpSubmissionGateway, IntakeConfig, IntakeError, IntakeResult, IntakeRuntime,
    OfflineGateway, SessionEvent, SubmissionGateway, Synthesizer, UnavailableRecognizer,
    Utterance,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prints each prompt and reports it finished straight away.
struct ConsoleSynthesizer;

impl Synthesizer for ConsoleSynthesizer {
    fn speak(&mut self, utterance: Utterance, events: EventSender) -> IntakeResult<()> {
        println!("bot > {}", utterance.text);
        events
            .send(SessionEvent::SynthesisDone {
                utterance: utterance.id,
            })
            .map_err(|e| IntakeError::ChannelSend(e.to_string()))
    }

    fn cancel(&mut self) {}
}

fn offline_requested() -> bool {
    std::env::args().any(|a| a == "--offline")
        || std::env::var("INTAKE_OFFLINE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
}

#[tokio::main]
async fn main() -> IntakeResult<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[intake-console] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,intake=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = IntakeConfig::load()?;
    let gateway: Arc<dyn SubmissionGateway> = if offline_requested() {
        tracing::info!("offline mode: tickets are issued locally");
        Arc::new(OfflineGateway)
    } else {
        let http = HttpSubmissionGateway::from_config(&config)?;
        tracing::info!(url = %http.url(), "submitting to ticket backend");
        Arc::new(http)
    };

    let runtime = IntakeRuntime::new(
        config,
        Box::new(UnavailableRecognizer),
        Box::new(ConsoleSynthesizer),
        gateway,
    );
    let handle = runtime.handle();
    let session = tokio::spawn(runtime.run());

    // Surface alerts and the ticket id as they change.
    let mut status = handle.watch_status();
    tokio::spawn(async move {
        let mut last_alert = None;
        let mut last_ticket = None;
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            if current.alert.is_some() && current.alert != last_alert {
                if let Some(alert) = &current.alert {
                    eprintln!("!   {}", alert);
                }
            }
            if current.ticket_id.is_some() && current.ticket_id != last_ticket {
                if let Some(id) = &current.ticket_id {
                    eprintln!("#   ticket {}", id);
                }
            }
            last_alert = current.alert;
            last_ticket = current.ticket_id;
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let sent = match line.trim() {
                    "/quit" => break,
                    "/restart" => handle.restart(),
                    "/mic" => handle.toggle_mic(),
                    "/status" => {
                        let s = handle.status();
                        println!("state={} mode={:?} ticket={}", s.state, s.mode, s.ticket_id.as_deref().unwrap_or("-"));
                        Ok(())
                    }
                    _ => handle.submit_text(line.as_str()),
                };
                if let Err(e) = sent {
                    tracing::warn!(error = %e, "intake loop is gone");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down");
                break;
            }
        }
    }

    // The loop may already have stopped on its own.
    let _ = handle.shutdown();
    match session.await {
        Ok(Ok(snapshot)) => {
            tracing::info!(
                state = %snapshot.state,
                messages = snapshot.transcript.len(),
                submissions = snapshot.submissions,
                "session closed"
            );
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(e) => Err(IntakeError::ChannelReceive(e.to_string())),
    }
}

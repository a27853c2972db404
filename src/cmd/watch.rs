//! Live project events: `futureproof watch <project_id>`.

use anyhow::Result;
use console::style;
use std::sync::Arc;
use tokio::sync::broadcast;

use futureproof::channel::{
    ChannelMessage, ConnectionState, ProjectEvent, ReconnectingChannel, WebSocketConnector,
};
use futureproof::config::Config;
use futureproof::ui::icons::PLUG;

pub async fn cmd_watch(config: &Config, project_id: i64, ping: bool, raw: bool) -> Result<()> {
    let mut channel = ReconnectingChannel::activate(
        Arc::new(WebSocketConnector),
        &config.ws_url,
        &format!("/ws/{}", project_id),
        config.reconnect.clone(),
    );
    eprintln!(
        "{}Watching {} (Ctrl-C to stop)",
        PLUG,
        style(channel.url()).underlined()
    );

    let mut states = channel.state_changes();
    let mut messages = channel.subscribe();
    let mut pinged = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                eprintln!("{} {}", style("●").dim(), state_label(state));
                if state == ConnectionState::Connected && ping && !pinged {
                    pinged = channel.send_text("ping");
                }
            }
            received = messages.recv() => match received {
                Ok(message) => println!("{}", format_message(&message, raw)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped channel messages while printing");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    channel.deactivate().await;
    Ok(())
}

fn state_label(state: ConnectionState) -> String {
    match state {
        ConnectionState::Connecting => style("connecting").yellow().to_string(),
        ConnectionState::Connected => style("connected").green().to_string(),
        ConnectionState::Disconnected => style("disconnected").red().to_string(),
    }
}

fn format_message(message: &ChannelMessage, raw: bool) -> String {
    if raw {
        return serde_json::to_string(message).unwrap_or_else(|_| message.kind.clone());
    }
    match message.event() {
        Some(ProjectEvent::Connected { project_name, .. }) => format!(
            "Connected to {}",
            project_name.as_deref().unwrap_or("project")
        ),
        Some(ProjectEvent::Pong { .. }) => "pong".to_string(),
        Some(ProjectEvent::Status { status, .. }) => format!("Project status: {}", status),
        Some(ProjectEvent::TransformationStarted { mode }) => format!(
            "Transformation started ({})",
            mode.as_deref().unwrap_or("standard")
        ),
        Some(ProjectEvent::TransformationCompleted { files_count, .. }) => format!(
            "Transformation completed: {} files",
            files_count.unwrap_or_default()
        ),
        Some(ProjectEvent::TransformationFailed { error }) => format!(
            "Transformation failed: {}",
            error.as_deref().unwrap_or("unknown error")
        ),
        Some(ProjectEvent::MlTransformationStarted {
            ml_frameworks,
            target,
        }) => format!(
            "ML transformation started: {} → {}",
            ml_frameworks.join(", "),
            target.as_deref().unwrap_or("pytorch")
        ),
        None => match message.text() {
            Some(text) => format!("[{}] {}", message.kind, text),
            None => format!("[{}]", message.kind),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ChannelMessage {
        ChannelMessage::parse(text).unwrap()
    }

    #[test]
    fn test_format_known_events() {
        let msg = parse(r#"{"type":"transformation_completed","files_count":3}"#);
        assert_eq!(format_message(&msg, false), "Transformation completed: 3 files");

        let msg = parse(r#"{"type":"connected","project_id":1,"project_name":"widgets"}"#);
        assert_eq!(format_message(&msg, false), "Connected to widgets");
    }

    #[test]
    fn test_format_unknown_event_uses_message_text() {
        let msg = parse(r#"{"type":"agent_progress","message":"50% done"}"#);
        assert_eq!(format_message(&msg, false), "[agent_progress] 50% done");
    }

    #[test]
    fn test_format_raw() {
        let msg = parse(r#"{"type":"pong","project_id":4}"#);
        let raw = format_message(&msg, true);
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["type"], "pong");
        assert_eq!(value["project_id"], 4);
    }
}

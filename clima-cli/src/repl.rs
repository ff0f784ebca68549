use clima_core::{AppEvent, EventSender};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinHandle,
};
use tracing::warn;

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Search(String),
    Here,
    Quit,
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        ":here" | ":h" => Input::Here,
        ":quit" | ":q" => Input::Quit,
        _ => Input::Search(line.to_string()),
    }
}

/// Feed stdin lines to the controller until `:quit` or end of input.
pub fn spawn_input(events: EventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "failed to read input");
                    break;
                }
            };

            let sent = match parse_input(&line) {
                Input::Search(text) => events
                    .send(AppEvent::SearchEdited(text))
                    .and_then(|()| events.send(AppEvent::SearchSubmitted)),
                Input::Here => events.send(AppEvent::LocationPressed),
                Input::Quit => break,
            };

            if sent.is_err() {
                return;
            }
        }

        let _ = events.send(AppEvent::Shutdown);
    })
}

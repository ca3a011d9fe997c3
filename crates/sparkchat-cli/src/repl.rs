//! Interactive chat loop.
//!
//! Input lines, interrupts and the in-flight completion are multiplexed with
//! `tokio::select!`, so the loop keeps reading input while a request runs. Lines come from
//! [`crate::input`], which keeps blocking reads off the runtime.

use std::future::Future;
use std::io::Write;
use std::pin::Pin;

use anyhow::Result;
use sparkchat_core::{ChatCompletion, ChatError, ChatSession, CompletionOutcome, Notification};
use tokio::sync::mpsc;

use crate::input::InputLines;
use crate::render;
use crate::slash_commands::{help_text, SlashCommand};

type InFlight<'a> = Pin<Box<dyn Future<Output = CompletionOutcome> + Send + 'a>>;

pub struct Repl<'a, W: Write> {
    chat: ChatSession,
    client: &'a dyn ChatCompletion,
    notifications: mpsc::UnboundedReceiver<Notification>,
    api_base: String,
    out: W,
}

enum Flow {
    Continue,
    Quit,
}

async fn wait_in_flight(in_flight: &mut Option<InFlight<'_>>) -> CompletionOutcome {
    match in_flight {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

impl<'a, W: Write> Repl<'a, W> {
    pub fn new(
        chat: ChatSession,
        client: &'a dyn ChatCompletion,
        notifications: mpsc::UnboundedReceiver<Notification>,
        api_base: &str,
        out: W,
    ) -> Self {
        Self {
            chat,
            client,
            notifications,
            api_base: api_base.to_string(),
            out,
        }
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs until `/quit`, end of input, or an interrupt while idle.
    ///
    /// An interrupt while a request is pending cancels that request instead.
    pub async fn run(
        &mut self,
        mut lines: InputLines,
        mut interrupts: mpsc::UnboundedReceiver<()>,
    ) -> Result<()> {
        let mut in_flight: Option<InFlight<'a>> = None;

        self.write_header()?;
        writeln!(self.out, "{}", render::welcome(self.chat.has_credential()))?;
        self.out.flush()?;

        loop {
            tokio::select! {
                biased;

                outcome = wait_in_flight(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    self.complete(outcome)?;
                }
                Some(()) = interrupts.recv() => {
                    if !self.chat.cancel() {
                        log::info!("Interrupted while idle, exiting");
                        break;
                    }
                }
                line = lines.recv() => {
                    let Some(line) = line else {
                        // Input closed: let the pending reply land before leaving.
                        if let Some(fut) = in_flight.take() {
                            let outcome = fut.await;
                            self.complete(outcome)?;
                        }
                        break;
                    };
                    match self.handle_line(&line?, &mut in_flight)? {
                        Flow::Continue => {}
                        Flow::Quit => break,
                    }
                }
            }
        }

        if let Some(fut) = in_flight.take() {
            self.chat.cancel();
            let outcome = fut.await;
            let _ = self.chat.finish_send(outcome);
        }
        self.flush_notifications()?;
        Ok(())
    }

    fn handle_line(&mut self, line: &str, in_flight: &mut Option<InFlight<'a>>) -> Result<Flow> {
        if let Some(command) = SlashCommand::parse(line) {
            match command {
                SlashCommand::Quit => return Ok(Flow::Quit),
                SlashCommand::Clear => {
                    self.chat.clear_session();
                    self.write_header()?;
                }
                SlashCommand::SetKey(key) => {
                    self.chat.save_credential(&key)?;
                    self.notify_local(Notification::info("Saved", "API key stored locally."));
                }
                SlashCommand::SetPrompt(prompt) => {
                    self.chat.save_system_prompt(&prompt)?;
                    self.notify_local(Notification::info("Saved", "System prompt updated."));
                }
                SlashCommand::Settings => {
                    writeln!(
                        self.out,
                        "{}",
                        render::settings(self.chat.credentials(), &self.api_base)
                    )?;
                }
                SlashCommand::Cancel => {
                    if !self.chat.cancel() {
                        self.notify_local(Notification::info(
                            "Nothing To Cancel",
                            "No request is pending.",
                        ));
                    }
                }
                SlashCommand::Help => writeln!(self.out, "{}", help_text())?,
                SlashCommand::MissingArgument(usage) => {
                    self.notify_local(Notification::error("Usage", usage));
                }
                SlashCommand::Unknown(name) => {
                    self.notify_local(Notification::error(
                        "Unknown Command",
                        &format!("{} is not a command. Type /help for the list.", name),
                    ));
                }
            }
            self.flush_notifications()?;
            return Ok(Flow::Continue);
        }

        match self.chat.begin_send(line) {
            Ok(pending) => {
                if let Some(message) = self.chat.messages().last() {
                    writeln!(self.out, "{}", render::format_message(message))?;
                }
                writeln!(self.out, "{}", render::waiting())?;
                *in_flight = Some(Box::pin(pending.run(self.client)));
            }
            Err(ChatError::EmptyMessage) => {}
            Err(err) => log::debug!("Send not started: {}", err),
        }
        self.flush_notifications()?;
        Ok(Flow::Continue)
    }

    fn complete(&mut self, outcome: CompletionOutcome) -> Result<()> {
        match self.chat.finish_send(outcome) {
            Ok(reply) => {
                let text = render::format_message(reply);
                writeln!(self.out, "{}", text)?;
                self.write_header()?;
            }
            Err(err) => log::debug!("Send finished with error: {}", err),
        }
        self.flush_notifications()
    }

    fn write_header(&mut self) -> Result<()> {
        writeln!(
            self.out,
            "{}",
            render::header(self.chat.messages().len(), self.chat.has_credential())
        )?;
        Ok(())
    }

    fn notify_local(&mut self, notification: Notification) {
        let _ = writeln!(self.out, "{}", render::format_notification(&notification));
    }

    fn flush_notifications(&mut self) -> Result<()> {
        while let Ok(notification) = self.notifications.try_recv() {
            writeln!(self.out, "{}", render::format_notification(&notification))?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::spawn_line_reader;
    use async_trait::async_trait;
    use sparkchat_core::credentials::API_KEY_NAME;
    use sparkchat_core::{InMemoryCredentialStore, Role, WireMessage};
    use std::io::{BufReader, Cursor, Read};
    use std::sync::{mpsc as std_mpsc, Mutex};
    use std::time::Duration;

    struct EchoCompletion {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ChatCompletion for EchoCompletion {
        async fn complete(
            &self,
            _api_key: &str,
            messages: &[WireMessage],
        ) -> Result<String, ChatError> {
            *self.calls.lock().unwrap() += 1;
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(format!("echo: {}", last))
        }
    }

    struct HangingCompletion;

    #[async_trait]
    impl ChatCompletion for HangingCompletion {
        async fn complete(&self, _: &str, _: &[WireMessage]) -> Result<String, ChatError> {
            std::future::pending().await
        }
    }

    fn make_repl<'a>(
        client: &'a dyn ChatCompletion,
        api_key: Option<&str>,
    ) -> Repl<'a, Vec<u8>> {
        let mut store = InMemoryCredentialStore::new();
        if let Some(key) = api_key {
            store = store.with_value(API_KEY_NAME, key);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let chat = ChatSession::new(Box::new(store), tx).unwrap();
        Repl::new(chat, client, rx, "http://localhost/v1", Vec::new())
    }

    fn no_interrupts() -> mpsc::UnboundedReceiver<()> {
        mpsc::unbounded_channel().1
    }

    fn lines(text: &'static str) -> InputLines {
        spawn_line_reader(Cursor::new(text)).unwrap()
    }

    /// Terminal-like input: reads block until bytes are pushed, and end only when the
    /// sender is dropped.
    struct OpenTerminal {
        chunks: std_mpsc::Receiver<Vec<u8>>,
        pending: Cursor<Vec<u8>>,
    }

    impl Read for OpenTerminal {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                let n = self.pending.read(buf)?;
                if n > 0 {
                    return Ok(n);
                }
                match self.chunks.recv() {
                    Ok(chunk) => self.pending = Cursor::new(chunk),
                    Err(_) => return Ok(0),
                }
            }
        }
    }

    fn open_terminal() -> (std_mpsc::Sender<Vec<u8>>, InputLines) {
        let (tx, rx) = std_mpsc::channel();
        let terminal = OpenTerminal {
            chunks: rx,
            pending: Cursor::new(Vec::new()),
        };
        (tx, spawn_line_reader(BufReader::new(terminal)).unwrap())
    }

    #[tokio::test]
    async fn test_message_and_reply_are_rendered() {
        let client = EchoCompletion {
            calls: Mutex::new(0),
        };
        let mut repl = make_repl(&client, Some("sk-test"));

        repl.run(lines("hello there\n/quit\n"), no_interrupts())
            .await
            .unwrap();

        let messages = repl.chat().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role(), Role::Assistant);
        assert_eq!(messages[1].content(), "echo: hello there");

        let out = String::from_utf8(repl.into_output()).unwrap();
        assert!(out.contains("You: hello there"));
        assert!(out.contains("Assistant: echo: hello there"));
    }

    #[tokio::test]
    async fn test_waiting_line_and_refreshed_count() {
        let client = EchoCompletion {
            calls: Mutex::new(0),
        };
        let mut repl = make_repl(&client, Some("sk-test"));

        repl.run(lines("ping\n"), no_interrupts()).await.unwrap();

        let out = String::from_utf8(repl.into_output()).unwrap();
        let user = out.find("You: ping").unwrap();
        let waiting = out.find(render::waiting()).unwrap();
        let reply = out.find("Assistant: echo: ping").unwrap();
        let count = out.find("Spark Chat (2 messages)").unwrap();
        assert!(user < waiting && waiting < reply && reply < count);
        assert!(out.starts_with("Spark Chat (0 messages)"));
    }

    #[tokio::test]
    async fn test_missing_key_shows_notice_and_skips_backend() {
        let client = EchoCompletion {
            calls: Mutex::new(0),
        };
        let mut repl = make_repl(&client, None);

        repl.run(lines("hello\n"), no_interrupts()).await.unwrap();

        assert_eq!(*client.calls.lock().unwrap(), 0);
        assert!(repl.chat().messages().is_empty());
        let out = String::from_utf8(repl.into_output()).unwrap();
        assert!(out.contains("[No API Key]"));
        assert!(out.contains("! API Key Required"));
    }

    #[tokio::test]
    async fn test_key_command_enables_sending() {
        let client = EchoCompletion {
            calls: Mutex::new(0),
        };
        let mut repl = make_repl(&client, None);

        repl.run(lines("/key sk-typed\nping\n"), no_interrupts())
            .await
            .unwrap();

        assert_eq!(repl.chat().credentials().api_key, "sk-typed");
        assert_eq!(repl.chat().messages().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_command() {
        let client = EchoCompletion {
            calls: Mutex::new(0),
        };
        let mut repl = make_repl(&client, Some("sk-test"));

        repl.run(lines("/clear\n"), no_interrupts()).await.unwrap();

        assert!(repl.chat().messages().is_empty());
        let out = String::from_utf8(repl.into_output()).unwrap();
        assert!(out.contains("* Chat Cleared"));
    }

    #[tokio::test]
    async fn test_interrupt_cancels_pending_then_exits() {
        let client = HangingCompletion;
        let mut repl = make_repl(&client, Some("sk-test"));

        let (int_tx, int_rx) = mpsc::unbounded_channel();
        let (terminal, input) = open_terminal();

        let driver = async {
            terminal.send(b"are you there?\n".to_vec()).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            int_tx.send(()).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            int_tx.send(()).unwrap();
        };

        let (result, ()) = tokio::join!(repl.run(input, int_rx), driver);
        result.unwrap();

        assert!(!repl.chat().is_sending());
        assert_eq!(repl.chat().messages().len(), 1);
        let out = String::from_utf8(repl.into_output()).unwrap();
        assert!(out.contains("The request was cancelled."));
        drop(terminal);
    }

    #[tokio::test]
    async fn test_interrupt_while_idle_exits_with_input_still_open() {
        let client = EchoCompletion {
            calls: Mutex::new(0),
        };
        let mut repl = make_repl(&client, Some("sk-test"));

        let (int_tx, int_rx) = mpsc::unbounded_channel();
        let (terminal, input) = open_terminal();
        int_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), repl.run(input, int_rx))
            .await
            .expect("loop kept waiting on open input after an idle interrupt")
            .unwrap();

        assert!(repl.chat().messages().is_empty());
        assert_eq!(*client.calls.lock().unwrap(), 0);
        drop(terminal);
    }
}

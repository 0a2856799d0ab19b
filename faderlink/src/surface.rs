//! Headless fader surface.
//!
//! Stands in for the on-screen widgets: line commands become pointer and
//! field events on the core, and every frame the smoothed values go out
//! through the dispatcher.
//!
//! ```text
//! down <fader> <value>   pointer down at value
//! move <fader> <value>   drag sample
//! up <fader>             pointer up
//! set <fader> <value>    external set
//! host <text>            edit the host field
//! port <text>            edit the port field
//! status | list | quit
//! ```
//!
//! `<fader>` is a 1-based index or the fader's OSC address.

use std::collections::HashSet;

use faderlink_core::{
    ConnectionManager, Control, ControlSettings, FaderError, FieldStatus, MessageDispatcher,
};
use tracing::error;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Down(String, f32),
    Move(String, f32),
    Up(String),
    Set(String, f32),
    Host(String),
    Port(String),
    Status,
    List,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let fader = || {
            args.first()
                .map(|s| s.to_string())
                .ok_or_else(|| format!("{verb}: missing fader"))
        };
        let value = || -> Result<f32, String> {
            let text = args.get(1).ok_or_else(|| format!("{verb}: missing value"))?;
            text.parse::<f32>()
                .map_err(|_| format!("{verb}: {text:?} is not a number"))
        };

        match verb.to_ascii_lowercase().as_str() {
            "down" => Ok(Self::Down(fader()?, value()?)),
            "move" => Ok(Self::Move(fader()?, value()?)),
            "set" => Ok(Self::Set(fader()?, value()?)),
            "up" => Ok(Self::Up(fader()?)),
            // Field text goes through untouched; validation trims.
            "host" => Ok(Self::Host(rest.to_string())),
            "port" => Ok(Self::Port(rest.to_string())),
            "status" => Ok(Self::Status),
            "list" => Ok(Self::List),
            "quit" | "exit" => Ok(Self::Quit),
            "" => Err("empty command".into()),
            other => Err(format!("unknown command {other:?}")),
        }
    }
}

/// What the caller should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Text(String),
    Quit,
}

/// Faders plus the connection and dispatch machinery behind them.
#[derive(Debug)]
pub struct Surface {
    controls: Vec<Control>,
    connection: ConnectionManager,
    dispatcher: MessageDispatcher,
}

impl Surface {
    /// Build the faders; settings that fail validation, or reuse an
    /// address already taken by an earlier fader, are logged and left out.
    pub fn new(settings: &[ControlSettings], connection: ConnectionManager, threshold: f32) -> Self {
        let mut seen = HashSet::new();
        let controls = settings
            .iter()
            .filter_map(|s| match Control::new(s) {
                Ok(c) if !seen.insert(c.id().clone()) => {
                    error!(name = %s.name, address = %c.id(), "skipping fader: duplicate address");
                    None
                }
                Ok(c) => Some(c),
                Err(e) => {
                    error!(name = %s.name, error = %e, "skipping fader");
                    None
                }
            })
            .collect();
        let dispatcher = MessageDispatcher::new(connection.subscribe()).with_threshold(threshold);
        Self {
            controls,
            connection,
            dispatcher,
        }
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut ConnectionManager {
        &mut self.connection
    }

    /// Advance every fader by `dt` seconds and send what changed.
    pub fn tick(&mut self, dt: f32) -> usize {
        // Lookup failures are already on the status channel.
        let _ = self.connection.poll_resolution();
        for control in &mut self.controls {
            control.advance(dt);
        }
        self.dispatcher.dispatch_all(&self.controls)
    }

    /// Apply one command. Field validation errors come back as `Err` for
    /// display; everything else is reported through the reply.
    pub fn apply(&mut self, command: Command) -> Result<Reply, String> {
        match command {
            Command::Down(f, v) => self.control_mut(&f)?.on_interaction_start(v),
            Command::Move(f, v) => self.control_mut(&f)?.on_input_sample(v),
            Command::Up(f) => self.control_mut(&f)?.on_interaction_end(),
            Command::Set(f, v) => self.control_mut(&f)?.on_external_set(v),
            Command::Host(text) => {
                self.connection.set_host(&text).map_err(field_error)?;
            }
            Command::Port(text) => {
                self.connection.set_port(&text).map_err(field_error)?;
            }
            Command::Status => return Ok(Reply::Text(self.status_text())),
            Command::List => return Ok(Reply::Text(self.list_text())),
            Command::Quit => return Ok(Reply::Quit),
        }
        Ok(Reply::Ok)
    }

    fn control_mut(&mut self, key: &str) -> Result<&mut Control, String> {
        let index = if key.starts_with('/') {
            self.controls.iter().position(|c| c.id().as_str() == key)
        } else {
            key.parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .filter(|&i| i < self.controls.len())
        };
        index
            .map(|i| &mut self.controls[i])
            .ok_or_else(|| format!("no fader {key:?}"))
    }

    fn status_text(&self) -> String {
        let editor = self.connection.editor();
        format!(
            "host: {}\nport: {}\n{}",
            field_text(editor.host_status()),
            field_text(editor.port_status()),
            self.connection.status()
        )
    }

    fn list_text(&self) -> String {
        self.controls
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "{:>2}. {:<16} {:<20} {:>8.4}  {}",
                    i + 1,
                    c.name(),
                    c.id(),
                    c.value(),
                    c.state()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn field_error(e: FaderError) -> String {
    match e {
        FaderError::InvalidAddress(_) => "Invalid IP Address".into(),
        FaderError::InvalidPort(_) => "Invalid Port".into(),
        other => other.to_string(),
    }
}

fn field_text(status: &FieldStatus) -> &str {
    match status {
        FieldStatus::Empty => "(empty)",
        FieldStatus::Valid => "ok",
        FieldStatus::Invalid(msg) => msg.as_str(),
    }
}

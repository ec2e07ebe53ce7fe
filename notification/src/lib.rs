//! Terminal actions for the volume-trend gate.
//!
//! The gate ends in exactly one of two branches. Each branch publishes a
//! [`Notice`] through a [`Notifier`]; how the notice is delivered is up to the
//! notifier, the message text comes from configuration.

use common::config::NotificationConfig;
use common::{Error, Result};
use serde::Serialize;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Continue,
    Halt,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub branch: Branch,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice) -> Result<()>;
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notice: &Notice) -> Result<()> {
        (**self).notify(notice)
    }
}

/// Publishes notices as tracing events.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) -> Result<()> {
        match notice.branch {
            Branch::Continue => info!(branch = "continue", "{}", notice.message),
            Branch::Halt => warn!(branch = "halt", "{}", notice.message),
        }
        Ok(())
    }
}

/// Writes each notice as one line to a writer, stdout by default.
pub struct EchoNotifier<W: Write + Send> {
    writer: Mutex<W>,
}

impl EchoNotifier<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> EchoNotifier<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| Error::Other("Notifier writer lock poisoned".to_string()))
    }
}

impl<W: Write + Send> Notifier for EchoNotifier<W> {
    fn notify(&self, notice: &Notice) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::Other("Notifier writer lock poisoned".to_string()))?;
        writeln!(writer, "{}", notice.message)?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps every notice in memory, in delivery order.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: &Notice) -> Result<()> {
        self.notices
            .lock()
            .map_err(|_| Error::Other("Notice buffer lock poisoned".to_string()))?
            .push(notice.clone());
        Ok(())
    }
}

/// The two terminal actions of the gate, bound to their messages.
pub struct GateActions {
    continue_message: String,
    halt_message: String,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl GateActions {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            continue_message: config.continue_message.clone(),
            halt_message: config.halt_message.clone(),
            notifiers: Vec::new(),
        }
    }

    /// Logs every notice, and echoes it to stdout when `echo` is set.
    pub fn from_config(config: &NotificationConfig) -> Self {
        let actions = Self::new(config).with_notifier(Box::new(LogNotifier));
        if config.echo {
            actions.with_notifier(Box::new(EchoNotifier::stdout()))
        } else {
            actions
        }
    }

    pub fn notifier_count(&self) -> usize {
        self.notifiers.len()
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn continue_path(&self) -> Result<Notice> {
        self.publish(Branch::Continue, &self.continue_message)
    }

    pub fn halt_path(&self) -> Result<Notice> {
        self.publish(Branch::Halt, &self.halt_message)
    }

    fn publish(&self, branch: Branch, message: &str) -> Result<Notice> {
        let notice = Notice {
            branch,
            message: message.to_string(),
        };
        for notifier in &self.notifiers {
            notifier.notify(&notice)?;
        }
        Ok(notice)
    }
}

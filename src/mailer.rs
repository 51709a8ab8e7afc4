use std::{
    fmt::{self, Debug},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use lettre::{
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport, Message,
    Tokio1Executor,
};

use crate::{alerts::NotifyError, config::EmailConfig};

/// Mock transport that captures sent emails for testing.
///
/// It can also be told to fail or to stall, to exercise the monitor's
/// handling of transport errors and timeouts.
#[derive(Clone, Default)]
pub struct MockTransport {
    messages: Arc<Mutex<Vec<Message>>>,
    failing: Arc<AtomicBool>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockTransport {
    /// Create a new mock transport
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn store_message(&self, message: Message) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message);
    }

    /// Get all sent messages
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Clear all sent messages
    pub fn clear(&self) {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Make every following send fail with a transport error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Stall every following send for `delay` before completing
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    async fn send(&self, message: Message) -> Result<(), NotifyError> {
        let delay = *self.delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport(
                "mock transport configured to fail".to_string(),
            ));
        }

        self.store_message(message);
        Ok(())
    }
}

/// Mailer that can be either a real SMTP transport or a mock for testing.
///
/// The mock variant captures sent emails in memory, allowing tests to verify
/// that emails were sent without actually sending them.
#[derive(Clone)]
pub enum Mailer {
    /// Real SMTP transport for production use
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    /// Mock transport that captures emails for testing
    Mock(MockTransport),
}

impl Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smtp(_) => f.debug_tuple("Mailer::Smtp").finish(),
            Self::Mock(_) => f.debug_tuple("Mailer::Mock").finish(),
        }
    }
}

impl Mailer {
    /// Create a new mock mailer for testing
    #[must_use]
    pub fn mock() -> Self {
        Self::Mock(MockTransport::new())
    }

    /// Build the mailer described by the email configuration
    pub fn from_config(config: &EmailConfig) -> Result<Self, NotifyError> {
        match config {
            EmailConfig::Mock => Ok(Self::mock()),
            EmailConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
                ..
            } => {
                let mut builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                        .map_err(|e| NotifyError::Transport(e.to_string()))?
                        .port(*port)
                } else {
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(*port)
                };

                if let (Some(username), Some(password)) = (username, password) {
                    builder =
                        builder.credentials(Credentials::new(username.clone(), password.clone()));
                }

                Ok(Self::Smtp(builder.build()))
            }
        }
    }

    /// Send an email. For mock transport, stores the message for later inspection.
    pub async fn send(&self, message: Message) -> Result<(), NotifyError> {
        match self {
            Self::Smtp(transport) => {
                transport
                    .send(message)
                    .await
                    .map_err(|e| NotifyError::Transport(e.to_string()))?;
                Ok(())
            }
            Self::Mock(mock) => mock.send(message).await,
        }
    }

    /// Get sent emails (only available for mock mailer)
    ///
    /// Returns None if this is a real SMTP mailer.
    #[must_use]
    pub fn messages(&self) -> Option<Vec<Message>> {
        match self {
            Self::Mock(transport) => Some(transport.messages()),
            Self::Smtp(_) => None,
        }
    }

    /// Clear sent emails (only available for mock mailer)
    pub fn clear_messages(&self) {
        if let Self::Mock(transport) = self {
            transport.clear();
        }
    }

    /// Access the mock transport (only available for mock mailer)
    #[must_use]
    pub const fn mock_transport(&self) -> Option<&MockTransport> {
        match self {
            Self::Mock(transport) => Some(transport),
            Self::Smtp(_) => None,
        }
    }
}

//! Event loop and publisher lifecycle.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::alias::AliasRequest;
use crate::avahi::AvahiResponder;
use crate::config::Config;
use crate::error::{AliasError, ErrorCode, ResponderError};
use crate::label::SystemHostname;
use crate::records::RecordSet;
use crate::responder::{Responder, ResponderEvent};
use crate::session::Session;

/// Publishes this host's aliases through avahi-daemon.
pub struct AliasPublisher {
    config: Config,
    aliases: Vec<AliasRequest>,
}

impl AliasPublisher {
    /// Create a publisher for the already validated `aliases`.
    pub fn new(config: Config, aliases: Vec<AliasRequest>) -> Self {
        Self { config, aliases }
    }

    /// The aliases to publish.
    pub fn aliases(&self) -> &[AliasRequest] {
        &self.aliases
    }

    /// Run until `shutdown` is cancelled or the session fails.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), AliasError> {
        let (responder, events) = match AvahiResponder::connect(self.config.responder.bus).await {
            Ok(connected) => connected,
            Err(e) => {
                error!("Failed to create Avahi client: {}", e);
                return Err(e.into());
            }
        };

        let records = RecordSet::new(
            self.aliases,
            &self.config.publish,
            Box::new(SystemHostname),
        );
        let session = Session::new(responder, records);

        run_session(session, events, shutdown).await
    }
}

/// Dispatch responder events to `session` until shutdown or a fatal error.
///
/// Queued events are handled before a pending shutdown request is noticed.
/// The record group is freed on the way out.
pub async fn run_session<R: Responder>(
    mut session: Session<R>,
    mut events: mpsc::UnboundedReceiver<ResponderEvent>,
    shutdown: CancellationToken,
) -> Result<(), AliasError> {
    let result = loop {
        tokio::select! {
            biased;

            event = events.recv() => {
                match event {
                    Some(event) => {
                        if let Err(e) = session.handle_event(event).await {
                            shutdown.cancel();
                            break Err(e);
                        }
                    }
                    None => {
                        error!("Client failure: {}", ErrorCode::DISCONNECTED);
                        break Err(ResponderError::Closed.into());
                    }
                }
            }

            _ = shutdown.cancelled() => {
                info!("Shutdown requested");
                break Ok(());
            }
        }
    };

    session.close().await;
    info!("mdns-alias stopped");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::select_aliases;
    use crate::config::AliasPolicy;

    #[test]
    fn test_publisher_creation() {
        let config = Config::default();
        let aliases = select_aliases(
            ["foo.local", "bar.lan"],
            &config.publish.suffix,
            AliasPolicy::Exclude,
        );

        let publisher = AliasPublisher::new(config, aliases);
        assert_eq!(publisher.aliases().len(), 1);
        assert_eq!(publisher.aliases()[0].name(), "foo.local");
    }
}

//! avahi-daemon responder over D-Bus.
//!
//! avahi-daemon exposes `org.freedesktop.Avahi.Server` at `/` and one
//! `org.freedesktop.Avahi.EntryGroup` object per group. Both emit
//! `StateChanged(i32, s)` signals; those, together with the daemon dropping
//! off the bus, are forwarded into a single [`ResponderEvent`] channel for the
//! event loop.

use async_trait::async_trait;
use futures::{future, stream, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zbus::fdo::DBusProxy;
use zbus::zvariant::OwnedObjectPath;
use zbus::Connection;

use crate::config::BusKind;
use crate::error::{ErrorCode, ResponderError};
use crate::responder::{
    CnameRecord, GroupState, Responder, ResponderEvent, IF_UNSPEC, PROTO_UNSPEC,
};
use crate::session::SessionState;

mod server {
    use zbus::proxy;
    use zbus::zvariant::OwnedObjectPath;

    #[proxy(
        interface = "org.freedesktop.Avahi.Server",
        default_service = "org.freedesktop.Avahi",
        default_path = "/",
        gen_blocking = false
    )]
    pub trait AvahiServer {
        fn get_state(&self) -> zbus::Result<i32>;

        fn get_version_string(&self) -> zbus::Result<String>;

        fn entry_group_new(&self) -> zbus::Result<OwnedObjectPath>;

        #[zbus(signal)]
        fn state_changed(&self, state: i32, error: String) -> zbus::Result<()>;
    }
}

mod entry_group {
    use zbus::proxy;

    #[proxy(
        interface = "org.freedesktop.Avahi.EntryGroup",
        default_service = "org.freedesktop.Avahi",
        gen_blocking = false
    )]
    pub trait AvahiEntryGroup {
        fn commit(&self) -> zbus::Result<()>;

        fn reset(&self) -> zbus::Result<()>;

        fn free(&self) -> zbus::Result<()>;

        fn is_empty(&self) -> zbus::Result<bool>;

        fn add_record(
            &self,
            interface: i32,
            protocol: i32,
            flags: u32,
            name: &str,
            clazz: u16,
            type_: u16,
            ttl: u32,
            rdata: &[u8],
        ) -> zbus::Result<()>;

        #[zbus(signal)]
        fn state_changed(&self, state: i32, error: String) -> zbus::Result<()>;
    }
}

/// Well-known bus name of avahi-daemon.
const AVAHI_SERVICE: &str = "org.freedesktop.Avahi";

use entry_group::AvahiEntryGroupProxy;
use server::AvahiServerProxy;

/// Map a failed D-Bus call to a responder error.
fn call_failed(op: &'static str) -> impl FnOnce(zbus::Error) -> ResponderError {
    move |e| {
        if matches!(e, zbus::Error::MethodError(..)) {
            ResponderError::code(op, ErrorCode::from(&e))
        } else {
            ResponderError::Bus(e)
        }
    }
}

/// An entry group owned by the daemon.
pub struct AvahiGroup {
    path: OwnedObjectPath,
    proxy: AvahiEntryGroupProxy<'static>,
    watcher: JoinHandle<()>,
}

impl Drop for AvahiGroup {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

/// Client session with avahi-daemon.
pub struct AvahiResponder {
    conn: Connection,
    server: AvahiServerProxy<'static>,
    events: mpsc::UnboundedSender<ResponderEvent>,
    watcher: JoinHandle<()>,
}

impl Drop for AvahiResponder {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

impl AvahiResponder {
    /// Connect to avahi-daemon on `bus`.
    ///
    /// The returned channel first carries `CONNECTING`, then the daemon's
    /// current state, then every later change.
    pub async fn connect(
        bus: BusKind,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ResponderEvent>), ResponderError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(ResponderEvent::Session {
            state: SessionState::Connecting,
            error: ErrorCode::OK,
        });

        let conn = match bus {
            BusKind::System => Connection::system().await?,
            BusKind::Session => Connection::session().await?,
        };
        let server = AvahiServerProxy::new(&conn).await?;

        let version = server
            .get_version_string()
            .await
            .map_err(call_failed("GetVersionString"))?;
        info!(%version, ?bus, "connected to avahi-daemon");

        // Subscribe before reading the state so no change is missed.
        let state_changes = server
            .receive_state_changed()
            .await?
            .filter_map(|signal| {
                let parsed = match signal.args() {
                    Ok(args) => Some(ServerSignal::State {
                        code: *args.state(),
                        error: ErrorCode::from_dbus_name(args.error()),
                    }),
                    Err(e) => {
                        warn!(error = %e, "malformed server StateChanged signal");
                        None
                    }
                };
                future::ready(parsed)
            });

        let dbus = DBusProxy::new(&conn).await?;
        let owner_changes = dbus
            .receive_name_owner_changed_with_args(&[(0, AVAHI_SERVICE)])
            .await
            .map_err(zbus::Error::from)?
            .filter_map(|signal| {
                let lost = match signal.args() {
                    Ok(args) => args.new_owner().is_none(),
                    Err(e) => {
                        warn!(error = %e, "malformed NameOwnerChanged signal");
                        false
                    }
                };
                future::ready(lost.then_some(ServerSignal::OwnerLost))
            });

        let state = server
            .get_state()
            .await
            .map_err(call_failed("GetState"))?;
        forward_server_state(&tx, state, ErrorCode::OK);

        let watcher = tokio::spawn(forward_server_signals(
            stream::select(state_changes, owner_changes),
            tx.clone(),
        ));

        Ok((
            Self {
                conn,
                server,
                events: tx,
                watcher,
            },
            rx,
        ))
    }
}

/// What the server watcher reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerSignal {
    /// `Server.StateChanged` with the raw state code.
    State { code: i32, error: ErrorCode },
    /// avahi-daemon left the bus.
    OwnerLost,
}

/// Forward server signals until the daemon goes away or the event loop does.
async fn forward_server_signals<S>(signals: S, events: mpsc::UnboundedSender<ResponderEvent>)
where
    S: Stream<Item = ServerSignal>,
{
    let mut signals = std::pin::pin!(signals);
    while let Some(signal) = signals.next().await {
        match signal {
            ServerSignal::State { code, error } => {
                if !forward_server_state(&events, code, error) {
                    return;
                }
            }
            ServerSignal::OwnerLost => {
                warn!("avahi-daemon left the bus");
                let _ = events.send(ResponderEvent::Session {
                    state: SessionState::Failure,
                    error: ErrorCode::DISCONNECTED,
                });
                return;
            }
        }
    }
}

/// Send a server state change; false once the event loop is gone.
fn forward_server_state(
    events: &mpsc::UnboundedSender<ResponderEvent>,
    code: i32,
    error: ErrorCode,
) -> bool {
    match SessionState::from_server_code(code) {
        Some(state) => events
            .send(ResponderEvent::Session { state, error })
            .is_ok(),
        None => {
            debug!(code, "ignoring unknown server state");
            true
        }
    }
}

#[async_trait]
impl Responder for AvahiResponder {
    type Group = AvahiGroup;

    async fn create_group(&mut self) -> Result<AvahiGroup, ResponderError> {
        let path = self
            .server
            .entry_group_new()
            .await
            .map_err(call_failed("EntryGroupNew"))?;

        let proxy = AvahiEntryGroupProxy::builder(&self.conn)
            .path(path.as_str().to_owned())?
            .build()
            .await?;

        let mut state_changes = proxy.receive_state_changed().await?;
        let events = self.events.clone();
        let group = path.as_str().to_owned();
        let watcher = tokio::spawn(async move {
            while let Some(signal) = state_changes.next().await {
                let args = match signal.args() {
                    Ok(args) => args,
                    Err(e) => {
                        warn!(error = %e, "malformed entry group StateChanged signal");
                        continue;
                    }
                };
                let Some(state) = GroupState::from_code(*args.state()) else {
                    debug!(code = *args.state(), "ignoring unknown entry group state");
                    continue;
                };
                let event = ResponderEvent::Group {
                    group: group.clone(),
                    state,
                    error: ErrorCode::from_dbus_name(args.error()),
                };
                if events.send(event).is_err() {
                    return;
                }
            }
        });

        Ok(AvahiGroup {
            path,
            proxy,
            watcher,
        })
    }

    async fn add_record(
        &mut self,
        group: &AvahiGroup,
        record: &CnameRecord,
    ) -> Result<(), ResponderError> {
        group
            .proxy
            .add_record(
                IF_UNSPEC,
                PROTO_UNSPEC,
                record.flags.bits(),
                &record.name,
                record.class(),
                record.record_type(),
                record.ttl,
                record.target.as_bytes(),
            )
            .await
            .map_err(call_failed("AddRecord"))
    }

    async fn commit(&mut self, group: &AvahiGroup) -> Result<(), ResponderError> {
        group.proxy.commit().await.map_err(call_failed("Commit"))
    }

    async fn reset(&mut self, group: &AvahiGroup) -> Result<(), ResponderError> {
        group.proxy.reset().await.map_err(call_failed("Reset"))?;
        if !group.proxy.is_empty().await.map_err(call_failed("IsEmpty"))? {
            warn!(group = %group.path.as_str(), "entry group not empty after reset");
        }
        Ok(())
    }

    async fn free(&mut self, group: AvahiGroup) -> Result<(), ResponderError> {
        group.proxy.free().await.map_err(call_failed("Free"))
    }

    fn group_id(&self, group: &AvahiGroup) -> String {
        group.path.as_str().to_owned()
    }
}

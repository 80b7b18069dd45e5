//! Shared test infrastructure: a recording responder and capture helpers.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mdns_alias::alias::select_aliases;
use mdns_alias::config::{AliasPolicy, PublishConfig};
use mdns_alias::error::{ErrorCode, ResponderError};
use mdns_alias::label::HostnameSource;
use mdns_alias::records::RecordSet;
use mdns_alias::responder::{CnameRecord, GroupState, Responder, ResponderEvent};
use mdns_alias::session::{Session, SessionState};

// --- Recorded calls ---

/// A responder operation as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateGroup(u32),
    AddRecord {
        group: u32,
        name: String,
        target: Vec<u8>,
        ttl: u32,
        class: u16,
        rtype: u16,
        flags: u32,
    },
    Commit(u32),
    Reset(u32),
    Free(u32),
}

/// Shared, cloneable call log.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn added_names(&self) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::AddRecord { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }
}

// --- MockResponder ---

/// Records every call; can be told to fail specific operations.
#[derive(Debug, Default)]
pub struct MockResponder {
    pub log: CallLog,
    next_group: u32,
    fail_create: bool,
    fail_add: Option<String>,
    fail_commit: bool,
}

impl MockResponder {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_add(mut self, alias: &str) -> Self {
        self.fail_add = Some(alias.to_string());
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }
}

#[async_trait]
impl Responder for MockResponder {
    type Group = u32;

    async fn create_group(&mut self) -> Result<u32, ResponderError> {
        if self.fail_create {
            return Err(ResponderError::code("EntryGroupNew", ErrorCode(-17)));
        }
        self.next_group += 1;
        self.log.push(Call::CreateGroup(self.next_group));
        Ok(self.next_group)
    }

    async fn add_record(&mut self, group: &u32, record: &CnameRecord) -> Result<(), ResponderError> {
        if self.fail_add.as_deref() == Some(record.name.as_str()) {
            return Err(ResponderError::code("AddRecord", ErrorCode(-9)));
        }
        self.log.push(Call::AddRecord {
            group: *group,
            name: record.name.clone(),
            target: record.target.as_bytes().to_vec(),
            ttl: record.ttl,
            class: record.class(),
            rtype: record.record_type(),
            flags: record.flags.bits(),
        });
        Ok(())
    }

    async fn commit(&mut self, group: &u32) -> Result<(), ResponderError> {
        if self.fail_commit {
            return Err(ResponderError::code("Commit", ErrorCode(-2)));
        }
        self.log.push(Call::Commit(*group));
        Ok(())
    }

    async fn reset(&mut self, group: &u32) -> Result<(), ResponderError> {
        self.log.push(Call::Reset(*group));
        Ok(())
    }

    async fn free(&mut self, group: u32) -> Result<(), ResponderError> {
        self.log.push(Call::Free(group));
        Ok(())
    }

    fn group_id(&self, group: &u32) -> String {
        format!("/Client1/EntryGroup{group}")
    }
}

// --- Hostname ---

/// A hostname that tests can change between publications.
#[derive(Debug, Clone)]
pub struct TestHostname(Arc<Mutex<Option<String>>>);

impl TestHostname {
    pub fn new(name: &str) -> Self {
        Self(Arc::new(Mutex::new(Some(name.to_string()))))
    }

    pub fn set(&self, name: &str) {
        *self.0.lock().unwrap() = Some(name.to_string());
    }

    pub fn fail(&self) {
        *self.0.lock().unwrap() = None;
    }
}

impl HostnameSource for TestHostname {
    fn hostname(&self) -> io::Result<String> {
        self.0
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| io::Error::other("gethostname failed"))
    }
}

// --- Output capture ---

/// Captures confirmation lines written by the session.
#[derive(Debug, Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// --- Builders ---

pub const HOST: &str = "myhost";

/// Wire form of `myhost.local`.
pub const HOST_TARGET: &[u8] = b"\x06myhost\x05local\x00";

pub fn record_set(aliases: &[&str], policy: AliasPolicy, hostname: TestHostname) -> RecordSet<u32> {
    let publish = PublishConfig {
        alias_policy: policy,
        ..PublishConfig::default()
    };
    let aliases = select_aliases(aliases.iter().copied(), &publish.suffix, policy);
    RecordSet::new(aliases, &publish, Box::new(hostname))
}

/// A session over a mock responder, with its call log and captured output.
pub fn session(aliases: &[&str], responder: MockResponder) -> (Session<MockResponder>, CallLog, Captured) {
    let log = responder.log.clone();
    let out = Captured::default();
    let records = record_set(aliases, AliasPolicy::Flag, TestHostname::new(HOST));
    let session = Session::new(responder, records).with_output(Box::new(out.clone()));
    (session, log, out)
}

// --- Events ---

pub fn state(state: SessionState) -> ResponderEvent {
    ResponderEvent::Session {
        state,
        error: ErrorCode::OK,
    }
}

pub fn failure(error: ErrorCode) -> ResponderEvent {
    ResponderEvent::Session {
        state: SessionState::Failure,
        error,
    }
}

pub fn group_state(group: u32, state: GroupState, error: ErrorCode) -> ResponderEvent {
    ResponderEvent::Group {
        group: format!("/Client1/EntryGroup{group}"),
        state,
        error,
    }
}

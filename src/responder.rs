//! Interface to the external mDNS responder.
//!
//! The responder owns the multicast socket and collision arbitration. This
//! crate only asks it to create a record group, fill it with CNAME records and
//! commit it, and listens for the state notifications it sends back.

use async_trait::async_trait;
use hickory_proto::rr::{DNSClass, RecordType};

use crate::error::{ErrorCode, ResponderError};
use crate::label::EncodedHostname;
use crate::session::SessionState;

/// Interface index meaning "all interfaces".
pub const IF_UNSPEC: i32 = -1;

/// Protocol meaning "IPv4 and IPv6".
pub const PROTO_UNSPEC: i32 = -1;

/// Publish flags understood by the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishFlags(u32);

impl PublishFlags {
    /// Several hosts may publish the same name without a conflict.
    pub const ALLOW_MULTIPLE: Self = Self(1 << 3);
    /// Publish over multicast DNS.
    pub const USE_MULTICAST: Self = Self(1 << 8);

    /// Raw flag bits.
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for PublishFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A CNAME record mapping an alias to this host's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnameRecord {
    /// Alias name (owner of the record).
    pub name: String,
    /// TTL in seconds.
    pub ttl: u32,
    /// Canonical name in wire form.
    pub target: EncodedHostname,
    /// Publish flags.
    pub flags: PublishFlags,
}

impl CnameRecord {
    /// Build a multicast, non-exclusive CNAME record for `name`.
    pub fn new(name: &str, target: EncodedHostname, ttl: u32) -> Self {
        Self {
            name: name.to_string(),
            ttl,
            target,
            flags: PublishFlags::USE_MULTICAST | PublishFlags::ALLOW_MULTIPLE,
        }
    }

    /// DNS class code (IN).
    pub fn class(&self) -> u16 {
        u16::from(DNSClass::IN)
    }

    /// DNS type code (CNAME).
    pub fn record_type(&self) -> u16 {
        u16::from(RecordType::CNAME)
    }
}

/// State of a record group as reported by the responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// Created or reset, not committed.
    Uncommitted,
    /// Committed, probing in progress.
    Registering,
    /// All records announced.
    Established,
    /// A record name is claimed elsewhere.
    Collision,
    /// The group failed.
    Failure,
}

impl GroupState {
    /// Map a responder group state code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Uncommitted),
            1 => Some(Self::Registering),
            2 => Some(Self::Established),
            3 => Some(Self::Collision),
            4 => Some(Self::Failure),
            _ => None,
        }
    }
}

/// Notification delivered from the responder to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderEvent {
    /// The session changed state.
    Session {
        /// New session state.
        state: SessionState,
        /// Cause reported with the change (`ErrorCode::OK` if none).
        error: ErrorCode,
    },
    /// The record group changed state.
    Group {
        /// Identifier of the group that changed.
        group: String,
        /// New group state.
        state: GroupState,
        /// Cause reported with the change.
        error: ErrorCode,
    },
}

/// Operations the core needs from the responder.
///
/// Every method is called from the single event loop; implementations never
/// see concurrent calls.
#[async_trait]
pub trait Responder: Send {
    /// Opaque handle for a record group.
    type Group: Send + Sync;

    /// Create an empty record group.
    async fn create_group(&mut self) -> Result<Self::Group, ResponderError>;

    /// Queue a CNAME record in `group`.
    async fn add_record(
        &mut self,
        group: &Self::Group,
        record: &CnameRecord,
    ) -> Result<(), ResponderError>;

    /// Commit all queued records of `group`.
    async fn commit(&mut self, group: &Self::Group) -> Result<(), ResponderError>;

    /// Withdraw and clear all records of `group`.
    async fn reset(&mut self, group: &Self::Group) -> Result<(), ResponderError>;

    /// Free `group`.
    async fn free(&mut self, group: Self::Group) -> Result<(), ResponderError>;

    /// Identifier used to match group events to `group`.
    fn group_id(&self, group: &Self::Group) -> String;

    /// Describe a responder error code.
    fn describe(&self, code: ErrorCode) -> &'static str {
        code.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cname_record_fields() {
        let target = EncodedHostname::encode("myhost", ".local");
        let record = CnameRecord::new("alias.local", target.clone(), 4500);

        assert_eq!(record.name, "alias.local");
        assert_eq!(record.class(), 1);
        assert_eq!(record.record_type(), 5);
        assert_eq!(record.ttl, 4500);
        assert_eq!(record.target, target);
        assert_eq!(record.flags.bits(), 256 | 8);
    }

    #[test]
    fn test_group_state_codes() {
        assert_eq!(GroupState::from_code(2), Some(GroupState::Established));
        assert_eq!(GroupState::from_code(4), Some(GroupState::Failure));
        assert_eq!(GroupState::from_code(9), None);
    }
}

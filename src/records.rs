//! The record group holding this host's CNAME aliases.
//!
//! One group exists per process. It is created lazily the first time the
//! session reaches running, emptied (not destroyed) on collisions and
//! re-registration, and freed at exit.

use tracing::{debug, info, warn};

use crate::alias::AliasRequest;
use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::label::{encode_local_hostname, HostnameSource};
use crate::metrics;
use crate::responder::{CnameRecord, Responder};

/// Membership state of a record group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// No records queued.
    Empty,
    /// Records queued, not yet committed.
    Populated,
    /// Records queued and committed.
    Committed,
}

/// A responder record group plus what we know about its contents.
#[derive(Debug)]
pub struct RecordGroup<G> {
    handle: G,
    membership: Membership,
    /// Session generation the records were queued under.
    generation: u64,
}

impl<G> RecordGroup<G> {
    fn new(handle: G) -> Self {
        Self {
            handle,
            membership: Membership::Empty,
            generation: 0,
        }
    }

    /// Responder handle for this group.
    pub fn handle(&self) -> &G {
        &self.handle
    }

    /// Current membership.
    pub fn membership(&self) -> Membership {
        self.membership
    }

    /// Session generation the current records belong to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn is_empty(&self) -> bool {
        self.membership == Membership::Empty
    }
}

/// Result of [`RecordSet::ensure_published`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The group already held records; nothing was sent.
    AlreadyPublished,
    /// Records were queued and committed.
    Published(PublishReport),
}

/// What a successful publication queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Dotted form of the CNAME target.
    pub target: String,
    /// Aliases queued, in input order.
    pub aliases: Vec<String>,
}

/// Owns the record group and the aliases that go into it.
pub struct RecordSet<G> {
    aliases: Vec<AliasRequest>,
    suffix: String,
    ttl: u32,
    hostname: Box<dyn HostnameSource>,
    group: Option<RecordGroup<G>>,
}

impl<G: Send + Sync> RecordSet<G> {
    /// Create a record set for `aliases`. No group exists until the first
    /// call to [`ensure_published`](Self::ensure_published).
    pub fn new(
        aliases: Vec<AliasRequest>,
        publish: &PublishConfig,
        hostname: Box<dyn HostnameSource>,
    ) -> Self {
        Self {
            aliases,
            suffix: publish.suffix.clone(),
            ttl: publish.ttl,
            hostname,
            group: None,
        }
    }

    /// The aliases this set publishes.
    pub fn aliases(&self) -> &[AliasRequest] {
        &self.aliases
    }

    /// The record group, if one has been created.
    pub fn group(&self) -> Option<&RecordGroup<G>> {
        self.group.as_ref()
    }

    /// Make sure every alias is queued and committed for `generation`.
    ///
    /// Creates the group if needed. Returns
    /// [`PublishOutcome::AlreadyPublished`] without touching the responder
    /// when the group already holds records for this generation. The first
    /// failing add or commit aborts the sequence.
    pub async fn ensure_published<R>(
        &mut self,
        responder: &mut R,
        generation: u64,
    ) -> Result<PublishOutcome, PublishError>
    where
        R: Responder<Group = G>,
    {
        let group = match self.group.take() {
            Some(group) => self.group.insert(group),
            None => {
                let handle = responder
                    .create_group()
                    .await
                    .map_err(PublishError::CreateGroup)?;
                debug!(group = %responder.group_id(&handle), "created entry group");
                metrics::record_group_created();
                self.group.insert(RecordGroup::new(handle))
            }
        };

        if !group.is_empty() && group.generation < generation {
            warn!(
                stale = group.generation,
                current = generation,
                "entry group holds records from an earlier session, resetting"
            );
            responder
                .reset(&group.handle)
                .await
                .map_err(PublishError::Reset)?;
            group.membership = Membership::Empty;
            metrics::record_group_reset();
        }

        if !group.is_empty() {
            debug!(generation, "entry group already populated");
            return Ok(PublishOutcome::AlreadyPublished);
        }

        // The hostname may have changed since the last reset.
        let target = encode_local_hostname(self.hostname.as_ref(), &self.suffix);

        let mut queued = Vec::with_capacity(self.aliases.len());
        for alias in &self.aliases {
            let record = CnameRecord::new(alias.name(), target.clone(), self.ttl);
            if let Err(source) = responder.add_record(&group.handle, &record).await {
                metrics::record_publish_failure();
                return Err(PublishError::AddRecord {
                    alias: alias.name().to_string(),
                    source,
                });
            }
            group.membership = Membership::Populated;
            group.generation = generation;
            metrics::record_record_queued();
            info!(alias = %alias, target = %target, "queued CNAME record");
            queued.push(alias.name().to_string());
        }

        if let Err(e) = responder.commit(&group.handle).await {
            metrics::record_publish_failure();
            return Err(PublishError::Commit(e));
        }
        group.membership = Membership::Committed;
        metrics::record_commit(queued.len());

        Ok(PublishOutcome::Published(PublishReport {
            target: target.to_string(),
            aliases: queued,
        }))
    }

    /// Withdraw all records, keeping the group for the next publication.
    ///
    /// A no-op when no group has been created yet.
    pub async fn reset<R>(&mut self, responder: &mut R) -> Result<(), PublishError>
    where
        R: Responder<Group = G>,
    {
        let Some(group) = self.group.as_mut() else {
            return Ok(());
        };

        responder
            .reset(&group.handle)
            .await
            .map_err(PublishError::Reset)?;
        group.membership = Membership::Empty;
        metrics::record_group_reset();
        debug!("entry group reset");
        Ok(())
    }

    /// Free the group, if any. Errors are logged.
    pub async fn free<R>(&mut self, responder: &mut R)
    where
        R: Responder<Group = G>,
    {
        if let Some(group) = self.group.take() {
            if let Err(e) = responder.free(group.handle).await {
                warn!(error = %e, "failed to free entry group");
            }
        }
    }
}

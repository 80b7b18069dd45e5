//! Metrics instrumentation for mdns-alias.
//!
//! All metrics are prefixed with `mdns_alias.`

use metrics::{counter, gauge};

use crate::session::SessionState;

/// Record a session state change.
pub fn record_session_transition(state: SessionState) {
    counter!("mdns_alias.session.transition.count", "state" => state.as_str()).increment(1);
}

/// Record an alias that failed suffix validation.
pub fn record_alias_rejected() {
    counter!("mdns_alias.alias.rejected.count").increment(1);
}

/// Record creation of the entry group.
pub fn record_group_created() {
    counter!("mdns_alias.group.created.count").increment(1);
}

/// Record a CNAME record queued in the entry group.
pub fn record_record_queued() {
    counter!("mdns_alias.record.queued.count").increment(1);
}

/// Record a successful commit of `aliases` records.
pub fn record_commit(aliases: usize) {
    counter!("mdns_alias.group.commit.count").increment(1);
    gauge!("mdns_alias.aliases.published").set(aliases as f64);
}

/// Record an entry group reset. The published gauge drops to zero.
pub fn record_group_reset() {
    counter!("mdns_alias.group.reset.count").increment(1);
    gauge!("mdns_alias.aliases.published").set(0.0);
}

/// Record a failed add or commit.
pub fn record_publish_failure() {
    counter!("mdns_alias.publish.failure.count").increment(1);
}

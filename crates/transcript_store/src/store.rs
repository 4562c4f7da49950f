use std::time::{Duration, Instant};

use agent_wire::DomainEvent;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::debounce::Debouncer;
use crate::entry::{Transcript, TranscriptEntry};
use crate::error::StoreError;
use crate::identity::SessionIdentity;
use crate::tier::{sanitize_key, StorageTier, VolatileStore};

/// Quiet period after the last mutation before a persistence write fires.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Bounded retention applied under storage pressure.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Most recent sessions kept across all identities.
    pub max_sessions: usize,
    /// Messages kept when a full snapshot no longer fits.
    pub degraded_len: usize,
    /// Last-ditch message count before giving up on the durable tier.
    pub floor_len: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_sessions: 8,
            degraded_len: 50,
            floor_len: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    session_id: String,
    saved_at: String,
    entries: Vec<TranscriptEntry>,
}

/// Folds domain events into an ordered transcript and persists it across a
/// prioritized list of storage tiers.
///
/// Writes are debounced and target both session-identity keys; reads probe
/// durable id, then legacy id, then the volatile last-resort snapshot,
/// stopping at the first non-empty result.
pub struct TranscriptStore {
    identity: SessionIdentity,
    transcript: Transcript,
    durable: Box<dyn StorageTier>,
    volatile: VolatileStore,
    retention: RetentionPolicy,
    debounce: Debouncer,
}

impl TranscriptStore {
    pub fn new(identity: SessionIdentity, durable: Box<dyn StorageTier>) -> Self {
        Self {
            identity,
            transcript: Transcript::default(),
            durable,
            volatile: VolatileStore::new(),
            retention: RetentionPolicy::default(),
            debounce: Debouncer::new(DEBOUNCE_DELAY),
        }
    }

    #[must_use]
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    #[must_use]
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce = Debouncer::new(delay);
        self
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Deadline of the pending debounced write, for schedulers.
    #[must_use]
    pub fn flush_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Records a user turn and schedules a debounced write.
    pub fn push_user(&mut self, text: impl Into<String>, now: Instant) {
        self.transcript.push_user(text);
        self.debounce.note_mutation(now);
    }

    /// Folds one domain event and schedules a debounced write.
    pub fn apply(&mut self, event: &DomainEvent, now: Instant) {
        self.transcript.apply(event);
        self.debounce.note_mutation(now);
    }

    /// Applies a server-assigned durable session id.
    ///
    /// Both the old and the new identity stay addressable through the
    /// transition: the new key is written immediately while the old key's
    /// snapshot remains in the durable tier.
    pub fn set_durable_id(&mut self, durable_id: &str) -> Result<bool, StoreError> {
        if !self.identity.set_durable_id(durable_id) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Loads the transcript for the current identity from the tier list.
    ///
    /// Returns true when a non-empty snapshot was found. Unreadable snapshots
    /// are skipped so one corrupt tier never hides a healthy fallback.
    pub fn load(&mut self) -> Result<bool, StoreError> {
        let durable_id = self.identity.durable_id().to_string();
        let legacy_id = self.identity.legacy_id().to_string();
        let probes = [
            (false, durable_id),
            (false, legacy_id.clone()),
            (true, legacy_id),
        ];

        for (volatile, key) in probes {
            let raw = if volatile {
                self.volatile.read(&key)?
            } else {
                self.durable.read(&key)?
            };
            let Some(raw) = raw else {
                continue;
            };

            match serde_json::from_str::<Snapshot>(&raw) {
                Ok(snapshot) if !snapshot.entries.is_empty() => {
                    self.transcript = Transcript::from_entries(snapshot.entries);
                    return Ok(true);
                }
                Ok(_) => {}
                Err(error) => debug!(key, %error, "skipping unreadable snapshot"),
            }
        }

        Ok(false)
    }

    /// Fires the pending debounced write if its quiet period has elapsed.
    pub fn flush_if_due(&mut self, now: Instant) -> Result<bool, StoreError> {
        if !self.debounce.fire_if_due(now) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Persists immediately, cancelling any pending debounced write.
    pub fn flush_now(&mut self) -> Result<(), StoreError> {
        self.debounce.cancel();
        self.persist()
    }

    /// Writes the current transcript under every identity key.
    pub fn persist(&mut self) -> Result<(), StoreError> {
        let full = self.snapshot_json(self.transcript.entries())?;

        // Volatile last-resort snapshot first: the newest write survives even
        // when every durable write is rejected.
        self.volatile.write(self.identity.legacy_id(), &full)?;

        let keys: Vec<String> = self
            .identity
            .keys()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        for key in &keys {
            self.write_with_recovery(key, &full)?;
        }

        self.enforce_retention();
        Ok(())
    }

    fn snapshot_json(&self, entries: &[TranscriptEntry]) -> Result<String, StoreError> {
        let snapshot = Snapshot {
            session_id: self.identity.durable_id().to_string(),
            saved_at: now_rfc3339()?,
            entries: entries.to_vec(),
        };
        serde_json::to_string(&snapshot).map_err(|source| StoreError::SnapshotSerialize {
            key: self.identity.durable_id().to_string(),
            source,
        })
    }

    /// Durable write with bounded quota recovery: evict oldest other
    /// sessions and retry, then retry with progressively shorter history.
    fn write_with_recovery(&mut self, key: &str, full: &str) -> Result<(), StoreError> {
        let mut outcome = self.durable.write(key, full);
        while let Err(error) = &outcome {
            if !error.is_quota() {
                break;
            }
            if !self.evict_oldest_other()? {
                break;
            }
            outcome = self.durable.write(key, full);
        }

        match outcome {
            Ok(()) => return Ok(()),
            Err(error) if error.is_quota() => {}
            Err(error) => return Err(error),
        }

        for keep in [self.retention.degraded_len, self.retention.floor_len] {
            let mut trimmed = self.transcript.clone();
            trimmed.truncate_to_recent(keep);
            let snapshot = self.snapshot_json(trimmed.entries())?;
            match self.durable.write(key, &snapshot) {
                Ok(()) => {
                    warn!(key, keep, "quota pressure; retained most recent entries only");
                    return Ok(());
                }
                Err(error) if error.is_quota() => {}
                Err(error) => return Err(error),
            }
        }

        // The volatile tier still holds the full snapshot, so the latest
        // write is degraded, not lost.
        warn!(key, "durable tier rejected every snapshot size; volatile copy retained");
        Ok(())
    }

    /// Removes the oldest stored session that is not part of the current
    /// identity. Returns false when nothing evictable remains.
    fn evict_oldest_other(&mut self) -> Result<bool, StoreError> {
        let protected: Vec<String> = self
            .identity
            .keys()
            .into_iter()
            .map(sanitize_key)
            .collect();

        let mut oldest: Option<(String, Option<OffsetDateTime>)> = None;
        for key in self.durable.keys()? {
            if protected.contains(&key) {
                continue;
            }
            let saved_at = self
                .durable
                .read(&key)?
                .and_then(|raw| serde_json::from_str::<Snapshot>(&raw).ok())
                .and_then(|snapshot| OffsetDateTime::parse(&snapshot.saved_at, &Rfc3339).ok());

            let replace = match &oldest {
                None => true,
                // Unparseable snapshots sort before any timestamp.
                Some((_, current)) => match (&saved_at, current) {
                    (None, Some(_)) => true,
                    (Some(_), None) => false,
                    (Some(candidate), Some(current)) => candidate < current,
                    (None, None) => false,
                },
            };
            if replace {
                oldest = Some((key, saved_at));
            }
        }

        match oldest {
            Some((key, _)) => {
                debug!(key, "evicting oldest stored session");
                self.durable.remove(&key)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn enforce_retention(&mut self) {
        loop {
            let over = match self.durable.keys() {
                Ok(keys) => keys.len() > self.retention.max_sessions,
                Err(error) => {
                    debug!(%error, "retention scan failed");
                    return;
                }
            };
            if !over {
                return;
            }
            match self.evict_oldest_other() {
                Ok(true) => {}
                Ok(false) => return,
                Err(error) => {
                    debug!(%error, "retention eviction failed");
                    return;
                }
            }
        }
    }
}

fn now_rfc3339() -> Result<String, StoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(StoreError::ClockFormat)
}

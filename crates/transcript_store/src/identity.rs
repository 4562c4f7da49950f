use uuid::Uuid;

/// The pair of keys addressing one conversation's persisted state.
///
/// The durable id is server-assigned (or a generated fallback); the legacy id
/// is the human-readable project/workspace name. Either may change
/// independently during a conversation, so persistence targets both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    durable_id: String,
    legacy_id: String,
}

impl SessionIdentity {
    #[must_use]
    pub fn new(durable_id: impl Into<String>, legacy_id: impl Into<String>) -> Self {
        Self {
            durable_id: durable_id.into(),
            legacy_id: legacy_id.into(),
        }
    }

    /// Identity with a generated fallback durable id, used until the server
    /// assigns one.
    #[must_use]
    pub fn with_generated_durable(legacy_id: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), legacy_id)
    }

    #[must_use]
    pub fn durable_id(&self) -> &str {
        &self.durable_id
    }

    #[must_use]
    pub fn legacy_id(&self) -> &str {
        &self.legacy_id
    }

    /// Updates the durable id in place; returns true when it actually changed.
    pub fn set_durable_id(&mut self, durable_id: impl Into<String>) -> bool {
        let durable_id = durable_id.into();
        if durable_id.is_empty() || durable_id == self.durable_id {
            return false;
        }
        self.durable_id = durable_id;
        true
    }

    /// Distinct persistence keys, durable id first.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        if self.durable_id == self.legacy_id {
            vec![&self.durable_id]
        } else {
            vec![&self.durable_id, &self.legacy_id]
        }
    }
}

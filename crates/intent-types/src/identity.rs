//! The in-memory identity handle: a DID bound to its derived ledger
//! signer. Never mutated after creation — a new DID replaces it, it is
//! never rotated in place.

use intent_crypto::secp::LocalSigner;
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Clone)]
pub struct Identity {
    pub did: String,
    pub signer: Arc<LocalSigner>,
    pub created_at: SystemTime,
    pub org_id: Option<String>,
    pub agent_label: Option<String>,
}

impl Identity {
    pub fn new(did: impl Into<String>, signer: LocalSigner, created_at: SystemTime) -> Self {
        Self {
            did: did.into(),
            signer: Arc::new(signer),
            created_at,
            org_id: None,
            agent_label: None,
        }
    }

    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    pub fn with_agent_label(mut self, agent_label: impl Into<String>) -> Self {
        self.agent_label = Some(agent_label.into());
        self
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("did", &self.did)
            .field("org_id", &self.org_id)
            .field("agent_label", &self.agent_label)
            .finish_non_exhaustive()
    }
}

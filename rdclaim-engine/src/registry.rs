use crate::rules::RuleSet;
use crate::workspace::ClaimWorkspace;
use shared_types::{Claim, ClaimError, ClaimId, ClaimTotals};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Open claims keyed by id. Each claim has its own lock, so edits to one
/// claim are serialized while other claims proceed in parallel.
pub struct ClaimRegistry {
    rules: Arc<RuleSet>,
    claims: RwLock<HashMap<ClaimId, Arc<Mutex<ClaimWorkspace>>>>,
}

impl ClaimRegistry {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            claims: RwLock::new(HashMap::new()),
        }
    }

    pub fn rules(&self) -> Arc<RuleSet> {
        self.rules.clone()
    }

    pub fn create(&self, claim: Claim) -> Result<ClaimId, ClaimError> {
        let id = claim.id;
        let workspace = ClaimWorkspace::new(claim, self.rules.clone())?;

        let mut claims = self
            .claims
            .write()
            .map_err(|_| ClaimError::RegistryPoisoned)?;
        if claims.contains_key(&id) {
            return Err(ClaimError::DuplicateClaim(id));
        }
        claims.insert(id, Arc::new(Mutex::new(workspace)));
        tracing::info!("Opened claim {}", id);
        Ok(id)
    }

    pub fn remove(&self, id: ClaimId) -> Result<(), ClaimError> {
        let mut claims = self
            .claims
            .write()
            .map_err(|_| ClaimError::RegistryPoisoned)?;
        claims
            .remove(&id)
            .map(|_| ())
            .ok_or(ClaimError::ClaimNotFound(id))
    }

    pub fn get(&self, id: ClaimId) -> Result<Arc<Mutex<ClaimWorkspace>>, ClaimError> {
        let claims = self
            .claims
            .read()
            .map_err(|_| ClaimError::RegistryPoisoned)?;
        claims.get(&id).cloned().ok_or(ClaimError::ClaimNotFound(id))
    }

    /// Run `f` while holding the claim's lock.
    pub fn with_claim<T>(
        &self,
        id: ClaimId,
        f: impl FnOnce(&mut ClaimWorkspace) -> Result<T, ClaimError>,
    ) -> Result<T, ClaimError> {
        let workspace = self.get(id)?;
        let mut guard = workspace
            .lock()
            .map_err(|_| ClaimError::LockPoisoned(id))?;
        f(&mut *guard)
    }

    /// Copy of the claim's current totals.
    pub fn snapshot(&self, id: ClaimId) -> Result<ClaimTotals, ClaimError> {
        self.with_claim(id, |ws| Ok(ws.totals().clone()))
    }

    pub fn ids(&self) -> Result<Vec<ClaimId>, ClaimError> {
        let claims = self
            .claims
            .read()
            .map_err(|_| ClaimError::RegistryPoisoned)?;
        Ok(claims.keys().copied().collect())
    }
}

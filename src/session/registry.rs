use crate::error::StartError;
use std::sync::{Arc, Mutex};
use tracing::info;

struct RegistryInner {
    next_id: u32,
    active: Option<u32>,
}

/// Active-session registry owned by the service boundary.
///
/// Assigns small positive session ids monotonically and holds the single
/// "one active session" busy flag. A second start request while a session
/// is active is rejected immediately, never queued. The session loop holds
/// an [`ActiveSlot`] guard; dropping it on any exit path releases the flag,
/// so cleanup cannot be skipped or fail.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                next_id: 0,
                active: None,
            })),
        }
    }

    /// Claim the active slot and assign a fresh session id.
    pub fn begin(&self) -> Result<(u32, ActiveSlot), StartError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(active) = inner.active {
            info!("rejecting session start, session {} is active", active);
            return Err(StartError::Busy);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.active = Some(id);
        Ok((
            id,
            ActiveSlot {
                inner: Arc::clone(&self.inner),
                id,
            },
        ))
    }

    /// The currently recording/processing session, if any.
    pub fn active_id(&self) -> Option<u32> {
        self.inner.lock().unwrap().active
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for the registry's busy flag. Released on drop.
pub struct ActiveSlot {
    inner: Arc<Mutex<RegistryInner>>,
    id: u32,
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.active == Some(self.id) {
                inner.active = None;
            }
        }
    }
}

//! Ownership of the one audible playlist handle.
//!
//! The arena holds the primary handle plus handles that have been detached
//! but not yet released. The only way a handle becomes primary is
//! [`HandleArena::install`], which refuses an occupied slot; the only way
//! it stops being primary is [`HandleArena::detach_primary`], which drops
//! the completion subscription in the same step.

use super::backend::HandleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Primary {
    handle: HandleId,
    /// Completion notices are honoured only while this is set.
    listening: bool,
}

#[derive(Debug, Default)]
pub(crate) struct HandleArena {
    primary: Option<Primary>,
    /// Detached, still loaded, awaiting fade-out and release.
    outgoing: Vec<HandleId>,
}

impl HandleArena {
    pub(crate) fn primary(&self) -> Option<HandleId> {
        self.primary.map(|p| p.handle)
    }

    /// Whether a completion notice from `handle` belongs to the current owner.
    pub(crate) fn accepts_completion(&self, handle: HandleId) -> bool {
        matches!(self.primary, Some(p) if p.handle == handle && p.listening)
    }

    /// Unsubscribe the primary from completion notices and move it to the
    /// outgoing list. Returns the detached handle.
    pub(crate) fn detach_primary(&mut self) -> Option<HandleId> {
        let mut primary = self.primary.take()?;
        primary.listening = false;
        self.outgoing.push(primary.handle);
        Some(primary.handle)
    }

    /// Detached handles not yet claimed for release, oldest first.
    pub(crate) fn outgoing(&self) -> Vec<HandleId> {
        self.outgoing.clone()
    }

    /// Claim a detached handle for release. `false` means someone else
    /// (a concurrent stop) already took it.
    pub(crate) fn claim_outgoing(&mut self, handle: HandleId) -> bool {
        match self.outgoing.iter().position(|h| *h == handle) {
            Some(i) => {
                self.outgoing.swap_remove(i);
                true
            }
            None => false,
        }
    }

    /// Make `handle` the primary with a fresh completion subscription.
    /// Fails, handing the handle back, if the slot is still occupied.
    pub(crate) fn install(&mut self, handle: HandleId) -> Result<(), HandleId> {
        if self.primary.is_some() {
            return Err(handle);
        }
        self.primary = Some(Primary {
            handle,
            listening: true,
        });
        Ok(())
    }

    /// Detach everything; the caller releases the returned handles.
    pub(crate) fn drain(&mut self) -> Vec<HandleId> {
        let mut handles: Vec<HandleId> = self.outgoing.drain(..).collect();
        if let Some(p) = self.primary.take() {
            handles.push(p.handle);
        }
        handles
    }
}

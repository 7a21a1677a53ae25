//! The `RequestPool`: a generational arena of path requests.
//!
//! # Layout
//!
//! Requests live in a flat `Vec` of slots.  A slot is either live (holds a
//! request with at least one claim) or on the free list.  Recycling bumps the
//! slot generation so old handles go stale, and keeps the request's buffers
//! so steady-state repathing allocates nothing.

use glam::Vec3;

use nav_core::{AgentId, PathConstraints, RequestId};

use crate::{ClaimOwner, PathRequest, RequestError, RequestHandle, RequestResult};

struct Slot {
    generation: u32,
    live:       bool,
    request:    PathRequest,
}

/// Arena of reference-counted requests.
#[derive(Default)]
pub struct RequestPool {
    slots: Vec<Slot>,
    free:  Vec<u32>,
}

impl RequestPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a slot (recycled if possible) and initialise it in `Created`,
    /// claimed by `owner`.
    pub fn acquire(
        &mut self,
        id:          RequestId,
        agent:       AgentId,
        start:       Vec3,
        end:         Vec3,
        constraints: PathConstraints,
        owner:       ClaimOwner,
    ) -> RequestHandle {
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.live = true;
                slot.request.reset(id, agent, start, end, constraints);
                RequestHandle::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    live:       true,
                    request:    PathRequest::new(id, agent, start, end, constraints),
                });
                RequestHandle::new(index, 0)
            }
        };
        self.slots[handle.index()].request.claims.push(owner);
        handle
    }

    /// The live request behind `handle`, or `None` if the handle is stale.
    pub fn get(&self, handle: RequestHandle) -> Option<&PathRequest> {
        self.slots
            .get(handle.index())
            .filter(|s| s.live && s.generation == handle.generation())
            .map(|s| &s.request)
    }

    pub fn get_mut(&mut self, handle: RequestHandle) -> Option<&mut PathRequest> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.live && s.generation == handle.generation())
            .map(|s| &mut s.request)
    }

    /// Add `owner`'s claim.
    ///
    /// # Errors
    ///
    /// `StaleHandle` for a recycled slot, `AlreadyClaimed` if `owner` already
    /// holds a claim.
    pub fn claim(&mut self, handle: RequestHandle, owner: ClaimOwner) -> RequestResult<()> {
        let request = self.get_mut(handle).ok_or(RequestError::StaleHandle(handle))?;
        if request.claims.contains(&owner) {
            return Err(RequestError::AlreadyClaimed { handle, owner });
        }
        request.claims.push(owner);
        Ok(())
    }

    /// Drop `owner`'s claim.  Returns `true` if that was the last claim and
    /// the slot went back to the free list.
    ///
    /// # Errors
    ///
    /// `StaleHandle` for a recycled slot, `ReleaseWithoutClaim` if `owner`
    /// holds no claim.  The count never goes below zero.
    pub fn release(&mut self, handle: RequestHandle, owner: ClaimOwner) -> RequestResult<bool> {
        let Some(request) = self.get_mut(handle) else {
            log::error!("release of stale request handle {handle} by {owner:?}");
            return Err(RequestError::StaleHandle(handle));
        };
        let Some(pos) = request.claims.iter().position(|&c| c == owner) else {
            log::error!("{owner:?} released request {} ({handle}) without a claim", request.id);
            return Err(RequestError::ReleaseWithoutClaim { handle, owner });
        };
        request.claims.swap_remove(pos);
        if !request.claims.is_empty() {
            return Ok(false);
        }

        log::trace!("recycling request {} ({handle})", request.id);
        request.vector_path.clear();
        let slot = &mut self.slots[handle.index()];
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index() as u32);
        Ok(true)
    }

    /// Requests currently holding at least one claim.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Recycled slots ready for reuse.
    #[inline]
    pub fn pooled_count(&self) -> usize {
        self.free.len()
    }

    /// All live requests with their handles.
    pub fn iter_live(&self) -> impl Iterator<Item = (RequestHandle, &PathRequest)> {
        self.slots.iter().enumerate().filter(|(_, s)| s.live).map(|(i, s)| {
            (RequestHandle::new(i as u32, s.generation), &s.request)
        })
    }
}

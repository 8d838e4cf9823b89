//! Generation-checked arena of context records.
//!
//! A handle packs a slot index (low 32 bits) and the slot's generation
//! (high 32 bits). Every table starts its generations at a random value, so
//! a handle minted by one engine is rejected by another, and a slot's
//! generation moves on each time it is freed.

use rand::RngCore;

use super::Context;
use crate::error::{CryptError, Result};

/// Opaque reference to a live context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(u64);

impl ContextHandle {
    fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }

    fn index(self) -> usize {
        (self.0 & 0xFFFF_FFFF) as usize
    }

    fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The raw integer form, for callers that keep handles in integer slots.
    pub fn to_raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

struct Slot {
    generation: u32,
    context: Option<Box<Context>>,
}

pub(crate) struct ContextTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Generation given to slots created from now on.
    seed: u32,
    live: usize,
}

impl ContextTable {
    pub(crate) fn new() -> Self {
        Self::with_seed(rand::rngs::OsRng.next_u32())
    }

    /// Table whose slots start at generation `seed`. Zero is skipped.
    pub(crate) fn with_seed(seed: u32) -> Self {
        let seed = seed.max(1);
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            seed,
            live: 0,
        }
    }

    pub(crate) fn insert(&mut self, context: Context) -> Result<ContextHandle> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| CryptError::NoMem)?;
                self.slots.push(Slot {
                    generation: self.seed,
                    context: None,
                });
                index
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.context = Some(Box::new(context));
        self.live += 1;
        Ok(ContextHandle::new(index, slot.generation))
    }

    /// Resolve a handle. A handle whose slot has since been freed fails
    /// `NotInited`; one that never named a slot of this table fails
    /// `InvalidHandle`.
    fn slot(&self, handle: ContextHandle) -> Result<&Slot> {
        let slot = self.slots.get(handle.index()).ok_or(CryptError::InvalidHandle)?;
        check_generation(slot, handle)?;
        Ok(slot)
    }

    pub(crate) fn get(&self, handle: ContextHandle) -> Result<&Context> {
        self.slot(handle)?
            .context
            .as_deref()
            .ok_or(CryptError::NotInited)
    }

    pub(crate) fn get_mut(&mut self, handle: ContextHandle) -> Result<&mut Context> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or(CryptError::InvalidHandle)?;
        check_generation(slot, handle)?;
        slot.context.as_deref_mut().ok_or(CryptError::NotInited)
    }

    /// Free the slot and return its context. The generation advances, so
    /// the handle goes stale.
    pub(crate) fn remove(&mut self, handle: ContextHandle) -> Result<Box<Context>> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or(CryptError::InvalidHandle)?;
        check_generation(slot, handle)?;
        let context = slot.context.take().ok_or(CryptError::NotInited)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index() as u32);
        self.live -= 1;
        Ok(context)
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Drop every live context, returning how many there were.
    pub(crate) fn clear(&mut self) -> usize {
        let live = self.live;
        for slot in self.slots.iter_mut() {
            if slot.context.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free = (0..self.slots.len() as u32).rev().collect();
        self.live = 0;
        live
    }
}

/// A slot's generation only moves forward from the seed, so a handle
/// generation behind the slot's is a freed handle and anything else is
/// foreign.
fn check_generation(slot: &Slot, handle: ContextHandle) -> Result<()> {
    let generation = handle.generation();
    if generation == slot.generation {
        return Ok(());
    }
    let behind = slot.generation.wrapping_sub(generation);
    if behind > 0 && behind < (1 << 16) {
        Err(CryptError::NotInited)
    } else {
        Err(CryptError::InvalidHandle)
    }
}

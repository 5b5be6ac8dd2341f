//! §4.D Attachment allocator: per-network IPv4 index allocation.
//!
//! Single-actor owned state — no suspension inside any operation, so a
//! `parking_lot::Mutex` is enough (grounded in the teacher's use of
//! `parking_lot` for cache locks elsewhere in the workspace).

use bitvec::vec::BitVec;
use boxd_shared::errors::{CoreError, CoreResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::Ipv4Addr;

struct AllocatorState {
    bits: BitVec,
    hostnames: HashMap<String, usize>,
    disabled: bool,
}

pub struct Allocator {
    lower_ip: Ipv4Addr,
    state: Mutex<AllocatorState>,
}

impl Allocator {
    pub fn new(lower_ip: Ipv4Addr, size: usize) -> Self {
        Self {
            lower_ip,
            state: Mutex::new(AllocatorState {
                bits: BitVec::repeat(false, size),
                hostnames: HashMap::new(),
                disabled: false,
            }),
        }
    }

    /// Idempotent: returns the existing index if `hostname` was already
    /// allocated. Otherwise claims the lowest unset bit.
    pub fn allocate(&self, hostname: &str) -> CoreResult<(usize, Ipv4Addr)> {
        let mut state = self.state.lock();
        if state.disabled {
            return Err(CoreError::InvalidState(
                "allocator has been disabled".to_string(),
            ));
        }
        if let Some(&index) = state.hostnames.get(hostname) {
            return Ok((index, self.address_at(index)));
        }

        let index = state
            .bits
            .iter()
            .enumerate()
            .find(|(_, bit)| !**bit)
            .map(|(i, _)| i)
            .ok_or_else(|| CoreError::InvalidState("attachment allocator is exhausted".to_string()))?;

        state.bits.set(index, true);
        state.hostnames.insert(hostname.to_string(), index);
        Ok((index, self.address_at(index)))
    }

    pub fn lookup(&self, hostname: &str) -> Option<usize> {
        self.state.lock().hostnames.get(hostname).copied()
    }

    /// Clears the bit and mapping for `hostname`, returning the freed index.
    pub fn deallocate(&self, hostname: &str) -> Option<usize> {
        let mut state = self.state.lock();
        let index = state.hostnames.remove(hostname)?;
        state.bits.set(index, false);
        Some(index)
    }

    /// Disables the allocator iff no allocations are currently outstanding.
    /// Returns whether the disable took effect.
    pub fn disable(&self) -> bool {
        let mut state = self.state.lock();
        if !state.hostnames.is_empty() {
            return false;
        }
        state.disabled = true;
        true
    }

    fn address_at(&self, index: usize) -> Ipv4Addr {
        let base: u32 = self.lower_ip.into();
        Ipv4Addr::from(base.wrapping_add(index as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_is_idempotent_per_hostname() {
        let a = Allocator::new(Ipv4Addr::new(10, 0, 0, 2), 4);
        let (i1, addr1) = a.allocate("h1").unwrap();
        let (i2, addr2) = a.allocate("h1").unwrap();
        assert_eq!(i1, i2);
        assert_eq!(addr1, addr2);
    }

    #[test]
    fn allocate_claims_lowest_free_bit() {
        let a = Allocator::new(Ipv4Addr::new(10, 0, 0, 2), 4);
        let (i0, _) = a.allocate("h0").unwrap();
        assert_eq!(i0, 0);
        a.deallocate("h0");
        let (i1, _) = a.allocate("h1").unwrap();
        assert_eq!(i1, 0);
    }

    #[test]
    fn exhausted_when_full() {
        let a = Allocator::new(Ipv4Addr::new(10, 0, 0, 2), 1);
        a.allocate("h0").unwrap();
        let err = a.allocate("h1").unwrap_err();
        assert_eq!(err.kind_code(), "invalid_state");
    }

    #[test]
    fn disable_refuses_with_outstanding_allocations() {
        let a = Allocator::new(Ipv4Addr::new(10, 0, 0, 2), 4);
        a.allocate("h0").unwrap();
        assert!(!a.disable());
        assert!(a.allocate("h1").is_ok());
    }

    #[test]
    fn disable_succeeds_when_empty_and_blocks_future_allocations() {
        let a = Allocator::new(Ipv4Addr::new(10, 0, 0, 2), 4);
        assert!(a.disable());
        let err = a.allocate("h0").unwrap_err();
        assert_eq!(err.kind_code(), "invalid_state");
    }

    #[test]
    fn deallocate_unknown_hostname_is_none() {
        let a = Allocator::new(Ipv4Addr::new(10, 0, 0, 2), 4);
        assert_eq!(a.deallocate("ghost"), None);
    }
}

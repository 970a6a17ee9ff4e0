//! Per-CA serial number allocation.
//!
//! Serials are 16-byte positive integers drawn from a v4 UUID. The first
//! byte is forced into `0x01..=0x7F` so the DER INTEGER encoding is exactly
//! the 16 raw bytes (no sign padding, no leading zero stripping). The
//! allocator also remembers every serial it handed out and redraws on a
//! collision, so serials are unique for the lifetime of one CA instance.

use std::collections::HashSet;

use pki_model::SerialNumber;
use uuid::Uuid;

/// Hands out unique serial numbers for one certificate authority.
#[derive(Debug, Default)]
pub struct SerialAllocator {
    issued: HashSet<SerialNumber>,
}

impl SerialAllocator {
    /// Empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the next unused serial and record it.
    pub fn allocate(&mut self) -> SerialNumber {
        loop {
            let serial = random_serial();
            if self.issued.insert(serial.clone()) {
                return serial;
            }
        }
    }

    /// Record a serial issued elsewhere (e.g. the root's own serial when the
    /// CA is reopened from disk) so it is never reused.
    pub fn reserve(&mut self, serial: SerialNumber) {
        self.issued.insert(serial);
    }

    /// Number of serials handed out or reserved.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    /// Whether nothing has been allocated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

fn random_serial() -> SerialNumber {
    let mut bytes = *Uuid::new_v4().as_bytes();
    bytes[0] = (bytes[0] & 0x7F) | 0x01;
    SerialNumber::from_bytes(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serials_are_sixteen_positive_bytes() {
        let mut alloc = SerialAllocator::new();
        for _ in 0..64 {
            let serial = alloc.allocate();
            assert_eq!(serial.as_bytes().len(), 16);
            assert!(serial.as_bytes()[0] & 0x80 == 0);
            assert!(serial.as_bytes()[0] != 0);
        }
    }

    #[test]
    fn allocations_never_repeat() {
        let mut alloc = SerialAllocator::new();
        let serials: HashSet<_> = (0..256).map(|_| alloc.allocate()).collect();
        assert_eq!(serials.len(), 256);
        assert_eq!(alloc.len(), 256);
    }

    #[test]
    fn reserved_serial_counts_as_issued() {
        let mut alloc = SerialAllocator::new();
        assert!(alloc.is_empty());
        alloc.reserve(SerialNumber::from_bytes(vec![0x07, 0xE3]));
        assert_eq!(alloc.len(), 1);
    }
}

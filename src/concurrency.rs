//! The single per-backend concurrency gate.
//!
//! One `RwLock` per open backend, held for the full duration of a handler,
//! across blocking file I/O, rather than released and reacquired
//! per-file. Read operations (search, bind, referral_check, entry_get_rw in
//! read mode) take a shared guard; write operations (add, modify, modrdn,
//! delete) take an exclusive guard.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The gate itself. Carries no data beyond the lock: callers already hold
/// whatever backend state (base directory, suffix, serializer) they need
/// and only use this to serialize access to it.
#[derive(Debug, Default)]
pub struct ConcurrencyGate {
    lock: RwLock<()>,
}

pub struct ReadTicket<'a>(#[allow(dead_code)] RwLockReadGuard<'a, ()>);
pub struct WriteTicket<'a>(#[allow(dead_code)] RwLockWriteGuard<'a, ()>);

impl ConcurrencyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire for a read-only handler. Blocks until no writer holds the
    /// gate; multiple readers may hold it concurrently.
    pub fn read(&self) -> ReadTicket<'_> {
        ReadTicket(self.lock.read().unwrap_or_else(|p| p.into_inner()))
    }

    /// Acquire for a mutating handler. Blocks until no other reader or
    /// writer holds the gate.
    pub fn write(&self) -> WriteTicket<'_> {
        WriteTicket(self.lock.write().unwrap_or_else(|p| p.into_inner()))
    }
}

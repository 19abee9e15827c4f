//! Rotating pool of per-credential service handles.
//!
//! The pool is owned by one evaluator. Parallel workers should each get
//! their own pool rather than share a cursor.

use crate::error::{JudgeError, Result};
use tracing::warn;

/// Ordered, immutable set of service handles with a cursor on the active one.
#[derive(Debug, Clone)]
pub struct CredentialPool<S> {
    handles: Vec<S>,
    cursor: usize,
}

impl<S> CredentialPool<S> {
    /// Build a pool starting at the first handle.
    pub fn new(handles: Vec<S>) -> Result<Self> {
        if handles.is_empty() {
            return Err(JudgeError::EmptyCredentialPool);
        }
        Ok(Self { handles, cursor: 0 })
    }

    /// Number of credentials in the pool.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Always false; an empty pool cannot be built.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Index of the active credential.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The active credential's handle.
    pub fn current(&self) -> &S {
        &self.handles[self.cursor]
    }

    /// Advance to the next credential, wrapping to the first.
    pub fn rotate(&mut self) {
        self.cursor = (self.cursor + 1) % self.handles.len();
        if self.handles.len() == 1 {
            warn!("No alternate API key available; retrying with the same key");
        }
    }
}

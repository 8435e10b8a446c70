// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! Handles onto a node's classical arrays.

use crate::future::{ArrayFuture, IndexOperand};
use crate::ir::{ArrayHandle, Register};

/// A handle to a classical array declared on the current node. Cheap to copy
/// since the backing storage is addressed by `(address, length)`, not owned
/// here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Array {
    pub(crate) handle: ArrayHandle,
}

impl Array {
    #[must_use]
    pub(crate) fn new(handle: ArrayHandle) -> Self {
        Self { handle }
    }

    #[must_use]
    pub fn handle(&self) -> ArrayHandle {
        self.handle
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.handle.length
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handle.length == 0
    }

    /// Returns a deferred scalar over the cell at a fixed immediate index.
    #[must_use]
    pub fn get_future_index(&self, index: u32) -> ArrayFuture {
        ArrayFuture {
            array: self.handle,
            index: IndexOperand::Immediate(index),
        }
    }

    /// Returns a deferred scalar over the cell addressed by a register, for
    /// loop-varying indices.
    #[must_use]
    pub fn get_future_index_reg(&self, index: Register) -> ArrayFuture {
        ArrayFuture {
            array: self.handle,
            index: IndexOperand::Register(index),
        }
    }
}

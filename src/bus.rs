// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Access to the memory-mapped register file of the video engine.

/// Byte offset of a register from the base of the video engine window.
pub type RegisterOffset = u32;

/// Register access primitives of one video engine instance.
///
/// Implementations must make every write visible to the hardware in program order; the engine
/// starts decoding on the trigger write and reads everything written before it.
pub trait RegisterBus {
    /// Read the 32-bit register at `offset`.
    fn read(&self, offset: RegisterOffset) -> u32;

    /// Write `value` to the 32-bit register at `offset`.
    fn write(&mut self, offset: RegisterOffset, value: u32);

    /// Write `values` to consecutive registers starting at `offset`.
    fn bulk_write(&mut self, offset: RegisterOffset, values: &[u32]) {
        for (i, value) in values.iter().enumerate() {
            self.write(offset + (i as RegisterOffset) * 4, *value);
        }
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read(&self, offset: RegisterOffset) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: RegisterOffset, value: u32) {
        (**self).write(offset, value)
    }

    fn bulk_write(&mut self, offset: RegisterOffset, values: &[u32]) {
        (**self).bulk_write(offset, values)
    }
}

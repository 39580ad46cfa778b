// Copyright 2018 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! An emulated register file.
//!
//! `RegisterSpace` stands in for the memory-mapped window of a video engine when no hardware is
//! present: it keeps one 32-bit value per declared register, honours read-only and
//! write-one-to-clear bits the way the hardware does, and journals every write in program order so
//! the emitted register program can be inspected.

use std::collections::BTreeMap;

use log::warn;

use crate::bus::RegisterBus;
use crate::bus::RegisterOffset;

/// Spec for a register. It specifies its location in the register space, which bits software may
/// write and which bits are cleared by writing 1 to them.
#[derive(Clone, Debug)]
pub struct RegisterSpec {
    pub name: &'static str,
    pub offset: RegisterOffset,
    pub reset_value: u32,
    /// Only masked bits could be written by software.
    pub writeable_mask: u32,
    /// When 1 is written to masked bits, those bits are cleared (status registers).
    pub write_1_to_clear_mask: u32,
}

impl RegisterSpec {
    /// A plain read/write register resetting to zero.
    pub const fn read_write(name: &'static str, offset: RegisterOffset) -> Self {
        RegisterSpec {
            name,
            offset,
            reset_value: 0,
            writeable_mask: !0,
            write_1_to_clear_mask: 0,
        }
    }

    /// A status register whose `mask` bits are set by hardware and cleared by writing 1.
    pub const fn write_1_to_clear(name: &'static str, offset: RegisterOffset, mask: u32) -> Self {
        RegisterSpec {
            name,
            offset,
            reset_value: 0,
            writeable_mask: mask,
            write_1_to_clear_mask: mask,
        }
    }

    /// Compute the new register value when software writes `written` over `old`.
    pub fn apply_write_masks(&self, old: u32, written: u32) -> u32 {
        let w1c = self.write_1_to_clear_mask;
        let val = (!w1c & written) | (w1c & old & !written);
        (old & !self.writeable_mask) | (val & self.writeable_mask)
    }
}

struct Register {
    spec: RegisterSpec,
    value: u32,
}

/// Register space represents a set of registers. It handles read/write operations.
#[derive(Default)]
pub struct RegisterSpace {
    regs: BTreeMap<RegisterOffset, Register>,
    journal: Vec<(RegisterOffset, u32)>,
}

impl RegisterSpace {
    /// Creates a new empty RegisterSpace.
    pub fn new() -> RegisterSpace {
        Default::default()
    }

    /// Add a register to the register space.
    pub fn add_register(&mut self, spec: RegisterSpec) {
        debug_assert_eq!(spec.offset % 4, 0, "{} is not word aligned", spec.name);
        let offset = spec.offset;
        let value = spec.reset_value;
        let previous = self.regs.insert(offset, Register { spec, value });
        debug_assert!(previous.is_none(), "register at {:#x} declared twice", offset);
    }

    /// Set bits from the hardware side. Masks are not applied and nothing is journaled.
    pub fn set_bits(&mut self, offset: RegisterOffset, mask: u32) {
        if let Some(reg) = self.regs.get_mut(&offset) {
            reg.value |= mask;
        }
    }

    /// Every software write so far, in program order.
    pub fn writes(&self) -> &[(RegisterOffset, u32)] {
        &self.journal
    }

    /// The values software wrote to `offset`, in program order.
    pub fn writes_to(&self, offset: RegisterOffset) -> Vec<u32> {
        self.journal
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Drain the write journal.
    pub fn take_writes(&mut self) -> Vec<(RegisterOffset, u32)> {
        std::mem::take(&mut self.journal)
    }
}

impl RegisterBus for RegisterSpace {
    fn read(&self, offset: RegisterOffset) -> u32 {
        match self.regs.get(&offset) {
            Some(reg) => reg.value,
            None => {
                warn!("read of undeclared register {:#x}", offset);
                0
            }
        }
    }

    fn write(&mut self, offset: RegisterOffset, value: u32) {
        self.journal.push((offset, value));
        match self.regs.get_mut(&offset) {
            Some(reg) => reg.value = reg.spec.apply_write_masks(reg.value, value),
            None => warn!("write of {:#x} to undeclared register {:#x}", value, offset),
        }
    }
}

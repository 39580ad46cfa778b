// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Interface to the allocator of memory the video engine can address directly.

/// Bus address as seen by the video engine, which is a 32-bit bus master.
pub type DmaAddr = u32;

/// A contiguous region both the CPU and the engine can access.
pub trait DmaRegion {
    /// Bus address of the first byte of the region.
    fn dma_addr(&self) -> DmaAddr;

    /// CPU view of the region.
    fn as_mut_slice(&mut self) -> &mut [u8];

    /// Size of the region in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Allocator of coherent DMA regions.
pub trait DmaAllocator {
    type Region: DmaRegion;

    /// Allocate a region of `size` bytes, or `None` when the allocator is out of memory.
    fn allocate(&mut self, size: usize) -> Option<Self::Region>;

    /// Give `region` back to the allocator.
    fn free(&mut self, region: Self::Region);
}

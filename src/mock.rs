// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Software stand-ins for the collaborators of the engine, used when no hardware is present.

use crate::bus::RegisterOffset;
use crate::dma::DmaAddr;
use crate::dma::DmaAllocator;
use crate::dma::DmaRegion;
use crate::refs::BufferIndex;
use crate::refs::BufferQueue;
use crate::refs::FrameAttributes;
use crate::register_space::RegisterSpace;
use crate::register_space::RegisterSpec;
use crate::vc1::regs::*;

/// Register file of the VC-1 engine: every register is plain read/write except STATUS, whose
/// interrupt bits are write-one-to-clear.
pub fn vc1_register_space() -> RegisterSpace {
    const REGISTERS: &[(&str, RegisterOffset)] = &[
        ("ve_mode", VE_MODE),
        ("pichdrlen", VC1_PICHDRLEN),
        ("ephs", VC1_EPHS),
        ("picctrl", VC1_PICCTRL),
        ("picqp", VC1_PICQP),
        ("picmv", VC1_PICMV),
        ("picintencomp", VC1_PICINTENCOMP),
        ("picinterlace", VC1_PICINTERLACE),
        ("fsize", VC1_FSIZE),
        ("picsize", VC1_PICSIZE),
        ("ctrl", VC1_CTRL),
        ("trigger_type", VC1_TRIGGER_TYPE),
        ("bits_addr", VC1_BITS_ADDR),
        ("bits_offset", VC1_BITS_OFFSET),
        ("bits_len", VC1_BITS_LEN),
        ("bits_end_addr", VC1_BITS_END_ADDR),
        ("rec_luma", VC1_REC_LUMA),
        ("rec_chroma", VC1_REC_CHROMA),
        ("fwd_ref_luma_addr", VC1_FWD_REF_LUMA_ADDR),
        ("fwd_ref_chroma_addr", VC1_FWD_REF_CHROMA_ADDR),
        ("bwd_ref_luma_addr", VC1_BWD_REF_LUMA_ADDR),
        ("bwd_ref_chroma_addr", VC1_BWD_REF_CHROMA_ADDR),
        ("mvinfo_addr", VC1_MVINFO_ADDR),
        ("bitplane_addr", VC1_BITPLANE_ADDR),
        ("dcacpred_addr", VC1_DCACPRED_ADDR),
        ("rot_ctrl", VC1_ROT_CTRL),
        ("rot_luma_addr", VC1_ROT_LUMA_ADDR),
        ("rot_chroma_addr", VC1_ROT_CHROMA_ADDR),
    ];

    let mut regs = RegisterSpace::new();
    for (name, offset) in REGISTERS {
        regs.add_register(RegisterSpec::read_write(*name, *offset));
    }
    regs.add_register(RegisterSpec::write_1_to_clear(
        "status",
        VC1_STATUS,
        status::INT_MASK,
    ));
    regs
}

/// Heap memory posing as a DMA region.
pub struct HeapRegion {
    addr: DmaAddr,
    data: Vec<u8>,
}

impl DmaRegion for HeapRegion {
    fn dma_addr(&self) -> DmaAddr {
        self.addr
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

/// Allocator handing out `HeapRegion`s at increasing, page aligned bus addresses, with
/// accounting of every allocation and free.
pub struct MockDmaAllocator {
    next_addr: DmaAddr,
    calls: usize,
    fail_at: Option<usize>,
    allocated: Vec<DmaAddr>,
    freed: Vec<DmaAddr>,
}

const MOCK_DMA_BASE: DmaAddr = 0x4000_0000;
const MOCK_PAGE_SIZE: usize = 4096;

impl MockDmaAllocator {
    pub fn new() -> Self {
        MockDmaAllocator {
            next_addr: MOCK_DMA_BASE,
            calls: 0,
            fail_at: None,
            allocated: Vec::new(),
            freed: Vec::new(),
        }
    }

    /// Make the allocation request number `n`, counted from 0, fail.
    pub fn fail_allocation(&mut self, n: usize) {
        self.fail_at = Some(n);
    }

    /// Number of regions allocated and not freed yet.
    pub fn live(&self) -> usize {
        self.allocated.len() - self.freed.len()
    }

    /// Addresses of every successful allocation, sorted.
    pub fn allocated(&self) -> Vec<DmaAddr> {
        let mut addrs = self.allocated.clone();
        addrs.sort_unstable();
        addrs
    }

    /// Addresses of every freed region, sorted.
    pub fn freed(&self) -> Vec<DmaAddr> {
        let mut addrs = self.freed.clone();
        addrs.sort_unstable();
        addrs
    }
}

impl Default for MockDmaAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaAllocator for MockDmaAllocator {
    type Region = HeapRegion;

    fn allocate(&mut self, size: usize) -> Option<HeapRegion> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_at == Some(call) {
            return None;
        }
        let addr = self.next_addr;
        let pages = size.div_ceil(MOCK_PAGE_SIZE).max(1);
        self.next_addr += (pages * MOCK_PAGE_SIZE) as DmaAddr;
        self.allocated.push(addr);
        Some(HeapRegion {
            addr,
            data: vec![0; size],
        })
    }

    fn free(&mut self, region: HeapRegion) {
        assert!(
            self.allocated.contains(&region.addr),
            "freeing unknown region {:#x}",
            region.addr
        );
        assert!(
            !self.freed.contains(&region.addr),
            "double free of {:#x}",
            region.addr
        );
        self.freed.push(region.addr);
    }
}

struct MockBuffer {
    timestamp: Option<u64>,
    luma: DmaAddr,
    chroma: DmaAddr,
    payload: [usize; 2],
    attrs: FrameAttributes,
}

/// In-memory queue of NV12 frame buffers laid out back to back from a base address.
pub struct MockBufferQueue {
    buffers: Vec<MockBuffer>,
}

impl MockBufferQueue {
    pub fn new(base: DmaAddr, count: usize, width: u32, height: u32) -> Self {
        let luma_size = width * height;
        let frame_size = luma_size + luma_size / 2;
        let buffers = (0..count as u32)
            .map(|i| {
                let luma = base + i * frame_size;
                MockBuffer {
                    timestamp: None,
                    luma,
                    chroma: luma + luma_size,
                    payload: [0; 2],
                    attrs: FrameAttributes::default(),
                }
            })
            .collect();
        MockBufferQueue { buffers }
    }

    pub fn set_timestamp(&mut self, index: BufferIndex, timestamp: u64) {
        self.buffers[index.0].timestamp = Some(timestamp);
    }

    pub fn set_payload(&mut self, index: BufferIndex, plane: usize, len: usize) {
        self.buffers[index.0].payload[plane] = len;
    }
}

impl BufferQueue for MockBufferQueue {
    fn find_buffer(&self, timestamp: u64) -> Option<BufferIndex> {
        self.buffers
            .iter()
            .position(|b| b.timestamp == Some(timestamp))
            .map(BufferIndex)
    }

    fn dma_address(&self, index: BufferIndex, plane: usize) -> DmaAddr {
        let buffer = &self.buffers[index.0];
        match plane {
            0 => buffer.luma,
            _ => buffer.chroma,
        }
    }

    fn payload_length(&self, index: BufferIndex, plane: usize) -> usize {
        self.buffers[index.0].payload[plane.min(1)]
    }

    fn attributes(&self, index: BufferIndex) -> FrameAttributes {
        self.buffers[index.0].attrs
    }

    fn set_attributes(&mut self, index: BufferIndex, attrs: FrameAttributes) {
        self.buffers[index.0].attrs = attrs;
    }
}

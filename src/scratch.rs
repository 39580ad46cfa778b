// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-session scratch memory of the VC-1 engine.

use log::warn;
use static_assertions::const_assert;

use crate::dma::DmaAddr;
use crate::dma::DmaAllocator;
use crate::dma::DmaRegion;
use crate::error::Error;
use crate::error::Result;
use crate::vc1::params::BitplaneKind;
use crate::vc1::params::Bitplanes;
use crate::vc1::params::EntryPointHeader;
use crate::vc1::params::BITPLANE_COUNT;
use crate::vc1::params::BITPLANE_SIZE;

pub const MV_BUF_SIZE: usize = 64 * 1024;
pub const ACDC_BUF_SIZE: usize = 16 * 1024;
pub const BITPLANES_BUF_SIZE: usize = 16 * 1024;

// Staged bitplanes must fit in the bitplane scratch buffer.
const_assert!(BITPLANE_COUNT * BITPLANE_SIZE <= BITPLANES_BUF_SIZE);

/// Byte offset of the plane of `kind` within the bitplane scratch buffer.
pub const fn bitplane_offset(kind: BitplaneKind) -> usize {
    match kind {
        BitplaneKind::AcPred => 0x0000,
        BitplaneKind::OverFlags => 0x0400,
        BitplaneKind::MvTypeMb => 0x0800,
        BitplaneKind::SkipMb => 0x0c00,
        BitplaneKind::DirectMb => 0x1000,
        BitplaneKind::FieldTx => 0x1400,
        BitplaneKind::ForwardMb => 0x1800,
    }
}

/// Size of one bitplane for the coded size of `entrypoint`, one bit per macroblock.
///
/// Sizes above `BITPLANE_SIZE` are clamped with a warning rather than rejected.
pub fn bitplane_size(entrypoint: &EntryPointHeader) -> usize {
    let mb_width = (entrypoint.coded_width as usize).div_ceil(16);
    let mb_height = (entrypoint.coded_height as usize).div_ceil(16);
    let size = (mb_width * mb_height).div_ceil(8);
    if size > BITPLANE_SIZE {
        warn!(
            "bitplane size {} for {}x{} exceeds {} bytes, clamping",
            size, entrypoint.coded_width, entrypoint.coded_height, BITPLANE_SIZE
        );
        BITPLANE_SIZE
    } else {
        size
    }
}

/// The three scratch regions the engine uses while decoding a stream.
///
/// Created by `start_session` and consumed by `stop_session`, so a session cannot be stopped
/// twice or before it fully started.
pub struct ScratchBuffers<R: DmaRegion> {
    mv: R,
    acdc: R,
    bitplanes: R,
}

fn allocate<A: DmaAllocator>(
    alloc: &mut A,
    region: &'static str,
    size: usize,
) -> Result<A::Region> {
    alloc
        .allocate(size)
        .ok_or(Error::OutOfMemory { region, size })
}

impl<R: DmaRegion> ScratchBuffers<R> {
    /// Allocate the motion vector, AC/DC prediction and bitplane buffers.
    ///
    /// On failure every region allocated so far is freed again before the error is returned.
    pub fn start_session<A>(alloc: &mut A) -> Result<Self>
    where
        A: DmaAllocator<Region = R>,
    {
        let mv = allocate(alloc, "motion vector", MV_BUF_SIZE)?;
        let acdc = match allocate(alloc, "AC/DC prediction", ACDC_BUF_SIZE) {
            Ok(acdc) => acdc,
            Err(e) => {
                alloc.free(mv);
                return Err(e);
            }
        };
        let bitplanes = match allocate(alloc, "bitplane", BITPLANES_BUF_SIZE) {
            Ok(bitplanes) => bitplanes,
            Err(e) => {
                alloc.free(acdc);
                alloc.free(mv);
                return Err(e);
            }
        };
        Ok(ScratchBuffers {
            mv,
            acdc,
            bitplanes,
        })
    }

    /// Free all three regions.
    pub fn stop_session<A>(self, alloc: &mut A)
    where
        A: DmaAllocator<Region = R>,
    {
        alloc.free(self.mv);
        alloc.free(self.acdc);
        alloc.free(self.bitplanes);
    }

    pub fn mv_addr(&self) -> DmaAddr {
        self.mv.dma_addr()
    }

    pub fn acdc_addr(&self) -> DmaAddr {
        self.acdc.dma_addr()
    }

    pub fn bitplanes_addr(&self) -> DmaAddr {
        self.bitplanes.dma_addr()
    }

    /// Copy every present plane of `planes` to its slot in the bitplane buffer.
    ///
    /// The full `BITPLANE_SIZE` bytes are copied whatever the coded size, so a staged plane never
    /// carries bytes of an earlier picture. Planes that are not present keep their old content.
    pub fn stage_bitplanes(&mut self, entrypoint: &EntryPointHeader, planes: &Bitplanes) {
        // Only computed for the oversize warning.
        let _ = bitplane_size(entrypoint);

        let buf = self.bitplanes.as_mut_slice();
        for kind in BitplaneKind::ALL {
            if let Some(plane) = planes.plane(kind) {
                let offset = bitplane_offset(kind);
                buf[offset..offset + BITPLANE_SIZE].copy_from_slice(plane);
            }
        }
    }

    /// CPU view of the bitplane buffer.
    pub fn bitplanes_mut(&mut self) -> &mut [u8] {
        self.bitplanes.as_mut_slice()
    }
}

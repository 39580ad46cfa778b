// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Lookup of previously decoded frames used as prediction references.

use log::debug;

use crate::dma::DmaAddr;
use crate::vc1::params::PictureType;

/// Position of a buffer in its queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferIndex(pub usize);

/// Decoder-private attributes recorded on a destination buffer when its frame is armed, and read
/// back when that frame is later used as a reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameAttributes {
    pub interlaced: bool,
    pub ptype: PictureType,
    pub intensity_comp: bool,
    pub range_reduced: bool,
}

/// A queue of frame buffers owned by the surrounding driver.
pub trait BufferQueue {
    /// Find the buffer holding the frame stamped with `timestamp`.
    fn find_buffer(&self, timestamp: u64) -> Option<BufferIndex>;

    /// Bus address of `plane` of the buffer at `index`.
    fn dma_address(&self, index: BufferIndex, plane: usize) -> DmaAddr;

    /// Number of payload bytes in `plane` of the buffer at `index`.
    fn payload_length(&self, index: BufferIndex, plane: usize) -> usize;

    fn attributes(&self, index: BufferIndex) -> FrameAttributes;

    fn set_attributes(&mut self, index: BufferIndex, attrs: FrameAttributes);
}

/// A resolved reference frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceFrame {
    pub index: BufferIndex,
    pub luma: DmaAddr,
    pub chroma: DmaAddr,
    pub attrs: FrameAttributes,
}

/// Look the frame stamped with `timestamp` up in `queue`.
///
/// A missing frame is not an error: the caller decodes with no-reference defaults.
pub fn lookup_reference(queue: &dyn BufferQueue, timestamp: u64) -> Option<ReferenceFrame> {
    let Some(index) = queue.find_buffer(timestamp) else {
        debug!("no reference frame with timestamp {}", timestamp);
        return None;
    };
    Some(ReferenceFrame {
        index,
        luma: queue.dma_address(index, 0),
        chroma: queue.dma_address(index, 1),
        attrs: queue.attributes(index),
    })
}

/// Luma and chroma addresses to program for `reference`, zero when it is absent.
pub fn reference_addresses(reference: Option<&ReferenceFrame>) -> (DmaAddr, DmaAddr) {
    reference.map_or((0, 0), |r| (r.luma, r.chroma))
}

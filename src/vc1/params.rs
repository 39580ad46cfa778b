// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Picture-level parameters of a VC-1 frame, as produced by the bitstream parser.
//!
//! These are trusted inputs: nothing here is validated, malformed combinations are expected to be
//! rejected by the parser.

use bitflags::bitflags;
use enumn::N;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, N)]
#[repr(u8)]
pub enum Profile {
    #[default]
    Simple = 0,
    Main = 1,
    Complex = 2,
    Advanced = 3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, N)]
#[repr(u8)]
pub enum PictureType {
    #[default]
    I = 0,
    P = 1,
    B = 2,
    Bi = 3,
    Skipped = 4,
}

/// Frame coding mode (FCM).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, N)]
#[repr(u8)]
pub enum FrameCodingMode {
    #[default]
    Progressive = 0,
    InterlacedFrame = 1,
    InterlacedField = 2,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, N)]
#[repr(u8)]
pub enum MvMode {
    #[default]
    OneMvHpelBilinear = 0,
    OneMv = 1,
    OneMvHpel = 2,
    MixedMv = 3,
    IntensityComp = 4,
}

/// Codec-level constants valid for the whole stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceHeader {
    pub profile: Profile,
    pub multires: bool,
    pub range_reduction: bool,
    pub finterpflag: bool,
    pub syncmarker: bool,
}

/// Parameters valid until the next entry point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryPointHeader {
    pub coded_width: u16,
    pub coded_height: u16,
    pub loop_filter: bool,
    pub fast_uvmc: bool,
    pub extended_mv: bool,
    pub dquant: u8,
    pub vs_transform: bool,
    pub overlap: bool,
    pub quantizer: u8,
}

/// Picture layer of one frame or field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PictureLayer {
    pub ptype: PictureType,
    pub fcm: FrameCodingMode,
    pub tff: bool,
    pub second_field: bool,
    pub ref_field: bool,
    pub range_reduced_frame: bool,
    pub transacfrm: u8,
    pub transacfrm2: u8,
    pub transdctab: bool,
    pub rndctrl: bool,
    pub condover: u8,
    pub cbptab: u8,
    pub ttmbf: bool,
    pub ttfrm: u8,
    pub pqindex: u8,
    pub halfqp: bool,
    pub pquantizer: bool,
    pub mvmode: MvMode,
    pub mvmode2: MvMode,
    pub mvtab: u8,
    /// Index into the B-frame fraction table, not the fraction itself.
    pub bfraction: u8,
    pub mvrange: u8,
    pub dmvrange: u8,
    pub mbmodetab: u8,
    pub imvtab: u8,
    pub icbptab: u8,
    pub twomvbptab: u8,
    pub fourmvbptab: u8,
    pub numref: bool,
    pub intcomp: bool,
    pub intcompfield: u8,
    pub lumscale: u8,
    pub lumshift: u8,
    pub lumscale2: u8,
    pub lumshift2: u8,
    pub refdist: u8,
}

impl PictureLayer {
    pub fn is_progressive(&self) -> bool {
        self.fcm == FrameCodingMode::Progressive
    }
}

/// VOP differential quantization parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VopDquant {
    pub dqprofile: u8,
    pub dqsbedge: u8,
    pub dqdbedge: u8,
    pub altpquant: u8,
    pub dquantfrm: bool,
    pub dqbilevel: bool,
}

bitflags! {
    /// One bit per bitplane syntax element. Used both for the set of bitplanes handed over by the
    /// parser and for the set of elements that were raw coded in the bitstream.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct BitplaneFlags: u8 {
        const ACPRED = 1 << 0;
        const OVERFLAGS = 1 << 1;
        const MVTYPEMB = 1 << 2;
        const SKIPMB = 1 << 3;
        const DIRECTMB = 1 << 4;
        const FIELDTX = 1 << 5;
        const FORWARDMB = 1 << 6;
    }
}

/// Size in bytes of one bitplane as handed over by the parser.
pub const BITPLANE_SIZE: usize = 1024;
pub const BITPLANE_COUNT: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitplaneKind {
    AcPred,
    OverFlags,
    MvTypeMb,
    SkipMb,
    DirectMb,
    FieldTx,
    ForwardMb,
}

impl BitplaneKind {
    pub const ALL: [BitplaneKind; BITPLANE_COUNT] = [
        BitplaneKind::AcPred,
        BitplaneKind::OverFlags,
        BitplaneKind::MvTypeMb,
        BitplaneKind::SkipMb,
        BitplaneKind::DirectMb,
        BitplaneKind::FieldTx,
        BitplaneKind::ForwardMb,
    ];

    pub fn flag(self) -> BitplaneFlags {
        match self {
            BitplaneKind::AcPred => BitplaneFlags::ACPRED,
            BitplaneKind::OverFlags => BitplaneFlags::OVERFLAGS,
            BitplaneKind::MvTypeMb => BitplaneFlags::MVTYPEMB,
            BitplaneKind::SkipMb => BitplaneFlags::SKIPMB,
            BitplaneKind::DirectMb => BitplaneFlags::DIRECTMB,
            BitplaneKind::FieldTx => BitplaneFlags::FIELDTX,
            BitplaneKind::ForwardMb => BitplaneFlags::FORWARDMB,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Macroblock flag maps of one picture. Only planes whose flag is in `present` carry data.
#[derive(Clone)]
pub struct Bitplanes {
    present: BitplaneFlags,
    planes: [[u8; BITPLANE_SIZE]; BITPLANE_COUNT],
}

impl Default for Bitplanes {
    fn default() -> Self {
        Bitplanes {
            present: BitplaneFlags::empty(),
            planes: [[0; BITPLANE_SIZE]; BITPLANE_COUNT],
        }
    }
}

impl std::fmt::Debug for Bitplanes {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Bitplanes")
            .field("present", &self.present)
            .finish_non_exhaustive()
    }
}

impl Bitplanes {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn present(&self) -> BitplaneFlags {
        self.present
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Store the plane of `kind`. `data` longer than `BITPLANE_SIZE` is truncated, shorter data is
    /// zero padded.
    pub fn set_plane(&mut self, kind: BitplaneKind, data: &[u8]) {
        let plane = &mut self.planes[kind.index()];
        let len = data.len().min(BITPLANE_SIZE);
        plane[..len].copy_from_slice(&data[..len]);
        plane[len..].fill(0);
        self.present |= kind.flag();
    }

    pub fn plane(&self, kind: BitplaneKind) -> Option<&[u8; BITPLANE_SIZE]> {
        if self.present.contains(kind.flag()) {
            Some(&self.planes[kind.index()])
        } else {
            None
        }
    }
}

/// Everything the parser extracted for one picture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SliceParams {
    pub sequence: SequenceHeader,
    pub entrypoint: EntryPointHeader,
    pub picture: PictureLayer,
    pub vopdquant: VopDquant,
    /// Bitplane elements that are raw coded per macroblock in the bitstream.
    pub raw_coding: BitplaneFlags,
    pub forward_ref_ts: u64,
    pub backward_ref_ts: u64,
    /// Bit offset of the picture data within the source buffer.
    pub data_bit_offset: u32,
}

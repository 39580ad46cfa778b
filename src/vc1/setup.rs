// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Translation of one picture's parameters into the register program of the VC-1 engine.
//!
//! The derivation helpers are free functions so each rule can be checked on its own. A
//! `FrameInputs` gathers everything one picture needs once references have been resolved, builds
//! every composite register and writes the whole program in the order the engine expects.

use log::debug;

use super::params::BitplaneFlags;
use super::params::Bitplanes;
use super::params::MvMode;
use super::params::PictureLayer;
use super::params::PictureType;
use super::params::Profile;
use super::params::SliceParams;
use super::regs::*;
use crate::bus::RegisterBus;
use crate::dma::DmaAddr;
use crate::dma::DmaRegion;
use crate::engine::SourceBuffer;
use crate::refs::reference_addresses;
use crate::refs::FrameAttributes;
use crate::refs::ReferenceFrame;
use crate::scratch::ScratchBuffers;

/// `num / denom` scaled by 256.
pub const fn fraction(num: u32, denom: u32) -> u32 {
    num * 256 / denom
}

/// B-frame fractions indexed by the BFRACTION code. The last two entries are the BI picture
/// marker and a terminating zero.
const VC1_FRACTIONS: [u32; 23] = [
    fraction(1, 2),
    fraction(1, 3),
    fraction(2, 3),
    fraction(1, 4),
    fraction(3, 4),
    fraction(1, 5),
    fraction(2, 5),
    fraction(3, 5),
    fraction(4, 5),
    fraction(1, 6),
    fraction(5, 6),
    fraction(1, 7),
    fraction(2, 7),
    fraction(3, 7),
    fraction(4, 7),
    fraction(5, 7),
    fraction(6, 7),
    fraction(1, 8),
    fraction(3, 8),
    fraction(5, 8),
    fraction(7, 8),
    0xff,
    0,
];

const VC1_MVMODE_MAP: [u32; 4] = [3, 0, 2, 1];

/// Scaled B-frame fraction for `index`; 0 when out of range.
pub fn get_fraction(index: u8) -> u32 {
    VC1_FRACTIONS.get(index as usize).copied().unwrap_or(0)
}

pub fn less_than_half(fraction_256: u32) -> bool {
    fraction_256 < fraction(1, 2)
}

/// Motion vector mode as the engine numbers it. Only the two low bits of `mode` are used.
pub fn remap_mvmode(mode: MvMode) -> u32 {
    VC1_MVMODE_MAP[(mode as usize) & 3]
}

/// Mode that actually drives motion compensation: P pictures signalling intensity compensation
/// carry their real mode in MVMODE2.
pub fn effective_mvmode(picture: &PictureLayer) -> MvMode {
    if picture.ptype == PictureType::P && picture.mvmode == MvMode::IntensityComp {
        picture.mvmode2
    } else {
        picture.mvmode
    }
}

/// Whether the picture is the bottom field.
pub fn is_bottom_field(picture: &PictureLayer) -> bool {
    !picture.is_progressive() && !(picture.tff ^ picture.second_field)
}

/// Whether the field references the field of the same parity.
pub fn same_ref_field(picture: &PictureLayer) -> bool {
    !(picture.second_field ^ picture.ref_field)
}

/// B pictures inherit intensity compensation from their forward reference, other pictures use
/// their own flag.
///
/// Unverified against field pictures, which signal compensation per field.
pub fn intensity_comp_enabled(picture: &PictureLayer, forward: Option<&ReferenceFrame>) -> bool {
    if picture.ptype == PictureType::B {
        forward.is_some_and(|f| f.attrs.intensity_comp)
    } else {
        picture.intcomp
    }
}

/// Intensity compensation flag to record for later pictures referencing this one. `None` leaves
/// whatever the destination buffer held.
pub fn output_intensity_comp(ptype: PictureType, enabled: bool) -> Option<bool> {
    match ptype {
        PictureType::P => Some(enabled),
        PictureType::I => Some(false),
        _ => None,
    }
}

/// Forward and backward reference frame distances, each clamped to what the engine holds.
pub fn reference_distances(ptype: PictureType, fraction_256: u32, refdist: u8) -> (u32, u32) {
    let refdist = refdist as u32;
    let frfd = if ptype == PictureType::B {
        (fraction_256 * refdist) >> 8
    } else {
        refdist
    };
    let brfd = (refdist as i64 - frfd as i64 - 1).clamp(0, 3) as u32;
    (frfd.min(3), brfd)
}

/// Interlacing of a reference. Without one, the current picture's cadence is assumed.
pub fn reference_interlaced(reference: Option<&ReferenceFrame>, progressive: bool) -> bool {
    match reference {
        Some(r) => r.attrs.interlaced,
        None => !progressive,
    }
}

/// Attributes to record on the destination buffer when the picture is armed. `previous` is what
/// the buffer held before.
pub fn output_attributes(
    picture: &PictureLayer,
    previous: FrameAttributes,
    intensity_comp: bool,
) -> FrameAttributes {
    FrameAttributes {
        interlaced: !picture.is_progressive(),
        ptype: picture.ptype,
        intensity_comp: output_intensity_comp(picture.ptype, intensity_comp)
            .unwrap_or(previous.intensity_comp),
        range_reduced: picture.range_reduced_frame,
    }
}

/// Everything needed to program one picture.
pub struct FrameInputs<'a> {
    pub slice: &'a SliceParams,
    pub bitplanes: Option<&'a Bitplanes>,
    pub forward: Option<&'a ReferenceFrame>,
    pub backward: Option<&'a ReferenceFrame>,
    pub source: SourceBuffer,
    /// Luma and chroma addresses of the destination buffer.
    pub destination: (DmaAddr, DmaAddr),
    /// Dimensions of the source format.
    pub width: u32,
    pub height: u32,
    pub mcri_cache: bool,
}

impl FrameInputs<'_> {
    fn picture(&self) -> &PictureLayer {
        &self.slice.picture
    }

    fn has_bitplanes(&self) -> bool {
        self.bitplanes.is_some_and(|b| !b.is_empty())
    }

    pub fn intensity_comp(&self) -> bool {
        intensity_comp_enabled(self.picture(), self.forward)
    }

    pub fn ephs(&self) -> Ephs {
        let sequence = &self.slice.sequence;
        let entrypoint = &self.slice.entrypoint;
        let advanced = sequence.profile == Profile::Advanced;
        let mut reg = Ephs::new();
        reg.set_profile(sequence.profile as u8);
        reg.set_loopfilter(entrypoint.loop_filter);
        reg.set_multires(sequence.multires);
        reg.set_fastuvmc(entrypoint.fast_uvmc);
        reg.set_extendedmv(entrypoint.extended_mv);
        reg.set_dquant(entrypoint.dquant);
        reg.set_vstransform(entrypoint.vs_transform);
        reg.set_overlap(entrypoint.overlap);
        reg.set_quantizer(entrypoint.quantizer);
        reg.set_rangered(sequence.range_reduction);
        reg.set_finterpflag(sequence.finterpflag);
        reg.set_syncmarker(sequence.syncmarker);
        reg.set_startcode_det_en(advanced);
        reg.set_eptb_det_bypass(!advanced);
        reg
    }

    pub fn picctrl(&self) -> PicCtrl {
        let picture = self.picture();
        let raw = self.slice.raw_coding;
        let fcm = picture.fcm as u8;
        let mut reg = PicCtrl::new();
        reg.set_ptype(picture.ptype as u8);
        reg.set_fcm(if fcm != 0 { fcm + 1 } else { 0 });
        reg.set_bottom_field(is_bottom_field(picture));
        reg.set_second_field(picture.second_field);
        reg.set_rangeredfrm(picture.range_reduced_frame);
        reg.set_fwd_rangeredfrm(self.forward.is_some_and(|f| f.attrs.range_reduced));
        reg.set_bwd_rangeredfrm(self.backward.is_some_and(|b| b.attrs.range_reduced));
        reg.set_transacfrm(picture.transacfrm);
        reg.set_transacfrm2(picture.transacfrm2);
        reg.set_transdctab(picture.transdctab);
        reg.set_rndctrl(picture.rndctrl);
        reg.set_condover(if picture.condover != 0 {
            picture.condover.wrapping_add(1)
        } else {
            0
        });
        reg.set_overflags_raw(raw.contains(BitplaneFlags::OVERFLAGS));
        reg.set_cbptab(picture.cbptab);
        reg.set_skipmb_raw(raw.contains(BitplaneFlags::SKIPMB));
        reg.set_ttmbf(picture.ttmbf);
        reg.set_ttfrm(picture.ttfrm);
        reg.set_directmb_raw(raw.contains(BitplaneFlags::DIRECTMB));
        // Unverified: this may only be meant for I pictures, or keyed on the reference types.
        reg.set_direct_ref_intra(picture.ptype != PictureType::P);
        reg.set_bitpl_coding(self.has_bitplanes());
        reg
    }

    pub fn picqp(&self) -> PicQp {
        let picture = self.picture();
        let vopdquant = &self.slice.vopdquant;
        let mut reg = PicQp::new();
        reg.set_pqindex(picture.pqindex);
        reg.set_halfqp(picture.halfqp);
        reg.set_pquantizer(picture.pquantizer);
        reg.set_dqprofile(vopdquant.dqprofile);
        reg.set_dqsbedge(vopdquant.dqsbedge);
        reg.set_dqdbedge(vopdquant.dqdbedge);
        reg.set_altpquant(vopdquant.altpquant);
        reg.set_dquantfrm(vopdquant.dquantfrm);
        reg.set_dqbilevel(vopdquant.dqbilevel);
        reg
    }

    pub fn picmv(&self) -> PicMv {
        let picture = self.picture();
        let bfraction = get_fraction(picture.bfraction);
        let mut reg = PicMv::new();
        reg.set_bfraction(bfraction as u8);
        reg.set_bfrac_less_than_half(less_than_half(bfraction));
        reg.set_mvrange(picture.mvrange);
        reg.set_mvmode(remap_mvmode(effective_mvmode(picture)) as u8);
        reg.set_intensity_comp_en(self.intensity_comp());
        reg.set_mvtab(picture.mvtab);
        reg
    }

    pub fn picintencomp(&self) -> PicIntenComp {
        let picture = self.picture();
        let mut reg = PicIntenComp::new();
        reg.set_lumascale1(picture.lumscale);
        reg.set_lumashift1(picture.lumshift);
        reg.set_lumascale2(picture.lumscale2);
        reg.set_lumashift2(picture.lumshift2);
        reg
    }

    pub fn picinterlace(&self) -> PicInterlace {
        let picture = self.picture();
        let raw = self.slice.raw_coding;
        let progressive = picture.is_progressive();
        let (frfd, brfd) = reference_distances(
            picture.ptype,
            get_fraction(picture.bfraction),
            picture.refdist,
        );
        let mut reg = PicInterlace::new();
        reg.set_fieldtx_raw(raw.contains(BitplaneFlags::FIELDTX));
        reg.set_dmvrange(picture.dmvrange);
        reg.set_fourmvswitch(effective_mvmode(picture) == MvMode::MixedMv);
        reg.set_mbmodetab(picture.mbmodetab);
        reg.set_imvtab(picture.imvtab);
        reg.set_icbptab(picture.icbptab);
        reg.set_intencomp(picture.intcomp);
        reg.set_twomvbptab(picture.twomvbptab);
        reg.set_fourmvbptab(picture.fourmvbptab);
        reg.set_frfd(frfd as u8);
        reg.set_brfd(brfd as u8);
        reg.set_reffield(same_ref_field(picture));
        reg.set_intencompfld(picture.intcompfield);
        reg.set_forward_raw(raw.contains(BitplaneFlags::FORWARDMB));
        reg.set_fwd_interlace(reference_interlaced(self.forward, progressive));
        reg.set_bwd_interlace(reference_interlaced(self.backward, progressive));
        reg.set_numref(picture.numref);
        reg
    }

    pub fn frame_size(&self) -> PicSize {
        let mut reg = PicSize::new();
        reg.set_width(self.width as u16);
        reg.set_height(self.height as u16);
        reg
    }

    pub fn ctrl(&self) -> Ctrl {
        let mut reg = Ctrl::new();
        reg.set_irqs(true);
        reg.set_mcri_cache_en(self.mcri_cache);
        reg
    }

    /// Write the register program for this picture and stage its bitplanes.
    ///
    /// Interrupts are enabled by the final write; the engine only starts once triggered.
    pub fn program<R: DmaRegion>(&self, bus: &mut dyn RegisterBus, scratch: &mut ScratchBuffers<R>) {
        bus.write(VC1_DCACPRED_ADDR, scratch.acdc_addr());
        bus.write(VC1_BITPLANE_ADDR, scratch.bitplanes_addr());
        bus.write(VC1_MVINFO_ADDR, scratch.mv_addr());

        let src = self.source.addr;
        // The length registers are 32 bits wide, larger payloads wrap.
        let payload = self.source.payload as u32;
        bus.write(VC1_BITS_ADDR, bits_addr::base(src));
        bus.write(VC1_BITS_END_ADDR, src.wrapping_add(payload));
        bus.write(VC1_BITS_OFFSET, self.slice.data_bit_offset);
        bus.write(VC1_BITS_LEN, payload.wrapping_mul(8));
        // One slice per picture: the data is both first and last.
        bus.write(
            VC1_BITS_ADDR,
            bits_addr::base(src)
                | bits_addr::VALID_SLICE_DATA
                | bits_addr::LAST_SLICE_DATA
                | bits_addr::FIRST_SLICE_DATA,
        );

        bus.write(VC1_STATUS, status::INT_MASK);
        bus.write(VC1_TRIGGER_TYPE, trigger_type::INIT_SWDEC);
        bus.write(VC1_ROT_CTRL, 0);
        bus.write(VC1_PICHDRLEN, 0);

        bus.write(VC1_EPHS, self.ephs().bits());
        bus.write(VC1_PICCTRL, self.picctrl().bits());
        bus.write(VC1_PICQP, self.picqp().bits());
        bus.write(VC1_PICMV, self.picmv().bits());
        bus.write(VC1_PICINTENCOMP, self.picintencomp().bits());
        bus.write(VC1_PICINTERLACE, self.picinterlace().bits());

        // Both size registers take the source format dimensions.
        bus.write(VC1_FSIZE, self.frame_size().bits());
        bus.write(VC1_PICSIZE, self.frame_size().bits());

        let (dst_luma, dst_chroma) = self.destination;
        bus.write(VC1_REC_LUMA, dst_luma);
        bus.write(VC1_REC_CHROMA, dst_chroma);
        // Rotation is not supported, the rotated output mirrors the reconstruction.
        bus.write(VC1_ROT_LUMA_ADDR, dst_luma);
        bus.write(VC1_ROT_CHROMA_ADDR, dst_chroma);

        let (fwd_luma, fwd_chroma) = reference_addresses(self.forward);
        let (bwd_luma, bwd_chroma) = reference_addresses(self.backward);
        bus.bulk_write(
            VC1_FWD_REF_LUMA_ADDR,
            &[fwd_luma, fwd_chroma, bwd_luma, bwd_chroma],
        );

        if let Some(bitplanes) = self.bitplanes.filter(|b| !b.is_empty()) {
            debug!("staging bitplanes {:?}", bitplanes.present());
            scratch.stage_bitplanes(&self.slice.entrypoint, bitplanes);
        }

        bus.write(VC1_CTRL, self.ctrl().bits());
    }
}

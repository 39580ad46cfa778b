// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Register map of the VC-1 decode engine.
//!
//! Offsets are relative to the base of the video engine window. Composite registers are
//! `#[bitfield]` layouts declared from bit 0 upwards, so the bit layout the hardware expects lives
//! in this file only.

use bit_field::*;

use crate::bus::RegisterOffset;

/// A 32-bit register layout and its value on the bus.
pub trait RegisterLayout: Sized {
    fn from_bits(bits: u32) -> Self;
    fn bits(&self) -> u32;
}

macro_rules! register_layout {
    ($($name:ident),* $(,)?) => {
        $(
            impl RegisterLayout for $name {
                fn from_bits(bits: u32) -> Self {
                    let mut reg = $name::new();
                    reg.set(0, 32, bits.into());
                    reg
                }

                fn bits(&self) -> u32 {
                    self.get(0, 32) as u32
                }
            }
        )*
    };
}

// Engine mode register, shared by all decode engines.
pub const VE_MODE: RegisterOffset = 0x000;

pub mod ve_mode {
    pub const DEC_VC1: u32 = 0x2;
    pub const DISABLED: u32 = 0x7;
    pub const DDR_MODE_BW_128: u8 = 0x3;
}

#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct VeMode {
    dec: BitField4,
    reserved0: BitField12,
    ddr_mode_bw: BitField2,
    reserved1: BitField2,
    rec_wr_mode_2mb: bool,
    reserved2: BitField11,
}

pub const VC1_PICHDRLEN: RegisterOffset = 0x300;
pub const VC1_EPHS: RegisterOffset = 0x304;
pub const VC1_PICCTRL: RegisterOffset = 0x308;
pub const VC1_PICQP: RegisterOffset = 0x30c;
pub const VC1_PICMV: RegisterOffset = 0x310;
pub const VC1_PICINTENCOMP: RegisterOffset = 0x314;
pub const VC1_PICINTERLACE: RegisterOffset = 0x318;
pub const VC1_FSIZE: RegisterOffset = 0x31c;
pub const VC1_PICSIZE: RegisterOffset = 0x320;
pub const VC1_CTRL: RegisterOffset = 0x324;
pub const VC1_TRIGGER_TYPE: RegisterOffset = 0x328;
pub const VC1_STATUS: RegisterOffset = 0x32c;
pub const VC1_BITS_ADDR: RegisterOffset = 0x330;
pub const VC1_BITS_OFFSET: RegisterOffset = 0x334;
pub const VC1_BITS_LEN: RegisterOffset = 0x338;
pub const VC1_BITS_END_ADDR: RegisterOffset = 0x33c;
pub const VC1_REC_LUMA: RegisterOffset = 0x340;
pub const VC1_REC_CHROMA: RegisterOffset = 0x344;
// The four reference addresses are consecutive and written in one burst.
pub const VC1_FWD_REF_LUMA_ADDR: RegisterOffset = 0x348;
pub const VC1_FWD_REF_CHROMA_ADDR: RegisterOffset = 0x34c;
pub const VC1_BWD_REF_LUMA_ADDR: RegisterOffset = 0x350;
pub const VC1_BWD_REF_CHROMA_ADDR: RegisterOffset = 0x354;
pub const VC1_MVINFO_ADDR: RegisterOffset = 0x358;
pub const VC1_BITPLANE_ADDR: RegisterOffset = 0x35c;
pub const VC1_DCACPRED_ADDR: RegisterOffset = 0x360;
pub const VC1_ROT_CTRL: RegisterOffset = 0x364;
pub const VC1_ROT_LUMA_ADDR: RegisterOffset = 0x368;
pub const VC1_ROT_CHROMA_ADDR: RegisterOffset = 0x36c;

/// Picture header registers, dumped before each trigger when register dumps are enabled.
pub const VC1_HEADER_WINDOW: std::ops::RangeInclusive<RegisterOffset> = VC1_PICHDRLEN..=VC1_CTRL;

#[bitfield]
/// Entry point and sequence header flags.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ephs {
    eptb_det_bypass: bool,
    startcode_det_en: bool,
    reserved0: BitField12,
    syncmarker: bool,
    finterpflag: bool,
    rangered: bool,
    quantizer: BitField2,
    overlap: bool,
    vstransform: bool,
    dquant: BitField2,
    extendedmv: bool,
    fastuvmc: bool,
    multires: bool,
    loopfilter: bool,
    reserved1: BitField3,
    profile: BitField2,
}

#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PicCtrl {
    ptype: BitField3,
    fcm: BitField2,
    bottom_field: bool,
    second_field: bool,
    rangeredfrm: bool,
    fwd_rangeredfrm: bool,
    bwd_rangeredfrm: bool,
    transacfrm: BitField2,
    transacfrm2: BitField2,
    transdctab: bool,
    rndctrl: bool,
    condover: BitField2,
    acpred_raw: bool,
    overflags_raw: bool,
    cbptab: BitField3,
    skipmb_raw: bool,
    ttmbf: bool,
    ttfrm: BitField2,
    directmb_raw: bool,
    direct_ref_intra: bool,
    bitpl_coding: bool,
    reserved: BitField2,
}

#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PicQp {
    pqindex: BitField5,
    halfqp: bool,
    pquantizer: bool,
    dqprofile: BitField2,
    dqsbedge: BitField2,
    dqdbedge: BitField2,
    altpquant: BitField5,
    dquantfrm: bool,
    dqbilevel: bool,
    reserved: BitField12,
}

#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PicMv {
    bfraction: BitField8,
    bfrac_less_than_half: bool,
    mvrange: BitField2,
    mvmode: BitField2,
    intensity_comp_en: bool,
    mvtab: BitField3,
    mvtypemb_raw: bool,
    reserved: BitField14,
}

#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PicIntenComp {
    lumascale1: BitField6,
    reserved0: BitField2,
    lumashift1: BitField6,
    reserved1: BitField2,
    lumascale2: BitField6,
    reserved2: BitField2,
    lumashift2: BitField6,
    reserved3: BitField2,
}

#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PicInterlace {
    fieldtx_raw: bool,
    dmvrange: BitField2,
    fourmvswitch: bool,
    mbmodetab: BitField3,
    imvtab: BitField3,
    icbptab: BitField3,
    intencomp: bool,
    twomvbptab: BitField2,
    fourmvbptab: BitField2,
    frfd: BitField2,
    brfd: BitField2,
    reffield: bool,
    intencompfld: BitField2,
    forward_raw: bool,
    fwd_interlace: bool,
    bwd_interlace: bool,
    numref: bool,
    reserved: BitField3,
}

#[bitfield]
/// Layout shared by FSIZE and PICSIZE.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PicSize {
    width: BitField16,
    height: BitField16,
}

#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ctrl {
    finish_irq_en: bool,
    error_irq_en: bool,
    vld_data_req_irq_en: bool,
    reserved0: BitField5,
    mcri_cache_en: bool,
    reserved1: BitField23,
}

impl Ctrl {
    /// Enable or mask every interrupt source at once.
    pub fn set_irqs(&mut self, enabled: bool) {
        self.set_finish_irq_en(enabled);
        self.set_error_irq_en(enabled);
        self.set_vld_data_req_irq_en(enabled);
    }
}

register_layout!(VeMode, Ephs, PicCtrl, PicQp, PicMv, PicIntenComp, PicInterlace, PicSize, Ctrl);

pub mod trigger_type {
    pub const INIT_SWDEC: u32 = 0x7;
    pub const DECODE: u32 = 0x8;
}

pub mod status {
    pub const SUCCESS: u32 = 1 << 0;
    pub const ERROR: u32 = 1 << 1;
    pub const VLD_DATA_REQ: u32 = 1 << 2;
    pub const INT_MASK: u32 = SUCCESS | ERROR | VLD_DATA_REQ;
}

pub mod bits_addr {
    pub const FIRST_SLICE_DATA: u32 = 1 << 28;
    pub const LAST_SLICE_DATA: u32 = 1 << 29;
    pub const VALID_SLICE_DATA: u32 = 1 << 30;

    /// The engine takes address bits 31:28 in the low nibble, the low nibble being implied zero.
    pub const fn base(addr: u32) -> u32 {
        (addr & 0x0fff_fff0) | (addr >> 28)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Sets each field to all ones, checks where it lands and that no two fields share a bit.
    // Evaluates to the union of all field bits.
    macro_rules! assert_layout {
        ($reg:ident { $($setter:ident($value:expr) => $mask:expr),* $(,)? }) => {{
            let mut seen = 0u32;
            $(
                let mut reg = $reg::new();
                reg.$setter($value);
                let mask = reg.bits();
                assert_eq!(mask, $mask, "{}::{}", stringify!($reg), stringify!($setter));
                assert_eq!(seen & mask, 0, "{}::{} overlaps", stringify!($reg), stringify!($setter));
                seen |= mask;
            )*
            seen
        }};
    }

    #[test]
    fn layouts_are_one_register_wide() {
        assert_eq!(std::mem::size_of::<VeMode>(), 4);
        assert_eq!(std::mem::size_of::<Ephs>(), 4);
        assert_eq!(std::mem::size_of::<PicCtrl>(), 4);
        assert_eq!(std::mem::size_of::<PicQp>(), 4);
        assert_eq!(std::mem::size_of::<PicMv>(), 4);
        assert_eq!(std::mem::size_of::<PicIntenComp>(), 4);
        assert_eq!(std::mem::size_of::<PicInterlace>(), 4);
        assert_eq!(std::mem::size_of::<PicSize>(), 4);
        assert_eq!(std::mem::size_of::<Ctrl>(), 4);
    }

    #[test]
    fn from_bits_round_trips_reserved_bits() {
        let reg = Ctrl::from_bits(0xdead_beef);
        assert_eq!(reg.bits(), 0xdead_beef);
        assert!(reg.get_finish_irq_en());
    }

    #[test]
    fn ve_mode_layout() {
        assert_layout!(VeMode {
            set_dec(u8::MAX) => 0xf,
            set_ddr_mode_bw(u8::MAX) => 0x3 << 16,
            set_rec_wr_mode_2mb(true) => 1 << 20,
        });
    }

    #[test]
    fn ephs_layout() {
        assert_layout!(Ephs {
            set_eptb_det_bypass(true) => 1 << 0,
            set_startcode_det_en(true) => 1 << 1,
            set_syncmarker(true) => 1 << 14,
            set_finterpflag(true) => 1 << 15,
            set_rangered(true) => 1 << 16,
            set_quantizer(u8::MAX) => 0x3 << 17,
            set_overlap(true) => 1 << 19,
            set_vstransform(true) => 1 << 20,
            set_dquant(u8::MAX) => 0x3 << 21,
            set_extendedmv(true) => 1 << 23,
            set_fastuvmc(true) => 1 << 24,
            set_multires(true) => 1 << 25,
            set_loopfilter(true) => 1 << 26,
            set_profile(u8::MAX) => 0x3 << 30,
        });
    }

    #[test]
    fn picctrl_layout() {
        let used = assert_layout!(PicCtrl {
            set_ptype(u8::MAX) => 0x7,
            set_fcm(u8::MAX) => 0x3 << 3,
            set_bottom_field(true) => 1 << 5,
            set_second_field(true) => 1 << 6,
            set_rangeredfrm(true) => 1 << 7,
            set_fwd_rangeredfrm(true) => 1 << 8,
            set_bwd_rangeredfrm(true) => 1 << 9,
            set_transacfrm(u8::MAX) => 0x3 << 10,
            set_transacfrm2(u8::MAX) => 0x3 << 12,
            set_transdctab(true) => 1 << 14,
            set_rndctrl(true) => 1 << 15,
            set_condover(u8::MAX) => 0x3 << 16,
            set_acpred_raw(true) => 1 << 18,
            set_overflags_raw(true) => 1 << 19,
            set_cbptab(u8::MAX) => 0x7 << 20,
            set_skipmb_raw(true) => 1 << 23,
            set_ttmbf(true) => 1 << 24,
            set_ttfrm(u8::MAX) => 0x3 << 25,
            set_directmb_raw(true) => 1 << 27,
            set_direct_ref_intra(true) => 1 << 28,
            set_bitpl_coding(true) => 1 << 29,
        });
        assert_eq!(used, 0x3fff_ffff);
    }

    #[test]
    fn picqp_picmv_layout() {
        assert_layout!(PicQp {
            set_pqindex(u8::MAX) => 0x1f,
            set_halfqp(true) => 1 << 5,
            set_pquantizer(true) => 1 << 6,
            set_dqprofile(u8::MAX) => 0x3 << 7,
            set_dqsbedge(u8::MAX) => 0x3 << 9,
            set_dqdbedge(u8::MAX) => 0x3 << 11,
            set_altpquant(u8::MAX) => 0x1f << 13,
            set_dquantfrm(true) => 1 << 18,
            set_dqbilevel(true) => 1 << 19,
        });
        assert_layout!(PicMv {
            set_bfraction(u8::MAX) => 0xff,
            set_bfrac_less_than_half(true) => 1 << 8,
            set_mvrange(u8::MAX) => 0x3 << 9,
            set_mvmode(u8::MAX) => 0x3 << 11,
            set_intensity_comp_en(true) => 1 << 13,
            set_mvtab(u8::MAX) => 0x7 << 14,
            set_mvtypemb_raw(true) => 1 << 17,
        });
    }

    #[test]
    fn picintencomp_layout() {
        assert_layout!(PicIntenComp {
            set_lumascale1(u8::MAX) => 0x3f,
            set_lumashift1(u8::MAX) => 0x3f << 8,
            set_lumascale2(u8::MAX) => 0x3f << 16,
            set_lumashift2(u8::MAX) => 0x3f << 24,
        });
    }

    #[test]
    fn picinterlace_layout() {
        let used = assert_layout!(PicInterlace {
            set_fieldtx_raw(true) => 1 << 0,
            set_dmvrange(u8::MAX) => 0x3 << 1,
            set_fourmvswitch(true) => 1 << 3,
            set_mbmodetab(u8::MAX) => 0x7 << 4,
            set_imvtab(u8::MAX) => 0x7 << 7,
            set_icbptab(u8::MAX) => 0x7 << 10,
            set_intencomp(true) => 1 << 13,
            set_twomvbptab(u8::MAX) => 0x3 << 14,
            set_fourmvbptab(u8::MAX) => 0x3 << 16,
            set_frfd(u8::MAX) => 0x3 << 18,
            set_brfd(u8::MAX) => 0x3 << 20,
            set_reffield(true) => 1 << 22,
            set_intencompfld(u8::MAX) => 0x3 << 23,
            set_forward_raw(true) => 1 << 25,
            set_fwd_interlace(true) => 1 << 26,
            set_bwd_interlace(true) => 1 << 27,
            set_numref(true) => 1 << 28,
        });
        assert_eq!(used, 0x1fff_ffff);
    }

    #[test]
    fn size_and_ctrl_layout() {
        assert_layout!(PicSize {
            set_width(u16::MAX) => 0xffff,
            set_height(u16::MAX) => 0xffff << 16,
        });
        assert_layout!(Ctrl {
            set_finish_irq_en(true) => 1 << 0,
            set_error_irq_en(true) => 1 << 1,
            set_vld_data_req_irq_en(true) => 1 << 2,
            set_mcri_cache_en(true) => 1 << 8,
        });
        let mut ctrl = Ctrl::new();
        ctrl.set_irqs(true);
        assert_eq!(ctrl.bits(), 0x7);
    }

    #[test]
    fn bits_addr_base_folds_high_nibble() {
        assert_eq!(bits_addr::base(0x4000_1230), 0x0000_1234);
        assert_eq!(bits_addr::base(0x0123_4560), 0x0123_4560);
    }
}

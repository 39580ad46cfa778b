// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use bit_field::*;

#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq)]
struct Control {
    enable: bool,
    mode: BitField3,
    reserved: BitField4,
    length: BitField16,
    tail: BitField8,
}

#[test]
fn fields_pack_in_declaration_order() {
    let mut c = Control::new();
    assert_eq!(c.get(0, 32), 0);

    c.set_enable(true);
    c.set_mode(0b101);
    c.set_length(0xbeef);
    assert_eq!(c.get(0, 32), 0x00be_ef0b);
    assert!(c.get_enable());
    assert_eq!(c.get_mode(), 0b101);
    assert_eq!(c.get_length(), 0xbeef);
    assert_eq!(c.get_tail(), 0);
}

#[test]
fn setter_truncates_to_field_width() {
    let mut c = Control::new();
    c.set_mode(0xff);
    assert_eq!(c.get_mode(), 0b111);
    assert_eq!(c.get(0, 32), 0b1110);
    assert_eq!(c.get_reserved(), 0);
}

#[test]
fn clearing_a_flag_keeps_neighbours() {
    let mut c = Control::new();
    c.set(0, 32, u32::MAX.into());
    c.set_enable(false);
    assert_eq!(c.get(0, 32), 0xffff_fffe);
}

#[test]
fn debug_lists_fields() {
    let mut c = Control::new();
    c.set_mode(2);
    let text = format!("{:?}", c);
    assert!(text.starts_with("Control"));
    assert!(text.contains("mode: 2"));
}

// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Driver core of the VC-1 decode engine of the Cedrus video engine.
//!
//! The crate programs one picture at a time into the engine's register window, starts the
//! hardware and reports how the run ended:
//!
//! * `vc1::setup` turns the parsed picture parameters into the register program.
//! * `engine::Accelerator` holds one engine instance and walks each run through its states.
//! * `scratch::ScratchBuffers` owns the memory the engine needs for a decode session.
//! * `refs` resolves reference pictures among previously decoded buffers.
//!
//! Register access, DMA memory and buffer queues are provided by the embedding driver through the
//! `RegisterBus`, `DmaAllocator` and `BufferQueue` traits. The `mock` module implements all three
//! in software.

pub mod bus;
pub mod config;
pub mod dma;
pub mod engine;
mod error;
pub mod mock;
pub mod refs;
pub mod register_space;
pub mod scratch;
pub mod vc1;

pub use self::bus::RegisterBus;
pub use self::bus::RegisterOffset;
pub use self::config::load_config_file;
pub use self::config::VpuConfig;
pub use self::dma::DmaAddr;
pub use self::dma::DmaAllocator;
pub use self::dma::DmaRegion;
pub use self::engine::Accelerator;
pub use self::engine::DecodeJob;
pub use self::engine::DecodeOps;
pub use self::engine::RunHandle;
pub use self::engine::RunOutcome;
pub use self::engine::RunState;
pub use self::engine::SourceBuffer;
pub use self::error::Error;
pub use self::error::Result;
pub use self::refs::BufferIndex;
pub use self::refs::BufferQueue;
pub use self::refs::FrameAttributes;
pub use self::vc1::Vc1Decoder;

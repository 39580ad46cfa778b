// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::io;

use remain::sorted;
use thiserror::Error;

use crate::engine::RunState;

#[sorted]
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration text is not valid.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(serde_json::Error),
    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    ConfigRead(io::Error),
    /// The engine reported an error or requested more bitstream than was provided.
    #[error("hardware fault, status {status:#x}")]
    HardwareFault { status: u32 },
    /// An operation was attempted in a run state that does not allow it.
    #[error("cannot {op} while {state:?}")]
    InvalidState { op: &'static str, state: RunState },
    /// A picture was submitted before the decode session was started.
    #[error("decode session not started")]
    NoSession,
    /// A scratch buffer could not be allocated.
    #[error("out of memory allocating {size} bytes for the {region} buffer")]
    OutOfMemory { region: &'static str, size: usize },
    /// Nothing was observed on the status register before the watchdog expired.
    #[error("decode watchdog expired")]
    WatchdogTimeout,
}

pub type Result<T> = std::result::Result<T, Error>;

// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Analysis module implementations.
//!
//! # Local Backend
//! In-process modules that ship with the crate:
//! - **stats**: segment, word and speaking-time counts per speaker
//! - **word_frequency**: token frequencies
//! - **transcript_output**: readable transcript rendering
//! - **summary**: overview built from `stats` and `word_frequency`
//!
//! # Stub Backend (Test-Only)
//! Modules that succeed, fail, panic, sleep or misbehave on demand, used by
//! the executor and pipeline tests.

pub mod local;
#[cfg(test)]
pub mod stub;

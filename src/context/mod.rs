// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod pipeline_context;

pub use pipeline_context::{ComputedKey, PipelineContext};

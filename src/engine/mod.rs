// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod factory;
pub mod parallel;
mod report;
#[cfg(test)]
mod integration_tests;

pub use factory::ExecutorFactory;
pub use parallel::ParallelExecutor;
pub use report::RunReport;

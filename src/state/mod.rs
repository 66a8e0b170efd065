// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! World state.

pub mod tree;

pub use tree::StateTree;

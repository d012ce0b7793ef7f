// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Entry Point
//!
//! proptest checks of invariants that must hold for every valid set of
//! deployment parameters.

mod property;

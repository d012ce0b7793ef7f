// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module

mod firewall_rules;
mod stack_synthesis;

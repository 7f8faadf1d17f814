// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Durable key-value storage used for registry metadata, training data and
//! correction history

pub mod kv_store;

pub use kv_store::{
    get_json, put_json, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StoreError,
};

// Copyright (c) 2024-present, plover Community.  All rights reserved.
//
// Licensed to the Apache Software Foundation (ASF) under one or more
// contributor license agreements.  See the NOTICE file distributed with
// this work for additional information regarding copyright ownership.
// The ASF licenses this file to You under the Apache License, Version 2.0
// (the "License"); you may not use this file except in compliance with
// the License.  You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A persistent, Redis-compatible LIST data type on top of RocksDB.
//!
//! Each list is a deque over the unsigned 64-bit index axis: a meta record
//! keeps the element count, a generation version, the expiry and the live
//! index window, while every element lives under its own data key in a
//! dedicated column family. Deleting or expiring a list bumps the version;
//! the orphaned generation is reclaimed lazily by compaction filters.

mod coding;
mod custom_comparator;
mod error;
mod list_meta_value_format;
mod lists;
mod lists_data;
mod lists_data_filter;
mod lists_data_key_format;
mod lists_meta_filter;
mod lists_ops;
mod options;
mod storage_define;

pub use error::{Error, Result};
pub use lists::{BeforeOrAfter, Lists};
pub use options::StorageOptions;

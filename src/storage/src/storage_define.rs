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

//! On-disk layout constants shared by the key and value codecs.

pub const USER_KEY_LEN_LENGTH: usize = 4;
pub const VERSION_LENGTH: usize = 4;
pub const INDEX_LENGTH: usize = 8;
pub const COUNT_LENGTH: usize = 8;
pub const TIMESTAMP_LENGTH: usize = 4;
pub const INDEX_BOUND_LENGTH: usize = 8;

/// count(8B) + version(4B) + timestamp(4B) + left_index(8B) + right_index(8B)
pub const LISTS_META_VALUE_LENGTH: usize =
    COUNT_LENGTH + VERSION_LENGTH + TIMESTAMP_LENGTH + 2 * INDEX_BOUND_LENGTH;

pub const META_COUNT_OFFSET: usize = 0;
pub const META_VERSION_OFFSET: usize = COUNT_LENGTH;
pub const META_TIMESTAMP_OFFSET: usize = META_VERSION_OFFSET + VERSION_LENGTH;
pub const META_LEFT_INDEX_OFFSET: usize = META_TIMESTAMP_OFFSET + TIMESTAMP_LENGTH;
pub const META_RIGHT_INDEX_OFFSET: usize = META_LEFT_INDEX_OFFSET + INDEX_BOUND_LENGTH;

/// Smallest well-formed data key: empty user key, version and index.
pub const LISTS_DATA_KEY_MIN_LENGTH: usize = USER_KEY_LEN_LENGTH + VERSION_LENGTH + INDEX_LENGTH;

/// A fresh list starts on the midpoint of the u64 index axis so it can grow
/// in either direction without renumbering. The live range is the half-open
/// interval (left_index, right_index).
pub const INITIAL_LEFT_INDEX: u64 = (1u64 << 63) - 1;
pub const INITIAL_RIGHT_INDEX: u64 = 1u64 << 63;

pub const DATA_CF_NAME: &str = "data_cf";

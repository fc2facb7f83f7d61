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

use bytes::{BufMut, BytesMut};
use chrono::Utc;
use snafu::ensure;

use crate::coding::{decode_fixed32, decode_fixed64, encode_fixed32, encode_fixed64};
use crate::error::{InvalidFormatSnafu, Result};
use crate::storage_define::{
    INITIAL_LEFT_INDEX, INITIAL_RIGHT_INDEX, LISTS_META_VALUE_LENGTH, META_COUNT_OFFSET,
    META_LEFT_INDEX_OFFSET, META_RIGHT_INDEX_OFFSET, META_TIMESTAMP_OFFSET, META_VERSION_OFFSET,
};

/*
 * | count | version | timestamp | left index | right index |
 * |  8B   |   4B    |    4B     |     8B     |      8B     |
 *
 * All fields little-endian. `timestamp` is an absolute Unix-seconds expiry,
 * 0 meaning the list never expires. The live element range is the half-open
 * window (left_index, right_index), so count == right - left - 1 always.
 */
pub struct ListsMetaValue {
    count: u64,
    version: u32,
    timestamp: u32,
    left_index: u64,
    right_index: u64,
}

impl ListsMetaValue {
    pub fn new(count: u64) -> Self {
        Self {
            count,
            version: 0,
            timestamp: 0,
            left_index: INITIAL_LEFT_INDEX,
            right_index: INITIAL_RIGHT_INDEX,
        }
    }

    /// Allocates a version strictly greater than the current one. Seconds of
    /// wall clock keep it monotonic across restarts; the `version + 1` arm
    /// keeps it monotonic under multiple resets within one second.
    pub fn update_version(&mut self) -> u32 {
        let now = Utc::now().timestamp() as u32;
        self.version = if self.version >= now {
            self.version + 1
        } else {
            now
        };
        self.version
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn left_index(&self) -> u64 {
        self.left_index
    }

    pub fn right_index(&self) -> u64 {
        self.right_index
    }

    pub fn modify_left_index(&mut self, delta: u64) {
        self.left_index = self.left_index.wrapping_sub(delta);
    }

    pub fn modify_right_index(&mut self, delta: u64) {
        self.right_index = self.right_index.wrapping_add(delta);
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(LISTS_META_VALUE_LENGTH);
        buf.put_u64_le(self.count);
        buf.put_u32_le(self.version);
        buf.put_u32_le(self.timestamp);
        buf.put_u64_le(self.left_index);
        buf.put_u64_le(self.right_index);
        buf
    }
}

/// A meta value parsed in place. Setters mutate both the decoded field and
/// the backing buffer, so the buffer can be written back to the meta column
/// after any sequence of mutations.
pub struct ParsedListsMetaValue {
    value: BytesMut,
    count: u64,
    version: u32,
    timestamp: u32,
    left_index: u64,
    right_index: u64,
}

impl ParsedListsMetaValue {
    pub fn new<T>(value: T) -> Result<Self>
    where
        T: Into<BytesMut>,
    {
        let value: BytesMut = value.into();
        ensure!(
            value.len() >= LISTS_META_VALUE_LENGTH,
            InvalidFormatSnafu {
                message: format!(
                    "invalid lists meta value length: {} < {}",
                    value.len(),
                    LISTS_META_VALUE_LENGTH,
                )
            }
        );

        let count = decode_fixed64(&value[META_COUNT_OFFSET..]);
        let version = decode_fixed32(&value[META_VERSION_OFFSET..]);
        let timestamp = decode_fixed32(&value[META_TIMESTAMP_OFFSET..]);
        let left_index = decode_fixed64(&value[META_LEFT_INDEX_OFFSET..]);
        let right_index = decode_fixed64(&value[META_RIGHT_INDEX_OFFSET..]);

        Ok(Self {
            value,
            count,
            version,
            timestamp,
            left_index,
            right_index,
        })
    }

    /// The backing buffer, kept in sync by every setter.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn left_index(&self) -> u64 {
        self.left_index
    }

    pub fn right_index(&self) -> u64 {
        self.right_index
    }

    pub fn is_stale(&self) -> bool {
        self.timestamp != 0 && self.timestamp as i64 <= Utc::now().timestamp()
    }

    pub fn set_count(&mut self, count: u64) {
        self.count = count;
        self.set_count_to_value();
    }

    pub fn modify_count(&mut self, delta: i64) {
        self.count = self.count.wrapping_add(delta as u64);
        self.set_count_to_value();
    }

    pub fn set_timestamp(&mut self, timestamp: u32) {
        self.timestamp = timestamp;
        self.set_timestamp_to_value();
    }

    pub fn set_relative_timestamp(&mut self, ttl: i64) {
        self.set_timestamp((Utc::now().timestamp() + ttl) as u32);
    }

    pub fn update_version(&mut self) -> u32 {
        let now = Utc::now().timestamp() as u32;
        self.version = if self.version >= now {
            self.version + 1
        } else {
            now
        };
        self.set_version_to_value();
        self.version
    }

    pub fn set_left_index(&mut self, index: u64) {
        self.left_index = index;
        self.set_index_to_value();
    }

    pub fn set_right_index(&mut self, index: u64) {
        self.right_index = index;
        self.set_index_to_value();
    }

    /// Moves the left bound outward by `delta` slots (inward when negative).
    /// The bounds are a 64-bit abelian group; wrapping is intentional.
    pub fn modify_left_index(&mut self, delta: i64) {
        self.left_index = self.left_index.wrapping_sub(delta as u64);
        self.set_index_to_value();
    }

    /// Moves the right bound outward by `delta` slots (inward when negative).
    pub fn modify_right_index(&mut self, delta: i64) {
        self.right_index = self.right_index.wrapping_add(delta as u64);
        self.set_index_to_value();
    }

    /// Logically erases the list: a new generation with the sentinel window,
    /// no elements and no expiry. Returns the new version.
    pub fn initial_meta_value(&mut self) -> u32 {
        self.set_count(0);
        self.set_left_index(INITIAL_LEFT_INDEX);
        self.set_right_index(INITIAL_RIGHT_INDEX);
        self.set_timestamp(0);
        self.update_version()
    }

    /// Physical slot for a user-facing signed index.
    pub fn target_index(&self, index: i64) -> u64 {
        if index >= 0 {
            self.left_index.wrapping_add(1).wrapping_add(index as u64)
        } else {
            self.right_index.wrapping_add(index as u64)
        }
    }

    /// True when the physical index lies inside the live window.
    pub fn in_window(&self, index: u64) -> bool {
        self.left_index < index && index < self.right_index
    }

    /// Converts an inclusive user range to a clamped physical range.
    ///
    /// `None` means the range was inverted before clamping. A `Some` result
    /// may still be inverted (start > stop) when the requested range lies
    /// entirely outside the live window; scans over it visit nothing, and
    /// LTRIM treats it as "keep nothing".
    pub fn range_indices(&self, start: i64, stop: i64) -> Option<(u64, u64)> {
        let mut start_index = self.target_index(start);
        let mut stop_index = self.target_index(stop);
        if start_index > stop_index {
            return None;
        }
        if start_index <= self.left_index {
            start_index = self.left_index + 1;
        }
        if stop_index >= self.right_index {
            stop_index = self.right_index - 1;
        }
        Some((start_index, stop_index))
    }

    fn set_count_to_value(&mut self) {
        encode_fixed64(&mut self.value[META_COUNT_OFFSET..], self.count);
    }

    fn set_version_to_value(&mut self) {
        encode_fixed32(&mut self.value[META_VERSION_OFFSET..], self.version);
    }

    fn set_timestamp_to_value(&mut self) {
        encode_fixed32(&mut self.value[META_TIMESTAMP_OFFSET..], self.timestamp);
    }

    fn set_index_to_value(&mut self) {
        encode_fixed64(&mut self.value[META_LEFT_INDEX_OFFSET..], self.left_index);
        encode_fixed64(&mut self.value[META_RIGHT_INDEX_OFFSET..], self.right_index);
    }
}

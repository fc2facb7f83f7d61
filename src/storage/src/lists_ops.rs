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

//! List command implementations.
//!
//! Every mutating command acquires the record lock for its key, reads the
//! meta record, assembles a single write batch touching both column
//! families, and commits it atomically. Element comparisons (LINSERT pivot,
//! LREM value) are byte-exact over the full length.

use bytes::BytesMut;
use rocksdb::{ReadOptions, WriteBatch, WriteOptions};
use snafu::ResultExt;

use pstd::lock_mgr::{MultiScopeRecordLock, ScopeRecordLock};

use crate::error::{
    display_key, InvalidArgumentSnafu, KeyNotFoundSnafu, Result, RocksSnafu, StaleSnafu,
};
use crate::list_meta_value_format::{ListsMetaValue, ParsedListsMetaValue};
use crate::lists::{BeforeOrAfter, Lists};
use crate::lists_data_key_format::ListsDataKey;

impl Lists {
    fn get_meta(
        &self,
        read_options: &ReadOptions,
        key: &[u8],
    ) -> Result<Option<ParsedListsMetaValue>> {
        match self
            .db()?
            .get_cf_opt(&self.meta_cf()?, key, read_options)
            .context(RocksSnafu)?
        {
            Some(value) => Ok(Some(ParsedListsMetaValue::new(BytesMut::from(
                value.as_slice(),
            ))?)),
            None => Ok(None),
        }
    }

    /// Reads the meta record and maps the three "list does not exist"
    /// shapes (absent, expired, emptied) to their error kinds.
    fn get_live_meta(
        &self,
        read_options: &ReadOptions,
        key: &[u8],
    ) -> Result<ParsedListsMetaValue> {
        match self.get_meta(read_options, key)? {
            None => KeyNotFoundSnafu {
                key: display_key(key),
            }
            .fail(),
            Some(parsed) => {
                if parsed.is_stale() {
                    StaleSnafu {
                        key: display_key(key),
                    }
                    .fail()
                } else if parsed.count() == 0 {
                    KeyNotFoundSnafu {
                        key: display_key(key),
                    }
                    .fail()
                } else {
                    Ok(parsed)
                }
            }
        }
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db()?
            .put_cf_opt(&self.meta_cf()?, key, value, &WriteOptions::default())
            .context(RocksSnafu)
    }

    /// Prepends `values` in order; each becomes the new head. Creates the
    /// list when it is absent or expired. Returns the new length.
    pub fn lpush(&self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.push(key, values, true)
    }

    /// Appends `values` in order. Creates the list when it is absent or
    /// expired. Returns the new length.
    pub fn rpush(&self, key: &[u8], values: &[Vec<u8>]) -> Result<u64> {
        self.push(key, values, false)
    }

    fn push(&self, key: &[u8], values: &[Vec<u8>], left: bool) -> Result<u64> {
        if values.is_empty() {
            return InvalidArgumentSnafu {
                message: "push requires at least one value".to_string(),
            }
            .fail();
        }

        let _lock = ScopeRecordLock::new(&self.lock_mgr, key);
        let mut batch = WriteBatch::default();
        match self.get_meta(&ReadOptions::default(), key)? {
            Some(mut parsed) => {
                let version = if parsed.is_stale() {
                    parsed.initial_meta_value()
                } else {
                    parsed.version()
                };
                for value in values {
                    let index = if left {
                        let index = parsed.left_index();
                        parsed.modify_left_index(1);
                        index
                    } else {
                        let index = parsed.right_index();
                        parsed.modify_right_index(1);
                        index
                    };
                    parsed.modify_count(1);
                    self.put_data(&mut batch, key, version, index, value)?;
                }
                batch.put_cf(&self.meta_cf()?, key, parsed.value());
                let ret = parsed.count();
                self.write_batch(batch)?;
                Ok(ret)
            }
            None => {
                let mut meta = ListsMetaValue::new(values.len() as u64);
                let version = meta.update_version();
                for value in values {
                    let index = if left {
                        let index = meta.left_index();
                        meta.modify_left_index(1);
                        index
                    } else {
                        let index = meta.right_index();
                        meta.modify_right_index(1);
                        index
                    };
                    self.put_data(&mut batch, key, version, index, value)?;
                }
                batch.put_cf(&self.meta_cf()?, key, meta.encode());
                self.write_batch(batch)?;
                Ok(meta.count())
            }
        }
    }

    /// Like [`Self::lpush`] with a single value, but only when the list
    /// already exists and is live.
    pub fn lpushx(&self, key: &[u8], value: &[u8]) -> Result<u64> {
        self.pushx(key, value, true)
    }

    /// Like [`Self::rpush`] with a single value, but only when the list
    /// already exists and is live.
    pub fn rpushx(&self, key: &[u8], value: &[u8]) -> Result<u64> {
        self.pushx(key, value, false)
    }

    fn pushx(&self, key: &[u8], value: &[u8], left: bool) -> Result<u64> {
        let _lock = ScopeRecordLock::new(&self.lock_mgr, key);
        let mut parsed = self.get_live_meta(&ReadOptions::default(), key)?;
        let version = parsed.version();
        let index = if left {
            let index = parsed.left_index();
            parsed.modify_left_index(1);
            index
        } else {
            let index = parsed.right_index();
            parsed.modify_right_index(1);
            index
        };
        parsed.modify_count(1);

        let mut batch = WriteBatch::default();
        self.put_data(&mut batch, key, version, index, value)?;
        batch.put_cf(&self.meta_cf()?, key, parsed.value());
        let ret = parsed.count();
        self.write_batch(batch)?;
        Ok(ret)
    }

    /// Removes and returns the head element.
    pub fn lpop(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.pop(key, true)
    }

    /// Removes and returns the tail element.
    pub fn rpop(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.pop(key, false)
    }

    fn pop(&self, key: &[u8], left: bool) -> Result<Vec<u8>> {
        let _lock = ScopeRecordLock::new(&self.lock_mgr, key);
        let read_options = ReadOptions::default();
        let mut parsed = self.get_live_meta(&read_options, key)?;
        let version = parsed.version();
        let target_index = if left {
            parsed.left_index().wrapping_add(1)
        } else {
            parsed.right_index().wrapping_sub(1)
        };

        let Some(element) = self.get_data(&read_options, key, version, target_index)? else {
            return KeyNotFoundSnafu {
                key: display_key(key),
            }
            .fail();
        };

        let mut batch = WriteBatch::default();
        self.delete_data(&mut batch, key, version, target_index)?;
        parsed.modify_count(-1);
        if left {
            parsed.modify_left_index(-1);
        } else {
            parsed.modify_right_index(-1);
        }
        // count 0 keeps the meta: the next push reuses the record
        batch.put_cf(&self.meta_cf()?, key, parsed.value());
        self.write_batch(batch)?;
        Ok(element)
    }

    /// Returns the elements between `start` and `stop` inclusive, with
    /// Redis index conversion and clamping. An inverted range yields an
    /// empty vector, not an error.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        let _lock = ScopeRecordLock::new(&self.lock_mgr, key);
        let parsed = self.get_live_meta(&ReadOptions::default(), key)?;
        let Some((start_index, stop_index)) = parsed.range_indices(start, stop) else {
            return Ok(Vec::new());
        };

        let mut ret = Vec::new();
        let mut iter =
            self.seek_data_forward(ReadOptions::default(), key, parsed.version(), start_index)?;
        while let Some((index, value)) = iter.entry() {
            if index > stop_index {
                break;
            }
            ret.push(value.to_vec());
            iter.step();
        }
        Ok(ret)
    }

    /// Returns the element at the given signed index, reading meta and data
    /// under one snapshot so a concurrent writer cannot tear the pair.
    pub fn lindex(&self, key: &[u8], index: i64) -> Result<Vec<u8>> {
        let db = self.db()?;
        let snapshot = db.snapshot();
        let mut read_options = ReadOptions::default();
        read_options.set_snapshot(&snapshot);

        let parsed = self.get_live_meta(&read_options, key)?;
        let target_index = parsed.target_index(index);
        if !parsed.in_window(target_index) {
            return KeyNotFoundSnafu {
                key: display_key(key),
            }
            .fail();
        }
        match self.get_data(&read_options, key, parsed.version(), target_index)? {
            Some(element) => Ok(element),
            None => KeyNotFoundSnafu {
                key: display_key(key),
            }
            .fail(),
        }
    }

    /// Overwrites the element at the given index. The index must fall
    /// strictly inside the live window; the meta record is untouched.
    pub fn lset(&self, key: &[u8], index: i64, value: &[u8]) -> Result<()> {
        let _lock = ScopeRecordLock::new(&self.lock_mgr, key);
        let parsed = self.get_live_meta(&ReadOptions::default(), key)?;
        let target_index = parsed.target_index(index);
        if !parsed.in_window(target_index) {
            return KeyNotFoundSnafu {
                key: display_key(key),
            }
            .fail();
        }
        let data_key = ListsDataKey::new(key, parsed.version(), target_index).encode();
        self.db()?
            .put_cf_opt(&self.data_cf()?, data_key, value, &WriteOptions::default())
            .context(RocksSnafu)
    }

    /// Returns the number of live elements.
    pub fn llen(&self, key: &[u8]) -> Result<u64> {
        let parsed = self.get_live_meta(&ReadOptions::default(), key)?;
        Ok(parsed.count())
    }

    /// Keeps only the elements between `start` and `stop` inclusive.
    ///
    /// The survivors are collected, the list is reset onto a new version and
    /// the survivors are pushed back, all under one held record lock and one
    /// batch. Everything from the old generation is left to the compaction
    /// filter. An inverted range before clamping is a no-op.
    pub fn ltrim(&self, key: &[u8], start: i64, stop: i64) -> Result<()> {
        let _lock = ScopeRecordLock::new(&self.lock_mgr, key);
        let Some(mut parsed) = self.get_meta(&ReadOptions::default(), key)? else {
            return Ok(());
        };
        if parsed.is_stale() || parsed.count() == 0 {
            return Ok(());
        }
        let version = parsed.version();
        let Some((start_index, stop_index)) = parsed.range_indices(start, stop) else {
            return Ok(());
        };

        let mut survivors = Vec::new();
        let mut iter = self.seek_data_forward(ReadOptions::default(), key, version, start_index)?;
        while let Some((index, value)) = iter.entry() {
            if index > stop_index {
                break;
            }
            survivors.push(value.to_vec());
            iter.step();
        }

        let mut batch = WriteBatch::default();
        let new_version = parsed.initial_meta_value();
        for value in &survivors {
            let index = parsed.right_index();
            parsed.modify_right_index(1);
            parsed.modify_count(1);
            self.put_data(&mut batch, key, new_version, index, value)?;
        }
        batch.put_cf(&self.meta_cf()?, key, parsed.value());
        self.write_batch(batch)
    }

    /// Inserts `value` before or after the first element equal to `pivot`.
    ///
    /// Only the shorter half of the list is shifted outward by one slot.
    /// Returns the new length, or `-1` when the pivot does not occur.
    pub fn linsert(
        &self,
        key: &[u8],
        before_or_after: BeforeOrAfter,
        pivot: &[u8],
        value: &[u8],
    ) -> Result<i64> {
        let _lock = ScopeRecordLock::new(&self.lock_mgr, key);
        let read_options = ReadOptions::default();
        let mut parsed = self.get_live_meta(&read_options, key)?;
        let version = parsed.version();

        let mut pivot_index = None;
        let mut iter = self.seek_data_forward(
            ReadOptions::default(),
            key,
            version,
            parsed.left_index().wrapping_add(1),
        )?;
        while let Some((index, element)) = iter.entry() {
            if index >= parsed.right_index() {
                break;
            }
            if element == pivot {
                pivot_index = Some(index);
                break;
            }
            iter.step();
        }
        let Some(pivot_index) = pivot_index else {
            return Ok(-1);
        };

        let mut batch = WriteBatch::default();
        let mid_index = parsed
            .left_index()
            .wrapping_add(parsed.right_index().wrapping_sub(parsed.left_index()) / 2);

        let target_index = if pivot_index <= mid_index {
            // shift the head half one slot to the left
            let target_index = match before_or_after {
                BeforeOrAfter::Before => pivot_index.wrapping_sub(1),
                BeforeOrAfter::After => pivot_index,
            };
            let mut nodes = Vec::new();
            let mut iter = self.seek_data_forward(
                ReadOptions::default(),
                key,
                version,
                parsed.left_index().wrapping_add(1),
            )?;
            while let Some((index, element)) = iter.entry() {
                if index > pivot_index {
                    break;
                }
                if index == pivot_index {
                    if before_or_after == BeforeOrAfter::After {
                        nodes.push(element.to_vec());
                    }
                    break;
                }
                nodes.push(element.to_vec());
                iter.step();
            }

            let mut write_index = parsed.left_index();
            for node in &nodes {
                self.put_data(&mut batch, key, version, write_index, node)?;
                write_index = write_index.wrapping_add(1);
            }
            parsed.modify_left_index(1);
            target_index
        } else {
            // shift the tail half one slot to the right
            let target_index = match before_or_after {
                BeforeOrAfter::Before => pivot_index,
                BeforeOrAfter::After => pivot_index.wrapping_add(1),
            };
            let mut nodes = Vec::new();
            let mut iter =
                self.seek_data_forward(ReadOptions::default(), key, version, pivot_index)?;
            while let Some((index, element)) = iter.entry() {
                if index >= parsed.right_index() {
                    break;
                }
                if !(index == pivot_index && before_or_after == BeforeOrAfter::After) {
                    nodes.push(element.to_vec());
                }
                iter.step();
            }

            let mut write_index = target_index.wrapping_add(1);
            for node in &nodes {
                self.put_data(&mut batch, key, version, write_index, node)?;
                write_index = write_index.wrapping_add(1);
            }
            parsed.modify_right_index(1);
            target_index
        };

        parsed.modify_count(1);
        self.put_data(&mut batch, key, version, target_index, value)?;
        batch.put_cf(&self.meta_cf()?, key, parsed.value());
        let ret = parsed.count() as i64;
        self.write_batch(batch)?;
        Ok(ret)
    }

    /// Removes up to `count` elements equal to `value`: head-to-tail when
    /// `count > 0`, tail-to-head when `count < 0`, all of them when 0.
    ///
    /// Survivors on the shorter affected side are shifted into the gaps, so
    /// the rewrite cost is proportional to the smaller of the two sides.
    /// Returns the number removed; no match at all is reported as not found.
    pub fn lrem(&self, key: &[u8], count: i64, value: &[u8]) -> Result<u64> {
        let _lock = ScopeRecordLock::new(&self.lock_mgr, key);
        let mut parsed = self.get_live_meta(&ReadOptions::default(), key)?;
        let version = parsed.version();
        let start_index = parsed.left_index().wrapping_add(1);
        let stop_index = parsed.right_index().wrapping_sub(1);

        let mut del_index: Vec<u64> = Vec::new();
        let mut rest = count.unsigned_abs();
        if count >= 0 {
            let mut iter =
                self.seek_data_forward(ReadOptions::default(), key, version, start_index)?;
            while let Some((index, element)) = iter.entry() {
                if index > stop_index || (count != 0 && rest == 0) {
                    break;
                }
                if element == value {
                    del_index.push(index);
                    if count != 0 {
                        rest -= 1;
                    }
                }
                iter.step();
            }
        } else {
            let mut iter =
                self.seek_data_backward(ReadOptions::default(), key, version, stop_index)?;
            while let Some((index, element)) = iter.entry() {
                if index < start_index || rest == 0 {
                    break;
                }
                if element == value {
                    del_index.push(index);
                    rest -= 1;
                }
                iter.step();
            }
        }

        if del_index.is_empty() {
            return KeyNotFoundSnafu {
                key: display_key(key),
            }
            .fail();
        }

        let removed = del_index.len() as u64;
        let sublist_left_index = if count >= 0 {
            del_index[0]
        } else {
            del_index[del_index.len() - 1]
        };
        let sublist_right_index = if count >= 0 {
            del_index[del_index.len() - 1]
        } else {
            del_index[0]
        };
        let left_part_len = sublist_right_index.wrapping_sub(start_index);
        let right_part_len = stop_index.wrapping_sub(sublist_left_index);

        let mut batch = WriteBatch::default();
        let mut rest = removed;
        if left_part_len <= right_part_len {
            // compact the head side: walk right-to-left from the rightmost
            // match, shifting survivors into the gaps
            let mut write_index = sublist_right_index;
            let mut iter = self.seek_data_backward(
                ReadOptions::default(),
                key,
                version,
                sublist_right_index,
            )?;
            while let Some((index, element)) = iter.entry() {
                if index < start_index {
                    break;
                }
                if element == value && rest > 0 {
                    rest -= 1;
                } else {
                    self.put_data(&mut batch, key, version, write_index, element)?;
                    write_index = write_index.wrapping_sub(1);
                }
                iter.step();
            }
            parsed.modify_left_index(-(removed as i64));
        } else {
            let mut write_index = sublist_left_index;
            let mut iter = self.seek_data_forward(
                ReadOptions::default(),
                key,
                version,
                sublist_left_index,
            )?;
            while let Some((index, element)) = iter.entry() {
                if index > stop_index {
                    break;
                }
                if element == value && rest > 0 {
                    rest -= 1;
                } else {
                    self.put_data(&mut batch, key, version, write_index, element)?;
                    write_index = write_index.wrapping_add(1);
                }
                iter.step();
            }
            parsed.modify_right_index(-(removed as i64));
        }

        parsed.modify_count(-(removed as i64));
        batch.put_cf(&self.meta_cf()?, key, parsed.value());
        self.write_batch(batch)?;
        Ok(removed)
    }

    /// Pops the tail of `source` and pushes it onto the head of
    /// `destination` in one atomic batch. Both record locks are taken in
    /// canonical order; a reader can never observe the element in both
    /// lists or in neither.
    pub fn rpoplpush(&self, source: &[u8], destination: &[u8]) -> Result<Vec<u8>> {
        let _locks = MultiScopeRecordLock::new(&self.lock_mgr, &[source, destination]);
        let read_options = ReadOptions::default();
        let mut batch = WriteBatch::default();

        if source == destination {
            let mut parsed = self.get_live_meta(&read_options, source)?;
            let version = parsed.version();
            let last_index = parsed.right_index().wrapping_sub(1);
            let Some(target) = self.get_data(&read_options, source, version, last_index)? else {
                return KeyNotFoundSnafu {
                    key: display_key(source),
                }
                .fail();
            };
            if parsed.count() == 1 {
                // rotating a single element is a no-op
                return Ok(target);
            }
            let target_index = parsed.left_index();
            self.delete_data(&mut batch, source, version, last_index)?;
            self.put_data(&mut batch, source, version, target_index, &target)?;
            parsed.modify_right_index(-1);
            parsed.modify_left_index(1);
            batch.put_cf(&self.meta_cf()?, source, parsed.value());
            self.write_batch(batch)?;
            return Ok(target);
        }

        let mut src_parsed = self.get_live_meta(&read_options, source)?;
        let src_version = src_parsed.version();
        let last_index = src_parsed.right_index().wrapping_sub(1);
        let Some(target) = self.get_data(&read_options, source, src_version, last_index)? else {
            return KeyNotFoundSnafu {
                key: display_key(source),
            }
            .fail();
        };
        self.delete_data(&mut batch, source, src_version, last_index)?;
        src_parsed.modify_count(-1);
        src_parsed.modify_right_index(-1);
        batch.put_cf(&self.meta_cf()?, source, src_parsed.value());

        match self.get_meta(&read_options, destination)? {
            Some(mut dst_parsed) => {
                let dst_version = if dst_parsed.is_stale() {
                    dst_parsed.initial_meta_value()
                } else {
                    dst_parsed.version()
                };
                let target_index = dst_parsed.left_index();
                self.put_data(&mut batch, destination, dst_version, target_index, &target)?;
                dst_parsed.modify_count(1);
                dst_parsed.modify_left_index(1);
                batch.put_cf(&self.meta_cf()?, destination, dst_parsed.value());
            }
            None => {
                let mut dst_meta = ListsMetaValue::new(1);
                let dst_version = dst_meta.update_version();
                let target_index = dst_meta.left_index();
                self.put_data(&mut batch, destination, dst_version, target_index, &target)?;
                dst_meta.modify_left_index(1);
                batch.put_cf(&self.meta_cf()?, destination, dst_meta.encode());
            }
        }

        self.write_batch(batch)?;
        Ok(target)
    }

    /// Sets a relative expiry. A non-positive `ttl` resets the list
    /// instead, exactly like [`Self::del`].
    pub fn expire(&self, key: &[u8], ttl: i64) -> Result<()> {
        let _lock = ScopeRecordLock::new(&self.lock_mgr, key);
        match self.get_meta(&ReadOptions::default(), key)? {
            None => KeyNotFoundSnafu {
                key: display_key(key),
            }
            .fail(),
            Some(mut parsed) => {
                if parsed.is_stale() {
                    return StaleSnafu {
                        key: display_key(key),
                    }
                    .fail();
                }
                if ttl > 0 {
                    parsed.set_relative_timestamp(ttl);
                } else {
                    parsed.initial_meta_value();
                }
                self.put_meta(key, parsed.value())
            }
        }
    }

    /// Logically deletes the list by bumping its version and restoring the
    /// sentinel window; the orphaned generation is reclaimed by compaction.
    pub fn del(&self, key: &[u8]) -> Result<()> {
        let _lock = ScopeRecordLock::new(&self.lock_mgr, key);
        match self.get_meta(&ReadOptions::default(), key)? {
            None => KeyNotFoundSnafu {
                key: display_key(key),
            }
            .fail(),
            Some(mut parsed) => {
                if parsed.is_stale() {
                    return StaleSnafu {
                        key: display_key(key),
                    }
                    .fail();
                }
                parsed.initial_meta_value();
                self.put_meta(key, parsed.value())
            }
        }
    }
}

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

//! Data-plane access: point reads/writes of list slots and iteration
//! bounded to one `(user_key, version)` generation.

use bytes::BytesMut;
use rocksdb::{DBRawIteratorWithThreadMode, ReadOptions, WriteBatch, WriteOptions};
use snafu::ResultExt;

use crate::coding::decode_fixed64_be;
use crate::error::{Result, RocksSnafu};
use crate::lists::{Db, Lists};
use crate::lists_data_key_format::{lists_data_prefix, ListsDataKey};
use crate::storage_define::INDEX_LENGTH;

/// An iterator over the data slots of one list generation. It never yields
/// entries outside the `(user_key, version)` prefix, no matter what other
/// generations or keys sit next to them in the column family.
pub(crate) struct ListsDataIterator<'a> {
    iter: DBRawIteratorWithThreadMode<'a, Db>,
    prefix: BytesMut,
    reverse: bool,
}

impl ListsDataIterator<'_> {
    /// The current slot as `(physical index, element bytes)`, or `None` when
    /// iteration has left the generation.
    pub(crate) fn entry(&self) -> Option<(u64, &[u8])> {
        let key = self.iter.key()?;
        if !key.starts_with(&self.prefix) {
            return None;
        }
        let index = decode_fixed64_be(&key[key.len() - INDEX_LENGTH..]);
        Some((index, self.iter.value()?))
    }

    pub(crate) fn step(&mut self) {
        if self.reverse {
            self.iter.prev();
        } else {
            self.iter.next();
        }
    }
}

impl Lists {
    /// Positions a forward iterator on the first slot with
    /// `index >= start_index`.
    pub(crate) fn seek_data_forward(
        &self,
        read_options: ReadOptions,
        key: &[u8],
        version: u32,
        start_index: u64,
    ) -> Result<ListsDataIterator<'_>> {
        let mut iter = self
            .db()?
            .raw_iterator_cf_opt(&self.data_cf()?, read_options);
        iter.seek(ListsDataKey::new(key, version, start_index).encode());
        Ok(ListsDataIterator {
            iter,
            prefix: lists_data_prefix(key, version),
            reverse: false,
        })
    }

    /// Positions a backward iterator on the last slot with
    /// `index <= start_index`.
    pub(crate) fn seek_data_backward(
        &self,
        read_options: ReadOptions,
        key: &[u8],
        version: u32,
        start_index: u64,
    ) -> Result<ListsDataIterator<'_>> {
        let mut iter = self
            .db()?
            .raw_iterator_cf_opt(&self.data_cf()?, read_options);
        iter.seek_for_prev(ListsDataKey::new(key, version, start_index).encode());
        Ok(ListsDataIterator {
            iter,
            prefix: lists_data_prefix(key, version),
            reverse: true,
        })
    }

    pub(crate) fn get_data(
        &self,
        read_options: &ReadOptions,
        key: &[u8],
        version: u32,
        index: u64,
    ) -> Result<Option<Vec<u8>>> {
        let data_key = ListsDataKey::new(key, version, index).encode();
        self.db()?
            .get_cf_opt(&self.data_cf()?, &data_key, read_options)
            .context(RocksSnafu)
    }

    pub(crate) fn put_data(
        &self,
        batch: &mut WriteBatch,
        key: &[u8],
        version: u32,
        index: u64,
        value: &[u8],
    ) -> Result<()> {
        let data_key = ListsDataKey::new(key, version, index).encode();
        batch.put_cf(&self.data_cf()?, data_key, value);
        Ok(())
    }

    pub(crate) fn delete_data(
        &self,
        batch: &mut WriteBatch,
        key: &[u8],
        version: u32,
        index: u64,
    ) -> Result<()> {
        let data_key = ListsDataKey::new(key, version, index).encode();
        batch.delete_cf(&self.data_cf()?, data_key);
        Ok(())
    }

    pub(crate) fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        self.db()?
            .write_opt(batch, &WriteOptions::default())
            .context(RocksSnafu)
    }
}

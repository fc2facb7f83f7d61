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
use snafu::ensure;

use crate::coding::{decode_fixed32, decode_fixed64_be};
use crate::error::{InvalidFormatSnafu, Result};
use crate::storage_define::{
    INDEX_LENGTH, LISTS_DATA_KEY_MIN_LENGTH, USER_KEY_LEN_LENGTH, VERSION_LENGTH,
};

/*
 * | user_key_len |  user_key  | version | index |
 * |      4B      |            |    4B   |  8B   |
 *
 * The length prefix disambiguates arbitrary key bytes without escaping.
 * `user_key_len` and `version` are little-endian; `index` is big-endian so
 * that, within one (user_key, version) prefix, bytewise order equals numeric
 * order.
 */
pub struct ListsDataKey {
    key: Vec<u8>,
    version: u32,
    index: u64,
}

impl ListsDataKey {
    pub fn new(key: &[u8], version: u32, index: u64) -> Self {
        Self {
            key: key.to_vec(),
            version,
            index,
        }
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(LISTS_DATA_KEY_MIN_LENGTH + self.key.len());
        buf.put_u32_le(self.key.len() as u32);
        buf.put_slice(&self.key);
        buf.put_u32_le(self.version);
        buf.put_u64(self.index);
        buf
    }
}

/// The `(user_key, version)` prefix shared by every data key of one list
/// generation; used to bound iteration.
pub fn lists_data_prefix(key: &[u8], version: u32) -> BytesMut {
    let mut buf = BytesMut::with_capacity(USER_KEY_LEN_LENGTH + key.len() + VERSION_LENGTH);
    buf.put_u32_le(key.len() as u32);
    buf.put_slice(key);
    buf.put_u32_le(version);
    buf
}

pub struct ParsedListsDataKey {
    key: Vec<u8>,
    version: u32,
    index: u64,
}

impl ParsedListsDataKey {
    pub fn decode(encoded: &[u8]) -> Result<Self> {
        ensure!(
            encoded.len() >= LISTS_DATA_KEY_MIN_LENGTH,
            InvalidFormatSnafu {
                message: format!("lists data key too short: {}", encoded.len())
            }
        );

        let key_len = decode_fixed32(encoded) as usize;
        let key_end = USER_KEY_LEN_LENGTH + key_len;
        ensure!(
            encoded.len() == key_end + VERSION_LENGTH + INDEX_LENGTH,
            InvalidFormatSnafu {
                message: format!(
                    "lists data key length {} does not match user key length {}",
                    encoded.len(),
                    key_len,
                )
            }
        );

        let key = encoded[USER_KEY_LEN_LENGTH..key_end].to_vec();
        let version = decode_fixed32(&encoded[key_end..]);
        let index = decode_fixed64_be(&encoded[key_end + VERSION_LENGTH..]);

        Ok(Self {
            key,
            version,
            index,
        })
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn index(&self) -> u64 {
        self.index
    }
}

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

//! Fixed-width integer codecs.
//!
//! Meta-value fields are little-endian, matching the rest of the on-disk
//! format. The data-key index is big-endian so that bytewise order within
//! one (key, version) prefix equals numeric order.

#[inline]
pub fn encode_fixed32(dst: &mut [u8], value: u32) {
    dst[..4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn decode_fixed32(src: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&src[..4]);
    u32::from_le_bytes(buf)
}

#[inline]
pub fn encode_fixed64(dst: &mut [u8], value: u64) {
    dst[..8].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn decode_fixed64(src: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&src[..8]);
    u64::from_le_bytes(buf)
}

#[inline]
pub fn decode_fixed64_be(src: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&src[..8]);
    u64::from_be_bytes(buf)
}

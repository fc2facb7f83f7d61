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

use std::{cmp::Ordering, ffi::CString};

use crate::coding::{decode_fixed32, decode_fixed64_be};
use crate::storage_define::{USER_KEY_LEN_LENGTH, VERSION_LENGTH};

pub fn lists_data_key_comparator_name() -> CString {
    CString::new("plover.ListsDataKeyComparator").unwrap()
}

/// ## ListsDataKey format
/// ```text
/// | user_key_len | user_key | version | index |
/// |      4B      |          |    4B   |  8B   |
/// ```
///
/// ## Order
/// - Compare by `user_key` (bytewise asc)
/// - If equal, compare `version` (numeric asc)
/// - If equal, compare `index` (numeric asc)
///
/// A record that stops after `user_key` or after `version` sorts before
/// every longer record sharing that prefix, so encoded prefixes work as
/// iterator lower bounds. Malformed records fall back to bytewise order.
#[inline(always)]
pub fn lists_data_key_compare(a: &[u8], b: &[u8]) -> Ordering {
    if a.len() < USER_KEY_LEN_LENGTH || b.len() < USER_KEY_LEN_LENGTH {
        return a.cmp(b);
    }

    let a_key_end = USER_KEY_LEN_LENGTH + decode_fixed32(a) as usize;
    let b_key_end = USER_KEY_LEN_LENGTH + decode_fixed32(b) as usize;
    if a.len() < a_key_end || b.len() < b_key_end {
        return a.cmp(b);
    }

    match a[USER_KEY_LEN_LENGTH..a_key_end].cmp(&b[USER_KEY_LEN_LENGTH..b_key_end]) {
        Ordering::Equal => {}
        other => return other,
    }

    let a_version_end = a_key_end + VERSION_LENGTH;
    let b_version_end = b_key_end + VERSION_LENGTH;
    match (a.len() >= a_version_end, b.len() >= b_version_end) {
        (false, false) => return a.len().cmp(&b.len()),
        (false, true) => return Ordering::Less,
        (true, false) => return Ordering::Greater,
        (true, true) => {}
    }

    let version_a = decode_fixed32(&a[a_key_end..]);
    let version_b = decode_fixed32(&b[b_key_end..]);
    match version_a.cmp(&version_b) {
        Ordering::Equal => {}
        other => return other,
    }

    let a_index = &a[a_version_end..];
    let b_index = &b[b_version_end..];
    match (a_index.len() >= 8, b_index.len() >= 8) {
        (false, false) => return a_index.cmp(b_index),
        (false, true) => return Ordering::Less,
        (true, false) => return Ordering::Greater,
        (true, true) => {}
    }

    decode_fixed64_be(a_index).cmp(&decode_fixed64_be(b_index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lists_data_key_format::{lists_data_prefix, ListsDataKey};

    #[test]
    fn test_index_orders_numerically_within_one_generation() {
        let a = ListsDataKey::new(b"plover", 2, 5).encode();
        let b = ListsDataKey::new(b"plover", 2, 6).encode();
        let c = ListsDataKey::new(b"plover", 2, 1 << 63).encode();
        assert_eq!(lists_data_key_compare(&a, &b), Ordering::Less);
        assert_eq!(lists_data_key_compare(&b, &c), Ordering::Less);
        assert_eq!(lists_data_key_compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_version_orders_before_index() {
        let a = ListsDataKey::new(b"plover", 1, u64::MAX).encode();
        let b = ListsDataKey::new(b"plover", 2, 0).encode();
        assert_eq!(lists_data_key_compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_user_key_orders_first() {
        let a = ListsDataKey::new(b"alpha", 9, u64::MAX).encode();
        let b = ListsDataKey::new(b"beta", 1, 0).encode();
        assert_eq!(lists_data_key_compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_key_length_does_not_leak_into_order() {
        // "ab" < "b" bytewise even though "ab" is longer
        let a = ListsDataKey::new(b"ab", 1, 0).encode();
        let b = ListsDataKey::new(b"b", 1, 0).encode();
        assert_eq!(lists_data_key_compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_prefix_sorts_before_full_keys() {
        let prefix = lists_data_prefix(b"plover", 2);
        let first = ListsDataKey::new(b"plover", 2, 0).encode();
        let prior = ListsDataKey::new(b"plover", 1, u64::MAX).encode();
        assert_eq!(lists_data_key_compare(&prefix, &first), Ordering::Less);
        assert_eq!(lists_data_key_compare(&prior, &prefix), Ordering::Less);
    }
}

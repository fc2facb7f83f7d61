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

//! Integration tests for the list commands.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pstd::lock_mgr::LockMgr;
use storage::{BeforeOrAfter, Lists, StorageOptions};
use tempfile::TempDir;

fn open_lists() -> (TempDir, Lists) {
    let tmp_dir = TempDir::new().unwrap();
    let mut lists = Lists::new(Arc::new(LockMgr::new(16)));
    lists
        .open(&StorageOptions::default(), tmp_dir.path().to_str().unwrap())
        .unwrap();
    (tmp_dir, lists)
}

fn values(items: &[&[u8]]) -> Vec<Vec<u8>> {
    items.iter().map(|v| v.to_vec()).collect()
}

#[test]
fn test_lpush_reverses_order() {
    let (_tmp, lists) = open_lists();

    let count = lists.lpush(b"L", &values(&[b"a", b"b", b"c"])).unwrap();
    assert_eq!(count, 3);
    assert_eq!(
        lists.lrange(b"L", 0, -1).unwrap(),
        values(&[b"c", b"b", b"a"])
    );
}

#[test]
fn test_rpush_keeps_order_and_indexing() {
    let (_tmp, lists) = open_lists();

    let count = lists
        .rpush(b"L", &values(&[b"a", b"b", b"c", b"d", b"e"]))
        .unwrap();
    assert_eq!(count, 5);
    assert_eq!(
        lists.lrange(b"L", 0, -1).unwrap(),
        values(&[b"a", b"b", b"c", b"d", b"e"])
    );
    assert_eq!(
        lists.lrange(b"L", -3, -1).unwrap(),
        values(&[b"c", b"d", b"e"])
    );
    assert_eq!(lists.lrange(b"L", 1, 3).unwrap(), values(&[b"b", b"c", b"d"]));
    assert_eq!(lists.lindex(b"L", 2).unwrap(), b"c");
    assert_eq!(lists.lindex(b"L", -1).unwrap(), b"e");
    assert!(lists.lindex(b"L", 5).unwrap_err().is_not_found());
    assert!(lists.lindex(b"L", -6).unwrap_err().is_not_found());
}

#[test]
fn test_lrange_clamps_and_empties() {
    let (_tmp, lists) = open_lists();
    lists.rpush(b"L", &values(&[b"a", b"b", b"c"])).unwrap();

    assert_eq!(
        lists.lrange(b"L", -100, 100).unwrap(),
        values(&[b"a", b"b", b"c"])
    );
    assert!(lists.lrange(b"L", 2, 1).unwrap().is_empty());
    assert!(lists.lrange(b"L", 5, 100).unwrap().is_empty());
    assert!(lists.lrange(b"missing", 0, -1).unwrap_err().is_not_found());
}

#[test]
fn test_llen_missing_and_empty() {
    let (_tmp, lists) = open_lists();

    assert!(lists.llen(b"L").unwrap_err().is_not_found());
    lists.rpush(b"L", &values(&[b"a"])).unwrap();
    assert_eq!(lists.llen(b"L").unwrap(), 1);
    lists.rpop(b"L").unwrap();
    assert!(lists.llen(b"L").unwrap_err().is_not_found());
}

#[test]
fn test_pop_round_trip_drains_in_order() {
    let (_tmp, lists) = open_lists();
    let xs = values(&[b"1", b"2", b"3", b"4"]);
    lists.rpush(b"L", &xs).unwrap();

    for expected in &xs {
        assert_eq!(&lists.lpop(b"L").unwrap(), expected);
    }
    assert!(lists.lpop(b"L").unwrap_err().is_not_found());
    assert!(lists.llen(b"L").unwrap_err().is_not_found());

    // the emptied meta is reused by the next push
    lists.rpush(b"L", &values(&[b"x"])).unwrap();
    assert_eq!(lists.lrange(b"L", 0, -1).unwrap(), values(&[b"x"]));
}

#[test]
fn test_rpop_takes_from_the_tail() {
    let (_tmp, lists) = open_lists();
    lists.rpush(b"L", &values(&[b"a", b"b", b"c"])).unwrap();

    assert_eq!(lists.rpop(b"L").unwrap(), b"c");
    assert_eq!(lists.rpop(b"L").unwrap(), b"b");
    assert_eq!(lists.lrange(b"L", 0, -1).unwrap(), values(&[b"a"]));
}

#[test]
fn test_pushx_requires_a_live_list() {
    let (_tmp, lists) = open_lists();

    assert!(lists.lpushx(b"L", b"v").unwrap_err().is_not_found());
    assert!(lists.rpushx(b"L", b"v").unwrap_err().is_not_found());

    lists.rpush(b"L", &values(&[b"a"])).unwrap();
    assert_eq!(lists.lpushx(b"L", b"head").unwrap(), 2);
    assert_eq!(lists.rpushx(b"L", b"tail").unwrap(), 3);
    assert_eq!(
        lists.lrange(b"L", 0, -1).unwrap(),
        values(&[b"head", b"a", b"tail"])
    );

    // an emptied list rejects pushx as well
    lists.rpush(b"E", &values(&[b"x"])).unwrap();
    lists.lpop(b"E").unwrap();
    assert!(lists.lpushx(b"E", b"v").unwrap_err().is_not_found());
}

#[test]
fn test_lset_overwrites_in_range_only() {
    let (_tmp, lists) = open_lists();
    lists.rpush(b"L", &values(&[b"a", b"b", b"c"])).unwrap();

    lists.lset(b"L", 1, b"B").unwrap();
    lists.lset(b"L", -1, b"C").unwrap();
    assert_eq!(
        lists.lrange(b"L", 0, -1).unwrap(),
        values(&[b"a", b"B", b"C"])
    );
    assert!(lists.lset(b"L", 3, b"x").unwrap_err().is_not_found());
    assert!(lists.lset(b"L", -4, b"x").unwrap_err().is_not_found());
    assert!(lists.lset(b"missing", 0, b"x").unwrap_err().is_not_found());
}

#[test]
fn test_ltrim_keeps_the_inclusive_range() {
    let (_tmp, lists) = open_lists();
    let xs: Vec<Vec<u8>> = (0..10).map(|i| format!("v{i}").into_bytes()).collect();
    lists.rpush(b"L", &xs).unwrap();

    lists.ltrim(b"L", 2, 5).unwrap();
    assert_eq!(lists.lrange(b"L", 0, -1).unwrap(), xs[2..=5].to_vec());
    assert_eq!(lists.llen(b"L").unwrap(), 4);

    lists.ltrim(b"L", 0, -2).unwrap();
    assert_eq!(lists.lrange(b"L", 0, -1).unwrap(), xs[2..=4].to_vec());
}

#[test]
fn test_ltrim_lenient_and_emptying_cases() {
    let (_tmp, lists) = open_lists();
    lists.rpush(b"L", &values(&[b"a", b"b", b"c"])).unwrap();

    // inverted before clamping: no-op
    lists.ltrim(b"L", 2, 0).unwrap();
    assert_eq!(lists.llen(b"L").unwrap(), 3);

    // past the tail: nothing survives
    lists.ltrim(b"L", 5, 100).unwrap();
    assert!(lists.llen(b"L").unwrap_err().is_not_found());

    // missing key: still no error
    lists.ltrim(b"missing", 0, -1).unwrap();
}

#[test]
fn test_lrem_positive_then_negative() {
    let (_tmp, lists) = open_lists();
    lists
        .rpush(b"L", &values(&[b"x", b"y", b"x", b"y", b"x"]))
        .unwrap();

    assert_eq!(lists.lrem(b"L", 2, b"x").unwrap(), 2);
    assert_eq!(
        lists.lrange(b"L", 0, -1).unwrap(),
        values(&[b"y", b"y", b"x"])
    );

    assert_eq!(lists.lrem(b"L", -1, b"y").unwrap(), 1);
    assert_eq!(lists.lrange(b"L", 0, -1).unwrap(), values(&[b"y", b"x"]));
}

#[test]
fn test_lrem_all_is_idempotent() {
    let (_tmp, lists) = open_lists();
    lists
        .rpush(b"L", &values(&[b"v", b"a", b"v", b"b", b"v"]))
        .unwrap();

    assert_eq!(lists.lrem(b"L", 0, b"v").unwrap(), 3);
    assert_eq!(lists.lrange(b"L", 0, -1).unwrap(), values(&[b"a", b"b"]));

    let second = lists.lrem(b"L", 0, b"v").unwrap_err();
    assert!(second.is_not_found());
    assert_eq!(lists.lrange(b"L", 0, -1).unwrap(), values(&[b"a", b"b"]));
}

#[test]
fn test_lrem_compares_full_bytes() {
    let (_tmp, lists) = open_lists();
    // values sharing a prefix before an embedded NUL must stay distinct
    lists
        .rpush(b"L", &values(&[b"a\x00x", b"a\x00y", b"a\x00x"]))
        .unwrap();

    assert_eq!(lists.lrem(b"L", 0, b"a\x00x").unwrap(), 2);
    assert_eq!(lists.lrange(b"L", 0, -1).unwrap(), values(&[b"a\x00y"]));
}

#[test]
fn test_linsert_before_and_after() {
    let (_tmp, lists) = open_lists();
    lists.rpush(b"L", &values(&[b"a", b"b", b"c"])).unwrap();

    assert_eq!(
        lists
            .linsert(b"L", BeforeOrAfter::Before, b"b", b"B")
            .unwrap(),
        4
    );
    assert_eq!(
        lists.lrange(b"L", 0, -1).unwrap(),
        values(&[b"a", b"B", b"b", b"c"])
    );

    assert_eq!(
        lists
            .linsert(b"L", BeforeOrAfter::After, b"b", b"B2")
            .unwrap(),
        5
    );
    assert_eq!(
        lists.lrange(b"L", 0, -1).unwrap(),
        values(&[b"a", b"B", b"b", b"B2", b"c"])
    );
}

#[test]
fn test_linsert_at_the_edges() {
    let (_tmp, lists) = open_lists();
    lists
        .rpush(b"L", &values(&[b"a", b"b", b"c", b"d"]))
        .unwrap();

    lists
        .linsert(b"L", BeforeOrAfter::Before, b"a", b"head")
        .unwrap();
    lists
        .linsert(b"L", BeforeOrAfter::After, b"d", b"tail")
        .unwrap();
    assert_eq!(
        lists.lrange(b"L", 0, -1).unwrap(),
        values(&[b"head", b"a", b"b", b"c", b"d", b"tail"])
    );
}

#[test]
fn test_linsert_pivot_missing_and_dead_list() {
    let (_tmp, lists) = open_lists();
    lists.rpush(b"L", &values(&[b"a"])).unwrap();

    assert_eq!(
        lists
            .linsert(b"L", BeforeOrAfter::Before, b"nope", b"v")
            .unwrap(),
        -1
    );
    assert!(lists
        .linsert(b"missing", BeforeOrAfter::Before, b"a", b"v")
        .unwrap_err()
        .is_not_found());

    // byte-exact pivot match: "a\x00x" must not match pivot "a"
    lists.rpush(b"N", &values(&[b"a\x00x"])).unwrap();
    assert_eq!(
        lists.linsert(b"N", BeforeOrAfter::Before, b"a", b"v").unwrap(),
        -1
    );
}

#[test]
fn test_rpoplpush_moves_across_lists() {
    let (_tmp, lists) = open_lists();
    lists.rpush(b"S", &values(&[b"1", b"2", b"3"])).unwrap();

    assert_eq!(lists.rpoplpush(b"S", b"D").unwrap(), b"3");
    assert_eq!(lists.lrange(b"S", 0, -1).unwrap(), values(&[b"1", b"2"]));
    assert_eq!(lists.lrange(b"D", 0, -1).unwrap(), values(&[b"3"]));

    assert_eq!(lists.rpoplpush(b"S", b"D").unwrap(), b"2");
    assert_eq!(lists.lrange(b"D", 0, -1).unwrap(), values(&[b"2", b"3"]));
}

#[test]
fn test_rpoplpush_rotation() {
    let (_tmp, lists) = open_lists();
    lists
        .rpush(b"R", &values(&[b"a", b"b", b"c", b"d", b"e"]))
        .unwrap();

    assert_eq!(lists.rpoplpush(b"R", b"R").unwrap(), b"e");
    assert_eq!(
        lists.lrange(b"R", 0, -1).unwrap(),
        values(&[b"e", b"a", b"b", b"c", b"d"])
    );
    assert_eq!(lists.llen(b"R").unwrap(), 5);
}

#[test]
fn test_rpoplpush_single_element_rotation_is_noop() {
    let (_tmp, lists) = open_lists();
    lists.rpush(b"R", &values(&[b"only"])).unwrap();

    assert_eq!(lists.rpoplpush(b"R", b"R").unwrap(), b"only");
    assert_eq!(lists.lrange(b"R", 0, -1).unwrap(), values(&[b"only"]));
}

#[test]
fn test_rpoplpush_missing_source() {
    let (_tmp, lists) = open_lists();
    assert!(lists.rpoplpush(b"S", b"D").unwrap_err().is_not_found());
    assert!(lists.llen(b"D").unwrap_err().is_not_found());
}

#[test]
fn test_expire_and_regeneration() {
    let (_tmp, lists) = open_lists();
    lists.rpush(b"K", &values(&[b"a", b"b"])).unwrap();

    lists.expire(b"K", 1).unwrap();
    assert_eq!(lists.llen(b"K").unwrap(), 2);

    thread::sleep(Duration::from_millis(1500));
    assert!(lists.llen(b"K").unwrap_err().is_not_found());
    assert!(lists.lrange(b"K", 0, -1).unwrap_err().is_not_found());

    // the next push starts a fresh generation
    lists.rpush(b"K", &values(&[b"c"])).unwrap();
    assert_eq!(lists.lrange(b"K", 0, -1).unwrap(), values(&[b"c"]));
}

#[test]
fn test_expire_non_positive_ttl_resets() {
    let (_tmp, lists) = open_lists();
    lists.rpush(b"K", &values(&[b"a"])).unwrap();

    lists.expire(b"K", 0).unwrap();
    assert!(lists.llen(b"K").unwrap_err().is_not_found());
    assert!(lists.expire(b"missing", 10).unwrap_err().is_not_found());
}

#[test]
fn test_del_hides_the_list_until_next_push() {
    let (_tmp, lists) = open_lists();
    lists.rpush(b"K", &values(&[b"a", b"b", b"c"])).unwrap();

    lists.del(b"K").unwrap();
    assert!(lists.llen(b"K").unwrap_err().is_not_found());
    assert!(lists.lindex(b"K", 0).unwrap_err().is_not_found());
    assert!(lists.lrange(b"K", 0, -1).unwrap_err().is_not_found());
    assert!(lists.del(b"missing").unwrap_err().is_not_found());

    lists.rpush(b"K", &values(&[b"z"])).unwrap();
    assert_eq!(lists.lrange(b"K", 0, -1).unwrap(), values(&[b"z"]));
}

#[test]
fn test_compaction_preserves_live_data() {
    let (_tmp, lists) = open_lists();
    lists
        .rpush(b"keep", &values(&[b"a", b"b", b"c"]))
        .unwrap();
    lists.rpush(b"drop", &values(&[b"x", b"y"])).unwrap();
    lists.del(b"drop").unwrap();

    lists.compact_range(None, None).unwrap();

    assert_eq!(
        lists.lrange(b"keep", 0, -1).unwrap(),
        values(&[b"a", b"b", b"c"])
    );
    assert!(lists.lrange(b"drop", 0, -1).unwrap_err().is_not_found());
}

#[test]
fn test_orphaned_generations_stay_invisible() {
    let (_tmp, lists) = open_lists();
    lists
        .rpush(b"L", &values(&[b"a", b"b", b"c", b"d"]))
        .unwrap();
    lists.ltrim(b"L", 1, 2).unwrap();

    // before any compaction the old generation must already be unreachable
    assert_eq!(lists.lrange(b"L", 0, -1).unwrap(), values(&[b"b", b"c"]));
    assert_eq!(lists.llen(b"L").unwrap(), 2);
    assert_eq!(lists.lindex(b"L", 0).unwrap(), b"b");
    assert!(lists.lindex(b"L", 2).unwrap_err().is_not_found());

    lists.compact_range(None, None).unwrap();
    assert_eq!(lists.lrange(b"L", 0, -1).unwrap(), values(&[b"b", b"c"]));
}

#[test]
fn test_concurrent_pushes_keep_count_consistent() {
    let (_tmp, lists) = open_lists();
    let lists = Arc::new(lists);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let lists = Arc::clone(&lists);
            thread::spawn(move || {
                for i in 0..25 {
                    let value = format!("{t}-{i}").into_bytes();
                    if t % 2 == 0 {
                        lists.lpush(b"L", &[value]).unwrap();
                    } else {
                        lists.rpush(b"L", &[value]).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(lists.llen(b"L").unwrap(), 200);
    assert_eq!(lists.lrange(b"L", 0, -1).unwrap().len(), 200);
}

#[test]
fn test_concurrent_rpoplpush_never_loses_elements() {
    let (_tmp, lists) = open_lists();
    let xs: Vec<Vec<u8>> = (0..50).map(|i| format!("v{i}").into_bytes()).collect();
    lists.rpush(b"S", &xs).unwrap();
    let lists = Arc::new(lists);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lists = Arc::clone(&lists);
            thread::spawn(move || {
                let mut moved = 0u64;
                while lists.rpoplpush(b"S", b"D").is_ok() {
                    moved += 1;
                }
                moved
            })
        })
        .collect();
    let moved: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(moved, 50);
    assert!(lists.llen(b"S").unwrap_err().is_not_found());
    let mut drained = lists.lrange(b"D", 0, -1).unwrap();
    drained.sort();
    let mut expected = xs;
    expected.sort();
    assert_eq!(drained, expected);
}

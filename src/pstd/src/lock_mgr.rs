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

//! Record-level lock manager keyed by raw key bytes.
//!
//! Every mutating storage operation holds the record lock for its key for the
//! duration of the read-modify-write cycle. Locks are always released through
//! the RAII scope guards so that a panicking holder cannot wedge the key.

use std::collections::{hash_map::DefaultHasher, HashSet};
use std::hash::{Hash, Hasher};

use parking_lot::{Condvar, Mutex};

struct LockMapShard {
    held: Mutex<HashSet<Vec<u8>>>,
    condvar: Condvar,
}

impl LockMapShard {
    fn new() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            condvar: Condvar::new(),
        }
    }
}

pub struct LockMgr {
    shards: Vec<LockMapShard>,
}

impl LockMgr {
    pub fn new(num_shards: usize) -> Self {
        let num_shards = num_shards.max(1);
        Self {
            shards: (0..num_shards).map(|_| LockMapShard::new()).collect(),
        }
    }

    #[inline]
    fn shard_for(&self, key: &[u8]) -> &LockMapShard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % self.shards.len()]
    }

    /// Blocks until the key is free, then marks it held.
    pub fn lock(&self, key: &[u8]) {
        let shard = self.shard_for(key);
        let mut held = shard.held.lock();
        while held.contains(key) {
            shard.condvar.wait(&mut held);
        }
        held.insert(key.to_vec());
    }

    /// Marks the key held iff it is currently free.
    pub fn try_lock(&self, key: &[u8]) -> bool {
        let shard = self.shard_for(key);
        let mut held = shard.held.lock();
        if held.contains(key) {
            return false;
        }
        held.insert(key.to_vec());
        true
    }

    pub fn unlock(&self, key: &[u8]) {
        let shard = self.shard_for(key);
        let mut held = shard.held.lock();
        held.remove(key);
        drop(held);
        shard.condvar.notify_all();
    }
}

/// RAII guard over a single record lock.
pub struct ScopeRecordLock<'a> {
    mgr: &'a LockMgr,
    key: Vec<u8>,
}

impl<'a> ScopeRecordLock<'a> {
    pub fn new(mgr: &'a LockMgr, key: &[u8]) -> Self {
        mgr.lock(key);
        Self {
            mgr,
            key: key.to_vec(),
        }
    }
}

impl Drop for ScopeRecordLock<'_> {
    fn drop(&mut self) {
        self.mgr.unlock(&self.key);
    }
}

/// RAII guard over a set of record locks.
///
/// Keys are deduplicated and acquired in sorted byte order, so two guards
/// competing for overlapping key sets cannot deadlock.
pub struct MultiScopeRecordLock<'a> {
    mgr: &'a LockMgr,
    keys: Vec<Vec<u8>>,
}

impl<'a> MultiScopeRecordLock<'a> {
    pub fn new(mgr: &'a LockMgr, keys: &[&[u8]]) -> Self {
        let mut sorted: Vec<Vec<u8>> = keys.iter().map(|k| k.to_vec()).collect();
        sorted.sort();
        sorted.dedup();
        for key in &sorted {
            mgr.lock(key);
        }
        Self { mgr, keys: sorted }
    }
}

impl Drop for MultiScopeRecordLock<'_> {
    fn drop(&mut self) {
        for key in self.keys.iter().rev() {
            self.mgr.unlock(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_lock_unlock() {
        let mgr = LockMgr::new(4);
        mgr.lock(b"key");
        assert!(!mgr.try_lock(b"key"));
        mgr.unlock(b"key");
        assert!(mgr.try_lock(b"key"));
        mgr.unlock(b"key");
    }

    #[test]
    fn test_scope_record_lock() {
        let mgr = LockMgr::new(4);
        {
            let _guard = ScopeRecordLock::new(&mgr, b"key");
            assert!(!mgr.try_lock(b"key"));
        }
        assert!(mgr.try_lock(b"key"));
        mgr.unlock(b"key");
    }

    #[test]
    fn test_lock_released_after_panic() {
        let mgr = Arc::new(LockMgr::new(4));
        let mgr_clone = Arc::clone(&mgr);
        let handle = thread::spawn(move || {
            let _guard = ScopeRecordLock::new(&mgr_clone, b"key");
            panic!("holder dies");
        });
        assert!(handle.join().is_err());
        assert!(mgr.try_lock(b"key"));
        mgr.unlock(b"key");
    }

    #[test]
    fn test_mutual_exclusion() {
        let mgr = Arc::new(LockMgr::new(4));
        let counter = Arc::new(AtomicU64::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mgr = Arc::clone(&mgr);
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    let _guard = ScopeRecordLock::new(&mgr, b"shared");
                    let seen = counter.load(Ordering::Acquire);
                    thread::sleep(Duration::from_millis(1));
                    counter.store(seen + 1, Ordering::Release);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Acquire), 8);
    }

    #[test]
    fn test_multi_lock_dedup_and_order() {
        let mgr = LockMgr::new(4);
        {
            let _guard = MultiScopeRecordLock::new(&mgr, &[b"b", b"a", b"b"]);
            assert!(!mgr.try_lock(b"a"));
            assert!(!mgr.try_lock(b"b"));
            assert!(mgr.try_lock(b"c"));
            mgr.unlock(b"c");
        }
        assert!(mgr.try_lock(b"a"));
        assert!(mgr.try_lock(b"b"));
        mgr.unlock(b"a");
        mgr.unlock(b"b");
    }

    #[test]
    fn test_multi_lock_no_deadlock_on_reversed_sets() {
        let mgr = Arc::new(LockMgr::new(4));
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let mgr = Arc::clone(&mgr);
                thread::spawn(move || {
                    let keys: [&[u8]; 2] = if i % 2 == 0 {
                        [b"src", b"dst"]
                    } else {
                        [b"dst", b"src"]
                    };
                    let _guard = MultiScopeRecordLock::new(&mgr, &keys);
                    thread::sleep(Duration::from_millis(1));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_single_key_multi_lock() {
        let mgr = LockMgr::new(4);
        let _guard = MultiScopeRecordLock::new(&mgr, &[b"only", b"only"]);
        assert!(!mgr.try_lock(b"only"));
    }
}

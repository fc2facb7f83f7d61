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

//! Garbage collection for the data column family.
//!
//! A data entry is garbage once its list's meta record is gone, expired, on
//! a newer version, or no longer covers the entry's index. All of that is
//! decided against the meta column, read through a weak engine handle; when
//! the engine cannot be reached the entry is kept, never dropped.

use std::sync::{Arc, Weak};

use bytes::BytesMut;
use once_cell::sync::OnceCell;
use rocksdb::{
    compaction_filter::CompactionFilter, compaction_filter_factory::CompactionFilterFactory,
    CompactionDecision, ReadOptions, DEFAULT_COLUMN_FAMILY_NAME,
};

use crate::list_meta_value_format::ParsedListsMetaValue;
use crate::lists::Db;
use crate::lists_data_key_format::ParsedListsDataKey;

const DATA_FILTER_NAME: &std::ffi::CStr = c"ListsDataCompactionFilter";
const DATA_FILTER_FACTORY_NAME: &std::ffi::CStr = c"ListsDataCompactionFilterFactory";

#[derive(Debug)]
enum MetaLookup {
    Valid,
    NotFound,
    Unavailable,
}

#[derive(Debug, Clone, Copy, Default)]
struct MetaState {
    version: u32,
    timestamp: u32,
    left_index: u64,
    right_index: u64,
}

pub struct ListsDataFilter {
    db: Option<Arc<Db>>,
    cur_key: BytesMut,
    meta_not_found: bool,
    cur_meta: MetaState,
}

impl ListsDataFilter {
    fn new(db: Option<Arc<Db>>) -> Self {
        Self {
            db,
            cur_key: BytesMut::new(),
            meta_not_found: false,
            cur_meta: MetaState::default(),
        }
    }

    /// Looks up and caches the meta record for `user_key`. Consecutive data
    /// keys of one list hit the cache; each fresh lookup reads under its own
    /// snapshot.
    fn ensure_meta_state(&mut self, user_key: &[u8]) -> MetaLookup {
        if self.cur_key.as_ref() != user_key {
            self.cur_key = BytesMut::from(user_key);
            self.meta_not_found = false;
            self.cur_meta = MetaState::default();

            let Some(db) = &self.db else {
                return MetaLookup::Unavailable;
            };
            let Some(cf) = db.cf_handle(DEFAULT_COLUMN_FAMILY_NAME) else {
                return MetaLookup::Unavailable;
            };

            let snapshot = db.snapshot();
            let mut read_opts = ReadOptions::default();
            read_opts.set_snapshot(&snapshot);
            match db.get_cf_opt(&cf, user_key, &read_opts) {
                Ok(Some(value)) => {
                    match ParsedListsMetaValue::new(BytesMut::from(value.as_slice())) {
                        Ok(meta) => {
                            self.cur_meta = MetaState {
                                version: meta.version(),
                                timestamp: meta.timestamp(),
                                left_index: meta.left_index(),
                                right_index: meta.right_index(),
                            };
                        }
                        Err(e) => {
                            log::debug!("lists data filter: meta parse failed for {user_key:?}: {e}");
                            self.meta_not_found = true;
                        }
                    }
                }
                Ok(None) => self.meta_not_found = true,
                Err(e) => {
                    log::warn!("lists data filter: meta read failed for {user_key:?}: {e}");
                    return MetaLookup::Unavailable;
                }
            }
        }

        if self.meta_not_found {
            MetaLookup::NotFound
        } else {
            MetaLookup::Valid
        }
    }
}

impl CompactionFilter for ListsDataFilter {
    fn name(&self) -> &std::ffi::CStr {
        DATA_FILTER_NAME
    }

    fn filter(&mut self, _level: u32, key: &[u8], _value: &[u8]) -> CompactionDecision {
        let Ok(parsed_key) = ParsedListsDataKey::decode(key) else {
            return CompactionDecision::Keep;
        };

        match self.ensure_meta_state(parsed_key.key()) {
            MetaLookup::Unavailable => CompactionDecision::Keep,
            MetaLookup::NotFound => CompactionDecision::Remove,
            MetaLookup::Valid => {
                let meta = self.cur_meta;
                let now = chrono::Utc::now().timestamp();
                if meta.timestamp != 0 && meta.timestamp as i64 <= now {
                    return CompactionDecision::Remove;
                }
                if parsed_key.version() != meta.version {
                    return CompactionDecision::Remove;
                }
                if parsed_key.index() <= meta.left_index || parsed_key.index() >= meta.right_index
                {
                    return CompactionDecision::Remove;
                }
                CompactionDecision::Keep
            }
        }
    }
}

pub struct ListsDataFilterFactory {
    db: Arc<OnceCell<Weak<Db>>>,
}

impl ListsDataFilterFactory {
    pub fn new(db: Arc<OnceCell<Weak<Db>>>) -> Self {
        Self { db }
    }
}

impl CompactionFilterFactory for ListsDataFilterFactory {
    type Filter = ListsDataFilter;

    fn create(
        &mut self,
        _context: rocksdb::compaction_filter_factory::CompactionFilterContext,
    ) -> Self::Filter {
        let db = self.db.get().and_then(Weak::upgrade);
        ListsDataFilter::new(db)
    }

    fn name(&self) -> &std::ffi::CStr {
        DATA_FILTER_FACTORY_NAME
    }
}

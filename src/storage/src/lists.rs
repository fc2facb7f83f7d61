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

//! The persistent list store: one RocksDB directory with a meta column
//! family (`default`) and a data column family (`data_cf`).

use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use rocksdb::{
    BlockBasedOptions, BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded,
    DEFAULT_COLUMN_FAMILY_NAME,
};
use snafu::ResultExt;

use pstd::lock_mgr::LockMgr;

use crate::custom_comparator::{lists_data_key_compare, lists_data_key_comparator_name};
use crate::error::{InvalidArgumentSnafu, Result, RocksSnafu};
use crate::lists_data_filter::ListsDataFilterFactory;
use crate::lists_meta_filter::ListsMetaFilterFactory;
use crate::options::StorageOptions;
use crate::storage_define::DATA_CF_NAME;

pub type Db = DBWithThreadMode<MultiThreaded>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeforeOrAfter {
    Before,
    After,
}

pub struct Lists {
    pub(crate) db: Option<Arc<Db>>,
    // Handed to the data compaction filter factory before the DB exists and
    // populated right after open. The handle is weak: the engine owns the
    // factory, so a strong handle would keep the engine alive forever.
    filter_db: Arc<OnceCell<Weak<Db>>>,
    pub(crate) lock_mgr: Arc<LockMgr>,
}

impl Lists {
    pub fn new(lock_mgr: Arc<LockMgr>) -> Self {
        Self {
            db: None,
            filter_db: Arc::new(OnceCell::new()),
            lock_mgr,
        }
    }

    pub fn open(&mut self, options: &StorageOptions, db_path: &str) -> Result<()> {
        // A reopened store must not leave the filters reading the old engine.
        self.filter_db = Arc::new(OnceCell::new());

        let mut meta_cf_opts = options.options.clone();
        Self::apply_table_options(&mut meta_cf_opts, options);
        meta_cf_opts.set_compaction_filter_factory(ListsMetaFilterFactory);

        let mut data_cf_opts = options.options.clone();
        Self::apply_table_options(&mut data_cf_opts, options);
        data_cf_opts.set_comparator(
            lists_data_key_comparator_name(),
            Box::new(lists_data_key_compare),
        );
        data_cf_opts
            .set_compaction_filter_factory(ListsDataFilterFactory::new(self.filter_db.clone()));

        let column_families = vec![
            ColumnFamilyDescriptor::new(DEFAULT_COLUMN_FAMILY_NAME, meta_cf_opts),
            ColumnFamilyDescriptor::new(DATA_CF_NAME, data_cf_opts),
        ];

        let db = Arc::new(
            Db::open_cf_descriptors(&options.options, db_path, column_families)
                .context(RocksSnafu)?,
        );
        let _ = self.filter_db.set(Arc::downgrade(&db));
        self.db = Some(db);
        Ok(())
    }

    fn apply_table_options(cf_opts: &mut rocksdb::Options, options: &StorageOptions) {
        let mut table_opts = BlockBasedOptions::default();
        if options.bloom_filter_bits_per_key > 0.0 {
            table_opts.set_bloom_filter(options.bloom_filter_bits_per_key, true);
        }
        if options.block_cache_size > 0 {
            let cache = rocksdb::Cache::new_lru_cache(options.block_cache_size);
            table_opts.set_block_cache(&cache);
        }
        cf_opts.set_block_based_table_factory(&table_opts);
    }

    /// Waits for background compactions to quiesce and releases the engine.
    /// The filter factory handle is dropped with it, so no compaction can
    /// outlive the store.
    pub fn close(&mut self) {
        if let Some(db) = self.db.take() {
            db.cancel_all_background_work(true);
        }
        self.filter_db = Arc::new(OnceCell::new());
    }

    pub(crate) fn db(&self) -> Result<&Arc<Db>> {
        self.db.as_ref().ok_or_else(|| {
            InvalidArgumentSnafu {
                message: "db is not opened".to_string(),
            }
            .build()
        })
    }

    pub(crate) fn meta_cf(&self) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.cf_handle(DEFAULT_COLUMN_FAMILY_NAME)
    }

    pub(crate) fn data_cf(&self) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.cf_handle(DATA_CF_NAME)
    }

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db()?.cf_handle(name).ok_or_else(|| {
            InvalidArgumentSnafu {
                message: format!("missing column family: {name}"),
            }
            .build()
        })
    }

    /// Manually compacts both column families over the given key range,
    /// driving the compaction filters over garbage generations.
    pub fn compact_range(&self, begin: Option<&[u8]>, end: Option<&[u8]>) -> Result<()> {
        let db = self.db()?;
        db.compact_range_cf(&self.meta_cf()?, begin, end);
        db.compact_range_cf(&self.data_cf()?, begin, end);
        Ok(())
    }
}

impl Drop for Lists {
    fn drop(&mut self) {
        self.close();
    }
}

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

//! Storage engine options.

use rocksdb::Options;

pub struct StorageOptions {
    /// Base RocksDB options, cloned into every column family.
    pub options: Options,
    /// Per-CF block cache size in bytes; 0 leaves the RocksDB default.
    pub block_cache_size: usize,
    /// Bloom filter bits per key for point lookups; 0 disables it.
    pub bloom_filter_bits_per_key: f64,
}

impl Default for StorageOptions {
    fn default() -> Self {
        let mut options = Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);
        options.set_max_open_files(10000);
        options.set_write_buffer_size(64 << 20);
        options.set_max_write_buffer_number(3);
        options.set_target_file_size_base(64 << 20);
        options.set_level_compaction_dynamic_level_bytes(true);

        Self {
            options,
            block_cache_size: 64 << 20,
            bloom_filter_bits_per_key: 10.0,
        }
    }
}

impl StorageOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

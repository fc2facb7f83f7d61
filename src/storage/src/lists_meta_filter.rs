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

//! Garbage collection for the meta column family.
//!
//! Purely reclamatory: a meta record is dropped only when it is expired and
//! holds no elements. Anything else, including bytes that fail to parse, is
//! kept; a meta that might still be referenced must never disappear.

use bytes::BytesMut;
use rocksdb::{
    compaction_filter::CompactionFilter, compaction_filter_factory::CompactionFilterFactory,
    CompactionDecision,
};

use crate::list_meta_value_format::ParsedListsMetaValue;

const META_FILTER_NAME: &std::ffi::CStr = c"ListsMetaCompactionFilter";
const META_FILTER_FACTORY_NAME: &std::ffi::CStr = c"ListsMetaCompactionFilterFactory";

#[derive(Debug, Default)]
pub struct ListsMetaFilter;

impl CompactionFilter for ListsMetaFilter {
    fn name(&self) -> &std::ffi::CStr {
        META_FILTER_NAME
    }

    fn filter(&mut self, _level: u32, key: &[u8], value: &[u8]) -> CompactionDecision {
        let parsed = match ParsedListsMetaValue::new(BytesMut::from(value)) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("lists meta filter: parse failed for {key:?}: {e}, keep");
                return CompactionDecision::Keep;
            }
        };

        if parsed.is_stale() && parsed.count() == 0 {
            return CompactionDecision::Remove;
        }
        CompactionDecision::Keep
    }
}

#[derive(Debug, Default)]
pub struct ListsMetaFilterFactory;

impl CompactionFilterFactory for ListsMetaFilterFactory {
    type Filter = ListsMetaFilter;

    fn create(
        &mut self,
        _context: rocksdb::compaction_filter_factory::CompactionFilterContext,
    ) -> Self::Filter {
        ListsMetaFilter
    }

    fn name(&self) -> &std::ffi::CStr {
        META_FILTER_FACTORY_NAME
    }
}

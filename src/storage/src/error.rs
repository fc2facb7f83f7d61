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

//! Error types for the list storage engine.

use snafu::{Location, Snafu};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("RocksDB error"))]
    Rocks {
        #[snafu(source)]
        error: rocksdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("key not found: {key}"))]
    KeyNotFound {
        key: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// The key exists but its TTL has passed; callers may treat this exactly
    /// like [`Error::KeyNotFound`].
    #[snafu(display("stale key: {key}"))]
    Stale {
        key: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("invalid format: {message}"))]
    InvalidFormat {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("invalid argument: {message}"))]
    InvalidArgument {
        message: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Error {
    /// True for the expected "list does not exist" outcomes, whether the meta
    /// is genuinely absent or merely expired.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound { .. } | Error::Stale { .. })
    }
}

pub(crate) fn display_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

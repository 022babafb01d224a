// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Storage
//!
//! Users, content types, permissions and grants live in a single embedded
//! redb database (`{DATA_DIR}/identity.redb`).
//!
//! The session and permission core only sees the [`IdentityStore`] trait.
//! Administrative handlers use [`IdentityDatabase`] directly for listing and
//! multi-row writes, each of which commits in one write transaction.

pub mod database;
pub mod query;
pub mod records;
pub mod store;

use std::path::Path;

pub use database::{IdentityDatabase, StoreError, StoreResult};
pub use query::{Page, PageRequest, QueryError, SortOrder, TriState, UserFilter, UserSortField};
pub use records::{ContentType, Grant, NewUser, Permission, User};
pub use store::{GrantLookup, IdentityStore};

/// File name of the identity database inside the data directory.
pub const DATABASE_FILE: &str = "identity.redb";

/// Open the identity database under `data_dir`.
pub fn open_in(data_dir: &Path) -> StoreResult<IdentityDatabase> {
    IdentityDatabase::open(&data_dir.join(DATABASE_FILE))
}

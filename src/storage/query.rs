// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User listing: filters, sorting, page and cursor pagination.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use thiserror::Error;

use super::records::User;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown sort field '{0}'")]
    UnknownSortField(String),

    #[error("unknown sort order '{0}' (expected asc or desc)")]
    UnknownSortOrder(String),

    #[error("'{0}' is not one of y, n, a")]
    InvalidTriState(String),

    #[error("page must be at least 1")]
    InvalidPage,

    #[error("page size must be between 1 and {MAX_PAGE_SIZE}")]
    InvalidPageSize,

    #[error("end date precedes start date")]
    InvertedRange,
}

/// Yes / no / all filter flag (`y`, `n`, `a`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState {
    Yes,
    No,
    #[default]
    All,
}

impl TriState {
    pub fn matches(&self, value: bool) -> bool {
        match self {
            TriState::Yes => value,
            TriState::No => !value,
            TriState::All => true,
        }
    }
}

impl FromStr for TriState {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "y" => Ok(TriState::Yes),
            "n" => Ok(TriState::No),
            "a" => Ok(TriState::All),
            other => Err(QueryError::InvalidTriState(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortField {
    #[default]
    Id,
    Username,
    LastLogin,
    CreatedAt,
}

impl UserSortField {
    fn compare(&self, a: &User, b: &User) -> Ordering {
        let primary = match self {
            UserSortField::Id => a.id.cmp(&b.id),
            UserSortField::Username => a.username.cmp(&b.username),
            UserSortField::LastLogin => a.last_login.cmp(&b.last_login),
            UserSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

impl FromStr for UserSortField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(UserSortField::Id),
            "username" => Ok(UserSortField::Username),
            "last_login" => Ok(UserSortField::LastLogin),
            "created_at" => Ok(UserSortField::CreatedAt),
            other => Err(QueryError::UnknownSortField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(QueryError::UnknownSortOrder(s.to_string())),
        }
    }
}

/// Inclusive range of UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayRange {
    from: Option<DateTime<Utc>>,
    /// Midnight after the last included day
    until: Option<DateTime<Utc>>,
}

impl DayRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, QueryError> {
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(QueryError::InvertedRange);
            }
        }
        Ok(Self {
            from: start.and_then(start_of_day),
            until: end
                .and_then(|d| d.checked_add_signed(TimeDelta::days(1)))
                .and_then(start_of_day),
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.until.is_none()
    }

    /// A missing timestamp only matches an unbounded range.
    pub fn contains(&self, at: Option<DateTime<Utc>>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(at) = at else {
            return false;
        };
        self.from.is_none_or(|from| at >= from) && self.until.is_none_or(|until| at < until)
    }
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

/// Filter and sort options for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub id_prefix: Option<String>,
    pub username_prefix: Option<String>,
    pub superuser: TriState,
    pub active: TriState,
    pub last_login: DayRange,
    pub created_at: DayRange,
    pub sort_field: UserSortField,
    pub sort_order: SortOrder,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.id_prefix
            .as_deref()
            .is_none_or(|prefix| user.id.to_string().starts_with(prefix))
            && self
                .username_prefix
                .as_deref()
                .is_none_or(|prefix| user.username.starts_with(prefix))
            && self.superuser.matches(user.is_superuser)
            && self.active.matches(user.is_active())
            && self.last_login.contains(user.last_login)
            && self.created_at.contains(Some(user.created_at))
    }

    pub fn apply(&self, users: Vec<User>) -> Vec<User> {
        let mut users: Vec<User> = users.into_iter().filter(|u| self.matches(u)).collect();
        users.sort_by(|a, b| {
            let ordering = self.sort_field.compare(a, b);
            match self.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        users
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Result<Self, QueryError> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page == 0 {
            return Err(QueryError::InvalidPage);
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(QueryError::InvalidPageSize);
        }
        Ok(Self { page, page_size })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len();
    let size = request.page_size as usize;
    let total_pages = total.div_ceil(size) as u32;
    let offset = (request.page as usize - 1).saturating_mul(size);
    let items = items.into_iter().skip(offset).take(size).collect();
    Page {
        items,
        total,
        page: request.page,
        page_size: request.page_size,
        total_pages,
    }
}

/// Users with `id > after`, in id order, plus the cursor for the next call.
pub fn cursor_page(mut users: Vec<User>, after: Option<i64>, limit: u32) -> Result<(Vec<User>, Option<i64>), QueryError> {
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(QueryError::InvalidPageSize);
    }
    users.sort_by_key(|u| u.id);
    let mut remaining = users
        .into_iter()
        .filter(|u| after.is_none_or(|cursor| u.id > cursor))
        .peekable();

    let page: Vec<User> = remaining.by_ref().take(limit as usize).collect();
    let next_cursor = match remaining.peek() {
        Some(_) => page.last().map(|u| u.id),
        None => None,
    };
    Ok((page, next_cursor))
}

/// Case-insensitive username prefix, or id prefix, match.
pub fn search_users(users: Vec<User>, term: &str, limit: u32) -> Vec<User> {
    let needle = term.trim().to_lowercase();
    let mut matches: Vec<User> = users
        .into_iter()
        .filter(|u| u.username.to_lowercase().starts_with(&needle) || u.id.to_string().starts_with(&needle))
        .collect();
    matches.sort_by(|a, b| a.username.cmp(&b.username).then_with(|| a.id.cmp(&b.id)));
    matches.truncate(limit.clamp(1, MAX_PAGE_SIZE) as usize);
    matches
}

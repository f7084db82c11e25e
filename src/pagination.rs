// Pagination - opaque cursor codec + connection builder
//
// One codec serves every list endpoint. A cursor is the record's creation
// time, milliseconds since epoch as a big-endian i64, base64url encoded
// without padding. Ordering is ascending by creation time, so cursors are
// monotonic and a decoded cursor marks a resume position.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::{DomainError, Result};

// ============================================================================
// CURSOR CODEC
// ============================================================================

/// Anything listable through a connection exposes its creation time.
pub trait Cursored {
    fn created_at(&self) -> DateTime<Utc>;
}

impl Cursored for crate::entities::Member {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Cursored for crate::entities::Vendor {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Cursored for crate::entities::Promo {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Cursored for crate::entities::EnrollmentRequest {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub fn encode_cursor(created_at: DateTime<Utc>) -> String {
    URL_SAFE_NO_PAD.encode(created_at.timestamp_millis().to_be_bytes())
}

/// Decode an opaque cursor back to a timestamp. Anything that is not valid
/// base64url over exactly eight bytes is rejected as "Invalid cursor".
pub fn decode_cursor(token: &str) -> Result<DateTime<Utc>> {
    let invalid = || DomainError::PaginationInput("Invalid cursor".to_string());

    let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
    let raw: [u8; 8] = bytes.try_into().map_err(|_| invalid())?;
    let millis = i64::from_be_bytes(raw);

    Utc.timestamp_millis_opt(millis).single().ok_or_else(invalid)
}

// ============================================================================
// CONNECTION SHAPE
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge<T> {
    pub node: T,
    pub cursor: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub total_count: i64,
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

// ============================================================================
// PAGINATE
// ============================================================================

/// Build a connection over `items`.
///
/// `first`: negative fails with "Invalid first"; omitted means no limit.
/// `after`: window starts at the first record whose creation time is >= the
/// decoded timestamp. `total_count` counts the windowed records before the
/// limit is applied, which keeps `has_next_page` honest for every window,
/// including the empty one, where `end_cursor` is simply None.
pub fn paginate<T: Cursored>(
    mut items: Vec<T>,
    first: Option<i64>,
    after: Option<&str>,
) -> Result<Connection<T>> {
    let limit = match first {
        Some(f) if f < 0 => {
            return Err(DomainError::PaginationInput("Invalid first".to_string()))
        }
        Some(f) => Some(f as usize),
        None => None,
    };

    let after_ts = after.map(decode_cursor).transpose()?;

    items.sort_by_key(|item| item.created_at());
    let window: Vec<T> = match after_ts {
        Some(ts) => items
            .into_iter()
            .filter(|item| item.created_at() >= ts)
            .collect(),
        None => items,
    };

    let total_count = window.len();
    let take = limit.unwrap_or(total_count);
    let edges: Vec<Edge<T>> = window
        .into_iter()
        .take(take)
        .map(|node| Edge {
            cursor: encode_cursor(node.created_at()),
            node,
        })
        .collect();

    let page_info = PageInfo {
        end_cursor: edges.last().map(|edge| edge.cursor.clone()),
        has_next_page: edges.len() < total_count,
    };

    Ok(Connection {
        total_count: total_count as i64,
        edges,
        page_info,
    })
}

// ============================================================================
// TESTS
// ============================================================================

//! Restaurant Query Engine: filtered, searched and cursor-paginated listings.
//!
//! Two mutually exclusive modes, picked by the presence of search text:
//!
//! | Mode    | Order                  | Range                          | Cursor          |
//! |---------|------------------------|--------------------------------|-----------------|
//! | search  | `name` asc             | `prefix <= name < prefix+MAX`  | last `name`     |
//! | default | `createdAt` desc, `id` | none                           | last row's `id` |
//!
//! Both modes always filter on `status == active`.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  restaurant::Restaurant,
  store::DocumentStore,
};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 50;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// A resume position, opaque to callers once encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
  /// Search mode: resume after this `name`.
  AfterName(String),
  /// Default mode: resume after this row.
  AfterRow(Uuid),
}

impl Cursor {
  pub fn encode(&self) -> String {
    let raw = match self {
      Self::AfterName(name) => format!("n:{name}"),
      Self::AfterRow(id) => format!("r:{id}"),
    };
    URL_SAFE_NO_PAD.encode(raw)
  }

  /// Decode a token produced by [`Cursor::encode`]. Anything else is `None`.
  pub fn decode(token: &str) -> Option<Self> {
    let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
    let raw = String::from_utf8(bytes).ok()?;
    match raw.split_once(':')? {
      ("n", name) => Some(Self::AfterName(name.to_owned())),
      ("r", id) => Uuid::parse_str(id).ok().map(Self::AfterRow),
      _ => None,
    }
  }
}

// ─── Parameters ──────────────────────────────────────────────────────────────

/// Exact-match filters; all optional and combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilters {
  pub region:               Option<String>,
  pub municipality:         Option<String>,
  pub accepts_reservations: Option<bool>,
  pub has_queue:            Option<bool>,
}

/// Input to [`list_restaurants`].
#[derive(Debug, Clone, Default)]
pub struct ListParams {
  pub filters:     ListFilters,
  /// Name prefix; a blank value selects default mode.
  pub search_text: Option<String>,
  /// Requested page size, clamped to `1..=MAX_PAGE_SIZE`.
  pub page_size:   Option<i64>,
  pub cursor:      Option<Cursor>,
}

/// Lenient page-size parsing: anything unparseable yields `None`, which
/// [`clamp_page_size`] turns into the default.
pub fn parse_page_size(raw: Option<&str>) -> Option<i64> {
  raw
    .and_then(|s| s.trim().parse::<f64>().ok())
    .filter(|f| f.is_finite())
    .map(|f| f.trunc() as i64)
}

pub fn clamp_page_size(requested: Option<i64>) -> usize {
  match requested {
    None => DEFAULT_PAGE_SIZE,
    Some(n) => n.clamp(1, MAX_PAGE_SIZE as i64) as usize,
  }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// Position of a row in default-mode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPosition {
  pub created_at: DateTime<Utc>,
  pub id:         Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMode {
  Search {
    prefix:     String,
    after_name: Option<String>,
  },
  Browse {
    after: Option<RowPosition>,
  },
}

/// A fully resolved listing query, executed by
/// [`DocumentStore::query_restaurants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
  pub filters:   ListFilters,
  pub mode:      QueryMode,
  pub page_size: usize,
}

impl QueryPlan {
  /// Rows the store should return: one more than the page, so the engine can
  /// tell a final page from a full one.
  pub fn fetch_limit(&self) -> usize { self.page_size + 1 }
}

/// Exclusive upper bound of the prefix range: every string starting with
/// `prefix` sorts below `prefix` followed by the highest code point.
pub fn prefix_upper_bound(prefix: &str) -> String {
  let mut bound = String::with_capacity(prefix.len() + 4);
  bound.push_str(prefix);
  bound.push(char::MAX);
  bound
}

// ─── Result ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
  Search,
  Default,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult {
  pub mode:        ListMode,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search_text: Option<String>,
  pub items:       Vec<Restaurant>,
  /// Encoded [`Cursor`]; present iff `has_more`.
  pub next_cursor: Option<String>,
  pub has_more:    bool,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Serve one page of active restaurants.
///
/// A cursor of the wrong kind for the selected mode is ignored. In default
/// mode a cursor naming a row that no longer exists restarts the walk from the
/// beginning instead of failing.
pub async fn list_restaurants<S>(
  store: &S,
  params: ListParams,
) -> Result<PagedResult>
where
  S: DocumentStore,
{
  let page_size = clamp_page_size(params.page_size);
  let search_text = params
    .search_text
    .map(|s| s.trim().to_owned())
    .filter(|s| !s.is_empty());

  let mode = match &search_text {
    Some(prefix) => QueryMode::Search {
      prefix:     prefix.clone(),
      after_name: match params.cursor {
        Some(Cursor::AfterName(name)) => Some(name),
        Some(Cursor::AfterRow(_)) => {
          tracing::debug!("row cursor ignored in search mode");
          None
        }
        None => None,
      },
    },
    None => QueryMode::Browse {
      after: resolve_row_cursor(store, params.cursor).await?,
    },
  };

  let plan = QueryPlan { filters: params.filters, mode, page_size };
  let mut items = store
    .query_restaurants(&plan)
    .await
    .map_err(Error::store)?;

  let has_more = items.len() > page_size;
  items.truncate(page_size);

  let next_cursor = if has_more {
    items.last().map(|last| match plan.mode {
      QueryMode::Search { .. } => Cursor::AfterName(last.name.clone()),
      QueryMode::Browse { .. } => Cursor::AfterRow(last.id),
    })
  } else {
    None
  };

  Ok(PagedResult {
    mode: match plan.mode {
      QueryMode::Search { .. } => ListMode::Search,
      QueryMode::Browse { .. } => ListMode::Default,
    },
    search_text,
    items,
    next_cursor: next_cursor.as_ref().map(Cursor::encode),
    has_more,
  })
}

/// Look up the row a default-mode cursor points at.
async fn resolve_row_cursor<S>(
  store: &S,
  cursor: Option<Cursor>,
) -> Result<Option<RowPosition>>
where
  S: DocumentStore,
{
  let id = match cursor {
    Some(Cursor::AfterRow(id)) => id,
    Some(Cursor::AfterName(_)) => {
      tracing::debug!("name cursor ignored in default mode");
      return Ok(None);
    }
    None => return Ok(None),
  };

  let row = store.get_restaurant(id).await.map_err(Error::store)?;
  if row.is_none() {
    tracing::debug!(%id, "cursor row is gone; restarting from the first page");
  }
  Ok(row.map(|r| RowPosition { created_at: r.created_at, id: r.id }))
}

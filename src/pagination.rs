//! Relay-style cursor pagination
//!
//! Cursors are opaque base64 tokens wrapping an absolute offset into the full
//! ordered collection. They are only meaningful against the collection that
//! produced them.
//!
//! Slicing order: `after`, `before`, `first`, `last`. Undecodable or
//! out-of-range cursors are ignored; negative limits are rejected.

use std::ops::Range;

use async_graphql::dynamic::{ObjectAccessor, ValueAccessor};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::RelayError;

/// Prefix of the decoded cursor payload
pub const CURSOR_PREFIX: &str = "arrayconnection:";

/// Page information
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Edge in a connection
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

/// Connection (paginated result)
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    /// Create a connection from items that start at `start_offset` in the full collection
    pub fn new<I>(items: I, start_offset: usize, has_previous: bool, has_next: bool) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let edges: Vec<Edge<T>> = items
            .into_iter()
            .enumerate()
            .map(|(idx, node)| Edge {
                cursor: CursorCodec::encode_offset(start_offset + idx),
                node,
            })
            .collect();

        let start_cursor = edges.first().map(|e| e.cursor.clone());
        let end_cursor = edges.last().map(|e| e.cursor.clone());

        Self {
            edges,
            page_info: PageInfo {
                has_next_page: has_next,
                has_previous_page: has_previous,
                start_cursor,
                end_cursor,
            },
        }
    }

    /// Create empty connection
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
        }
    }

    /// Nodes of the connection, in order
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }
}

/// Cursor encoding/decoding
pub struct CursorCodec;

impl CursorCodec {
    /// Encode cursor to base64
    pub fn encode(value: &str) -> String {
        BASE64.encode(value.as_bytes())
    }

    /// Decode cursor from base64
    pub fn decode(cursor: &str) -> crate::Result<String> {
        let bytes = BASE64
            .decode(cursor.as_bytes())
            .map_err(|e| RelayError::InvalidCursor(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| RelayError::InvalidCursor(e.to_string()))
    }

    /// Cursor for an absolute offset
    pub fn encode_offset(offset: usize) -> String {
        Self::encode(&format!("{CURSOR_PREFIX}{offset}"))
    }

    /// Offset carried by a cursor
    pub fn decode_offset(cursor: &str) -> crate::Result<usize> {
        let raw = Self::decode(cursor)?;
        raw.strip_prefix(CURSOR_PREFIX)
            .ok_or_else(|| RelayError::InvalidCursor(format!("unexpected cursor payload {raw:?}")))?
            .parse()
            .map_err(|e: std::num::ParseIntError| RelayError::InvalidCursor(e.to_string()))
    }
}

/// Cursor of the first item equal to `item`, if any
pub fn cursor_for_object_in_connection<T: PartialEq>(items: &[T], item: &T) -> Option<String> {
    items
        .iter()
        .position(|candidate| candidate == item)
        .map(CursorCodec::encode_offset)
}

/// Offset carried by `cursor`, or `default` when absent or undecodable
pub fn offset_with_default(cursor: Option<&str>, default: usize) -> usize {
    cursor
        .and_then(|c| CursorCodec::decode_offset(c).ok())
        .unwrap_or(default)
}

/// Connection field arguments
///
/// Follows the Relay Cursor Connections Specification:
/// https://relay.dev/graphql/connections.htm
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionArgs {
    /// Cursor to end before (backward pagination)
    pub before: Option<String>,

    /// Cursor to start after (forward pagination)
    pub after: Option<String>,

    /// Number of items to keep from the head
    pub first: Option<i64>,

    /// Number of items to keep from the tail
    pub last: Option<i64>,
}

impl ConnectionArgs {
    pub fn with_before(mut self, cursor: impl Into<String>) -> Self {
        self.before = Some(cursor.into());
        self
    }

    pub fn with_after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn with_first(mut self, first: i64) -> Self {
        self.first = Some(first);
        self
    }

    pub fn with_last(mut self, last: i64) -> Self {
        self.last = Some(last);
        self
    }

    /// Read `before`, `after`, `first` and `last` from dynamic field arguments
    ///
    /// Absent and explicit `null` arguments are both treated as unset.
    pub fn from_accessor(args: &ObjectAccessor<'_>) -> async_graphql::Result<Self> {
        Ok(Self {
            before: optional(args, "before")
                .map(|v| v.string().map(str::to_owned))
                .transpose()?,
            after: optional(args, "after")
                .map(|v| v.string().map(str::to_owned))
                .transpose()?,
            first: optional(args, "first").map(|v| v.i64()).transpose()?,
            last: optional(args, "last").map(|v| v.i64()).transpose()?,
        })
    }

    /// Reject negative `first`/`last`
    pub fn validate(&self) -> crate::Result<()> {
        non_negative("first", self.first)?;
        non_negative("last", self.last)?;
        Ok(())
    }
}

fn optional<'a>(args: &'a ObjectAccessor<'_>, name: &str) -> Option<ValueAccessor<'a>> {
    args.get(name).filter(|v| !v.is_null())
}

fn non_negative(name: &str, value: Option<i64>) -> crate::Result<Option<usize>> {
    match value {
        None => Ok(None),
        Some(n) if n < 0 => Err(RelayError::InvalidArgument(format!(
            "Argument \"{name}\" must be a non-negative integer"
        ))),
        Some(n) => usize::try_from(n)
            .map(Some)
            .map_err(|e| RelayError::InvalidArgument(e.to_string())),
    }
}

/// Service-level page size policy
///
/// The default is unbounded: arguments pass through untouched.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PageLimits {
    /// `first` used when the client supplies neither `first` nor `last`
    pub default_page_size: Option<usize>,

    /// Largest accepted `first`/`last`
    pub max_page_size: Option<usize>,
}

impl PageLimits {
    /// Validate `args` against the limits and fill in the default page size
    pub fn apply(&self, args: &ConnectionArgs) -> crate::Result<ConnectionArgs> {
        let first = non_negative("first", args.first)?;
        let last = non_negative("last", args.last)?;

        if let Some(max) = self.max_page_size {
            for (name, value) in [("first", first), ("last", last)] {
                if value.is_some_and(|n| n > max) {
                    return Err(RelayError::InvalidArgument(format!(
                        "Argument \"{name}\" cannot exceed {max}"
                    )));
                }
            }
        }

        let mut args = args.clone();
        if first.is_none() && last.is_none() {
            if let Some(default) = self.default_page_size {
                let default = i64::try_from(default).map_err(|_| {
                    RelayError::InvalidArgument(format!(
                        "Default page size {default} is out of range"
                    ))
                })?;
                args.first = Some(default);
            }
        }
        Ok(args)
    }
}

/// Position of a materialised slice within the full collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceInfo {
    /// Absolute offset of the slice's first item
    pub slice_start: usize,

    /// Length of the full collection
    pub array_length: usize,
}

/// Absolute range selected by the arguments, with its page flags
#[derive(Debug, Clone, PartialEq, Eq)]
struct Window {
    range: Range<usize>,
    has_previous_page: bool,
    has_next_page: bool,
}

impl Window {
    /// Select from a collection of `array_length` items of which only the
    /// offsets in `available` can be returned
    ///
    /// Cursors are bounded by the full collection, then clamped to
    /// `available` before `first` and `last` apply.
    fn compute(
        args: &ConnectionArgs,
        array_length: usize,
        available: Range<usize>,
    ) -> crate::Result<Self> {
        let first = non_negative("first", args.first)?;
        let last = non_negative("last", args.last)?;

        let after = cursor_in_range(args.after.as_deref(), array_length);
        let before = cursor_in_range(args.before.as_deref(), array_length);

        let lower = after.map_or(0, |offset| offset + 1);
        let upper = before.unwrap_or(array_length).max(lower);

        let mut start = lower.clamp(available.start, available.end);
        let mut end = upper.min(available.end).max(start);

        if let Some(first) = first {
            if end - start > first {
                end = start + first;
            }
        }
        if let Some(last) = last {
            if end - start > last {
                start = end - last;
            }
        }

        let has_previous_page = after.is_some() || start > lower;
        let has_next_page = before.is_some() || end < upper;

        tracing::trace!(
            array_length,
            start,
            end,
            has_previous_page,
            has_next_page,
            "computed connection window"
        );

        Ok(Self {
            range: start..end,
            has_previous_page,
            has_next_page,
        })
    }
}

fn cursor_in_range(cursor: Option<&str>, array_length: usize) -> Option<usize> {
    let cursor = cursor?;
    match CursorCodec::decode_offset(cursor) {
        Ok(offset) if offset < array_length => Some(offset),
        Ok(offset) => {
            tracing::debug!(offset, array_length, "ignoring out-of-range cursor");
            None
        }
        Err(error) => {
            tracing::debug!(cursor, %error, "ignoring undecodable cursor");
            None
        }
    }
}

/// Build a connection over a fully materialised collection
pub fn connection_from_slice<T: Clone>(
    items: &[T],
    args: &ConnectionArgs,
) -> crate::Result<Connection<T>> {
    connection_from_array_slice(
        items,
        args,
        SliceInfo {
            slice_start: 0,
            array_length: items.len(),
        },
    )
}

/// Build a connection over part of a collection
///
/// `slice` holds the items at `info.slice_start..` of a collection of
/// `info.array_length` items. Only the overlap of the selected window and the
/// slice becomes edges; page flags and cursors refer to the full collection.
pub fn connection_from_array_slice<T: Clone>(
    slice: &[T],
    args: &ConnectionArgs,
    info: SliceInfo,
) -> crate::Result<Connection<T>> {
    let slice_end = info.slice_start + slice.len();
    let window = Window::compute(args, info.array_length, info.slice_start..slice_end)?;

    let Range { start, end } = window.range;
    let items = slice[start - info.slice_start..end - info.slice_start]
        .iter()
        .cloned();

    Ok(Connection::new(
        items,
        start,
        window.has_previous_page,
        window.has_next_page,
    ))
}

/// A collection that is paged on demand instead of materialised
#[async_trait]
pub trait PagedSource: Send + Sync {
    type Item: Send;

    /// Number of items in the full collection
    async fn total_count(&self) -> async_graphql::Result<usize>;

    /// Items at the absolute offsets in `range`
    async fn fetch(&self, range: Range<usize>) -> async_graphql::Result<Vec<Self::Item>>;
}

/// Build a connection by fetching only the selected window from `source`
///
/// Argument errors are raised before the source is queried. Source errors
/// propagate unchanged.
pub async fn connection_from_source<S>(
    source: &S,
    args: &ConnectionArgs,
) -> async_graphql::Result<Connection<S::Item>>
where
    S: PagedSource + ?Sized,
{
    args.validate()?;
    let array_length = source.total_count().await?;
    let window = Window::compute(args, array_length, 0..array_length)?;

    let mut items = if window.range.is_empty() {
        Vec::new()
    } else {
        source.fetch(window.range.clone()).await?
    };
    if items.len() > window.range.len() {
        tracing::warn!(
            fetched = items.len(),
            expected = window.range.len(),
            "paged source returned more items than requested"
        );
        items.truncate(window.range.len());
    }

    Ok(Connection::new(
        items,
        window.range.start,
        window.has_previous_page,
        window.has_next_page,
    ))
}

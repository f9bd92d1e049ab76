//! Clip cursor: a position inside an already-ranked clip list.
//!
//! The caller owns ordering (ascending count for "lowest", descending for
//! "top"); the cursor never re-sorts. Every accessor tolerates empty lists
//! and out-of-range or negative indexes.

use std::cmp::Reverse;

use crate::api::Clip;
use crate::state::ClipOrder;

/// Outcome of looking up the clip under the cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CursorPosition<'a> {
    Found(&'a Clip),
    NotFound,
}

impl<'a> CursorPosition<'a> {
    pub fn clip(self) -> Option<&'a Clip> {
        match self {
            Self::Found(clip) => Some(clip),
            Self::NotFound => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClipCursor<'a> {
    clips: &'a [Clip],
    index: i64,
}

impl<'a> ClipCursor<'a> {
    pub fn new(clips: &'a [Clip], index: i64) -> Self {
        Self { clips, index }
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn current(&self) -> CursorPosition<'a> {
        usize::try_from(self.index)
            .ok()
            .and_then(|i| self.clips.get(i))
            .map_or(CursorPosition::NotFound, CursorPosition::Found)
    }

    fn in_bounds(&self) -> bool {
        matches!(self.current(), CursorPosition::Found(_))
    }

    pub fn has_previous(&self) -> bool {
        self.in_bounds() && self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.in_bounds() && self.index < self.last_index()
    }

    /// Index the "previous" control should request, if enabled.
    pub fn previous_index(&self) -> Option<i64> {
        self.has_previous().then(|| self.index - 1)
    }

    /// Index the "next" control should request, if enabled.
    pub fn next_index(&self) -> Option<i64> {
        self.has_next().then(|| self.index + 1)
    }

    /// Clamp an arbitrary request into this list's bounds.
    pub fn clamp(&self, requested: i64) -> i64 {
        clamp_index(requested, self.clips.len())
    }

    fn last_index(&self) -> i64 {
        i64::try_from(self.clips.len()).unwrap_or(i64::MAX) - 1
    }
}

/// Clamp `requested` into `[0, len - 1]`; `0` for an empty list.
pub fn clamp_index(requested: i64, len: usize) -> i64 {
    let last = i64::try_from(len).unwrap_or(i64::MAX).saturating_sub(1).max(0);
    requested.clamp(0, last)
}

/// Rank clips for a slot: ascending count for `ASC`, descending for `DESC`.
/// Stable, so equal counts keep upstream order.
pub fn sort_for(order: ClipOrder, clips: &mut [Clip]) {
    match order {
        ClipOrder::Asc => clips.sort_by_key(|c| c.count),
        ClipOrder::Desc => clips.sort_by_key(|c| Reverse(c.count)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(id: &str, count: i64) -> Clip {
        Clip {
            clip_id: id.to_string(),
            count,
            time: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn single_clip_has_no_neighbours() {
        let clips = vec![clip("a", 1)];
        let cursor = ClipCursor::new(&clips, 0);
        assert_eq!(cursor.current().clip().map(|c| c.clip_id.as_str()), Some("a"));
        assert!(!cursor.has_previous());
        assert!(!cursor.has_next());
    }

    #[test]
    fn negative_index_is_not_found() {
        let clips = vec![clip("a", 1), clip("b", 2)];
        let cursor = ClipCursor::new(&clips, -1);
        assert_eq!(cursor.current(), CursorPosition::NotFound);
        assert_eq!(cursor.next_index(), None);
        assert_eq!(cursor.previous_index(), None);
    }

    #[test]
    fn clamp_index_bounds() {
        assert_eq!(clamp_index(5, 0), 0);
        assert_eq!(clamp_index(-3, 4), 0);
        assert_eq!(clamp_index(9, 4), 3);
        assert_eq!(clamp_index(2, 4), 2);
    }

    #[test]
    fn sort_for_orders_by_count() {
        let mut clips = vec![clip("a", 5), clip("b", 1), clip("c", 9)];
        sort_for(ClipOrder::Asc, &mut clips);
        let ids: Vec<_> = clips.iter().map(|c| c.clip_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);

        sort_for(ClipOrder::Desc, &mut clips);
        let ids: Vec<_> = clips.iter().map(|c| c.clip_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}

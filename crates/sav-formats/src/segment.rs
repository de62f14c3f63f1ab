//! Very long string segmentation arithmetic
//!
//! A string variable wider than [`REAL_CHUNK`] bytes is stored as several
//! physical "segment" variables. Every segment but the last holds 255 bytes of
//! storage but only contributes [`EFFECTIVE_CHUNK`] bytes to the logical
//! width; the last holds whatever remains. Numeric variables have width 0 and
//! always occupy one 8-byte slot.
//!
//! These functions are total over `usize` and never fail.

/// Number of bytes really stored in each non-final segment
pub const REAL_CHUNK: usize = 255;

/// Number of logical bytes each non-final segment accounts for
pub const EFFECTIVE_CHUNK: usize = 252;

/// Size of one physical storage slot ("oct")
pub const SLOT_SIZE: usize = 8;

/// Round `x` up to the next multiple of `to`
pub const fn round_up(x: usize, to: usize) -> usize {
    x.div_ceil(to) * to
}

/// Whether a string of width `w` must be split across several segments
pub const fn is_spanning(w: usize) -> bool {
    w > REAL_CHUNK
}

/// Number of segments used to store a variable of width `w`
pub const fn segment_count(w: usize) -> usize {
    if is_spanning(w) {
        w.div_ceil(EFFECTIVE_CHUNK)
    } else {
        1
    }
}

/// Allocated width of segment `i` of a variable of width `w`
///
/// Indices past the last segment are treated as the last segment.
pub const fn allocated_width(w: usize, i: usize) -> usize {
    if !is_spanning(w) {
        return w;
    }
    let count = segment_count(w);
    if i < count - 1 {
        REAL_CHUNK
    } else {
        round_up(w - (count - 1) * EFFECTIVE_CHUNK, SLOT_SIZE)
    }
}

/// Bytes a variable of width `w` occupies in one case
pub const fn total_physical_bytes(w: usize) -> usize {
    if w == 0 {
        SLOT_SIZE
    } else if !is_spanning(w) {
        round_up(w, SLOT_SIZE)
    } else {
        (w / EFFECTIVE_CHUNK) * round_up(REAL_CHUNK, SLOT_SIZE)
            + round_up(w % EFFECTIVE_CHUNK, SLOT_SIZE)
    }
}

/// Number of 8-byte slots a variable of width `w` adds to the nominal case size
pub fn width_to_octs(w: usize) -> usize {
    segment_read_widths(w)
        .map(|width| width.div_ceil(SLOT_SIZE))
        .sum::<usize>()
        .max(1)
}

/// Widths to read from the block codec when reconstructing one cell
///
/// The returned iterator is lazy and can be cloned to restart it.
pub const fn segment_read_widths(w: usize) -> SegmentReadWidths {
    SegmentReadWidths {
        width: w,
        next: 0,
        count: segment_count(w),
    }
}

/// Iterator over per-segment read widths, see [`segment_read_widths`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReadWidths {
    width: usize,
    next: usize,
    count: usize,
}

impl Iterator for SegmentReadWidths {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        if index + 1 < self.count {
            Some(REAL_CHUNK)
        } else {
            Some(self.width - (self.count - 1) * EFFECTIVE_CHUNK)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SegmentReadWidths {}

/// One physical slice of a logical variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Zero-based position; the primary descriptor is segment 0
    pub index: usize,
    /// Allocated width in bytes (at most [`REAL_CHUNK`])
    pub width: usize,
    /// Whether this is the final segment of its variable
    pub is_last: bool,
}

impl Segment {
    /// Number of 8-byte slots this segment occupies
    pub const fn slots(&self) -> usize {
        if self.width == 0 {
            1
        } else {
            self.width.div_ceil(SLOT_SIZE)
        }
    }
}

/// All segments of a variable of width `w`, primary first
pub fn segments(w: usize) -> impl Iterator<Item = Segment> {
    let count = segment_count(w);
    (0..count).map(move |index| Segment {
        index,
        width: allocated_width(w, index),
        is_last: index + 1 == count,
    })
}

//! Order-preserving fan-out of a snapshot into contiguous slices.

/// Size of each slice when `len` items are split `slice_count` ways:
/// `ceil(len / slice_count)`, never zero.
pub fn slice_size(len: usize, slice_count: usize) -> usize {
    len.div_ceil(slice_count.max(1)).max(1)
}

/// Split `items` into at most `slice_count` contiguous, non-overlapping
/// views. Every slice holds [`slice_size`] items except possibly the last,
/// which holds the remainder, so there are `ceil(len / slice_size)` slices.
///
/// The views borrow from `items`; nothing is copied. A `slice_count` of zero
/// is treated as one.
pub fn slice<T>(items: &[T], slice_count: usize) -> Vec<&[T]> {
    if items.is_empty() {
        return Vec::new();
    }
    items.chunks(slice_size(items.len(), slice_count)).collect()
}

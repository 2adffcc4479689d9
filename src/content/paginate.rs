//! Pagination of ordered listings.

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager<T> {
    /// 1-based position.
    pub number: usize,
    /// Number of pagers in the sequence.
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> Pager<T> {
    pub fn prev(&self) -> Option<usize> {
        (self.number > 1).then(|| self.number - 1)
    }

    pub fn next(&self) -> Option<usize> {
        (self.number < self.total).then(|| self.number + 1)
    }
}

/// Split `items` into pagers of `size`.
///
/// `size <= 0` yields one pager holding everything; an empty list yields none.
pub fn paginate<T: Clone>(items: &[T], size: i64) -> Vec<Pager<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let size = usize::try_from(size).ok().filter(|&s| s > 0).unwrap_or(items.len());
    let total = items.len().div_ceil(size);

    items
        .chunks(size)
        .enumerate()
        .map(|(i, chunk)| Pager {
            number: i + 1,
            total,
            items: chunk.to_vec(),
        })
        .collect()
}

use serde::Serialize;

/// Page cursor for a paginated listing. All page numbers are 1-based and
/// clamped to `[1, size]`; an empty table still has one (empty) page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Paginate {
    /// Total matching rows
    pub total: i64,
    /// Number of pages
    pub size: i64,
    /// Rows per page
    pub row: i64,
    pub current: i64,
    pub previous: i64,
    pub next: i64,
    pub offset: i64,
}

impl Paginate {
    pub fn calculate(page: i64, total: i64, limit: i64) -> Self {
        let limit = limit.max(1);
        let total = total.max(0);
        let size = ((total + limit - 1) / limit).max(1);
        let current = clamp(page, 1, size);

        Self {
            total,
            size,
            row: limit,
            current,
            previous: clamp(current - 1, 1, size),
            next: clamp(current + 1, 1, size),
            offset: (current - 1) * limit,
        }
    }
}

fn clamp(value: i64, min: i64, max: i64) -> i64 {
    value.max(min).min(max)
}

/// One page of records plus its cursor
#[derive(Debug, Clone, Serialize)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub cursor: Paginate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_zero_clamps_to_first() {
        let p = Paginate::calculate(0, 47, 10);
        assert_eq!(p.size, 5);
        assert_eq!(p.current, 1);
        assert_eq!(p.previous, 1);
        assert_eq!(p.next, 2);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn page_past_the_end_clamps_to_last() {
        let p = Paginate::calculate(999, 47, 10);
        assert_eq!(p.current, 5);
        assert_eq!(p.previous, 4);
        assert_eq!(p.next, 5);
        assert_eq!(p.offset, 40);
    }

    #[test]
    fn empty_table_has_a_single_page() {
        let p = Paginate::calculate(3, 0, 10);
        assert_eq!(p.size, 1);
        assert_eq!(p.current, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn non_positive_limit_is_treated_as_one() {
        let p = Paginate::calculate(2, 3, 0);
        assert_eq!(p.row, 1);
        assert_eq!(p.size, 3);
        assert_eq!(p.offset, 1);
    }
}

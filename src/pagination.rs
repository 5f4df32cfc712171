use serde::Deserialize;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

/// Raw `?page=&per_page=` values. Anything that doesn't parse falls back to
/// the defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        let page = if page < 1 { DEFAULT_PAGE } else { page };
        let per_page = if per_page < 1 {
            DEFAULT_PER_PAGE
        } else {
            per_page.min(MAX_PER_PAGE)
        };
        Self { page, per_page }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_PER_PAGE)
    }
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        let parse = |raw: Option<String>, default: i64| {
            raw.and_then(|v| v.trim().parse::<i64>().ok())
                .unwrap_or(default)
        };
        Self::new(
            parse(q.page, DEFAULT_PAGE),
            parse(q.per_page, DEFAULT_PER_PAGE),
        )
    }
}

pub fn page_count(total: i64, per_page: i64) -> i64 {
    if per_page <= 0 || total <= 0 {
        return 0;
    }
    (total + per_page - 1) / per_page
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, req: PageRequest) -> Self {
        Self {
            items,
            total,
            page: req.page,
            per_page: req.per_page,
            pages: page_count(total, req.per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, per_page: Option<&str>) -> PageRequest {
        PageQuery {
            page: page.map(String::from),
            per_page: per_page.map(String::from),
        }
        .into()
    }

    #[test]
    fn missing_values_use_defaults() {
        assert_eq!(query(None, None), PageRequest { page: 1, per_page: 10 });
    }

    #[test]
    fn malformed_values_fall_back() {
        assert_eq!(query(Some("abc"), Some("1.5")), PageRequest::default());
        assert_eq!(query(Some("3"), Some("")), PageRequest { page: 3, per_page: 10 });
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        assert_eq!(query(Some("0"), Some("-4")), PageRequest { page: 1, per_page: 10 });
        assert_eq!(query(Some("2"), Some("5000")).per_page, MAX_PER_PAGE);
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(3, 25).offset(), 50);
        assert_eq!(PageRequest::new(i64::MAX, 100).offset(), i64::MAX);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(7, 3), 3);
    }
}

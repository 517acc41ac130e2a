use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

/// Query parameters shared by every list endpoint. The dashboard tables
/// search, sort and page through these instead of holding the whole
/// collection client-side, so the clamping here is the only guard against
/// unbounded result sets.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_dir: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

impl ListParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }

    pub fn sort_dir(&self) -> SortDir {
        match self.sort_dir.as_deref() {
            Some("asc") | Some("ASC") => SortDir::Asc,
            _ => SortDir::Desc,
        }
    }

    /// Resolves the requested sort column against a whitelist. Anything not
    /// on the list falls back to the first entry, which keeps user input out
    /// of the ORDER BY clause entirely.
    pub fn sort_column<'a>(&self, allowed: &[&'a str]) -> &'a str {
        match self.sort_by.as_deref() {
            Some(requested) => allowed
                .iter()
                .find(|col| **col == requested)
                .copied()
                .unwrap_or(allowed[0]),
            None => allowed[0],
        }
    }

    /// Trimmed search term, or None when the box was empty.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page(),
            per_page: params.per_page(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<i64>, per_page: Option<i64>) -> ListParams {
        ListParams {
            page,
            per_page,
            ..Default::default()
        }
    }

    #[test]
    fn page_and_per_page_are_clamped() {
        assert_eq!(params(None, None).page(), 1);
        assert_eq!(params(Some(0), None).page(), 1);
        assert_eq!(params(Some(-3), None).page(), 1);
        assert_eq!(params(None, None).per_page(), 20);
        assert_eq!(params(None, Some(0)).per_page(), 1);
        assert_eq!(params(None, Some(1000)).per_page(), 100);
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(params(Some(1), Some(25)).offset(), 0);
        assert_eq!(params(Some(3), Some(25)).offset(), 50);
    }

    #[test]
    fn sort_column_rejects_unlisted_input() {
        let allowed = ["created_at", "guest_name"];
        let mut p = ListParams::default();
        assert_eq!(p.sort_column(&allowed), "created_at");

        p.sort_by = Some("guest_name".to_string());
        assert_eq!(p.sort_column(&allowed), "guest_name");

        p.sort_by = Some("guest_name; DROP TABLE bookings".to_string());
        assert_eq!(p.sort_column(&allowed), "created_at");
    }

    #[test]
    fn search_term_is_trimmed_and_wrapped() {
        let mut p = ListParams::default();
        assert_eq!(p.search_term(), None);

        p.search = Some("   ".to_string());
        assert_eq!(p.search_term(), None);

        p.search = Some(" ravi ".to_string());
        assert_eq!(p.search_term(), Some("%ravi%".to_string()));
    }
}

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::records::RecordKind;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Largest page the backend serves; used when walking every page.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("From date {from} is after To date {to}")]
    InvertedRange { from: NaiveDate, to: NaiveDate },
}

/// Filters and paging of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Id of the kind's filter lookup (shop, vehicle or employee)
    pub lookup_id: Option<u64>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ListQuery {
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
            search: None,
            from: None,
            to: None,
            lookup_id: None,
        }
    }

    pub fn set_search(&mut self, search: &str) {
        let search = search.trim();
        self.search = (!search.is_empty()).then(|| search.to_string());
        self.page = 1;
    }

    pub fn set_range(
        &mut self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<(), FilterError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(FilterError::InvertedRange { from, to });
            }
        }
        self.from = from;
        self.to = to;
        self.page = 1;
        Ok(())
    }

    pub fn set_lookup(&mut self, id: Option<u64>) {
        self.lookup_id = id;
        self.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.search = None;
        self.from = None;
        self.to = None;
        self.lookup_id = None;
        self.page = 1;
    }

    pub fn has_filters(&self) -> bool {
        self.search.is_some() || self.from.is_some() || self.to.is_some() || self.lookup_id.is_some()
    }

    /// Query string pairs for `kind`; unset filters are left out.
    pub fn to_params(&self, kind: RecordKind) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("limit", self.per_page.to_string()),
        ];
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if let Some(from) = self.from {
            params.push(("fromDate", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            params.push(("toDate", to.format("%Y-%m-%d").to_string()));
        }
        if let (Some(id), Some(lookup)) = (self.lookup_id, kind.filter_lookup()) {
            params.push((lookup.filter_param(), id.to_string()));
        }
        params
    }

    /// Short human description of the active filters, for the status line.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(search) = &self.search {
            parts.push(format!("search \"{search}\""));
        }
        match (self.from, self.to) {
            (Some(from), Some(to)) => parts.push(format!("{from} to {to}")),
            (Some(from), None) => parts.push(format!("from {from}")),
            (None, Some(to)) => parts.push(format!("until {to}")),
            (None, None) => {}
        }
        if let Some(id) = self.lookup_id {
            parts.push(format!("#{id}"));
        }
        parts.join(", ")
    }
}

/// One page of a list response
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// A list response as sent by the backend. Paging fields it leaves out are
/// taken from the query that was sent.
#[derive(Debug, Deserialize)]
pub struct PageBody<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl<T> PageBody<T> {
    pub fn into_page(self, query: &ListQuery) -> Page<T> {
        let page = self.page.unwrap_or(query.page).max(1);
        let limit = self.limit.unwrap_or(query.per_page).max(1);
        // without a total, a full page means another one may follow
        let total = self.total.unwrap_or_else(|| {
            let seen = u64::from(page - 1) * u64::from(limit) + self.data.len() as u64;
            if self.data.len() as u64 >= u64::from(limit) {
                seen + 1
            } else {
                seen
            }
        });
        Page {
            data: self.data,
            total,
            page,
            limit,
        }
    }
}

impl<T> Page<T> {
    pub fn page_count(&self) -> u32 {
        let limit = u64::from(self.limit.max(1));
        (self.total.div_ceil(limit)).max(1) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn params_skip_unset_filters() {
        let query = ListQuery::default();
        assert_eq!(
            query.to_params(RecordKind::AdibReport),
            vec![("page", "1".to_string()), ("limit", "10".to_string())]
        );
    }

    #[test]
    fn params_use_the_kind_lookup() {
        let mut query = ListQuery::new(25);
        query.set_search("  diesel ");
        query.set_range(Some(date(2024, 1, 1)), Some(date(2024, 1, 31))).unwrap();
        query.set_lookup(Some(7));

        let params = query.to_params(RecordKind::FuelBill);
        assert!(params.contains(&("search", "diesel".to_string())));
        assert!(params.contains(&("fromDate", "2024-01-01".to_string())));
        assert!(params.contains(&("toDate", "2024-01-31".to_string())));
        assert!(params.contains(&("vehicleId", "7".to_string())));

        // accommodation bills have no lookup filter
        let params = query.to_params(RecordKind::AccommodationBill);
        assert!(params.iter().all(|(k, _)| !k.ends_with("Id")));
    }

    #[test]
    fn filter_changes_reset_the_page() {
        let mut query = ListQuery::default();
        query.page = 4;
        query.set_search("rent");
        assert_eq!(query.page, 1);

        query.page = 3;
        query.set_lookup(Some(2));
        assert_eq!(query.page, 1);

        query.page = 2;
        query.clear_filters();
        assert_eq!(query.page, 1);
        assert!(!query.has_filters());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut query = ListQuery::default();
        query.page = 5;
        let err = query
            .set_range(Some(date(2024, 3, 1)), Some(date(2024, 2, 1)))
            .unwrap_err();
        assert!(matches!(err, FilterError::InvertedRange { .. }));
        assert_eq!(query.from, None);
        assert_eq!(query.page, 5);
    }

    fn decode(body: &str, query: &ListQuery) -> Page<u8> {
        serde_json::from_str::<PageBody<u8>>(body)
            .unwrap()
            .into_page(query)
    }

    #[test]
    fn page_maths() {
        let page = decode(r#"{"data":[1,2],"total":21,"page":3,"limit":10}"#, &ListQuery::default());
        assert_eq!(page.page_count(), 3);
        assert!(!page.has_next());

        let empty = decode(r#"{"data":[]}"#, &ListQuery::default());
        assert_eq!(empty.page_count(), 1);
        assert!(!empty.has_next());
    }

    #[test]
    fn missing_paging_fields_come_from_the_query() {
        let mut query = ListQuery::new(25);
        query.page = 2;

        let page = decode(r#"{"data":[1,2,3],"total":60}"#, &query);
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 25);
        assert_eq!(page.page_count(), 3);
        assert!(page.has_next());

        // server values win when present
        let page = decode(r#"{"data":[1],"total":60,"page":3,"limit":20}"#, &query);
        assert_eq!((page.page, page.limit), (3, 20));
    }

    #[test]
    fn missing_total_is_estimated_from_the_data() {
        let mut query = ListQuery::new(2);
        query.page = 3;
        let full = decode(r#"{"data":[1,2]}"#, &query);
        assert!(full.has_next());

        let short = decode(r#"{"data":[1]}"#, &query);
        assert_eq!(short.total, 5);
        assert!(!short.has_next());
    }
}

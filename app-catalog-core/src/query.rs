//! Catalog queries and their lookup-service form

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Result ordering requested from the lookup service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Filter criteria for [`AppCatalog::find_apps`](crate::AppCatalog::find_apps)
///
/// Every field is optional; an empty query matches every listing the
/// service is willing to return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCatalogQuery {
    pub domain: Option<String>,
    pub publisher: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub sort_order: Option<SortOrder>,
    /// First day (inclusive) of the release window
    pub start_date: Option<NaiveDate>,
    /// Last day (inclusive) of the release window
    pub end_date: Option<NaiveDate>,
}

impl AppCatalogQuery {
    pub fn builder() -> AppCatalogQueryBuilder {
        AppCatalogQueryBuilder::default()
    }
}

/// Builder for [`AppCatalogQuery`]
#[derive(Debug, Clone, Default)]
pub struct AppCatalogQueryBuilder {
    query: AppCatalogQuery,
}

impl AppCatalogQueryBuilder {
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.query.domain = Some(domain.into());
        self
    }

    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.query.publisher = Some(publisher.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.query.name = Some(name.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.query.category = Some(category.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.query.skip = Some(skip);
        self
    }

    pub fn sort_order(mut self, order: SortOrder) -> Self {
        self.query.sort_order = Some(order);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.query.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.query.end_date = Some(date);
        self
    }

    pub fn build(self) -> AppCatalogQuery {
        self.query
    }
}

/// The query object sent to the lookup service
///
/// Absent criteria are omitted from the JSON entirely. Date bounds are
/// widened to whole UTC days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    skip: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort_order: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
}

impl LookupQuery {
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn publisher(&self) -> Option<&str> {
        self.publisher.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn tags(&self) -> Option<&[String]> {
        self.tags.as_deref()
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn skip(&self) -> Option<u32> {
        self.skip
    }

    pub fn sort_order(&self) -> Option<SortOrder> {
        self.sort_order
    }

    pub fn start_date(&self) -> Option<&str> {
        self.start_date.as_deref()
    }

    pub fn end_date(&self) -> Option<&str> {
        self.end_date.as_deref()
    }
}

impl From<&AppCatalogQuery> for LookupQuery {
    fn from(query: &AppCatalogQuery) -> Self {
        Self {
            domain: query.domain.clone(),
            publisher: query.publisher.clone(),
            name: query.name.clone(),
            category: query.category.clone(),
            tags: query.tags.clone().filter(|tags| !tags.is_empty()),
            limit: query.limit,
            skip: query.skip,
            sort_order: query.sort_order,
            start_date: query.start_date.map(start_of_day),
            end_date: query.end_date.map(end_of_day),
        }
    }
}

fn start_of_day(date: NaiveDate) -> String {
    format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"))
}

fn end_of_day(date: NaiveDate) -> String {
    format!("{}T23:59:59.999Z", date.format("%Y-%m-%d"))
}

/// Options for [`AppCatalog::find_apps`](crate::AppCatalog::find_apps)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindOptions {
    /// Keep each listing's proof bundle so it can be updated or removed later
    pub include_beef: bool,

    /// Skip listings whose token does not decode instead of failing the query
    pub skip_malformed: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            include_beef: true,
            skip_malformed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_date_range_widens_to_whole_days() {
        let query = AppCatalogQuery::builder()
            .start_date(date("2024-01-01"))
            .end_date(date("2024-01-31"))
            .build();

        let lookup = LookupQuery::from(&query);
        assert_eq!(lookup.start_date(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(lookup.end_date(), Some("2024-01-31T23:59:59.999Z"));
    }

    #[test]
    fn test_empty_query_serializes_to_empty_object() {
        let lookup = LookupQuery::from(&AppCatalogQuery::default());
        assert_eq!(serde_json::to_value(&lookup).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_only_present_fields_are_sent() {
        let query = AppCatalogQuery::builder()
            .domain("x.com")
            .tags(["games", "social"])
            .limit(10)
            .sort_order(SortOrder::Desc)
            .build();

        assert_eq!(
            serde_json::to_value(LookupQuery::from(&query)).unwrap(),
            serde_json::json!({
                "domain": "x.com",
                "tags": ["games", "social"],
                "limit": 10,
                "sortOrder": "desc"
            })
        );
    }

    #[test]
    fn test_empty_tags_are_dropped() {
        let query = AppCatalogQuery::builder()
            .tags(Vec::<String>::new())
            .build();
        assert_eq!(LookupQuery::from(&query).tags(), None);
    }

    #[test]
    fn test_query_deserializes_from_camel_case() {
        let query: AppCatalogQuery = serde_json::from_value(serde_json::json!({
            "publisher": "02abc",
            "startDate": "2024-02-01",
            "sortOrder": "asc"
        }))
        .unwrap();
        assert_eq!(query.publisher.as_deref(), Some("02abc"));
        assert_eq!(query.start_date, Some(date("2024-02-01")));
        assert_eq!(query.sort_order, Some(SortOrder::Asc));
    }

    #[test]
    fn test_find_options_include_beef_by_default() {
        let options = FindOptions::default();
        assert!(options.include_beef);
        assert!(!options.skip_malformed);
    }
}

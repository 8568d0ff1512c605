//! Filter predicate engine
//!
//! A filter descriptor is the persisted, wire-compatible description of
//! one column's active filter. `FilterDescriptor::passes` evaluates it
//! against a resolved cell value. Malformed input fails open: a value
//! the filter cannot interpret never hides a row.

use ahash::AHashMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::column::ColumnDef;
use crate::value::{as_number, display_string, is_blank, resolve_field};

/// Mapping from column id to that column's active filter.
///
/// Absence of a key means "no filter on this column".
pub type FilterModel = AHashMap<String, FilterDescriptor>;

/// Text filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextFilterOp {
    Contains,
    NotContains,
    Equals,
    NotEqual,
    StartsWith,
    EndsWith,
    Blank,
    NotBlank,
}

/// Number filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NumberFilterOp {
    Equals,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    InRange,
    Blank,
    NotBlank,
}

/// Date filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateFilterOp {
    Equals,
    NotEqual,
    LessThan,
    GreaterThan,
    InRange,
    Blank,
    NotBlank,
}

/// Case-insensitive text filter over string-coerced values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFilter {
    #[serde(rename = "type")]
    pub op: TextFilterOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Number filter; `filter_to` is only consulted by `InRange`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberFilter {
    #[serde(rename = "type")]
    pub op: NumberFilterOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<f64>,
    #[serde(
        rename = "filterTo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub filter_to: Option<f64>,
}

/// Set filter: a value passes iff its string form is in `values`.
/// `None` in the list stands for the null/missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetFilter {
    pub values: Vec<Option<String>>,
}

/// Date filter over ISO `YYYY-MM-DD` cell values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFilter {
    #[serde(rename = "type")]
    pub op: DateFilterOp,
    #[serde(
        rename = "dateFrom",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub date_from: Option<NaiveDate>,
    #[serde(rename = "dateTo", default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
}

/// One column's filter, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filterType", rename_all = "lowercase")]
pub enum FilterDescriptor {
    Text(TextFilter),
    Number(NumberFilter),
    Set(SetFilter),
    Date(DateFilter),
}

impl FilterDescriptor {
    /// Evaluate this filter against a resolved cell value.
    pub fn passes(&self, value: Option<&Value>) -> bool {
        match self {
            FilterDescriptor::Text(f) => f.passes(value),
            FilterDescriptor::Number(f) => f.passes(value),
            FilterDescriptor::Set(f) => f.passes(value),
            FilterDescriptor::Date(f) => f.passes(value),
        }
    }
}

impl TextFilter {
    pub fn passes(&self, value: Option<&Value>) -> bool {
        match self.op {
            TextFilterOp::Blank => return is_blank(value),
            TextFilterOp::NotBlank => return !is_blank(value),
            _ => {}
        }

        // A comparison operator with no comparison text is inactive.
        let needle = match self.filter.as_deref() {
            Some(s) if !s.is_empty() => s.to_lowercase(),
            _ => return true,
        };
        let haystack = display_string(value).to_lowercase();

        match self.op {
            TextFilterOp::Contains => haystack.contains(&needle),
            TextFilterOp::NotContains => !haystack.contains(&needle),
            TextFilterOp::Equals => haystack == needle,
            TextFilterOp::NotEqual => haystack != needle,
            TextFilterOp::StartsWith => haystack.starts_with(&needle),
            TextFilterOp::EndsWith => haystack.ends_with(&needle),
            TextFilterOp::Blank | TextFilterOp::NotBlank => unreachable!(),
        }
    }
}

impl NumberFilter {
    pub fn passes(&self, value: Option<&Value>) -> bool {
        match self.op {
            NumberFilterOp::Blank => return is_blank(value),
            NumberFilterOp::NotBlank => return !is_blank(value),
            _ => {}
        }

        // Non-numeric cell values and incomplete descriptors fail open.
        let (num, bound) = match (as_number(value), self.filter) {
            (Some(n), Some(b)) => (n, b),
            _ => return true,
        };

        match self.op {
            NumberFilterOp::Equals => num == bound,
            NumberFilterOp::NotEqual => num != bound,
            NumberFilterOp::GreaterThan => num > bound,
            NumberFilterOp::GreaterThanOrEqual => num >= bound,
            NumberFilterOp::LessThan => num < bound,
            NumberFilterOp::LessThanOrEqual => num <= bound,
            NumberFilterOp::InRange => num >= bound && num <= self.filter_to.unwrap_or(bound),
            NumberFilterOp::Blank | NumberFilterOp::NotBlank => unreachable!(),
        }
    }
}

impl SetFilter {
    pub fn passes(&self, value: Option<&Value>) -> bool {
        // Empty selection hides everything.
        if self.values.is_empty() {
            return false;
        }

        let key = value.map(|v| display_string(Some(v)));
        self.values.contains(&key)
    }
}

impl DateFilter {
    pub fn passes(&self, value: Option<&Value>) -> bool {
        match self.op {
            DateFilterOp::Blank => return is_blank(value),
            DateFilterOp::NotBlank => return !is_blank(value),
            _ => {}
        }

        // Unparseable cell values fail open, same policy as numbers.
        let cell = match value.and_then(|v| v.as_str()) {
            Some(s) => match s.parse::<NaiveDate>() {
                Ok(d) => d,
                Err(_) => return true,
            },
            None => return true,
        };
        let from = match self.date_from {
            Some(d) => d,
            None => return true,
        };

        match self.op {
            DateFilterOp::Equals => cell == from,
            DateFilterOp::NotEqual => cell != from,
            DateFilterOp::LessThan => cell < from,
            DateFilterOp::GreaterThan => cell > from,
            DateFilterOp::InRange => cell >= from && cell <= self.date_to.unwrap_or(from),
            DateFilterOp::Blank | DateFilterOp::NotBlank => unreachable!(),
        }
    }
}

/// Quick-filter match: a row passes iff any visible column's
/// string-coerced field value contains the needle, case-insensitively.
pub fn row_matches_quick_filter(row: &Value, columns: &[ColumnDef], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    columns.iter().any(|col| {
        if col.hide {
            return false;
        }
        let value = col
            .field
            .as_deref()
            .and_then(|field| resolve_field(row, field));
        display_string(value).to_lowercase().contains(&needle)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(op: TextFilterOp, filter: &str) -> TextFilter {
        TextFilter {
            op,
            filter: Some(filter.to_string()),
        }
    }

    fn number(op: NumberFilterOp, filter: f64) -> NumberFilter {
        NumberFilter {
            op,
            filter: Some(filter),
            filter_to: None,
        }
    }

    #[test]
    fn text_operators() {
        let v = json!("Hello World");
        assert!(text(TextFilterOp::Contains, "world").passes(Some(&v)));
        assert!(!text(TextFilterOp::NotContains, "world").passes(Some(&v)));
        assert!(text(TextFilterOp::Equals, "hello world").passes(Some(&v)));
        assert!(text(TextFilterOp::StartsWith, "hell").passes(Some(&v)));
        assert!(text(TextFilterOp::EndsWith, "rld").passes(Some(&v)));
        assert!(text(TextFilterOp::NotEqual, "bye").passes(Some(&v)));
    }

    #[test]
    fn text_blank_ignores_comparison_value() {
        let blank = TextFilter {
            op: TextFilterOp::Blank,
            filter: Some("ignored".to_string()),
        };
        assert!(blank.passes(None));
        assert!(blank.passes(Some(&json!(""))));
        assert!(!blank.passes(Some(&json!("x"))));
    }

    #[test]
    fn text_without_comparison_value_is_inactive() {
        let f = TextFilter {
            op: TextFilterOp::Contains,
            filter: None,
        };
        assert!(f.passes(Some(&json!("anything"))));
    }

    #[test]
    fn number_operators() {
        assert!(number(NumberFilterOp::GreaterThan, 26.0).passes(Some(&json!(30))));
        assert!(!number(NumberFilterOp::GreaterThan, 26.0).passes(Some(&json!(25))));
        assert!(number(NumberFilterOp::LessThanOrEqual, 25.0).passes(Some(&json!(25))));
        assert!(number(NumberFilterOp::NotEqual, 25.0).passes(Some(&json!(30))));
    }

    #[test]
    fn number_in_range_defaults_missing_upper_bound() {
        let f = NumberFilter {
            op: NumberFilterOp::InRange,
            filter: Some(10.0),
            filter_to: Some(20.0),
        };
        assert!(f.passes(Some(&json!(15))));
        assert!(!f.passes(Some(&json!(25))));

        let degenerate = NumberFilter {
            op: NumberFilterOp::InRange,
            filter: Some(10.0),
            filter_to: None,
        };
        assert!(degenerate.passes(Some(&json!(10))));
        assert!(!degenerate.passes(Some(&json!(11))));
    }

    #[test]
    fn number_fails_open_on_non_numeric_values() {
        let f = number(NumberFilterOp::GreaterThan, 5.0);
        assert!(f.passes(Some(&json!("not a number"))));
        assert!(f.passes(None));
        assert!(f.passes(Some(&json!("26"))));
        assert!(!f.passes(Some(&json!("4"))));
    }

    #[test]
    fn set_filter_membership_and_null() {
        let f = SetFilter {
            values: vec![Some("a".to_string()), None],
        };
        assert!(f.passes(Some(&json!("a"))));
        assert!(!f.passes(Some(&json!("b"))));
        assert!(f.passes(None));
    }

    #[test]
    fn set_filter_empty_selection_hides_everything() {
        let f = SetFilter { values: vec![] };
        assert!(!f.passes(Some(&json!("a"))));
        assert!(!f.passes(None));
    }

    #[test]
    fn date_operators() {
        let d = |s: &str| s.parse::<NaiveDate>().unwrap();
        let f = DateFilter {
            op: DateFilterOp::InRange,
            date_from: Some(d("2024-01-01")),
            date_to: Some(d("2024-06-30")),
        };
        assert!(f.passes(Some(&json!("2024-03-15"))));
        assert!(!f.passes(Some(&json!("2024-07-01"))));

        let eq = DateFilter {
            op: DateFilterOp::Equals,
            date_from: Some(d("2024-01-01")),
            date_to: None,
        };
        assert!(eq.passes(Some(&json!("2024-01-01"))));
        assert!(!eq.passes(Some(&json!("2024-01-02"))));
        // Unparseable dates fail open.
        assert!(eq.passes(Some(&json!("yesterday"))));
    }

    #[test]
    fn descriptor_wire_format_round_trips() {
        let descriptor = FilterDescriptor::Number(NumberFilter {
            op: NumberFilterOp::GreaterThan,
            filter: Some(26.0),
            filter_to: None,
        });
        let wire = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            wire,
            json!({ "filterType": "number", "type": "greaterThan", "filter": 26.0 })
        );
        let back: FilterDescriptor = serde_json::from_value(wire).unwrap();
        assert_eq!(back, descriptor);
    }

    #[test]
    fn quick_filter_matches_any_visible_column() {
        let columns = vec![
            ColumnDef::new("name"),
            ColumnDef::new("age"),
            ColumnDef {
                hide: true,
                ..ColumnDef::new("secret")
            },
        ];
        let row = json!({ "name": "Ann", "age": 25, "secret": "zzz" });
        assert!(row_matches_quick_filter(&row, &columns, "an"));
        assert!(row_matches_quick_filter(&row, &columns, "25"));
        assert!(!row_matches_quick_filter(&row, &columns, "zzz"));
    }
}

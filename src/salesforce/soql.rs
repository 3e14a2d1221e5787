//! SOQL text assembly.
//!
//! Values are quoted but never escaped: callers only pass record ids, which
//! cannot contain quotes. Names and labels are never put into a query.

/// Predicate part of a query.
#[derive(Debug, Clone, Copy)]
pub enum WhereClause<'a> {
    /// Predicates joined with `AND`, in order.
    All(&'a [String]),
    /// A pre-joined clause used verbatim.
    Raw(&'a str),
}

impl<'a> From<&'a [String]> for WhereClause<'a> {
    fn from(predicates: &'a [String]) -> Self {
        WhereClause::All(predicates)
    }
}

impl<'a> From<&'a Vec<String>> for WhereClause<'a> {
    fn from(predicates: &'a Vec<String>) -> Self {
        WhereClause::All(predicates)
    }
}

impl<'a> From<&'a str> for WhereClause<'a> {
    fn from(clause: &'a str) -> Self {
        WhereClause::Raw(clause)
    }
}

impl<'a> From<&'a String> for WhereClause<'a> {
    fn from(clause: &'a String) -> Self {
        WhereClause::Raw(clause)
    }
}

/// Build `select <fields> from <object> [where ..] [order by ..] [limit n]`.
///
/// An empty predicate list or empty raw clause leaves out the `where` part.
pub fn generate_query<'a, S: AsRef<str>>(
    fields: &[S],
    object_name: &str,
    where_clause: Option<WhereClause<'a>>,
    order_clause: Option<&str>,
    limit: Option<usize>,
) -> String {
    let fields = fields
        .iter()
        .map(|field| field.as_ref())
        .collect::<Vec<&str>>()
        .join(",");
    let mut parts = vec!["select".to_string(), fields, format!("from {}", object_name)];

    match where_clause {
        Some(WhereClause::All(predicates)) if !predicates.is_empty() => {
            parts.push(format!("where {}", predicates.join(" AND ")));
        }
        Some(WhereClause::Raw(clause)) if !clause.is_empty() => {
            parts.push(format!("where {}", clause));
        }
        _ => {}
    }

    if let Some(order) = order_clause.filter(|order| !order.is_empty()) {
        parts.push(format!("order by {}", order));
    }

    if let Some(limit) = limit.filter(|limit| *limit > 0) {
        parts.push(format!("limit {}", limit));
    }

    parts.join(" ")
}

pub fn quote_string(value: &str) -> String {
    format!("'{}'", value)
}

pub fn quote_strings<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values.iter().map(|value| quote_string(value.as_ref())).collect()
}

/// `field in ('a','b')`, or `None` when there is nothing to match.
pub fn in_clause<S: AsRef<str>>(field: &str, values: &[S]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    Some(format!("{} in ({})", field, quote_strings(values).join(",")))
}

//! Ambient main-query inheritance.
//!
//! A block configured to inherit takes its scope from the query the
//! surrounding template is already answering (an archive page, a search
//! results page, an author listing). Scalar constraints are replaced;
//! taxonomy clauses are merged. The separate replace-wholesale path for the
//! taxonomy *filter configuration* lives in `extension` and must not be
//! conflated with this one.

use serde::{Deserialize, Serialize};

use crate::query::{QueryArguments, TaxClause, TaxQuery, TaxQueryRelation};

/// Snapshot of the page's own main query, supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientQuery {
    pub post_type: Option<String>,

    /// Taxonomy constraints already active on the page (e.g. the term of a
    /// term-archive page).
    pub tax_clauses: Vec<TaxClause>,

    pub author: Option<u64>,

    pub search: Option<String>,

    pub year: Option<u32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

/// Override `args` with the ambient query's constraints.
///
/// Post type, author, date constraints and search are replaced when the
/// ambient query carries them; taxonomy clauses are appended to whatever the
/// block's own filters produced. A block with its own search feature keeps
/// its search term (`own_search`).
pub fn apply_ambient_query(args: &mut QueryArguments, ambient: &AmbientQuery, own_search: bool) {
    if let Some(post_type) = &ambient.post_type {
        args.post_type = post_type.clone();
    }
    if ambient.author.is_some() {
        args.author = ambient.author;
    }
    if !own_search && ambient.search.is_some() {
        args.search = ambient.search.clone();
    }
    if ambient.year.is_some() {
        args.year = ambient.year;
    }
    if ambient.month.is_some() {
        args.month = ambient.month;
    }
    if ambient.day.is_some() {
        args.day = ambient.day;
    }

    if !ambient.tax_clauses.is_empty() {
        match &mut args.tax_query {
            Some(tax_query) => tax_query.queries.extend(ambient.tax_clauses.iter().cloned()),
            None => {
                args.tax_query = Some(TaxQuery::new(
                    TaxQueryRelation::And,
                    ambient.tax_clauses.clone(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> QueryArguments {
        QueryArguments {
            post_type: "article".to_string(),
            posts_per_page: 10,
            ..QueryArguments::default()
        }
    }

    #[test]
    fn scalars_are_replaced() {
        let mut args = args();
        let ambient = AmbientQuery {
            post_type: Some("event".to_string()),
            author: Some(12),
            year: Some(2024),
            month: Some(6),
            day: Some(30),
            ..AmbientQuery::default()
        };

        apply_ambient_query(&mut args, &ambient, false);

        assert_eq!(args.post_type, "event");
        assert_eq!(args.author, Some(12));
        assert_eq!(args.year, Some(2024));
        assert_eq!(args.month, Some(6));
        assert_eq!(args.day, Some(30));
    }

    #[test]
    fn absent_ambient_fields_leave_args_alone() {
        let mut args = args();
        args.author = Some(3);

        apply_ambient_query(&mut args, &AmbientQuery::default(), false);

        assert_eq!(args.post_type, "article");
        assert_eq!(args.author, Some(3));
    }

    #[test]
    fn ambient_search_fills_in_when_the_block_has_none() {
        let mut args = args();
        let ambient = AmbientQuery {
            search: Some("festival".to_string()),
            ..AmbientQuery::default()
        };

        apply_ambient_query(&mut args, &ambient, false);
        assert_eq!(args.search.as_deref(), Some("festival"));
    }

    #[test]
    fn block_search_wins_over_ambient_search() {
        let mut args = args();
        args.search = Some("local".to_string());
        let ambient = AmbientQuery {
            search: Some("festival".to_string()),
            ..AmbientQuery::default()
        };

        apply_ambient_query(&mut args, &ambient, true);
        assert_eq!(args.search.as_deref(), Some("local"));
    }

    #[test]
    fn tax_clauses_merge_with_existing_ones() {
        let mut args = args();
        args.tax_query = Some(TaxQuery::new(
            TaxQueryRelation::And,
            vec![TaxClause::terms("category", vec![1], true)],
        ));
        let ambient = AmbientQuery {
            tax_clauses: vec![TaxClause::terms("topic", vec![9], true)],
            ..AmbientQuery::default()
        };

        apply_ambient_query(&mut args, &ambient, false);

        let tax_query = args.tax_query.unwrap();
        assert_eq!(tax_query.relation, TaxQueryRelation::And);
        assert_eq!(tax_query.queries.len(), 2);
        assert_eq!(tax_query.queries[1].taxonomy, "topic");
    }

    #[test]
    fn tax_clauses_apply_without_existing_ones() {
        let mut args = args();
        let ambient = AmbientQuery {
            tax_clauses: vec![TaxClause::terms("topic", vec![9], true)],
            ..AmbientQuery::default()
        };

        apply_ambient_query(&mut args, &ambient, false);

        let tax_query = args.tax_query.unwrap();
        assert_eq!(tax_query.relation, TaxQueryRelation::And);
        assert_eq!(tax_query.queries.len(), 1);
    }
}

//! Rendering of store filters and sort orders into Postgres SQL.
//!
//! Structured-field paths compare as JSONB via `fields #> path`, so a
//! filter on `isHomepage = true` only matches a stored JSON `true`. Against
//! the published copy the same paths are read from `published_data`, where
//! structured fields sit at the top level next to title, slug and status.

use pagesync_core::store::{FieldRef, Sort, SortField, Where};
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

/// Which copy of a page a query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCopy {
    Working,
    Published,
}

impl PageCopy {
    fn text_column(self, column: &'static str) -> &'static str {
        match (self, column) {
            (PageCopy::Working, _) => column,
            (PageCopy::Published, "title") => "(published_data ->> 'title')",
            (PageCopy::Published, "slug") => "(published_data ->> 'slug')",
            (PageCopy::Published, "status") => "(published_data ->> 'status')",
            (PageCopy::Published, "updated_at") => "published_at",
            (PageCopy::Published, _) => column,
        }
    }

    fn fields_column(self) -> &'static str {
        match self {
            PageCopy::Working => "fields",
            PageCopy::Published => "published_data",
        }
    }
}

/// Append `filter` over `copy` as a boolean SQL expression.
pub fn push_where(builder: &mut QueryBuilder<'_, Postgres>, filter: &Where, copy: PageCopy) {
    match filter {
        Where::And(clauses) if clauses.is_empty() => {
            builder.push("TRUE");
        }
        Where::And(clauses) => {
            builder.push("(");
            for (i, clause) in clauses.iter().enumerate() {
                if i > 0 {
                    builder.push(" AND ");
                }
                push_where(builder, clause, copy);
            }
            builder.push(")");
        }
        Where::Equals(field, value) => push_comparison(builder, field, value, false, copy),
        Where::NotEquals(field, value) => push_comparison(builder, field, value, true, copy),
    }
}

fn push_comparison(
    builder: &mut QueryBuilder<'_, Postgres>,
    field: &FieldRef,
    value: &Value,
    negated: bool,
    copy: PageCopy,
) {
    let column = match field {
        FieldRef::Id => {
            match value.as_i64() {
                Some(id) => {
                    builder.push(if negated { "id <> " } else { "id = " });
                    builder.push_bind(id);
                }
                None => {
                    builder.push(if negated { "TRUE" } else { "FALSE" });
                }
            }
            return;
        }
        FieldRef::Title => copy.text_column("title"),
        FieldRef::Slug => copy.text_column("slug"),
        FieldRef::Status => copy.text_column("status"),
        FieldRef::Field(path) => {
            let segments: Vec<String> = path.split('.').map(str::to_string).collect();
            builder.push(copy.fields_column());
            builder.push(" #> ");
            builder.push_bind(segments);
            builder.push(if negated {
                "::text[] IS DISTINCT FROM "
            } else {
                "::text[] = "
            });
            builder.push_bind(value.clone());
            builder.push("::jsonb");
            return;
        }
    };

    // Text columns only ever equal a JSON string.
    match value.as_str() {
        Some(text) => {
            builder.push(column);
            builder.push(if negated { " <> " } else { " = " });
            builder.push_bind(text.to_string());
        }
        None => {
            builder.push(if negated { "TRUE" } else { "FALSE" });
        }
    }
}

/// Append an `ORDER BY` clause with `id` as the tie-breaker.
pub fn push_order_by(builder: &mut QueryBuilder<'_, Postgres>, sort: Sort, copy: PageCopy) {
    let column = match sort.field {
        SortField::CreatedAt => "created_at",
        SortField::UpdatedAt => copy.text_column("updated_at"),
        SortField::Title => copy.text_column("title"),
        SortField::Slug => copy.text_column("slug"),
    };
    let direction = if sort.descending { "DESC" } else { "ASC" };
    builder.push(format!(" ORDER BY {column} {direction}, id {direction}"));
}

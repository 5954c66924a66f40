//! Catalog query view (C8, §4.8): a typed, chainable projection over the
//! FASTA catalog by name, supporting `sort`, `filter`, `reset`, positional
//! access and substring (name) membership tests.

use crate::catalog::{Catalog, FastaRow};
use crate::error::Result;

/// What column to order by (§4.8 `sort(by, reverse)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Name,
    Length,
}

impl SortKey {
    fn column(self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Length => "slen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Cmp {
    fn sql_op(self) -> &'static str {
        match self {
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Gt => ">",
            Cmp::Ge => ">=",
            Cmp::Eq => "=",
        }
    }
}

/// One `filter()` condition (§4.8): a comparison against `length`, or a
/// `LIKE` pattern against `name`. Conditions are ANDed together.
#[derive(Debug, Clone)]
pub enum Condition {
    Length(Cmp, u64),
    NameLike(String),
}

/// A chainable, SQL-backed projection over the `seq` table. Each call to
/// `sort`/`filter`/`reset` rewrites the underlying `ORDER BY`/`WHERE`
/// clause; operations are commutative in their effect on the final query,
/// satisfying §4.8's composability requirement.
pub struct View<'c> {
    catalog: &'c Catalog,
    sort_key: SortKey,
    reverse: bool,
    conditions: Vec<Condition>,
}

impl<'c> View<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        View {
            catalog,
            sort_key: SortKey::Id,
            reverse: false,
            conditions: Vec::new(),
        }
    }

    pub fn sort(mut self, by: SortKey, reverse: bool) -> Self {
        self.sort_key = by;
        self.reverse = reverse;
        self
    }

    pub fn filter(mut self, cond: Condition) -> Self {
        self.conditions.push(cond);
        self
    }

    /// Drops every filter and resets ordering to catalog (id) order,
    /// restoring the full count (§4.8 `reset()`).
    pub fn reset(mut self) -> Self {
        self.conditions.clear();
        self.sort_key = SortKey::Id;
        self.reverse = false;
        self
    }

    fn where_sql_and_params(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        if self.conditions.is_empty() {
            return (String::new(), Vec::new());
        }
        let mut clauses = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        for cond in &self.conditions {
            match cond {
                Condition::Length(cmp, v) => {
                    clauses.push(format!("slen {} ?", cmp.sql_op()));
                    params.push(Box::new(*v as i64));
                }
                Condition::NameLike(pattern) => {
                    clauses.push("name LIKE ?".to_string());
                    params.push(Box::new(pattern.clone()));
                }
            }
        }
        (format!("WHERE {}", clauses.join(" AND ")), params)
    }

    fn order_sql(&self) -> String {
        format!(
            "ORDER BY {} {}",
            self.sort_key.column(),
            if self.reverse { "DESC" } else { "ASC" }
        )
    }

    /// Number of records currently visible through this view.
    pub fn len(&self) -> Result<u64> {
        let (where_sql, params) = self.where_sql_and_params();
        let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        self.catalog.fasta_view_count(&where_sql, &refs)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Random access by position within the current projection (0-based).
    pub fn get(&self, position: u64) -> Result<Option<FastaRow>> {
        let (where_sql, params) = self.where_sql_and_params();
        let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        self.catalog
            .fasta_view_row(&where_sql, &refs, &self.order_sql(), position)
    }

    /// `name ∈ view` substring/membership test (§4.8).
    pub fn contains(&self, name: &str) -> Result<bool> {
        let (mut where_sql, mut params) = self.where_sql_and_params();
        let name_owned = name.to_string();
        if where_sql.is_empty() {
            where_sql = "WHERE name = ?".to_string();
        } else {
            where_sql.push_str(" AND name = ?");
        }
        params.push(Box::new(name_owned));
        let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        Ok(self.catalog.fasta_view_count(&where_sql, &refs)? > 0)
    }

    pub fn iter(&self) -> ViewIter<'_, 'c> {
        ViewIter {
            view: self,
            pos: 0,
        }
    }
}

pub struct ViewIter<'v, 'c> {
    view: &'v View<'c>,
    pos: u64,
}

impl<'v, 'c> Iterator for ViewIter<'v, 'c> {
    type Item = Result<FastaRow>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.view.get(self.pos) {
            Ok(Some(row)) => {
                self.pos += 1;
                Some(Ok(row))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

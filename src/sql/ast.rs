//! Planner-facing AST types
//!
//! These types represent a parsed query in a form that's easier to walk
//! than the sqlparser AST. Every supported node kind is a variant, so the
//! planner dispatches with an exhaustive `match`; syntax without a
//! variant here is rejected while lowering.

/// Identifier with its source quoting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub value: String,
    /// Whether the source wrapped the identifier in quotes
    pub quoted: bool,
}

impl Ident {
    /// Create an unquoted identifier
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: false,
        }
    }

    /// Create an identifier that was quoted in the source
    pub fn quoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quoted: true,
        }
    }

    /// Compare names, ignoring case unless `case_sensitive`
    pub fn matches(&self, other: &str, case_sensitive: bool) -> bool {
        if case_sensitive {
            self.value == other
        } else {
            self.value.eq_ignore_ascii_case(other)
        }
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    /// Numeric literal, kept verbatim
    Number(String),
    /// String literal, already unescaped
    String(String),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// Whether the operator yields a boolean
    pub fn is_predicate(&self) -> bool {
        !self.is_arithmetic()
    }

    /// Whether the operator computes a value rather than a truth value
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Plus
                | BinaryOp::Minus
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo
                | BinaryOp::Concat
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

/// Column reference, optionally qualified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub schema: Option<Ident>,
    pub table: Option<Ident>,
    pub name: Ident,
}

impl ColumnRef {
    /// Unqualified column
    pub fn bare(name: Ident) -> Self {
        Self {
            schema: None,
            table: None,
            name,
        }
    }
}

/// Function call
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Function name as written
    pub name: String,
    pub args: Vec<Expr>,
    pub distinct: bool,
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference
    Column(ColumnRef),
    /// Literal value
    Literal(Literal),
    /// Binary operation
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Unary operation
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// `expr IS [NOT] NULL|TRUE|FALSE`
    Is {
        expr: Box<Expr>,
        value: Literal,
        negated: bool,
    },
    /// `expr [NOT] BETWEEN low AND high`
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// `expr [NOT] IN (list)`
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// `expr [NOT] IN (subquery)`
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Query>,
        negated: bool,
    },
    /// `[NOT] EXISTS (subquery)`
    Exists { subquery: Box<Query>, negated: bool },
    /// Scalar subquery
    Subquery(Box<Query>),
    /// `expr [NOT] LIKE|ILIKE pattern`
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
        case_insensitive: bool,
    },
    /// Function call (aggregate or scalar)
    Function(FunctionCall),
    /// Parenthesized expression
    Nested(Box<Expr>),
    /// `*` inside a function call, as in `COUNT(*)`
    Wildcard,
}

impl Expr {
    /// Name of the node kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Column(_) => "Column",
            Expr::Literal(_) => "Literal",
            Expr::Binary { .. } => "Binary",
            Expr::Unary { .. } => "Unary",
            Expr::Is { .. } => "Is",
            Expr::Between { .. } => "Between",
            Expr::InList { .. } => "InList",
            Expr::InSubquery { .. } => "InSubquery",
            Expr::Exists { .. } => "Exists",
            Expr::Subquery(_) => "Subquery",
            Expr::Like { .. } => "Like",
            Expr::Function(_) => "Function",
            Expr::Nested(_) => "Nested",
            Expr::Wildcard => "Wildcard",
        }
    }

    /// Shorthand for an unqualified column
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::bare(Ident::new(name)))
    }

    /// Collect column references, outermost first.
    ///
    /// Subqueries are opaque: their columns belong to their own scope.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Expr::Column(col) => out.push(col),
            Expr::Literal(_) | Expr::Wildcard | Expr::Exists { .. } | Expr::Subquery(_) => {}
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Unary { expr, .. } | Expr::Nested(expr) | Expr::Is { expr, .. } => {
                expr.collect_columns(out)
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.collect_columns(out);
                low.collect_columns(out);
                high.collect_columns(out);
            }
            Expr::InList { expr, list, .. } => {
                expr.collect_columns(out);
                for item in list {
                    item.collect_columns(out);
                }
            }
            Expr::InSubquery { expr, .. } => expr.collect_columns(out),
            Expr::Like { expr, pattern, .. } => {
                expr.collect_columns(out);
                pattern.collect_columns(out);
            }
            Expr::Function(func) => {
                for arg in &func.args {
                    arg.collect_columns(out);
                }
            }
        }
    }

    /// Copy of this expression with schema and table qualifiers removed
    /// from every column reference outside subqueries
    pub fn without_qualifiers(&self) -> Expr {
        fn strip(e: &Expr) -> Box<Expr> {
            Box::new(e.without_qualifiers())
        }

        match self {
            Expr::Column(col) => Expr::Column(ColumnRef::bare(col.name.clone())),
            Expr::Literal(_) | Expr::Wildcard | Expr::Exists { .. } | Expr::Subquery(_) => {
                self.clone()
            }
            Expr::Binary { left, op, right } => Expr::Binary {
                left: strip(left),
                op: *op,
                right: strip(right),
            },
            Expr::Unary { op, expr } => Expr::Unary {
                op: *op,
                expr: strip(expr),
            },
            Expr::Is {
                expr,
                value,
                negated,
            } => Expr::Is {
                expr: strip(expr),
                value: value.clone(),
                negated: *negated,
            },
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => Expr::Between {
                expr: strip(expr),
                low: strip(low),
                high: strip(high),
                negated: *negated,
            },
            Expr::InList {
                expr,
                list,
                negated,
            } => Expr::InList {
                expr: strip(expr),
                list: list.iter().map(Expr::without_qualifiers).collect(),
                negated: *negated,
            },
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => Expr::InSubquery {
                expr: strip(expr),
                subquery: subquery.clone(),
                negated: *negated,
            },
            Expr::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
            } => Expr::Like {
                expr: strip(expr),
                pattern: strip(pattern),
                negated: *negated,
                case_insensitive: *case_insensitive,
            },
            Expr::Function(func) => Expr::Function(FunctionCall {
                name: func.name.clone(),
                args: func.args.iter().map(Expr::without_qualifiers).collect(),
                distinct: func.distinct,
            }),
            Expr::Nested(expr) => Expr::Nested(strip(expr)),
        }
    }

    /// Split a top-level AND chain into its conjuncts.
    ///
    /// Only the outermost chain is split (parentheses around a whole
    /// chain are looked through); OR and nested ANDs under other
    /// operators stay intact.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.collect_conjuncts(&mut out);
        out
    }

    fn collect_conjuncts<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match self {
            Expr::Binary {
                left,
                op: BinaryOp::And,
                right,
            } => {
                left.collect_conjuncts(out);
                right.collect_conjuncts(out);
            }
            Expr::Nested(inner) if matches!(**inner, Expr::Binary { op: BinaryOp::And, .. }) => {
                inner.collect_conjuncts(out)
            }
            other => out.push(other),
        }
    }
}

/// SELECT item (column in SELECT list)
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// Expression with optional alias
    Expr { expr: Expr, alias: Option<Ident> },
    /// Wildcard (*)
    Wildcard,
    /// Qualified wildcard (table.*)
    QualifiedWildcard(Ident),
}

/// Relation in FROM or JOIN
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    /// Named table, possibly schema-qualified (last part is the table)
    Table { name: Vec<Ident>, alias: Option<Ident> },
    /// Subquery in FROM
    Derived {
        subquery: Box<Query>,
        alias: Option<Ident>,
    },
}

impl TableRef {
    /// Declared alias, if any
    pub fn alias(&self) -> Option<&Ident> {
        match self {
            TableRef::Table { alias, .. } | TableRef::Derived { alias, .. } => alias.as_ref(),
        }
    }

    /// Unqualified table name for named tables
    pub fn table_name(&self) -> Option<&Ident> {
        match self {
            TableRef::Table { name, .. } => name.last(),
            TableRef::Derived { .. } => None,
        }
    }
}

/// JOIN type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// How a joined relation is matched against the rows before it
#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    On(Expr),
    Using(Vec<Ident>),
    Natural,
    None,
}

/// JOIN clause
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub relation: TableRef,
    pub kind: JoinKind,
    pub constraint: JoinConstraint,
}

/// One comma-separated FROM entry with its joins
#[derive(Debug, Clone, PartialEq)]
pub struct FromItem {
    pub relation: TableRef,
    pub joins: Vec<Join>,
}

/// ORDER BY item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub descending: bool,
}

/// SELECT block, without query-level ORDER BY / LIMIT
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Vec<FromItem>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
}

impl Select {
    /// Number of relations named in FROM and JOIN
    pub fn relation_count(&self) -> usize {
        self.from.iter().map(|item| 1 + item.joins.len()).sum()
    }

    /// Whether GROUP BY or HAVING is present
    pub fn has_grouping(&self) -> bool {
        !self.group_by.is_empty() || self.having.is_some()
    }
}

/// Set operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

/// Query body
#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    Select(Box<Select>),
    SetOperation {
        op: SetOperator,
        /// `ALL`: keep duplicates
        all: bool,
        left: Box<Query>,
        right: Box<Query>,
    },
}

/// Full query with ordering and row limits
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub body: QueryBody,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

impl Query {
    /// Wrap a bare SELECT
    pub fn select(select: Select) -> Self {
        Self {
            body: QueryBody::Select(Box::new(select)),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Whether ORDER BY, LIMIT or OFFSET is present
    pub fn has_row_modifiers(&self) -> bool {
        !self.order_by.is_empty() || self.limit.is_some() || self.offset.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(l: Expr, r: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(l),
            op: BinaryOp::Eq,
            right: Box::new(r),
        }
    }

    fn and(l: Expr, r: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(l),
            op: BinaryOp::And,
            right: Box::new(r),
        }
    }

    fn qualified(table: &str, name: &str) -> Expr {
        Expr::Column(ColumnRef {
            schema: None,
            table: Some(Ident::new(table)),
            name: Ident::new(name),
        })
    }

    #[test]
    fn test_conjuncts_split_outer_and_chain() {
        let one = Expr::Literal(Literal::Number("1".to_string()));
        let expr = and(
            and(eq(Expr::column("a"), one.clone()), eq(Expr::column("b"), one.clone())),
            Expr::Nested(Box::new(and(
                eq(Expr::column("c"), one.clone()),
                eq(Expr::column("d"), one.clone()),
            ))),
        );
        assert_eq!(expr.conjuncts().len(), 4);
    }

    #[test]
    fn test_conjuncts_keep_or_intact() {
        let one = Expr::Literal(Literal::Number("1".to_string()));
        let or = Expr::Binary {
            left: Box::new(eq(Expr::column("a"), one.clone())),
            op: BinaryOp::Or,
            right: Box::new(and(eq(Expr::column("b"), one.clone()), eq(Expr::column("c"), one))),
        };
        let conjuncts = or.conjuncts();
        assert_eq!(conjuncts.len(), 1);
        assert_eq!(conjuncts[0], &or);
    }

    #[test]
    fn test_without_qualifiers_leaves_original() {
        let expr = eq(qualified("a", "id"), qualified("b", "id"));
        let stripped = expr.without_qualifiers();
        assert_eq!(stripped, eq(Expr::column("id"), Expr::column("id")));
        assert!(expr.columns().iter().all(|c| c.table.is_some()));
    }

    #[test]
    fn test_columns_skip_subqueries() {
        let sub = Query::select(Select {
            projection: vec![SelectItem::Expr {
                expr: Expr::column("inner_col"),
                alias: None,
            }],
            ..Default::default()
        });
        let expr = Expr::InSubquery {
            expr: Box::new(Expr::column("outer_col")),
            subquery: Box::new(sub),
            negated: false,
        };
        let cols = expr.columns();
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].name.value, "outer_col");
    }
}

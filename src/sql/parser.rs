//! SQL parser wrapper around sqlparser crate
//!
//! Parses a single query and lowers the sqlparser AST into the
//! planner-facing types in [`crate::sql::ast`].

use sqlparser::ast as sp;
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser as SqlParser;

use crate::config::SqlDialect;
use crate::sql::ast::*;
use crate::sql::error::{SqlError, SqlResult};

/// SQL parser
pub struct Parser;

impl Parser {
    /// Parse a single query statement
    pub fn parse_one(sql: &str, dialect: SqlDialect) -> SqlResult<Query> {
        let ast = match dialect {
            SqlDialect::Generic => Self::parse_with(&GenericDialect {}, sql)?,
            SqlDialect::Sqlite => Self::parse_with(&SQLiteDialect {}, sql)?,
            SqlDialect::MySql => Self::parse_with(&MySqlDialect {}, sql)?,
            SqlDialect::Postgres => Self::parse_with(&PostgreSqlDialect {}, sql)?,
        };

        let mut statements = ast.into_iter();
        let stmt = match (statements.next(), statements.next()) {
            (None, _) => return Err(SqlError::Parse("Empty SQL statement".to_string())),
            (Some(_), Some(_)) => {
                return Err(SqlError::Parse(
                    "Multiple statements not supported".to_string(),
                ))
            }
            (Some(stmt), None) => stmt,
        };

        match stmt {
            sp::Statement::Query(query) => lower_query(&query),
            other => unsupported(format!("statement {}", node_kind(&other))),
        }
    }

    fn parse_with(dialect: &dyn Dialect, sql: &str) -> SqlResult<Vec<sp::Statement>> {
        Ok(SqlParser::parse_sql(dialect, sql)?)
    }
}

/// Variant name of a sqlparser node, taken from its Debug form
fn node_kind(node: &dyn std::fmt::Debug) -> String {
    let debug = format!("{:?}", node);
    debug
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .find(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn unsupported<T>(kind: impl Into<String>) -> SqlResult<T> {
    Err(SqlError::unsupported(kind))
}

fn lower_ident(ident: &sp::Ident) -> Ident {
    Ident {
        value: ident.value.clone(),
        quoted: ident.quote_style.is_some(),
    }
}

fn lower_object_name(name: &sp::ObjectName) -> SqlResult<Vec<Ident>> {
    let mut parts = Vec::with_capacity(name.0.len());
    for part in &name.0 {
        match part {
            sp::ObjectNamePart::Identifier(ident) => parts.push(lower_ident(ident)),
            other => return unsupported(format!("object name part {}", node_kind(other))),
        }
    }
    if parts.is_empty() {
        return Err(SqlError::Parse("object name must not be empty".to_string()));
    }
    Ok(parts)
}

fn lower_query(query: &sp::Query) -> SqlResult<Query> {
    if query.with.is_some() {
        return unsupported("WITH");
    }
    if query.fetch.is_some() {
        return unsupported("FETCH");
    }

    let body = lower_set_expr(&query.body)?;

    let order_by = match &query.order_by {
        None => Vec::new(),
        Some(order_by) => match &order_by.kind {
            sp::OrderByKind::Expressions(exprs) => exprs
                .iter()
                .map(lower_order_by_expr)
                .collect::<SqlResult<Vec<_>>>()?,
            other => return unsupported(format!("ORDER BY {}", node_kind(other))),
        },
    };

    let (limit, offset) = match &query.limit_clause {
        None => (None, None),
        Some(sp::LimitClause::LimitOffset {
            limit,
            offset,
            limit_by,
        }) => {
            if !limit_by.is_empty() {
                return unsupported("LIMIT BY");
            }
            let limit = limit.as_ref().map(lower_expr).transpose()?;
            let offset = offset.as_ref().map(|o| lower_expr(&o.value)).transpose()?;
            (limit, offset)
        }
        Some(sp::LimitClause::OffsetCommaLimit { offset, limit }) => {
            (Some(lower_expr(limit)?), Some(lower_expr(offset)?))
        }
    };

    // A parenthesized query without its own modifiers is the inner query
    if order_by.is_empty() && limit.is_none() && offset.is_none() {
        return Ok(body);
    }

    // Modifiers on both a parenthesized query and its wrapper
    if !body.order_by.is_empty() || body.limit.is_some() || body.offset.is_some() {
        return unsupported("nested ORDER BY / LIMIT");
    }

    Ok(Query {
        body: body.body,
        order_by,
        limit,
        offset,
    })
}

fn lower_set_expr(body: &sp::SetExpr) -> SqlResult<Query> {
    match body {
        sp::SetExpr::Select(select) => Ok(Query::select(lower_select(select)?)),
        sp::SetExpr::Query(query) => lower_query(query),
        sp::SetExpr::SetOperation {
            op,
            set_quantifier,
            left,
            right,
        } => {
            let op = match op {
                sp::SetOperator::Union => SetOperator::Union,
                sp::SetOperator::Intersect => SetOperator::Intersect,
                sp::SetOperator::Except | sp::SetOperator::Minus => SetOperator::Except,
            };
            let all = match set_quantifier {
                sp::SetQuantifier::All => true,
                sp::SetQuantifier::Distinct | sp::SetQuantifier::None => false,
                other => return unsupported(format!("set quantifier {}", node_kind(other))),
            };
            Ok(Query {
                body: QueryBody::SetOperation {
                    op,
                    all,
                    left: Box::new(lower_set_expr(left)?),
                    right: Box::new(lower_set_expr(right)?),
                },
                order_by: Vec::new(),
                limit: None,
                offset: None,
            })
        }
        other => unsupported(node_kind(other)),
    }
}

fn lower_select(select: &sp::Select) -> SqlResult<Select> {
    let distinct = match &select.distinct {
        None => false,
        Some(sp::Distinct::Distinct) => true,
        Some(sp::Distinct::On(_)) => return unsupported("DISTINCT ON"),
    };
    if select.top.is_some() {
        return unsupported("TOP");
    }

    let projection = select
        .projection
        .iter()
        .map(lower_select_item)
        .collect::<SqlResult<Vec<_>>>()?;

    let from = select
        .from
        .iter()
        .map(lower_table_with_joins)
        .collect::<SqlResult<Vec<_>>>()?;

    let selection = select.selection.as_ref().map(lower_expr).transpose()?;

    let group_by = match &select.group_by {
        sp::GroupByExpr::Expressions(exprs, modifiers) => {
            if !modifiers.is_empty() {
                return unsupported("GROUP BY modifiers");
            }
            exprs.iter().map(lower_expr).collect::<SqlResult<Vec<_>>>()?
        }
        sp::GroupByExpr::All(_) => return unsupported("GROUP BY ALL"),
    };

    let having = select.having.as_ref().map(lower_expr).transpose()?;

    Ok(Select {
        distinct,
        projection,
        from,
        selection,
        group_by,
        having,
    })
}

fn lower_select_item(item: &sp::SelectItem) -> SqlResult<SelectItem> {
    match item {
        sp::SelectItem::UnnamedExpr(expr) => Ok(SelectItem::Expr {
            expr: lower_expr(expr)?,
            alias: None,
        }),
        sp::SelectItem::ExprWithAlias { expr, alias } => Ok(SelectItem::Expr {
            expr: lower_expr(expr)?,
            alias: Some(lower_ident(alias)),
        }),
        sp::SelectItem::Wildcard(_) => Ok(SelectItem::Wildcard),
        sp::SelectItem::QualifiedWildcard(kind, _) => match kind {
            sp::SelectItemQualifiedWildcardKind::ObjectName(name) => {
                let mut parts = lower_object_name(name)?;
                match parts.pop() {
                    Some(table) => Ok(SelectItem::QualifiedWildcard(table)),
                    None => unsupported("qualified wildcard"),
                }
            }
            other => unsupported(format!("qualified wildcard {}", node_kind(other))),
        },
    }
}

fn lower_table_with_joins(item: &sp::TableWithJoins) -> SqlResult<FromItem> {
    let relation = lower_table_factor(&item.relation)?;
    let joins = item
        .joins
        .iter()
        .map(lower_join)
        .collect::<SqlResult<Vec<_>>>()?;
    Ok(FromItem { relation, joins })
}

fn lower_table_factor(factor: &sp::TableFactor) -> SqlResult<TableRef> {
    match factor {
        sp::TableFactor::Table {
            name, alias, args, ..
        } => {
            if args.is_some() {
                return unsupported("table function");
            }
            Ok(TableRef::Table {
                name: lower_object_name(name)?,
                alias: alias.as_ref().map(|a| lower_ident(&a.name)),
            })
        }
        sp::TableFactor::Derived {
            subquery, alias, ..
        } => Ok(TableRef::Derived {
            subquery: Box::new(lower_query(subquery)?),
            alias: alias.as_ref().map(|a| lower_ident(&a.name)),
        }),
        other => unsupported(node_kind(other)),
    }
}

fn lower_join(join: &sp::Join) -> SqlResult<Join> {
    use sp::JoinOperator as Op;

    let (kind, constraint) = match &join.join_operator {
        Op::Join(c) | Op::Inner(c) => (JoinKind::Inner, Some(c)),
        Op::Left(c) | Op::LeftOuter(c) => (JoinKind::Left, Some(c)),
        Op::Right(c) | Op::RightOuter(c) => (JoinKind::Right, Some(c)),
        Op::FullOuter(c) => (JoinKind::Full, Some(c)),
        Op::CrossJoin(c) => (JoinKind::Cross, Some(c)),
        other => return unsupported(format!("join {}", node_kind(other))),
    };

    let constraint = match constraint {
        Some(sp::JoinConstraint::On(expr)) => JoinConstraint::On(lower_expr(expr)?),
        Some(sp::JoinConstraint::None) | None => JoinConstraint::None,
        Some(sp::JoinConstraint::Using(names)) => JoinConstraint::Using(
            names
                .iter()
                .map(lower_object_name)
                .collect::<SqlResult<Vec<_>>>()?
                .into_iter()
                .filter_map(|mut parts| parts.pop())
                .collect(),
        ),
        Some(sp::JoinConstraint::Natural) => JoinConstraint::Natural,
    };

    Ok(Join {
        relation: lower_table_factor(&join.relation)?,
        kind,
        constraint,
    })
}

fn lower_order_by_expr(item: &sp::OrderByExpr) -> SqlResult<OrderByItem> {
    Ok(OrderByItem {
        expr: lower_expr(&item.expr)?,
        descending: item.options.asc == Some(false),
    })
}

fn lower_value(value: &sp::Value) -> SqlResult<Literal> {
    match value {
        sp::Value::Number(text, _) => Ok(Literal::Number(text.to_string())),
        sp::Value::SingleQuotedString(s)
        | sp::Value::DoubleQuotedString(s)
        | sp::Value::EscapedStringLiteral(s)
        | sp::Value::NationalStringLiteral(s) => Ok(Literal::String(s.clone())),
        sp::Value::Boolean(b) => Ok(Literal::Boolean(*b)),
        sp::Value::Null => Ok(Literal::Null),
        other => unsupported(format!("value {}", node_kind(other))),
    }
}

fn boxed(expr: &sp::Expr) -> SqlResult<Box<Expr>> {
    Ok(Box::new(lower_expr(expr)?))
}

fn lower_expr(expr: &sp::Expr) -> SqlResult<Expr> {
    match expr {
        sp::Expr::Identifier(ident) => Ok(Expr::Column(ColumnRef::bare(lower_ident(ident)))),
        sp::Expr::CompoundIdentifier(idents) => {
            let mut parts: Vec<Ident> = idents.iter().map(lower_ident).collect();
            let name = match parts.pop() {
                Some(name) => name,
                None => return Err(SqlError::Parse("empty column reference".to_string())),
            };
            let table = parts.pop();
            let schema = parts.pop();
            if !parts.is_empty() {
                return unsupported("column reference with more than three parts");
            }
            Ok(Expr::Column(ColumnRef {
                schema,
                table,
                name,
            }))
        }
        sp::Expr::Value(value) => Ok(Expr::Literal(lower_value(&value.value)?)),
        sp::Expr::BinaryOp { left, op, right } => {
            let op = match op {
                sp::BinaryOperator::Plus => BinaryOp::Plus,
                sp::BinaryOperator::Minus => BinaryOp::Minus,
                sp::BinaryOperator::Multiply => BinaryOp::Multiply,
                sp::BinaryOperator::Divide => BinaryOp::Divide,
                sp::BinaryOperator::Modulo => BinaryOp::Modulo,
                sp::BinaryOperator::StringConcat => BinaryOp::Concat,
                sp::BinaryOperator::Eq => BinaryOp::Eq,
                sp::BinaryOperator::NotEq => BinaryOp::NotEq,
                sp::BinaryOperator::Lt => BinaryOp::Lt,
                sp::BinaryOperator::LtEq => BinaryOp::LtEq,
                sp::BinaryOperator::Gt => BinaryOp::Gt,
                sp::BinaryOperator::GtEq => BinaryOp::GtEq,
                sp::BinaryOperator::And => BinaryOp::And,
                sp::BinaryOperator::Or => BinaryOp::Or,
                other => return unsupported(format!("operator {}", other)),
            };
            Ok(Expr::Binary {
                left: boxed(left)?,
                op,
                right: boxed(right)?,
            })
        }
        sp::Expr::UnaryOp { op, expr } => {
            let op = match op {
                sp::UnaryOperator::Not => UnaryOp::Not,
                sp::UnaryOperator::Minus => UnaryOp::Neg,
                sp::UnaryOperator::Plus => UnaryOp::Plus,
                other => return unsupported(format!("operator {}", other)),
            };
            Ok(Expr::Unary {
                op,
                expr: boxed(expr)?,
            })
        }
        sp::Expr::Nested(inner) => Ok(Expr::Nested(boxed(inner)?)),
        sp::Expr::IsNull(inner) => Ok(is(inner, Literal::Null, false)?),
        sp::Expr::IsNotNull(inner) => Ok(is(inner, Literal::Null, true)?),
        sp::Expr::IsTrue(inner) => Ok(is(inner, Literal::Boolean(true), false)?),
        sp::Expr::IsNotTrue(inner) => Ok(is(inner, Literal::Boolean(true), true)?),
        sp::Expr::IsFalse(inner) => Ok(is(inner, Literal::Boolean(false), false)?),
        sp::Expr::IsNotFalse(inner) => Ok(is(inner, Literal::Boolean(false), true)?),
        sp::Expr::Between {
            expr,
            negated,
            low,
            high,
        } => Ok(Expr::Between {
            expr: boxed(expr)?,
            low: boxed(low)?,
            high: boxed(high)?,
            negated: *negated,
        }),
        sp::Expr::InList {
            expr,
            list,
            negated,
        } => Ok(Expr::InList {
            expr: boxed(expr)?,
            list: list.iter().map(lower_expr).collect::<SqlResult<Vec<_>>>()?,
            negated: *negated,
        }),
        sp::Expr::InSubquery {
            expr,
            subquery,
            negated,
        } => Ok(Expr::InSubquery {
            expr: boxed(expr)?,
            subquery: Box::new(lower_query(subquery)?),
            negated: *negated,
        }),
        sp::Expr::Exists { subquery, negated } => Ok(Expr::Exists {
            subquery: Box::new(lower_query(subquery)?),
            negated: *negated,
        }),
        sp::Expr::Subquery(query) => Ok(Expr::Subquery(Box::new(lower_query(query)?))),
        sp::Expr::Like {
            negated,
            any,
            expr,
            pattern,
            ..
        } => like(*any, expr, pattern, *negated, false),
        sp::Expr::ILike {
            negated,
            any,
            expr,
            pattern,
            ..
        } => like(*any, expr, pattern, *negated, true),
        sp::Expr::Function(func) => lower_function(func),
        sp::Expr::Wildcard(_) => Ok(Expr::Wildcard),
        other => unsupported(node_kind(other)),
    }
}

fn is(expr: &sp::Expr, value: Literal, negated: bool) -> SqlResult<Expr> {
    Ok(Expr::Is {
        expr: boxed(expr)?,
        value,
        negated,
    })
}

fn like(
    any: bool,
    expr: &sp::Expr,
    pattern: &sp::Expr,
    negated: bool,
    case_insensitive: bool,
) -> SqlResult<Expr> {
    if any {
        return unsupported("LIKE ANY");
    }
    Ok(Expr::Like {
        expr: boxed(expr)?,
        pattern: boxed(pattern)?,
        negated,
        case_insensitive,
    })
}

fn lower_function(func: &sp::Function) -> SqlResult<Expr> {
    let name = lower_object_name(&func.name)?
        .into_iter()
        .map(|part| part.value)
        .collect::<Vec<_>>()
        .join(".");

    if func.over.is_some() {
        return unsupported(format!("window function {}", name));
    }
    if func.filter.is_some() {
        return unsupported(format!("FILTER clause on {}", name));
    }

    let (args, distinct) = match &func.args {
        sp::FunctionArguments::None => (Vec::new(), false),
        sp::FunctionArguments::List(list) => {
            let distinct = matches!(list.duplicate_treatment, Some(sp::DuplicateTreatment::Distinct));
            let mut args = Vec::with_capacity(list.args.len());
            for arg in &list.args {
                match arg {
                    sp::FunctionArg::Unnamed(sp::FunctionArgExpr::Expr(expr)) => {
                        args.push(lower_expr(expr)?)
                    }
                    sp::FunctionArg::Unnamed(sp::FunctionArgExpr::Wildcard) => {
                        args.push(Expr::Wildcard)
                    }
                    other => {
                        return unsupported(format!("argument {} of {}", node_kind(other), name))
                    }
                }
            }
            (args, distinct)
        }
        sp::FunctionArguments::Subquery(_) => {
            return unsupported(format!("subquery argument of {}", name))
        }
    };

    Ok(Expr::Function(FunctionCall {
        name,
        args,
        distinct,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Query {
        Parser::parse_one(sql, SqlDialect::Generic).unwrap()
    }

    fn select_of(query: &Query) -> &Select {
        match &query.body {
            QueryBody::Select(select) => select,
            other => panic!("Expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_select() {
        let query = parse("SELECT id, name FROM users WHERE id = 1");
        let select = select_of(&query);
        assert_eq!(select.projection.len(), 2);
        assert_eq!(select.from.len(), 1);
        assert!(select.selection.is_some());
    }

    #[test]
    fn test_parse_join() {
        let query = parse("SELECT u.name, o.total FROM users u JOIN orders o ON u.id = o.user_id");
        let select = select_of(&query);
        assert_eq!(select.from[0].joins.len(), 1);
        let join = &select.from[0].joins[0];
        assert_eq!(join.kind, JoinKind::Inner);
        assert_eq!(join.relation.alias().map(|a| a.value.as_str()), Some("o"));
        assert!(matches!(
            join.constraint,
            JoinConstraint::On(Expr::Binary {
                op: BinaryOp::Eq,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_order_and_limit_attach_to_query() {
        let query = parse("SELECT a FROM t ORDER BY a DESC LIMIT 3 OFFSET 1");
        assert_eq!(query.order_by.len(), 1);
        assert!(query.order_by[0].descending);
        assert_eq!(query.limit, Some(Expr::Literal(Literal::Number("3".to_string()))));
        assert_eq!(query.offset, Some(Expr::Literal(Literal::Number("1".to_string()))));
    }

    #[test]
    fn test_parse_set_operation() {
        let query = parse("SELECT a FROM t UNION ALL SELECT a FROM s");
        match query.body {
            QueryBody::SetOperation { op, all, .. } => {
                assert_eq!(op, SetOperator::Union);
                assert!(all);
            }
            other => panic!("Expected set operation, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_minus_and_by_name() {
        let query = parse("SELECT a FROM t MINUS SELECT a FROM s");
        match query.body {
            QueryBody::SetOperation { op, all, .. } => {
                assert_eq!(op, SetOperator::Except);
                assert!(!all);
            }
            other => panic!("Expected set operation, got {:?}", other),
        }

        let err = Parser::parse_one(
            "SELECT a FROM t UNION BY NAME SELECT a FROM s",
            SqlDialect::Generic,
        )
        .unwrap_err();
        assert_eq!(err, SqlError::Unsupported("set quantifier ByName".to_string()));
    }

    #[test]
    fn test_parse_count_star_and_distinct() {
        let query = parse("SELECT COUNT(*), COUNT(DISTINCT name) FROM users");
        let select = select_of(&query);
        match &select.projection[0] {
            SelectItem::Expr {
                expr: Expr::Function(f),
                ..
            } => {
                assert_eq!(f.name, "COUNT");
                assert_eq!(f.args, vec![Expr::Wildcard]);
            }
            other => panic!("Expected COUNT(*), got {:?}", other),
        }
        match &select.projection[1] {
            SelectItem::Expr {
                expr: Expr::Function(f),
                ..
            } => assert!(f.distinct),
            other => panic!("Expected COUNT(DISTINCT ...), got {:?}", other),
        }
    }

    #[test]
    fn test_parse_string_escape() {
        let query = parse("SELECT a FROM t WHERE name = 'O''Brien'");
        let select = select_of(&query);
        match &select.selection {
            Some(Expr::Binary { right, .. }) => {
                assert_eq!(**right, Expr::Literal(Literal::String("O'Brien".to_string())));
            }
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_quoted_identifier() {
        let query = parse("SELECT \"Name\" FROM t");
        let select = select_of(&query);
        match &select.projection[0] {
            SelectItem::Expr {
                expr: Expr::Column(col),
                ..
            } => {
                assert_eq!(col.name.value, "Name");
                assert!(col.name.quoted);
            }
            other => panic!("Expected column, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_multiple_statements() {
        let err = Parser::parse_one("SELECT 1; SELECT 2", SqlDialect::Generic).unwrap_err();
        assert!(matches!(err, SqlError::Parse(_)));
    }

    #[test]
    fn test_parse_rejects_empty() {
        let err = Parser::parse_one("", SqlDialect::Generic).unwrap_err();
        assert!(matches!(err, SqlError::Parse(_)));
    }

    #[test]
    fn test_parse_rejects_insert() {
        let err = Parser::parse_one(
            "INSERT INTO users (id, name) VALUES (1, 'Alice')",
            SqlDialect::Generic,
        )
        .unwrap_err();
        assert_eq!(err, SqlError::Unsupported("statement Insert".to_string()));
    }

    #[test]
    fn test_parse_rejects_cast_by_kind() {
        let err = Parser::parse_one("SELECT CAST(a AS INT) FROM t", SqlDialect::Generic)
            .unwrap_err();
        assert_eq!(err, SqlError::Unsupported("Cast".to_string()));
    }

    #[test]
    fn test_parse_syntax_error() {
        let err = Parser::parse_one("SELEC a FROM", SqlDialect::Generic).unwrap_err();
        assert!(matches!(err, SqlError::Parse(_)));
    }
}

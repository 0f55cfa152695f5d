//! Recursive-descent parser for the pattern query language.
//!
//! Grammar:
//!
//! ```text
//! query      := MATCH patterns [WHERE expr] RETURN items [ORDER BY order_items]
//! patterns   := pattern (',' pattern)*
//! pattern    := node ( relation node )*
//! node       := '(' [var] [':' label] [ '{' prop_map '}' ] ')'
//! relation   := '-[:' type ']->'  |  '<-[:' type ']-'
//! expr       := comparison ( (AND|OR) comparison )*
//! comparison := var '.' prop op value
//! ```

use crate::error::{GraphError, Result};
use crate::model::{Direction, PropertyValue};
use crate::query::ast::{
    CmpOp, Expr, NodePattern, OrderItem, Pattern, Query, RelPattern, ReturnItem,
};
use crate::query::lexer::{Token, TokenKind};

/// Parses a token stream into a [`Query`].
pub fn parse(tokens: &[Token]) -> Result<Query> {
    let mut parser = Parser { tokens, pos: 0 };
    let query = parser.query()?;
    if let Some(token) = parser.peek() {
        return Err(parser.unexpected(token.clone(), "end of query"));
    }
    Ok(query)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn query(&mut self) -> Result<Query> {
        self.expect(&TokenKind::Match)?;
        let mut patterns = vec![self.pattern()?];
        while self.eat(&TokenKind::Comma) {
            patterns.push(self.pattern()?);
        }

        let where_clause = if self.eat(&TokenKind::Where) {
            Some(self.expr()?)
        } else {
            None
        };

        self.expect(&TokenKind::Return)?;
        let mut return_items = vec![self.return_item()?];
        while self.eat(&TokenKind::Comma) {
            return_items.push(self.return_item()?);
        }

        let mut order_by = Vec::new();
        if self.eat(&TokenKind::Order) {
            self.expect(&TokenKind::By)?;
            order_by.push(self.order_item()?);
            while self.eat(&TokenKind::Comma) {
                order_by.push(self.order_item()?);
            }
        }

        Ok(Query {
            patterns,
            where_clause,
            return_items,
            order_by,
        })
    }

    fn pattern(&mut self) -> Result<Pattern> {
        let start = self.node()?;
        let mut hops = Vec::new();
        while let Some(rel) = self.relation()? {
            let node = self.node()?;
            hops.push((rel, node));
        }
        Ok(Pattern { start, hops })
    }

    fn node(&mut self) -> Result<NodePattern> {
        self.expect(&TokenKind::LParen)?;
        let var = self.eat_ident();
        let label = if self.eat(&TokenKind::Colon) {
            Some(self.ident("label")?)
        } else {
            None
        };
        let mut props = Vec::new();
        if self.eat(&TokenKind::LBrace) {
            if !self.check(&TokenKind::RBrace) {
                loop {
                    let key = self.ident("property name")?;
                    self.expect(&TokenKind::Colon)?;
                    let value = self.value()?;
                    props.push((key, value));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(&TokenKind::RBrace)?;
        }
        self.expect(&TokenKind::RParen)?;
        Ok(NodePattern { var, label, props })
    }

    /// `-[:T]->` or `<-[:T]-`, or nothing when no relation follows.
    fn relation(&mut self) -> Result<Option<RelPattern>> {
        let direction = if self.eat(&TokenKind::Dash) {
            Direction::Outgoing
        } else if self.eat(&TokenKind::BackArrow) {
            Direction::Incoming
        } else {
            return Ok(None);
        };

        self.expect(&TokenKind::LBracket)?;
        self.expect(&TokenKind::Colon)?;
        let edge_type = self.ident("edge type")?;
        self.expect(&TokenKind::RBracket)?;
        match direction {
            Direction::Outgoing => self.expect(&TokenKind::Arrow)?,
            Direction::Incoming => self.expect(&TokenKind::Dash)?,
        }
        Ok(Some(RelPattern {
            edge_type,
            direction,
        }))
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut expr = self.comparison()?;
        loop {
            if self.eat(&TokenKind::And) {
                let right = self.comparison()?;
                expr = Expr::And(Box::new(expr), Box::new(right));
            } else if self.eat(&TokenKind::Or) {
                let right = self.comparison()?;
                expr = Expr::Or(Box::new(expr), Box::new(right));
            } else {
                return Ok(expr);
            }
        }
    }

    fn comparison(&mut self) -> Result<Expr> {
        let var = self.ident("variable")?;
        self.expect(&TokenKind::Dot)?;
        let prop = self.ident("property name")?;
        let op = self.cmp_op()?;
        let value = self.value()?;
        Ok(Expr::Cmp {
            var,
            prop,
            op,
            value,
        })
    }

    fn cmp_op(&mut self) -> Result<CmpOp> {
        let token = self.advance("comparison operator")?;
        let op = match token.kind {
            TokenKind::Eq => CmpOp::Eq,
            TokenKind::Ne => CmpOp::Ne,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::Le => CmpOp::Le,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::Ge => CmpOp::Ge,
            _ => return Err(self.unexpected(token, "comparison operator")),
        };
        Ok(op)
    }

    fn value(&mut self) -> Result<PropertyValue> {
        let token = self.advance("value")?;
        let value = match token.kind {
            TokenKind::Int(v) => PropertyValue::Int(v),
            TokenKind::Str(ref v) => PropertyValue::String(v.clone()),
            TokenKind::True => PropertyValue::Bool(true),
            TokenKind::False => PropertyValue::Bool(false),
            TokenKind::Null => PropertyValue::Null,
            _ => return Err(self.unexpected(token, "value")),
        };
        Ok(value)
    }

    fn return_item(&mut self) -> Result<ReturnItem> {
        let var = self.ident("variable")?;
        if self.eat(&TokenKind::Dot) {
            let prop = self.ident("property name")?;
            Ok(ReturnItem::Prop(var, prop))
        } else {
            Ok(ReturnItem::Var(var))
        }
    }

    fn order_item(&mut self) -> Result<OrderItem> {
        let var = self.ident("variable")?;
        self.expect(&TokenKind::Dot)?;
        let prop = self.ident("property name")?;
        let descending = if self.eat(&TokenKind::Desc) {
            true
        } else {
            self.eat(&TokenKind::Asc);
            false
        };
        Ok(OrderItem {
            var,
            prop,
            descending,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek().map(|t| &t.kind == kind).unwrap_or(false)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self) -> Option<String> {
        if let Some(Token {
            kind: TokenKind::Ident(name),
            ..
        }) = self.peek()
        {
            let name = name.clone();
            self.pos += 1;
            Some(name)
        } else {
            None
        }
    }

    fn ident(&mut self, expected: &'static str) -> Result<String> {
        let token = self.advance(expected)?;
        if let TokenKind::Ident(name) = token.kind {
            Ok(name)
        } else {
            Err(self.unexpected(token, expected))
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<()> {
        let token = self.advance(kind.class())?;
        if &token.kind == kind {
            Ok(())
        } else {
            Err(self.unexpected(token, kind.class()))
        }
    }

    fn advance(&mut self, expected: &'static str) -> Result<Token> {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                Ok(token.clone())
            }
            None => Err(GraphError::Parse {
                position: self
                    .tokens
                    .last()
                    .map(|t| t.pos + 1)
                    .unwrap_or(0),
                message: format!("expected {expected}, found end of query"),
            }),
        }
    }

    fn unexpected(&self, token: Token, expected: &'static str) -> GraphError {
        GraphError::Parse {
            position: token.pos,
            message: format!("expected {expected}, found {}", token.kind.class()),
        }
    }
}

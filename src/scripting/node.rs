// Copyright 2025 Sqlweave Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Template tree nodes
//!
//! A statement's SQL is described by a tree of [`SqlNode`]s built once at
//! definition time. Applying the tree to a [`DynamicContext`] appends SQL
//! fragments to a [`SqlBuffer`] and may add bindings to the context; the
//! tree itself is never modified, so it can be shared between threads.

use regex::Regex;

use crate::core::{Error, Result, Value};
use crate::expr::Expression;
use crate::parsing::{parse_tokens, TokenParser};

use super::context::{DynamicContext, SqlBuffer};

/// Prefixes removed by a WHERE wrapper
pub const WHERE_PREFIX_OVERRIDES: &[&str] = &[
    "AND ", "OR ", "AND\n", "OR\n", "AND\r", "OR\r", "AND\t", "OR\t",
];

/// One node of a template tree
#[derive(Debug, Clone)]
pub enum SqlNode {
    /// Literal SQL, appended as-is
    StaticText(String),
    /// SQL with `${...}` substitutions
    Text(TextSqlNode),
    If(IfSqlNode),
    Choose(ChooseSqlNode),
    ForEach(ForEachSqlNode),
    Bind(VarDeclSqlNode),
    Trim(TrimSqlNode),
    /// Ordered sequence of nodes
    Mixed(Vec<SqlNode>),
}

impl SqlNode {
    /// Text node; becomes static text when it has no substitutions
    pub fn text(text: impl Into<String>) -> SqlNode {
        let text = text.into();
        if TokenParser::substitutions().has_tokens(&text) {
            SqlNode::Text(TextSqlNode::new(text))
        } else {
            SqlNode::StaticText(text)
        }
    }

    pub fn static_text(text: impl Into<String>) -> SqlNode {
        SqlNode::StaticText(text.into())
    }

    pub fn mixed(nodes: Vec<SqlNode>) -> SqlNode {
        SqlNode::Mixed(nodes)
    }

    pub fn if_test(test: &str, contents: SqlNode) -> Result<SqlNode> {
        Ok(SqlNode::If(IfSqlNode::new(test, contents)?))
    }

    pub fn bind(name: impl Into<String>, expression: &str) -> Result<SqlNode> {
        Ok(SqlNode::Bind(VarDeclSqlNode::new(name, expression)?))
    }

    pub fn where_clause(contents: SqlNode) -> SqlNode {
        SqlNode::Trim(TrimSqlNode::where_clause(contents))
    }

    pub fn set_clause(contents: SqlNode) -> SqlNode {
        SqlNode::Trim(TrimSqlNode::set_clause(contents))
    }

    /// Returns true if the SQL depends on the parameter object
    pub fn is_dynamic(&self) -> bool {
        match self {
            SqlNode::StaticText(_) => false,
            SqlNode::Text(node) => node.is_dynamic(),
            SqlNode::Mixed(nodes) => nodes.iter().any(SqlNode::is_dynamic),
            _ => true,
        }
    }

    /// Append this node's SQL to `sink`
    ///
    /// Returns false when a conditional node contributed nothing.
    pub fn apply(&self, ctx: &mut DynamicContext, sink: &mut SqlBuffer) -> Result<bool> {
        match self {
            SqlNode::StaticText(text) => {
                sink.append(text.as_str());
                Ok(true)
            }
            SqlNode::Text(node) => node.apply(ctx, sink),
            SqlNode::If(node) => node.apply(ctx, sink),
            SqlNode::Choose(node) => node.apply(ctx, sink),
            SqlNode::ForEach(node) => node.apply(ctx, sink),
            SqlNode::Bind(node) => node.apply(ctx),
            SqlNode::Trim(node) => node.apply(ctx, sink),
            SqlNode::Mixed(nodes) => {
                for node in nodes {
                    node.apply(ctx, sink)?;
                }
                Ok(true)
            }
        }
    }
}

impl From<IfSqlNode> for SqlNode {
    fn from(node: IfSqlNode) -> Self {
        SqlNode::If(node)
    }
}

impl From<ChooseSqlNode> for SqlNode {
    fn from(node: ChooseSqlNode) -> Self {
        SqlNode::Choose(node)
    }
}

impl From<ForEachSqlNode> for SqlNode {
    fn from(node: ForEachSqlNode) -> Self {
        SqlNode::ForEach(node)
    }
}

impl From<TrimSqlNode> for SqlNode {
    fn from(node: TrimSqlNode) -> Self {
        SqlNode::Trim(node)
    }
}

impl From<TextSqlNode> for SqlNode {
    fn from(node: TextSqlNode) -> Self {
        SqlNode::Text(node)
    }
}

// =============================================================================
// Text substitution
// =============================================================================

/// SQL text with `${...}` substitutions
#[derive(Debug, Clone)]
pub struct TextSqlNode {
    text: String,
    injection_filter: Option<(String, Regex)>,
}

impl TextSqlNode {
    pub fn new(text: impl Into<String>) -> Self {
        TextSqlNode {
            text: text.into(),
            injection_filter: None,
        }
    }

    /// Reject substituted values that do not fully match `pattern`
    pub fn with_injection_filter(mut self, pattern: &str) -> Result<Self> {
        let anchored = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| Error::expression_parse(pattern, e.to_string()))?;
        self.injection_filter = Some((pattern.to_string(), anchored));
        Ok(self)
    }

    pub fn is_dynamic(&self) -> bool {
        TokenParser::substitutions().has_tokens(&self.text)
    }

    fn apply(&self, ctx: &mut DynamicContext, sink: &mut SqlBuffer) -> Result<bool> {
        let sql = TokenParser::substitutions().parse(&self.text, |content| {
            let parameter = ctx.parameter().clone();
            if parameter.is_null() || parameter.is_scalar() {
                ctx.bind("value", parameter);
            }
            let value = Expression::parse(content)?.evaluate(&*ctx)?;
            let text = match value {
                Value::Null => String::new(),
                other => other.to_string(),
            };
            if let Some((pattern, filter)) = &self.injection_filter {
                if !filter.is_match(&text) {
                    return Err(Error::InjectionRejected {
                        value: text,
                        pattern: pattern.clone(),
                    });
                }
            }
            Ok(text)
        })?;
        sink.append(sql);
        Ok(true)
    }
}

// =============================================================================
// Conditionals
// =============================================================================

/// Body applied only when its test is true
#[derive(Debug, Clone)]
pub struct IfSqlNode {
    test: Expression,
    contents: Box<SqlNode>,
}

impl IfSqlNode {
    pub fn new(test: &str, contents: SqlNode) -> Result<Self> {
        Ok(IfSqlNode {
            test: Expression::parse(test)?,
            contents: Box::new(contents),
        })
    }

    fn apply(&self, ctx: &mut DynamicContext, sink: &mut SqlBuffer) -> Result<bool> {
        if self.test.evaluate_boolean(&*ctx)? {
            self.contents.apply(ctx, sink)?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// First matching branch, else the default body
#[derive(Debug, Clone)]
pub struct ChooseSqlNode {
    when: Vec<IfSqlNode>,
    otherwise: Option<Box<SqlNode>>,
}

impl ChooseSqlNode {
    pub fn new(when: Vec<IfSqlNode>, otherwise: Option<SqlNode>) -> Self {
        ChooseSqlNode {
            when,
            otherwise: otherwise.map(Box::new),
        }
    }

    fn apply(&self, ctx: &mut DynamicContext, sink: &mut SqlBuffer) -> Result<bool> {
        for branch in &self.when {
            if branch.apply(ctx, sink)? {
                return Ok(true);
            }
        }
        if let Some(otherwise) = &self.otherwise {
            otherwise.apply(ctx, sink)?;
            return Ok(true);
        }
        Ok(false)
    }
}

// =============================================================================
// Variable declaration
// =============================================================================

/// Binds the value of an expression to a name
#[derive(Debug, Clone)]
pub struct VarDeclSqlNode {
    name: String,
    expression: Expression,
}

impl VarDeclSqlNode {
    pub fn new(name: impl Into<String>, expression: &str) -> Result<Self> {
        Ok(VarDeclSqlNode {
            name: name.into(),
            expression: Expression::parse(expression)?,
        })
    }

    fn apply(&self, ctx: &mut DynamicContext) -> Result<bool> {
        let value = self.expression.evaluate(&*ctx)?;
        ctx.bind(self.name.clone(), value);
        Ok(true)
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// Repeats its body once per element of a collection
///
/// Each element is bound under the item name and under a loop-unique name
/// `__<item>_<n>`. `#{item...}` references in the body's output are
/// rewritten to the unique name so every iteration binds its own value.
#[derive(Debug, Clone)]
pub struct ForEachSqlNode {
    collection: Expression,
    item: Option<String>,
    index: Option<String>,
    open: String,
    close: String,
    separator: Option<String>,
    contents: Box<SqlNode>,
}

impl ForEachSqlNode {
    pub fn new(collection: &str, contents: SqlNode) -> Result<Self> {
        Ok(ForEachSqlNode {
            collection: Expression::parse(collection)?,
            item: None,
            index: None,
            open: String::new(),
            close: String::new(),
            separator: None,
            contents: Box::new(contents),
        })
    }

    pub fn item(mut self, name: impl Into<String>) -> Self {
        self.item = Some(name.into());
        self
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(name.into());
        self
    }

    pub fn open(mut self, open: impl Into<String>) -> Self {
        self.open = open.into();
        self
    }

    pub fn close(mut self, close: impl Into<String>) -> Self {
        self.close = close.into();
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    fn apply(&self, ctx: &mut DynamicContext, sink: &mut SqlBuffer) -> Result<bool> {
        let entries = self.collection.evaluate_iterable(&*ctx)?;
        if entries.is_empty() {
            return Ok(true);
        }

        let shadowed_item = self.item.as_ref().map(|n| ctx.binding(n).cloned());
        let shadowed_index = self.index.as_ref().map(|n| ctx.binding(n).cloned());

        let mut body_sql = String::new();
        let mut first = true;
        for (key, element) in entries {
            let unique = ctx.next_unique_number();
            if let Some(index) = &self.index {
                ctx.bind(index.clone(), key.clone());
                ctx.bind(unique_name(index, unique), key);
            }
            if let Some(item) = &self.item {
                ctx.bind(item.clone(), element.clone());
                ctx.bind(unique_name(item, unique), element);
            }

            let mut iteration = SqlBuffer::new();
            self.contents.apply(ctx, &mut iteration)?;
            let sql = iteration.sql();
            if sql.is_empty() {
                continue;
            }
            let sql = self.rewrite_references(&sql, unique)?;
            if !first {
                if let Some(separator) = &self.separator {
                    body_sql.push_str(separator);
                }
            }
            body_sql.push_str(&sql);
            first = false;
        }

        restore(ctx, self.item.as_deref(), shadowed_item);
        restore(ctx, self.index.as_deref(), shadowed_index);

        sink.append(format!("{}{}{}", self.open, body_sql, self.close));
        Ok(true)
    }

    /// Point `#{item...}` and `#{index...}` at this iteration's names
    fn rewrite_references(&self, sql: &str, unique: usize) -> Result<String> {
        parse_tokens(sql, "#{", "}", |content| {
            let rewritten = self
                .item
                .as_deref()
                .and_then(|item| rewrite_reference(content, item, unique))
                .or_else(|| {
                    self.index
                        .as_deref()
                        .and_then(|index| rewrite_reference(content, index, unique))
                })
                .unwrap_or_else(|| content.to_string());
            Ok(format!("#{{{}}}", rewritten))
        })
    }
}

fn unique_name(name: &str, unique: usize) -> String {
    format!("__{}_{}", name, unique)
}

/// Rewrite `content` when it starts with `name` as a whole word
fn rewrite_reference(content: &str, name: &str, unique: usize) -> Option<String> {
    let rest = content.trim_start().strip_prefix(name)?;
    match rest.chars().next() {
        None => {}
        Some(c) if c == '.' || c == ',' || c == ':' || c.is_whitespace() => {}
        Some(_) => return None,
    }
    Some(format!("{}{}", unique_name(name, unique), rest))
}

fn restore(ctx: &mut DynamicContext, name: Option<&str>, shadowed: Option<Option<Value>>) {
    if let Some(name) = name {
        match shadowed.flatten() {
            Some(previous) => {
                ctx.bind(name, previous);
            }
            None => {
                ctx.unbind(name);
            }
        }
    }
}

// =============================================================================
// Trim family
// =============================================================================

/// Buffers its body, then fixes up the leading and trailing keywords
#[derive(Debug, Clone)]
pub struct TrimSqlNode {
    contents: Box<SqlNode>,
    prefix: Option<String>,
    suffix: Option<String>,
    prefix_overrides: Vec<String>,
    suffix_overrides: Vec<String>,
}

impl TrimSqlNode {
    /// Overrides are `|`-separated and matched case-insensitively
    pub fn new(
        contents: SqlNode,
        prefix: Option<&str>,
        prefix_overrides: Option<&str>,
        suffix: Option<&str>,
        suffix_overrides: Option<&str>,
    ) -> Self {
        TrimSqlNode {
            contents: Box::new(contents),
            prefix: prefix.map(str::to_string),
            suffix: suffix.map(str::to_string),
            prefix_overrides: parse_overrides(prefix_overrides),
            suffix_overrides: parse_overrides(suffix_overrides),
        }
    }

    /// `WHERE` wrapper dropping a leading `AND`/`OR`
    pub fn where_clause(contents: SqlNode) -> Self {
        TrimSqlNode {
            contents: Box::new(contents),
            prefix: Some("WHERE".to_string()),
            suffix: None,
            prefix_overrides: WHERE_PREFIX_OVERRIDES.iter().map(|s| s.to_string()).collect(),
            suffix_overrides: Vec::new(),
        }
    }

    /// `SET` wrapper dropping a leading or trailing comma
    pub fn set_clause(contents: SqlNode) -> Self {
        TrimSqlNode::new(contents, Some("SET"), Some(","), None, Some(","))
    }

    /// Parenthesized list dropping a trailing comma
    pub fn column_list(contents: SqlNode) -> Self {
        TrimSqlNode::new(contents, Some("("), None, Some(")"), Some(","))
    }

    fn apply(&self, ctx: &mut DynamicContext, sink: &mut SqlBuffer) -> Result<bool> {
        let mut body = SqlBuffer::new();
        let result = self.contents.apply(ctx, &mut body)?;
        sink.append(self.trim(&body.sql()));
        Ok(result)
    }

    /// Apply the prefix and suffix rules to already-trimmed SQL
    pub fn trim(&self, sql: &str) -> String {
        if sql.is_empty() {
            return String::new();
        }

        let mut core = sql.to_string();
        let upper = core.to_ascii_uppercase();
        if let Some(strip) = self
            .prefix_overrides
            .iter()
            .find(|p| upper.starts_with(p.as_str()))
        {
            core.replace_range(..strip.trim().len(), "");
            core = core.trim_start().to_string();
        }

        let upper = core.to_ascii_uppercase();
        if let Some(strip) = self.suffix_overrides.iter().find(|s| {
            let t = s.trim();
            !t.is_empty() && (upper.ends_with(s.as_str()) || upper.ends_with(t))
        }) {
            core.truncate(core.len() - strip.trim().len());
            core = core.trim_end().to_string();
        }

        if core.is_empty() {
            return String::new();
        }

        let mut out = String::with_capacity(core.len() + 16);
        if let Some(prefix) = &self.prefix {
            out.push_str(prefix);
            out.push(' ');
        }
        out.push_str(&core);
        if let Some(suffix) = &self.suffix {
            out.push(' ');
            out.push_str(suffix);
        }
        out
    }
}

fn parse_overrides(overrides: Option<&str>) -> Vec<String> {
    overrides
        .map(|o| {
            o.split('|')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_ascii_uppercase())
                .collect()
        })
        .unwrap_or_default()
}

//! Message bundle: one locale's Fluent resource, parsed and ready to format.
//!
//! Formatting covers the Fluent subset the resume templates use: variables,
//! message and term references, literals, and select expressions matched on
//! the selector's literal value. No plural categories and no isolation marks.
//! A bare `{name}` that names no message in the bundle falls back to the
//! attribute of the same name.

use std::collections::HashMap;

use fluent_syntax::ast::{
    CallArguments, Entry, Expression, InlineExpression, Pattern, PatternElement, Variant,
    VariantKey,
};
use fluent_syntax::parser;

use crate::i18n::args::MessageArgs;
use crate::i18n::messages::MessagesError;

/// Reference chains deeper than this are treated as cycles.
const MAX_DEPTH: usize = 16;

#[derive(Debug)]
struct Entity {
    value: Option<Pattern<String>>,
    attributes: HashMap<String, Pattern<String>>,
}

impl Entity {
    fn pattern(&self, attribute: Option<&str>) -> Option<&Pattern<String>> {
        match attribute {
            Some(name) => self.attributes.get(name),
            None => self.value.as_ref(),
        }
    }
}

/// Parsed form of one locale's resource text.
#[derive(Debug)]
pub struct MessageBundle {
    locale: String,
    messages: HashMap<String, Entity>,
    terms: HashMap<String, Entity>,
}

impl MessageBundle {
    /// Parses a Fluent resource. Any junk in the resource is an error.
    pub fn parse(locale: &str, source: &str) -> Result<Self, MessagesError> {
        let resource = parser::parse(source.to_string()).map_err(|(_, errors)| {
            let reason = errors
                .iter()
                .map(|e| format!("{:?} at {}..{}", e.kind, e.pos.start, e.pos.end))
                .collect::<Vec<_>>()
                .join("; ");
            MessagesError::MalformedResource {
                locale: locale.to_string(),
                reason,
            }
        })?;

        let mut messages = HashMap::new();
        let mut terms = HashMap::new();

        for entry in resource.body {
            match entry {
                Entry::Message(message) => {
                    let attributes = message
                        .attributes
                        .into_iter()
                        .map(|a| (a.id.name, a.value))
                        .collect();
                    messages.insert(
                        message.id.name,
                        Entity {
                            value: message.value,
                            attributes,
                        },
                    );
                }
                Entry::Term(term) => {
                    let attributes = term
                        .attributes
                        .into_iter()
                        .map(|a| (a.id.name, a.value))
                        .collect();
                    terms.insert(
                        term.id.name,
                        Entity {
                            value: Some(term.value),
                            attributes,
                        },
                    );
                }
                _ => {}
            }
        }

        Ok(Self {
            locale: locale.to_string(),
            messages,
            terms,
        })
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Formats the value of message `key`, or `None` when the bundle has no such value.
    pub fn format(&self, key: &str, args: &MessageArgs) -> Option<String> {
        let pattern = self.messages.get(key)?.value.as_ref()?;
        let mut out = String::new();
        self.write_pattern(&mut out, pattern, args, 0);
        Some(out)
    }

    fn write_pattern(
        &self,
        out: &mut String,
        pattern: &Pattern<String>,
        args: &MessageArgs,
        depth: usize,
    ) {
        if depth > MAX_DEPTH {
            out.push_str("{???}");
            return;
        }
        for element in &pattern.elements {
            match element {
                PatternElement::TextElement { value } => out.push_str(value),
                PatternElement::Placeable { expression } => {
                    self.write_expression(out, expression, args, depth)
                }
            }
        }
    }

    fn write_expression(
        &self,
        out: &mut String,
        expression: &Expression<String>,
        args: &MessageArgs,
        depth: usize,
    ) {
        match expression {
            Expression::Inline(inline) => self.write_inline(out, inline, args, depth),
            Expression::Select { selector, variants } => {
                let mut selected = String::new();
                self.write_inline(&mut selected, selector, args, depth);
                if let Some(variant) = select_variant(&selected, variants) {
                    self.write_pattern(out, &variant.value, args, depth + 1);
                }
            }
        }
    }

    fn write_inline(
        &self,
        out: &mut String,
        inline: &InlineExpression<String>,
        args: &MessageArgs,
        depth: usize,
    ) {
        match inline {
            InlineExpression::StringLiteral { value } => out.push_str(&unescape(value)),
            InlineExpression::NumberLiteral { value } => out.push_str(value),
            InlineExpression::VariableReference { id } => match args.get(&id.name) {
                Some(value) => out.push_str(value),
                None => {
                    out.push_str("{$");
                    out.push_str(&id.name);
                    out.push('}');
                }
            },
            InlineExpression::MessageReference { id, attribute } => {
                let pattern = self
                    .messages
                    .get(&id.name)
                    .and_then(|m| m.pattern(attribute.as_ref().map(|a| a.name.as_str())));
                match (pattern, attribute) {
                    (Some(pattern), _) => self.write_pattern(out, pattern, args, depth + 1),
                    (None, None) if args.get(&id.name).is_some() => {
                        out.push_str(args.get(&id.name).unwrap_or_default())
                    }
                    (None, attribute) => {
                        out.push('{');
                        out.push_str(&id.name);
                        if let Some(attribute) = attribute {
                            out.push('.');
                            out.push_str(&attribute.name);
                        }
                        out.push('}');
                    }
                }
            }
            InlineExpression::TermReference {
                id,
                attribute,
                arguments,
            } => {
                let pattern = self
                    .terms
                    .get(&id.name)
                    .and_then(|t| t.pattern(attribute.as_ref().map(|a| a.name.as_str())));
                match pattern {
                    Some(pattern) => {
                        // Terms only see the arguments passed to them explicitly.
                        let term_args = self.term_args(arguments.as_ref(), args, depth);
                        self.write_pattern(out, pattern, &term_args, depth + 1);
                    }
                    None => {
                        out.push_str("{-");
                        out.push_str(&id.name);
                        out.push('}');
                    }
                }
            }
            InlineExpression::FunctionReference { id, .. } => {
                out.push('{');
                out.push_str(&id.name);
                out.push_str("()}");
            }
            InlineExpression::Placeable { expression } => {
                self.write_expression(out, expression, args, depth + 1)
            }
        }
    }

    fn term_args(
        &self,
        arguments: Option<&CallArguments<String>>,
        args: &MessageArgs,
        depth: usize,
    ) -> MessageArgs {
        let mut term_args = MessageArgs::new();
        if let Some(arguments) = arguments {
            for named in &arguments.named {
                let mut value = String::new();
                self.write_inline(&mut value, &named.value, args, depth + 1);
                term_args.insert(named.name.name.clone(), value);
            }
        }
        term_args
    }
}

fn select_variant<'v>(
    selected: &str,
    variants: &'v [Variant<String>],
) -> Option<&'v Variant<String>> {
    variants
        .iter()
        .find(|v| match &v.key {
            VariantKey::Identifier { name } => name == selected,
            VariantKey::NumberLiteral { value } => {
                match (value.parse::<f64>(), selected.parse::<f64>()) {
                    (Ok(key), Ok(sel)) => key == sel,
                    _ => value == selected,
                }
            }
        })
        .or_else(|| variants.iter().find(|v| v.default))
}

/// Resolves `\\`, `\"`, `\uXXXX` and `\UXXXXXX` escapes of a Fluent string literal.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('u') => push_codepoint(&mut out, &mut chars, 4),
            Some('U') => push_codepoint(&mut out, &mut chars, 6),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn push_codepoint(out: &mut String, chars: &mut std::str::Chars<'_>, len: usize) {
    let hex: String = chars.by_ref().take(len).collect();
    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => out.push(char::REPLACEMENT_CHARACTER),
    }
}

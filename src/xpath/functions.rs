//! XPath 1.0 Functions
//!
//! Node Set Functions:
//! - position(), last(), count(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()

use super::eval::number_of;
use super::value::{string_to_number, XPathValue};
use crate::dom::{DocumentAccess, NodeId};
use crate::error::XPathError;

type FnResult = Result<XPathValue, XPathError>;

/// Evaluate a function call
pub fn call<D: DocumentAccess + ?Sized>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
    position: usize,
    size: usize,
) -> FnResult {
    match name {
        // Node Set Functions
        "position" => no_args(name, &args).map(|_| XPathValue::Number(position as f64)),
        "last" => no_args(name, &args).map(|_| XPathValue::Number(size as f64)),
        "count" => fn_count(args),
        "local-name" => name_of(name, args, context, |n| doc.node_local_name(n)),
        "namespace-uri" => name_of(name, args, context, |n| doc.node_namespace_uri(n)),
        "name" => name_of(name, args, context, |n| doc.node_name(n)),

        // String Functions
        "string" => fn_string(args, doc, context),
        "concat" => fn_concat(args, doc),
        "starts-with" => {
            let [s, prefix] = two_strings(name, args, doc)?;
            Ok(XPathValue::Boolean(s.starts_with(&prefix)))
        }
        "contains" => {
            let [s, pattern] = two_strings(name, args, doc)?;
            Ok(XPathValue::Boolean(s.contains(&pattern)))
        }
        "substring" => fn_substring(args, doc),
        "substring-before" => {
            let [s, pattern] = two_strings(name, args, doc)?;
            let before = s.find(&pattern).map(|pos| &s[..pos]).unwrap_or("");
            Ok(XPathValue::String(before.to_string()))
        }
        "substring-after" => {
            let [s, pattern] = two_strings(name, args, doc)?;
            let after = s
                .find(&pattern)
                .map(|pos| &s[pos + pattern.len()..])
                .unwrap_or("");
            Ok(XPathValue::String(after.to_string()))
        }
        "string-length" => {
            let s = optional_string(name, args, doc, context)?;
            Ok(XPathValue::Number(s.chars().count() as f64))
        }
        "normalize-space" => {
            let s = optional_string(name, args, doc, context)?;
            Ok(XPathValue::String(
                s.split_whitespace().collect::<Vec<_>>().join(" "),
            ))
        }
        "translate" => fn_translate(args, doc),

        // Boolean Functions
        "boolean" => one_arg(name, args).map(|a| XPathValue::Boolean(a.to_boolean())),
        "not" => one_arg(name, args).map(|a| XPathValue::Boolean(!a.to_boolean())),
        "true" => no_args(name, &args).map(|_| XPathValue::Boolean(true)),
        "false" => no_args(name, &args).map(|_| XPathValue::Boolean(false)),
        "lang" => fn_lang(args, doc, context),

        // Number Functions
        "number" => fn_number(args, doc, context),
        "sum" => fn_sum(args, doc),
        "floor" => one_number(name, args, doc).map(|n| XPathValue::Number(n.floor())),
        "ceiling" => one_number(name, args, doc).map(|n| XPathValue::Number(n.ceil())),
        "round" => one_number(name, args, doc).map(|n| XPathValue::Number(xpath_round(n))),

        _ => Err(XPathError::UnknownFunction(name.to_string())),
    }
}

fn arity_error(name: &str, expected: &str) -> XPathError {
    XPathError::Evaluation(format!("{}() requires {}", name, expected))
}

fn no_args(name: &str, args: &[XPathValue]) -> Result<(), XPathError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(arity_error(name, "no arguments"))
    }
}

fn one_arg(name: &str, args: Vec<XPathValue>) -> FnResult {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(arg), None) => Ok(arg),
        _ => Err(arity_error(name, "exactly 1 argument")),
    }
}

fn one_number<D: DocumentAccess + ?Sized>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
) -> Result<f64, XPathError> {
    one_arg(name, args).map(|a| number_of(doc, &a))
}

fn two_strings<D: DocumentAccess + ?Sized>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
) -> Result<[String; 2], XPathError> {
    if args.len() != 2 {
        return Err(arity_error(name, "exactly 2 arguments"));
    }
    Ok([resolve_string(&args[0], doc), resolve_string(&args[1], doc)])
}

/// Zero arguments means the context node's string value
fn optional_string<D: DocumentAccess + ?Sized>(
    name: &str,
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> Result<String, XPathError> {
    match args.as_slice() {
        [] => Ok(doc.string_value(context)),
        [arg] => Ok(resolve_string(arg, doc)),
        _ => Err(arity_error(name, "0 or 1 arguments")),
    }
}

// Node Set Functions

fn fn_count(args: Vec<XPathValue>) -> FnResult {
    match one_arg("count", args)? {
        XPathValue::NodeSet(nodes) => Ok(XPathValue::Number(nodes.len() as f64)),
        XPathValue::Attributes(values) => Ok(XPathValue::Number(values.len() as f64)),
        _ => Err(XPathError::Evaluation(
            "count() argument must be a node-set".to_string(),
        )),
    }
}

/// name(), local-name(), namespace-uri() of the first node of the argument
/// (or of the context node)
fn name_of<'d, F>(name: &str, args: Vec<XPathValue>, context: NodeId, lookup: F) -> FnResult
where
    F: Fn(NodeId) -> Option<&'d str>,
{
    let node = match args.as_slice() {
        [] => Some(context),
        [XPathValue::NodeSet(nodes)] => nodes.first().copied(),
        [XPathValue::Attributes(_)] => None,
        [_] => {
            return Err(XPathError::Evaluation(format!(
                "{}() argument must be a node-set",
                name
            )))
        }
        _ => return Err(arity_error(name, "0 or 1 arguments")),
    };
    let value = node.and_then(lookup).unwrap_or("");
    Ok(XPathValue::String(value.to_string()))
}

// String Functions

fn fn_string<D: DocumentAccess + ?Sized>(
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> FnResult {
    optional_string("string", args, doc, context).map(XPathValue::String)
}

fn fn_concat<D: DocumentAccess + ?Sized>(args: Vec<XPathValue>, doc: &D) -> FnResult {
    if args.len() < 2 {
        return Err(arity_error("concat", "at least 2 arguments"));
    }
    let result: String = args.iter().map(|a| resolve_string(a, doc)).collect();
    Ok(XPathValue::String(result))
}

/// substring(s, start, len?) with XPath's rounding rules: characters at
/// positions p with round(start) <= p < round(start) + round(len)
fn fn_substring<D: DocumentAccess + ?Sized>(args: Vec<XPathValue>, doc: &D) -> FnResult {
    if args.len() < 2 || args.len() > 3 {
        return Err(arity_error("substring", "2 or 3 arguments"));
    }

    let s = resolve_string(&args[0], doc);
    let start = xpath_round(number_of(doc, &args[1]));
    let end = match args.get(2) {
        Some(len) => start + xpath_round(number_of(doc, len)),
        None => f64::INFINITY,
    };

    let result: String = s
        .chars()
        .enumerate()
        .filter(|&(i, _)| {
            let p = (i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect();

    Ok(XPathValue::String(result))
}

fn fn_translate<D: DocumentAccess + ?Sized>(args: Vec<XPathValue>, doc: &D) -> FnResult {
    if args.len() != 3 {
        return Err(arity_error("translate", "exactly 3 arguments"));
    }

    let s = resolve_string(&args[0], doc);
    let from: Vec<char> = resolve_string(&args[1], doc).chars().collect();
    let to: Vec<char> = resolve_string(&args[2], doc).chars().collect();

    let result: String = s
        .chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect();

    Ok(XPathValue::String(result))
}

// Boolean Functions

fn fn_lang<D: DocumentAccess + ?Sized>(
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> FnResult {
    let target_lang = resolve_string(&one_arg("lang", args)?, doc).to_lowercase();

    // Nearest xml:lang on the ancestor-or-self chain decides
    let mut node = Some(context);
    while let Some(current) = node {
        if let Some(lang_val) = doc.get_attribute(current, "xml:lang") {
            let lang_lower = lang_val.to_lowercase();
            let matches = lang_lower == target_lang
                || (lang_lower.starts_with(&target_lang)
                    && lang_lower.as_bytes().get(target_lang.len()) == Some(&b'-'));
            return Ok(XPathValue::Boolean(matches));
        }
        node = doc.parent_of(current);
    }
    Ok(XPathValue::Boolean(false))
}

// Number Functions

fn fn_number<D: DocumentAccess + ?Sized>(
    args: Vec<XPathValue>,
    doc: &D,
    context: NodeId,
) -> FnResult {
    let value = match args.as_slice() {
        [] => string_to_number(&doc.string_value(context)),
        [arg] => number_of(doc, arg),
        _ => return Err(arity_error("number", "0 or 1 arguments")),
    };
    Ok(XPathValue::Number(value))
}

fn fn_sum<D: DocumentAccess + ?Sized>(args: Vec<XPathValue>, doc: &D) -> FnResult {
    let strings: Vec<String> = match one_arg("sum", args)? {
        XPathValue::NodeSet(nodes) => nodes.iter().map(|&n| doc.string_value(n)).collect(),
        XPathValue::Attributes(values) => values,
        _ => {
            return Err(XPathError::Evaluation(
                "sum() argument must be a node-set".to_string(),
            ))
        }
    };
    Ok(XPathValue::Number(
        strings.iter().map(|s| string_to_number(s)).sum(),
    ))
}

/// XPath round: halves round towards positive infinity
fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

/// Convert an XPath value to a string, using document access for node sets
/// (the string-value of the first node in document order).
fn resolve_string<D: DocumentAccess + ?Sized>(val: &XPathValue, doc: &D) -> String {
    match val {
        XPathValue::NodeSet(nodes) => nodes
            .first()
            .map(|&first| doc.string_value(first))
            .unwrap_or_default(),
        _ => val.to_string_value(),
    }
}

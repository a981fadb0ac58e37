//! Parser d'attributs `key=value`
//!
//! Valeurs nues, ou entre guillemets simples/doubles avec échappement de
//! `"`, `'` et `\` par antislash.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{AttrValue, Attributes};

static RE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s=]+)=(?:"((?:\\.|[^"\\])*)"|'((?:\\.|[^'\\])*)'|(\S+))"#)
        .expect("valid key=value regex")
});
static RE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\\(["'\\])"#).expect("valid escape regex"));

/// Codes d'enregistrement retirés en tête des lignes d'attributs
const ATTRIBUTE_RECORDS: [&str; 5] = ["10", "11", "12", "20", "30"];

/// Clé des tokens bruts d'une ligne d'attributs sans paire
pub const RAW_KEY: &str = "_raw";

/// Clé des tokens de fin de ligne `05` sans paire
pub const EXTRA_KEY: &str = "_extra";

/// Extrait toutes les paires `key=value` d'un texte
///
/// Une clé répétée garde la dernière valeur.
pub fn parse_pairs(text: &str) -> Attributes {
    let mut attributes = Attributes::new();
    for caps in RE_PAIR.captures_iter(text) {
        let key = &caps[1];
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| RE_ESCAPE.replace_all(m.as_str(), "$1").into_owned())
            .or_else(|| caps.get(4).map(|m| m.as_str().to_string()))
            .unwrap_or_default();
        attributes.insert(key.to_string(), AttrValue::Text(value));
    }
    attributes
}

/// Parse une ligne d'attributs (`10`, `11`, `12`, `20`, `30`)
///
/// Sans aucune paire, les tokens (code retiré) sont conservés sous `_raw`.
pub fn parse_attributes(line: &str) -> Attributes {
    let body = strip_record_code(line.trim());
    let attributes = parse_pairs(body);
    if !attributes.is_empty() {
        return attributes;
    }

    let tokens = tokens(body);
    let mut raw = Attributes::new();
    if !tokens.is_empty() {
        raw.insert(RAW_KEY.to_string(), AttrValue::List(tokens));
    }
    raw
}

/// Attributs de fin de ligne `05`: paires, sinon `_extra`
pub fn parse_trailing(text: &str) -> Attributes {
    let attributes = parse_pairs(text);
    if !attributes.is_empty() {
        return attributes;
    }

    let tokens = tokens(text);
    let mut extra = Attributes::new();
    if !tokens.is_empty() {
        extra.insert(EXTRA_KEY.to_string(), AttrValue::List(tokens));
    }
    extra
}

fn strip_record_code(line: &str) -> &str {
    let first = line.split_whitespace().next().unwrap_or("");
    if ATTRIBUTE_RECORDS.contains(&first) {
        line[first.len()..].trim_start()
    } else {
        line
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

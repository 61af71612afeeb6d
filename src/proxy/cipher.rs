//! Port cipher resolver
//!
//! Some listing pages hide the port number behind a page-local script: a
//! chain of XOR assignments defines a symbol table, and a later
//! `document.write` renders the port as a `+`-joined sequence of
//! parenthesized XOR groups. Each group decodes to a few digits and the
//! digit strings are concatenated positionally; the groups are never summed.
//!
//! Definitions are strictly left to right. A forward reference means the
//! page format changed, so resolution fails fast instead of guessing.

use std::collections::HashMap;
use thiserror::Error;

/// Decode failures for one page's cipher. The containing record is dropped;
/// parsing of the document continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("malformed operand `{0}`")]
    BadOperand(String),
    #[error("undefined symbol `{0}`")]
    UndefinedSymbol(String),
    #[error("empty port expression")]
    EmptyExpression,
    #[error("decoded port `{0}` out of range")]
    PortOutOfRange(String),
}

/// Page-local symbol table built from one inline assignment script.
#[derive(Debug, Clone, Default)]
pub struct ConstantTable {
    values: HashMap<String, i64>,
}

impl ConstantTable {
    /// Build a table from semicolon-separated assignment statements of the
    /// form `name=OPERAND` or `name=OPERAND^OPERAND`, where an operand is an
    /// integer literal or an already-defined symbol. Statements without `=`
    /// are skipped. Any unresolvable operand fails the whole table; no
    /// partial table is exposed.
    pub fn parse(script: &str) -> Result<ConstantTable, CipherError> {
        let mut values = HashMap::new();

        for statement in script.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            let Some((name, expr)) = statement.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            let value = match expr.split_once('^') {
                Some((first, rest)) => {
                    let second = rest.split('^').next().unwrap_or("");
                    resolve_operand(&values, first)? ^ resolve_operand(&values, second)?
                }
                None => resolve_operand(&values, expr)?,
            };
            values.insert(name.to_string(), value);
        }

        Ok(ConstantTable { values })
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Decode a port expression of the form `(a^b)+(c)+...`.
    ///
    /// Each `+`-separated group resolves to an integer (one operand: direct
    /// lookup; two: XOR of both lookups). The decimal renderings of the
    /// group values are concatenated, and the concatenation is the port.
    pub fn decode_port(&self, expr: &str) -> Result<u16, CipherError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(CipherError::EmptyExpression);
        }

        let mut digits = String::new();
        for group in expr.split('+') {
            let group = group.replace(['(', ')'], "");
            let value = match group.split_once('^') {
                Some((first, rest)) => {
                    let second = rest.split('^').next().unwrap_or("");
                    resolve_operand(&self.values, first)? ^ resolve_operand(&self.values, second)?
                }
                None => resolve_operand(&self.values, &group)?,
            };
            digits.push_str(&value.to_string());
        }

        match digits.parse::<u32>() {
            Ok(port) if (1..=65535).contains(&port) => Ok(port as u16),
            _ => Err(CipherError::PortOutOfRange(digits)),
        }
    }
}

fn resolve_operand(values: &HashMap<String, i64>, operand: &str) -> Result<i64, CipherError> {
    let operand = operand.trim();
    if operand.is_empty() {
        return Err(CipherError::BadOperand(operand.to_string()));
    }
    if let Ok(literal) = operand.parse::<i64>() {
        return Ok(literal);
    }
    if operand.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return Err(CipherError::BadOperand(operand.to_string()));
    }
    values
        .get(operand)
        .copied()
        .ok_or_else(|| CipherError::UndefinedSymbol(operand.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literals_and_xor() {
        let table = ConstantTable::parse("a=5;b=3^a").unwrap();
        assert_eq!(table.get("a"), Some(5));
        assert_eq!(table.get("b"), Some(3 ^ 5));
    }

    #[test]
    fn test_parse_skips_statements_without_assignment() {
        let table = ConstantTable::parse("a=1;;noise;b=2").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_forward_reference_fails() {
        let err = ConstantTable::parse("a=3^b;b=1").unwrap_err();
        assert_eq!(err, CipherError::UndefinedSymbol("b".to_string()));
    }

    #[test]
    fn test_malformed_literal_fails() {
        let err = ConstantTable::parse("a=12x;b=1").unwrap_err();
        assert_eq!(err, CipherError::BadOperand("12x".to_string()));
    }

    #[test]
    fn test_groups_concatenate_never_sum() {
        // 8+0+8 would be 16; the positional concatenation must give 808.
        let table = ConstantTable::parse("x=8;y=0").unwrap();
        let port = table.decode_port("(x)+(y)+(x)").unwrap();
        assert_eq!(port, 808);
    }

    #[test]
    fn test_decode_xor_groups() {
        let table = ConstantTable::parse("a=65;b=66;c=a^b").unwrap();
        assert_eq!(table.get("c"), Some(3));
        // (65^66) renders "3", (c) renders "3" -> "33"
        assert_eq!(table.decode_port("(a^b)+(c)").unwrap(), 33);
    }

    #[test]
    fn test_decode_unknown_symbol_fails() {
        let table = ConstantTable::parse("a=8").unwrap();
        assert_eq!(
            table.decode_port("(a)+(missing)").unwrap_err(),
            CipherError::UndefinedSymbol("missing".to_string())
        );
    }

    #[test]
    fn test_decode_out_of_range_port() {
        let table = ConstantTable::parse("big=99999").unwrap();
        assert!(matches!(
            table.decode_port("(big)"),
            Err(CipherError::PortOutOfRange(_))
        ));

        let table = ConstantTable::parse("z=0").unwrap();
        assert!(matches!(
            table.decode_port("(z)"),
            Err(CipherError::PortOutOfRange(_))
        ));
    }

    #[test]
    fn test_decode_empty_expression() {
        let table = ConstantTable::parse("a=1").unwrap();
        assert_eq!(
            table.decode_port("  ").unwrap_err(),
            CipherError::EmptyExpression
        );
    }

    #[test]
    fn test_realistic_page_table() {
        // Shape observed on real listing pages: long chains where most
        // symbols are defined in terms of earlier ones.
        let script = "s4a0e2=3553;x3f1b9=53553^s4a0e2;q9c7d1=50000^x3f1b9";
        let table = ConstantTable::parse(script).unwrap();
        assert_eq!(table.get("s4a0e2"), Some(3553));
        assert_eq!(table.get("x3f1b9"), Some(53553 ^ 3553));
        let port = table
            .decode_port("(s4a0e2^x3f1b9)")
            .unwrap();
        assert_eq!(port as i64, 3553 ^ (53553 ^ 3553));
    }
}

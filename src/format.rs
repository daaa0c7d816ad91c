//! Text form of an individual: a sum of `coefficient * function(x1^e1 *
//! x2^e2 * ...)` terms, one per line's worth of summands joined by `" + "`.
//! Round-trips through [`parse`] (the only contractual property per the
//! external-interface surface: no file or wire format is defined here).

use crate::function::FunctionKind;
use crate::individual::Individual;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("empty term in formatted individual")]
    EmptyTerm,
    #[error("unknown function kind {0:?}")]
    UnknownFunction(String),
    #[error("malformed coefficient in term {0:?}")]
    BadCoefficient(String),
    #[error("malformed exponent in factor {0:?}")]
    BadExponent(String),
    #[error("individual has no terms")]
    EmptyIndividual,
}

fn format_monomial(exponent: &[f64]) -> String {
    exponent
        .iter()
        .enumerate()
        .filter(|(_, &e)| e != 0.0)
        .map(|(j, e)| format!("x{}^{}", j, e))
        .collect::<Vec<_>>()
        .join("*")
}

fn format_term(coefficient: f64, function: FunctionKind, exponent: &[f64]) -> String {
    let monomial = format_monomial(exponent);
    let monomial = if monomial.is_empty() { "1".to_string() } else { monomial };
    if function == FunctionKind::Identity {
        format!("{}*{}", coefficient, monomial)
    } else {
        format!("{}*{}({})", coefficient, function.name(), monomial)
    }
}

/// Renders an individual as `c0*f0(...) + c1*f1(...) + ...`.
pub fn format(individual: &Individual) -> String {
    (0..individual.length())
        .map(|i| {
            let (c, f, e) = individual.term(i);
            format_term(c, f, e)
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

fn parse_monomial(text: &str) -> Result<Vec<f64>, FormatError> {
    if text == "1" {
        return Ok(Vec::new());
    }
    let mut exponents: Vec<(usize, f64)> = Vec::new();
    for factor in text.split('*') {
        let rest = factor
            .strip_prefix('x')
            .ok_or_else(|| FormatError::BadExponent(factor.to_string()))?;
        let (var_idx, exp) = rest
            .split_once('^')
            .ok_or_else(|| FormatError::BadExponent(factor.to_string()))?;
        let var_idx: usize = var_idx
            .parse()
            .map_err(|_| FormatError::BadExponent(factor.to_string()))?;
        let exp: f64 = exp.parse().map_err(|_| FormatError::BadExponent(factor.to_string()))?;
        exponents.push((var_idx, exp));
    }
    let dim = exponents.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
    let mut out = vec![0.0; dim];
    for (i, e) in exponents {
        out[i] = e;
    }
    Ok(out)
}

fn parse_term(text: &str) -> Result<(f64, FunctionKind, Vec<f64>), FormatError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(FormatError::EmptyTerm);
    }
    let (coeff_str, rest) = text.split_once('*').ok_or_else(|| FormatError::BadCoefficient(text.to_string()))?;
    let coefficient: f64 = coeff_str
        .parse()
        .map_err(|_| FormatError::BadCoefficient(coeff_str.to_string()))?;

    if let Some(open) = rest.find('(') {
        let name = &rest[..open];
        let inner = rest
            .strip_prefix(name)
            .and_then(|s| s.strip_prefix('('))
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| FormatError::UnknownFunction(rest.to_string()))?;
        let function =
            FunctionKind::parse(name).ok_or_else(|| FormatError::UnknownFunction(name.to_string()))?;
        let exponent = parse_monomial(inner)?;
        Ok((coefficient, function, exponent))
    } else {
        let exponent = parse_monomial(rest)?;
        Ok((coefficient, FunctionKind::Identity, exponent))
    }
}

/// Inverse of [`format`]; the resulting individual always has `birth = 0`
/// since no provenance is carried in the text form.
pub fn parse(text: &str) -> Result<Individual, FormatError> {
    let mut coefficients = Vec::new();
    let mut functions = Vec::new();
    let mut exponents = Vec::new();
    let dim = text
        .split('+')
        .map(|term| parse_term(term).map(|(_, _, e)| e.len()))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .max()
        .unwrap_or(0);

    for term in text.split('+') {
        let (c, f, mut e) = parse_term(term)?;
        e.resize(dim, 0.0);
        coefficients.push(c);
        functions.push(f);
        exponents.push(e);
    }
    if coefficients.is_empty() {
        return Err(FormatError::EmptyIndividual);
    }
    Ok(Individual::new(coefficients, functions, exponents, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::dispatch::DispatchTable;

    fn sample() -> Individual {
        Individual::new(
            vec![2.0, -1.5],
            vec![FunctionKind::Identity, FunctionKind::Sin],
            vec![vec![1.0, 0.0], vec![0.0, 2.0]],
            7,
        )
    }

    #[test]
    fn format_renders_expected_text() {
        let text = format(&sample());
        assert_eq!(text, "2*x0^1 + -1.5*sin(x1^2)");
    }

    #[test]
    fn round_trip_through_parse_agrees_on_evaluation() {
        let _dataset = Dataset::new(ndarray::array![[1.0, 2.0], [3.0, 4.0]], &["x0", "x1"]);
        let dispatch = DispatchTable::new();
        let original = sample();
        let text = format(&original);
        let parsed = parse(&text).unwrap();

        for row in [[1.0, 2.0], [3.0, 4.0], [-1.0, 0.5]] {
            let a = original.evaluate_at(&row, &dispatch);
            let b = parsed.evaluate_at(&row, &dispatch);
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }

    #[test]
    fn parse_rejects_empty_input() {
        assert_eq!(parse("").unwrap_err(), FormatError::EmptyTerm);
    }

    #[test]
    fn parse_rejects_unknown_function() {
        let err = parse("1*bogus(x0^1)").unwrap_err();
        assert!(matches!(err, FormatError::UnknownFunction(_)));
    }

    #[test]
    fn constant_term_round_trips_as_bare_monomial_one() {
        let individual = Individual::new(vec![3.5], vec![FunctionKind::Identity], vec![vec![0.0, 0.0]], 0);
        let text = format(&individual);
        assert_eq!(text, "3.5*1");
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.coefficients(), &[3.5]);
    }
}

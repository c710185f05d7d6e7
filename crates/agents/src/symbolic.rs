//! Whitelisted symbolic-math dispatcher for the Solver.
//!
//! The solver model may request exactly one computation per solve as a
//! function call against this enumerated capability table. There is no
//! code execution: requests are data, every function is implemented here,
//! and anything unrecognized or malformed comes back as an error string
//! rather than a failure.
//!
//! Supported functions:
//!
//! - `solve(expr[, var])` - roots of a linear or quadratic univariate equation
//! - `simplify(expr)` - canonical form of a univariate polynomial
//! - `diff(expr)` - derivative of a univariate polynomial
//! - `integrate(expr)` - antiderivative of a univariate polynomial
//! - `limit(expr, point)` - polynomial value at a point (polynomials are continuous)
//! - `det(matrix)` - determinant of a square matrix given as JSON rows
//! - `eval(expr)` - arithmetic over numbers and the constants `pi`, `e`

use mentor_common::ToolCall;
use tracing::debug;

/// Run one whitelisted call. Errors are captured in the returned string.
pub fn dispatch(call: &ToolCall) -> String {
    debug!(function = %call.function, args = ?call.args, "Dispatching symbolic tool call");
    match run(call) {
        Ok(result) => result,
        Err(e) => format!("error: {e}"),
    }
}

fn run(call: &ToolCall) -> Result<String, String> {
    let arg = |i: usize| -> Result<&str, String> {
        call.args
            .get(i)
            .map(|s| s.as_str())
            .ok_or_else(|| format!("{} requires at least {} argument(s)", call.function, i + 1))
    };

    match call.function.as_str() {
        "solve" => {
            let poly = parse_equation(arg(0)?)?;
            solve_poly(&poly)
        }
        "simplify" => {
            let poly = Poly::parse(arg(0)?)?;
            Ok(poly.render())
        }
        "diff" => {
            let poly = Poly::parse(arg(0)?)?;
            Ok(poly.derivative().render())
        }
        "integrate" => {
            let poly = Poly::parse(arg(0)?)?;
            Ok(format!("{} + C", poly.antiderivative().render()))
        }
        "limit" => {
            let poly = Poly::parse(arg(0)?)?;
            let point = parse_number(arg(1)?)?;
            Ok(format_num(poly.eval(point)))
        }
        "det" => {
            let matrix: Vec<Vec<f64>> = serde_json::from_str(arg(0)?)
                .map_err(|e| format!("matrix must be JSON rows of numbers: {e}"))?;
            determinant(&matrix).map(format_num)
        }
        "eval" => {
            let value = eval_arithmetic(arg(0)?)?;
            Ok(format_num(value))
        }
        other => Err(format!("unknown function '{other}'")),
    }
}

/// A univariate polynomial; `coeffs[i]` is the coefficient of power `i`.
#[derive(Debug, Clone, PartialEq)]
struct Poly {
    coeffs: Vec<f64>,
    var: char,
}

impl Poly {
    fn parse(input: &str) -> Result<Self, String> {
        let cleaned: String = input
            .replace('²', "^2")
            .replace('³', "^3")
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '*')
            .collect();

        if cleaned.is_empty() {
            return Err("empty expression".to_string());
        }

        let var = cleaned
            .chars()
            .find(|c| c.is_ascii_alphabetic())
            .unwrap_or('x');

        let mut coeffs: Vec<f64> = Vec::new();
        for term in split_terms(&cleaned) {
            let (power, coef) = parse_term(&term, var)?;
            if coeffs.len() <= power {
                coeffs.resize(power + 1, 0.0);
            }
            coeffs[power] += coef;
        }

        let mut poly = Poly { coeffs, var };
        poly.trim();
        Ok(poly)
    }

    fn trim(&mut self) {
        while self.coeffs.len() > 1 && self.coeffs.last() == Some(&0.0) {
            self.coeffs.pop();
        }
        if self.coeffs.is_empty() {
            self.coeffs.push(0.0);
        }
    }

    fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    fn derivative(&self) -> Poly {
        if self.degree() == 0 {
            return Poly {
                coeffs: vec![0.0],
                var: self.var,
            };
        }
        let coeffs = self
            .coeffs
            .iter()
            .enumerate()
            .skip(1)
            .map(|(power, c)| c * power as f64)
            .collect();
        let mut poly = Poly {
            coeffs,
            var: self.var,
        };
        poly.trim();
        poly
    }

    fn antiderivative(&self) -> Poly {
        let mut coeffs = vec![0.0];
        coeffs.extend(
            self.coeffs
                .iter()
                .enumerate()
                .map(|(power, c)| c / (power + 1) as f64),
        );
        let mut poly = Poly {
            coeffs,
            var: self.var,
        };
        poly.trim();
        poly
    }

    fn render(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for (power, &coef) in self.coeffs.iter().enumerate().rev() {
            if coef == 0.0 && self.degree() > 0 {
                continue;
            }
            let magnitude = coef.abs();
            let body = match power {
                0 => format_num(magnitude),
                1 if magnitude == 1.0 => self.var.to_string(),
                1 => format!("{}{}", format_num(magnitude), self.var),
                _ if magnitude == 1.0 => format!("{}^{}", self.var, power),
                _ => format!("{}{}^{}", format_num(magnitude), self.var, power),
            };
            if parts.is_empty() {
                parts.push(if coef < 0.0 { format!("-{body}") } else { body });
            } else {
                parts.push(format!("{} {}", if coef < 0.0 { "-" } else { "+" }, body));
            }
        }
        if parts.is_empty() {
            "0".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// Split on top-level `+`/`-`, keeping each term's sign. `^-` exponents are
/// not supported, so every `+`/`-` is a term boundary except a leading one.
fn split_terms(s: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut current = String::new();
    for (i, c) in s.char_indices() {
        if (c == '+' || c == '-') && i > 0 {
            if !current.is_empty() {
                terms.push(std::mem::take(&mut current));
            }
        }
        // '+' is only a separator; '-' belongs to the next term's sign
        if c != '+' {
            current.push(c);
        }
    }
    if !current.is_empty() {
        terms.push(current);
    }
    terms
}

/// Parse one term like `5x`, `-x^2`, `3.5`, `x` into `(power, coefficient)`.
fn parse_term(term: &str, var: char) -> Result<(usize, f64), String> {
    let (coef_str, power) = match term.find(var) {
        None => (term, 0usize),
        Some(pos) => {
            let after = &term[pos + var.len_utf8()..];
            let power = if let Some(exp) = after.strip_prefix('^') {
                exp.parse::<usize>()
                    .map_err(|_| format!("bad exponent in term '{term}'"))?
            } else if after.is_empty() {
                1
            } else {
                return Err(format!("unexpected trailing '{after}' in term '{term}'"));
            };
            (&term[..pos], power)
        }
    };

    let coef = match coef_str {
        "" | "+" => 1.0,
        "-" => -1.0,
        s => s
            .parse::<f64>()
            .map_err(|_| format!("bad coefficient '{s}' in term '{term}'"))?,
    };

    Ok((power, coef))
}

/// Parse `lhs = rhs` (or a bare expression, treated as `expr = 0`) into a
/// single polynomial whose roots solve the equation.
fn parse_equation(input: &str) -> Result<Poly, String> {
    match input.split_once('=') {
        None => Poly::parse(input),
        Some((lhs, rhs)) => {
            let left = Poly::parse(lhs)?;
            let right = Poly::parse(rhs)?;
            let len = left.coeffs.len().max(right.coeffs.len());
            let mut coeffs = vec![0.0; len];
            for (i, c) in left.coeffs.iter().enumerate() {
                coeffs[i] += c;
            }
            for (i, c) in right.coeffs.iter().enumerate() {
                coeffs[i] -= c;
            }
            let mut poly = Poly {
                coeffs,
                var: left.var,
            };
            poly.trim();
            Ok(poly)
        }
    }
}

fn solve_poly(poly: &Poly) -> Result<String, String> {
    let var = poly.var;
    match poly.degree() {
        0 => {
            if poly.coeffs[0] == 0.0 {
                Ok(format!("all {var} satisfy the equation"))
            } else {
                Ok("no solution".to_string())
            }
        }
        1 => {
            let root = -poly.coeffs[0] / poly.coeffs[1];
            Ok(format!("{var} = {}", format_num(root)))
        }
        2 => {
            let a = poly.coeffs[2];
            let b = poly.coeffs[1];
            let c = poly.coeffs[0];
            let disc = b * b - 4.0 * a * c;
            if disc < 0.0 {
                Ok(format!(
                    "no real roots (discriminant = {})",
                    format_num(disc)
                ))
            } else if disc == 0.0 {
                Ok(format!("{var} = {}", format_num(-b / (2.0 * a))))
            } else {
                let sqrt_disc = disc.sqrt();
                let mut r1 = (-b - sqrt_disc) / (2.0 * a);
                let mut r2 = (-b + sqrt_disc) / (2.0 * a);
                if r1 > r2 {
                    std::mem::swap(&mut r1, &mut r2);
                }
                Ok(format!(
                    "{var} = {} or {var} = {}",
                    format_num(r1),
                    format_num(r2)
                ))
            }
        }
        d => Err(format!(
            "only linear and quadratic equations are supported (degree {d})"
        )),
    }
}

fn determinant(matrix: &[Vec<f64>]) -> Result<f64, String> {
    let n = matrix.len();
    if n == 0 {
        return Err("empty matrix".to_string());
    }
    if matrix.iter().any(|row| row.len() != n) {
        return Err("matrix must be square".to_string());
    }
    Ok(det_recursive(matrix))
}

fn det_recursive(m: &[Vec<f64>]) -> f64 {
    let n = m.len();
    match n {
        1 => m[0][0],
        2 => m[0][0] * m[1][1] - m[0][1] * m[1][0],
        _ => {
            let mut sum = 0.0;
            for col in 0..n {
                let minor: Vec<Vec<f64>> = m[1..]
                    .iter()
                    .map(|row| {
                        row.iter()
                            .enumerate()
                            .filter(|(i, _)| *i != col)
                            .map(|(_, v)| *v)
                            .collect()
                    })
                    .collect();
                let sign = if col % 2 == 0 { 1.0 } else { -1.0 };
                sum += sign * m[0][col] * det_recursive(&minor);
            }
            sum
        }
    }
}

fn parse_number(s: &str) -> Result<f64, String> {
    match s.trim() {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        other => other
            .parse::<f64>()
            .map_err(|_| format!("bad number '{other}'")),
    }
}

/// Recursive-descent arithmetic over `+ - * / ^`, parentheses, numbers and
/// the constants `pi` and `e`.
fn eval_arithmetic(input: &str) -> Result<f64, String> {
    let tokens: Vec<char> = input.chars().filter(|c| !c.is_whitespace()).collect();
    let mut pos = 0;
    let value = parse_expr(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(format!("unexpected input at position {pos}"));
    }
    Ok(value)
}

fn parse_expr(tokens: &[char], pos: &mut usize) -> Result<f64, String> {
    let mut value = parse_product(tokens, pos)?;
    while let Some(&op) = tokens.get(*pos) {
        match op {
            '+' => {
                *pos += 1;
                value += parse_product(tokens, pos)?;
            }
            '-' => {
                *pos += 1;
                value -= parse_product(tokens, pos)?;
            }
            _ => break,
        }
    }
    Ok(value)
}

fn parse_product(tokens: &[char], pos: &mut usize) -> Result<f64, String> {
    let mut value = parse_power(tokens, pos)?;
    while let Some(&op) = tokens.get(*pos) {
        match op {
            '*' => {
                *pos += 1;
                value *= parse_power(tokens, pos)?;
            }
            '/' => {
                *pos += 1;
                let divisor = parse_power(tokens, pos)?;
                if divisor == 0.0 {
                    return Err("division by zero".to_string());
                }
                value /= divisor;
            }
            _ => break,
        }
    }
    Ok(value)
}

fn parse_power(tokens: &[char], pos: &mut usize) -> Result<f64, String> {
    let base = parse_unary(tokens, pos)?;
    if tokens.get(*pos) == Some(&'^') {
        *pos += 1;
        let exponent = parse_power(tokens, pos)?;
        Ok(base.powf(exponent))
    } else {
        Ok(base)
    }
}

fn parse_unary(tokens: &[char], pos: &mut usize) -> Result<f64, String> {
    if tokens.get(*pos) == Some(&'-') {
        *pos += 1;
        return Ok(-parse_unary(tokens, pos)?);
    }
    parse_primary(tokens, pos)
}

fn parse_primary(tokens: &[char], pos: &mut usize) -> Result<f64, String> {
    match tokens.get(*pos) {
        Some('(') => {
            *pos += 1;
            let value = parse_expr(tokens, pos)?;
            if tokens.get(*pos) != Some(&')') {
                return Err("missing closing parenthesis".to_string());
            }
            *pos += 1;
            Ok(value)
        }
        Some(c) if c.is_ascii_digit() || *c == '.' => {
            let start = *pos;
            while tokens
                .get(*pos)
                .map(|c| c.is_ascii_digit() || *c == '.')
                .unwrap_or(false)
            {
                *pos += 1;
            }
            let number: String = tokens[start..*pos].iter().collect();
            number
                .parse::<f64>()
                .map_err(|_| format!("bad number '{number}'"))
        }
        Some(c) if c.is_ascii_alphabetic() => {
            let start = *pos;
            while tokens
                .get(*pos)
                .map(|c| c.is_ascii_alphabetic())
                .unwrap_or(false)
            {
                *pos += 1;
            }
            let name: String = tokens[start..*pos].iter().collect();
            match name.as_str() {
                "pi" => Ok(std::f64::consts::PI),
                "e" => Ok(std::f64::consts::E),
                other => Err(format!("unknown constant '{other}'")),
            }
        }
        Some(c) => Err(format!("unexpected character '{c}'")),
        None => Err("unexpected end of expression".to_string()),
    }
}

fn format_num(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let formatted = format!("{value:.6}");
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

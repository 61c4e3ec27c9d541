//! Numeric literal canonicalization
//!
//! A number is split into sign, integer digits, the run of zeros after the
//! decimal point, the remaining fraction digits, and an optional exponent,
//! then reassembled in its shortest equivalent spelling:
//!
//! | input      | output   |
//! |------------|----------|
//! | `0.500000` | `.5`     |
//! | `2.000`    | `2`      |
//! | `-0.0`     | `0`      |
//! | `1.5e+010` | `1.5e10` |
//!
//! Reassembly is idempotent. Text that does not parse as a decimal number
//! (hex literals, stray signs) is passed through untouched.

use std::borrow::Cow;

/// Decomposed decimal literal borrowing its digit runs from the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberParts<'a> {
    negative: bool,
    /// Integer digits without leading zeros
    before_dot: &'a str,
    /// Zeros between the decimal point and the first significant fraction digit
    zeros_after_dot: usize,
    /// Fraction digits after the zero run, trailing zeros removed
    after_dot: &'a str,
    exponent: Option<i32>,
}

impl<'a> NumberParts<'a> {
    /// Decompose `text`, or `None` when it is not a plain decimal literal
    pub fn parse(text: &'a str) -> Option<Self> {
        let (negative, body) = match text.as_bytes().first()? {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };

        let (mantissa, exponent) = match body.find(['e', 'E']) {
            Some(pos) => {
                let exp_text = &body[pos + 1..];
                let exp_digits = exp_text.strip_prefix(['+', '-']).unwrap_or(exp_text);
                if exp_digits.is_empty() || !exp_digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let exp_text = exp_text.strip_prefix('+').unwrap_or(exp_text);
                (&body[..pos], Some(exp_text.parse::<i32>().ok()?))
            }
            None => (body, None),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let before_dot = int_part.trim_start_matches('0');
        let frac_trimmed = frac_part.trim_end_matches('0');
        let after_dot = frac_trimmed.trim_start_matches('0');
        let zeros_after_dot = frac_trimmed.len() - after_dot.len();

        Some(Self {
            negative,
            before_dot,
            zeros_after_dot,
            after_dot,
            exponent,
        })
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn value_before_dot(&self) -> &'a str {
        self.before_dot
    }

    pub fn zeros_after_dot(&self) -> usize {
        self.zeros_after_dot
    }

    pub fn value_after_dot(&self) -> &'a str {
        self.after_dot
    }

    pub fn exponent(&self) -> Option<i32> {
        self.exponent
    }

    /// Neither integer nor fraction digits survive trimming
    pub fn is_zero(&self) -> bool {
        self.before_dot.is_empty() && self.after_dot.is_empty()
    }

    /// Shortest spelling of the same value
    pub fn canonical(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }

        let mut out = String::with_capacity(
            self.before_dot.len() + self.zeros_after_dot + self.after_dot.len() + 6,
        );
        if self.negative {
            out.push('-');
        }
        out.push_str(self.before_dot);
        if !self.after_dot.is_empty() {
            out.push('.');
            out.extend(std::iter::repeat('0').take(self.zeros_after_dot));
            out.push_str(self.after_dot);
        }
        if let Some(exp) = self.exponent.filter(|e| *e != 0) {
            out.push('e');
            out.push_str(&exp.to_string());
        }
        out
    }
}

/// Canonical text for a number token, or the input when it cannot be parsed
pub fn canonicalize(text: &str) -> Cow<'_, str> {
    match NumberParts::parse(text) {
        Some(parts) => {
            let canonical = parts.canonical();
            if canonical == text {
                Cow::Borrowed(text)
            } else {
                Cow::Owned(canonical)
            }
        }
        None => Cow::Borrowed(text),
    }
}

/// Format `value` with `digits` significant digits, canonicalized
pub fn format_significant(value: f64, digits: u32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let digits = digits.max(1) as usize;
    let scientific = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exp)) = scientific.split_once('e') else {
        return canonicalize(&scientific).into_owned();
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return canonicalize(&scientific).into_owned();
    };

    let (negative, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa),
    };
    let digit_str: String = mantissa.chars().filter(|c| *c != '.').collect();

    // Keep plain positional notation for the ranges VRML files actually use
    let plain = if (-7..=15).contains(&exp) {
        let point = exp + 1;
        if point <= 0 {
            format!(".{}{}", "0".repeat((-point) as usize), digit_str)
        } else if point as usize >= digit_str.len() {
            format!("{}{}", digit_str, "0".repeat(point as usize - digit_str.len()))
        } else {
            let (int_digits, frac_digits) = digit_str.split_at(point as usize);
            format!("{}.{}", int_digits, frac_digits)
        }
    } else {
        format!("{}e{}", mantissa, exp)
    };

    let signed = if negative { format!("-{}", plain) } else { plain };
    canonicalize(&signed).into_owned()
}

/// Fixed-point rendering of an integer scaled by `10^resolution`
///
/// `12345` at resolution 3 prints `12.345`; `5` prints `.005`; `-1500`
/// prints `-1.5`.
pub fn format_at_resolution(value: i64, resolution: u32) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let resolution = resolution as usize;

    let (int_digits, frac_digits) = if digits.len() > resolution {
        let (i, f) = digits.split_at(digits.len() - resolution);
        (i.to_string(), f.to_string())
    } else {
        (String::new(), format!("{}{}", "0".repeat(resolution - digits.len()), digits))
    };

    let text = if frac_digits.is_empty() {
        int_digits
    } else {
        format!("{}.{}", int_digits, frac_digits)
    };
    let text = if negative { format!("-{}", text) } else { text };
    canonicalize(&text).into_owned()
}

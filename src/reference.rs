//! Reference-string grammar.
//!
//! ```text
//! limit-ref   := "unlimited" | "disabled" | real-ref
//! real-ref    := digits [unit-code] "-" period-ref ["-cal"]
//! period-ref  := unit-name | unit-name "_x" digits
//! set-ref     := limit-ref ("," limit-ref)*
//! ```
//!
//! Input is tokenized first and then parsed with one token of lookahead.
//! Anything outside the grammar is rejected with the byte offset of the
//! offending token; matching is case-insensitive.

use tracing::debug;

use crate::calendar::{CalendarPeriodType, CalendarUnit};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::limit::Limit;
use crate::unit::DisplayUnit;

const UNLIMITED: &str = "unlimited";
const DISABLED: &str = "disabled";
const CALENDAR_SUFFIX: &str = "cal";
const SCALE_MARKER: &str = "x";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Digits,
    Letters,
    Dash,
    Underscore,
    Comma,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    offset: usize,
}

fn tokenize<'a>(original: &str, lowered: &'a str) -> Result<Vec<Token<'a>>, DecodeError> {
    let mut tokens = Vec::new();
    let mut chars = lowered.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let kind = match c {
            '0'..='9' => TokenKind::Digits,
            'a'..='z' => TokenKind::Letters,
            '-' => TokenKind::Dash,
            '_' => TokenKind::Underscore,
            ',' => TokenKind::Comma,
            other => {
                return Err(DecodeError::new(original, offset, DecodeErrorKind::UnexpectedChar(other)));
            }
        };

        let mut end = offset + c.len_utf8();
        if matches!(kind, TokenKind::Digits | TokenKind::Letters) {
            while let Some(&(next_offset, next)) = chars.peek() {
                let same_run = match kind {
                    TokenKind::Digits => next.is_ascii_digit(),
                    _ => next.is_ascii_lowercase(),
                };
                if !same_run {
                    break;
                }
                end = next_offset + next.len_utf8();
                chars.next();
            }
        }

        tokens.push(Token {
            kind,
            text: &lowered[offset..end],
            offset,
        });
    }

    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, lowered: &'a str) -> Result<Self, DecodeError> {
        if input.is_empty() {
            return Err(DecodeError::new(input, 0, DecodeErrorKind::Empty));
        }
        Ok(Self {
            input,
            tokens: tokenize(input, lowered)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, offset: usize, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(self.input, offset, kind)
    }

    fn unexpected(&self, token: Token<'_>, expected: &'static str) -> DecodeError {
        self.error(
            token.offset,
            DecodeErrorKind::UnexpectedToken {
                expected,
                found: format!("{:?}", token.text),
            },
        )
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token<'a>, DecodeError> {
        match self.bump() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(self.unexpected(token, expected)),
            None => Err(self.error(self.input.len(), DecodeErrorKind::UnexpectedEnd(expected))),
        }
    }

    fn expect_end(&mut self) -> Result<(), DecodeError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.unexpected(token, "end of input")),
        }
    }

    fn at_limit_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token { kind: TokenKind::Comma, .. }))
    }

    fn limit_set(&mut self) -> Result<Vec<Limit>, DecodeError> {
        let mut limits = vec![self.limit()?];
        while self.peek().is_some() {
            self.expect(TokenKind::Comma, "`,`")?;
            limits.push(self.limit()?);
        }
        Ok(limits)
    }

    fn limit(&mut self) -> Result<Limit, DecodeError> {
        let head = match self.bump() {
            Some(token) => token,
            None => {
                return Err(self.error(self.input.len(), DecodeErrorKind::UnexpectedEnd("limit reference")));
            }
        };

        match head.kind {
            TokenKind::Letters if head.text == UNLIMITED => self.sentinel(Limit::UNLIMITED),
            TokenKind::Letters if head.text == DISABLED => self.sentinel(Limit::DISABLED),
            TokenKind::Digits => self.real_limit(head),
            _ => Err(self.unexpected(head, "a count, `unlimited` or `disabled`")),
        }
    }

    fn sentinel(&mut self, limit: Limit) -> Result<Limit, DecodeError> {
        match self.peek() {
            Some(token) if !self.at_limit_end() => Err(self.unexpected(token, "`,` or end of input")),
            _ => Ok(limit),
        }
    }

    fn real_limit(&mut self, count: Token<'a>) -> Result<Limit, DecodeError> {
        let value: u64 = count
            .text
            .parse()
            .map_err(|_| self.error(count.offset, DecodeErrorKind::InvalidNumber(count.text.to_string())))?;

        let unit = match self.peek() {
            Some(token) if token.kind == TokenKind::Letters => {
                self.bump();
                DisplayUnit::from_code(token.text)
                    .ok_or_else(|| self.error(token.offset, DecodeErrorKind::UnknownUnit(token.text.to_string())))?
            }
            _ => DisplayUnit::default(),
        };

        self.expect(TokenKind::Dash, "`-`")?;
        let period_type = self.period_type()?;

        let is_calendar_aligned = match self.peek() {
            Some(token) if token.kind == TokenKind::Dash => {
                self.bump();
                let suffix = self.expect(TokenKind::Letters, "`cal`")?;
                if suffix.text != CALENDAR_SUFFIX {
                    return Err(self.unexpected(suffix, "`cal`"));
                }
                true
            }
            _ => false,
        };

        if let Some(token) = self.peek() {
            if !self.at_limit_end() {
                return Err(self.unexpected(token, "`-cal`, `,` or end of input"));
            }
        }

        Limit::try_new(Some(value), Some(period_type), Some(is_calendar_aligned), unit)
            .map_err(|err| self.error(count.offset, DecodeErrorKind::Inconsistent(err)))
    }

    fn period_type(&mut self) -> Result<CalendarPeriodType, DecodeError> {
        let name = self.expect(TokenKind::Letters, "a period name")?;
        let base = CalendarPeriodType::all()
            .into_iter()
            .find(|period_type| period_type.ref_base() == name.text)
            .ok_or_else(|| self.error(name.offset, DecodeErrorKind::UnknownPeriod(name.text.to_string())))?;

        if !matches!(self.peek(), Some(Token { kind: TokenKind::Underscore, .. })) {
            return Ok(base);
        }
        self.bump();

        let marker = self.expect(TokenKind::Letters, "`x`")?;
        if marker.text != SCALE_MARKER {
            return Err(self.unexpected(marker, "`x`"));
        }
        let digits = self.expect(TokenKind::Digits, "a scale factor")?;
        let invalid_scale = || self.error(name.offset, DecodeErrorKind::InvalidScale(name.text.to_string()));

        if !matches!(base, CalendarPeriodType::Day(_)) {
            return Err(invalid_scale());
        }
        let factor: u32 = digits
            .text
            .parse()
            .map_err(|_| self.error(digits.offset, DecodeErrorKind::InvalidNumber(digits.text.to_string())))?;
        CalendarPeriodType::days(factor).map_err(|_| invalid_scale())
    }
}

fn rejected<T>(kind: &'static str, result: Result<T, DecodeError>) -> Result<T, DecodeError> {
    result.inspect_err(|err| debug!(kind, %err, "rejected reference"))
}

pub(crate) fn parse_limit(input: &str) -> Result<Limit, DecodeError> {
    let lowered = input.to_ascii_lowercase();
    let result = Parser::new(input, &lowered).and_then(|mut parser| {
        let limit = parser.limit()?;
        parser.expect_end()?;
        Ok(limit)
    });
    rejected("limit", result)
}

pub(crate) fn parse_limit_set(input: &str) -> Result<Vec<Limit>, DecodeError> {
    let lowered = input.to_ascii_lowercase();
    let result = Parser::new(input, &lowered).and_then(|mut parser| parser.limit_set());
    rejected("limit set", result)
}

pub(crate) fn parse_period_type(input: &str) -> Result<CalendarPeriodType, DecodeError> {
    let lowered = input.to_ascii_lowercase();
    let result = Parser::new(input, &lowered).and_then(|mut parser| {
        let period_type = parser.period_type()?;
        parser.expect_end()?;
        Ok(period_type)
    });
    rejected("period type", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(input: &str) -> DecodeErrorKind {
        parse_limit(input).unwrap_err().kind
    }

    #[test]
    fn test_tokenize_runs() {
        let tokens = tokenize("10i-day_x10-cal", "10i-day_x10-cal").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Digits,
                TokenKind::Letters,
                TokenKind::Dash,
                TokenKind::Letters,
                TokenKind::Underscore,
                TokenKind::Letters,
                TokenKind::Digits,
                TokenKind::Dash,
                TokenKind::Letters,
            ]
        );
        assert_eq!(tokens[6].text, "10");
        assert_eq!(tokens[6].offset, 9);
    }

    #[test]
    fn test_parse_real_limits() {
        let limit = parse_limit("10-day-cal").unwrap();
        assert_eq!(limit.limit(), Some(10));
        assert_eq!(limit.period_type(), Some(CalendarPeriodType::DAY));
        assert_eq!(limit.is_calendar_aligned(), Some(true));

        let limit = parse_limit("100-month").unwrap();
        assert_eq!(limit.is_calendar_aligned(), Some(false));

        let limit = parse_limit("5R-DAY_X10").unwrap();
        assert_eq!(limit.unit(), DisplayUnit::Report);
        assert_eq!(limit.period_type(), Some(CalendarPeriodType::DAY_X10));
    }

    #[test]
    fn test_parse_sentinels() {
        assert!(parse_limit("unlimited").unwrap().is_unlimited());
        assert!(parse_limit("Disabled").unwrap().is_disabled());
        assert!(matches!(kind_of("unlimited-day"), DecodeErrorKind::UnexpectedToken { .. }));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(kind_of(""), DecodeErrorKind::Empty);
        assert_eq!(kind_of("10 day"), DecodeErrorKind::UnexpectedChar(' '));
        assert_eq!(kind_of("10"), DecodeErrorKind::UnexpectedEnd("`-`"));
        assert_eq!(kind_of("10kg-day"), DecodeErrorKind::UnknownUnit("kg".into()));
        assert_eq!(kind_of("10-fortnight"), DecodeErrorKind::UnknownPeriod("fortnight".into()));
        assert_eq!(kind_of("10-month_x2"), DecodeErrorKind::InvalidScale("month".into()));
        assert_eq!(kind_of("10-day_x0"), DecodeErrorKind::InvalidScale("day".into()));
        assert!(matches!(kind_of("10-day-calendar"), DecodeErrorKind::UnexpectedToken { .. }));
        assert!(matches!(kind_of("10-day-cal-cal"), DecodeErrorKind::UnexpectedToken { .. }));
        assert!(matches!(kind_of("day-10"), DecodeErrorKind::UnexpectedToken { .. }));
        assert!(matches!(kind_of("99999999999999999999-day"), DecodeErrorKind::InvalidNumber(_)));
    }

    #[test]
    fn test_zero_count_with_period_is_inconsistent() {
        assert!(matches!(kind_of("0-day"), DecodeErrorKind::Inconsistent(_)));
    }

    #[test]
    fn test_error_offset_points_at_token() {
        let err = parse_limit("10-day-week").unwrap_err();
        assert_eq!(err.offset, 7);
        assert_eq!(err.input, "10-day-week");
    }

    #[test]
    fn test_parse_set() {
        let limits = parse_limit_set("10-day-cal,100-month-cal").unwrap();
        assert_eq!(limits.len(), 2);

        let err = parse_limit_set("10-day-cal,").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnexpectedEnd("limit reference"));

        let err = parse_limit_set("10-day-cal;5-week").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnexpectedChar(';'));
    }

    #[test]
    fn test_parse_period_type() {
        assert_eq!(parse_period_type("week").unwrap(), CalendarPeriodType::WEEK);
        assert_eq!(parse_period_type("day_x2").unwrap(), CalendarPeriodType::DAY_X2);
        assert!(parse_period_type("week-cal").is_err());
    }
}

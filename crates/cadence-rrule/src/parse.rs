//! Textual rule ingestion (RFC 5545 content lines).
//!
//! Parses a `DTSTART`/`RRULE`/`RDATE`/`EXDATE` block into a validated
//! [`RecurrenceRule`]. Lines are unfolded per RFC 5545 §3.1 before
//! tokenizing; unknown property names and unknown RRULE keys (including
//! RFC 7529 `RSCALE`/`SKIP`) are ignored.
//!
//! Time zone precedence: an explicit `timezone` argument beats a `TZID=`
//! parameter on the anchor line, which beats a trailing `Z`; a bare
//! wall-clock anchor falls back to UTC.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::core::{Frequency, NthWeekday, Rule, Until, parse_weekday};
use crate::error::ValidationError;
use crate::rule::RecurrenceRule;
use cadence_core::{resolve_tzid, to_zoned};

/// ## Summary
/// Parses an RFC 5545 text block containing a `DTSTART` line, an `RRULE`
/// line, and any number of `RDATE`/`EXDATE` lines into a validated rule.
///
/// `timezone` overrides any zone information embedded in the block.
///
/// ## Errors
/// - [`ValidationError::MalformedText`] for unparseable lines or values.
/// - [`ValidationError::Zone`] for unknown TZIDs.
/// - Any construction error from [`RecurrenceRule::new`].
pub fn parse_block(
    input: &str,
    timezone: Option<&str>,
) -> Result<RecurrenceRule, ValidationError> {
    let mut anchor: Option<(usize, ContentLine)> = None;
    let mut raw_rule: Option<(usize, Rule)> = None;
    let mut rdate_lines: Vec<(usize, ContentLine)> = Vec::new();
    let mut exdate_lines: Vec<(usize, ContentLine)> = Vec::new();

    for (line_num, line) in split_lines(input) {
        let content = parse_content_line(&line, line_num)?;
        match content.name.as_str() {
            "DTSTART" => anchor = Some((line_num, content)),
            "RRULE" => raw_rule = Some((line_num, parse_rrule_value(&content.value, line_num)?)),
            "RDATE" => rdate_lines.push((line_num, content)),
            "EXDATE" => exdate_lines.push((line_num, content)),
            _ => {}
        }
    }

    let (anchor_line, anchor) =
        anchor.ok_or_else(|| malformed(0, "missing DTSTART line"))?;
    let (_, raw_rule) = raw_rule.ok_or_else(|| malformed(0, "missing RRULE line"))?;

    let stamp = parse_stamp(&anchor.value, anchor_line)?;
    let tz = match timezone.or_else(|| anchor.param("TZID")) {
        Some(tzid) => resolve_tzid(tzid)?,
        None => Tz::UTC,
    };
    let dtstart = stamp.resolve(tz)?;

    let rule = RecurrenceRule::new(raw_rule, dtstart)?;
    let rdates = parse_stamp_lines(&rdate_lines, tz)?;
    let exdates = parse_stamp_lines(&exdate_lines, tz)?;
    Ok(rule.with_rdates(rdates).with_exdates(exdates))
}

impl FromStr for Rule {
    type Err = ValidationError;

    /// Parses a bare RRULE value such as `FREQ=DAILY;COUNT=5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_rrule_value(s, 1)
    }
}

/// A date-time value before zone resolution.
enum Stamp {
    /// `YYYYMMDD`: midnight in the resolved zone.
    Date(NaiveDate),
    /// `YYYYMMDDTHHMMSS`: wall clock in the resolved zone.
    Floating(NaiveDateTime),
    /// `YYYYMMDDTHHMMSSZ`: an absolute instant.
    Instant(DateTime<Utc>),
}

impl Stamp {
    fn resolve(&self, tz: Tz) -> Result<DateTime<Tz>, ValidationError> {
        match self {
            Self::Date(d) => Ok(to_zoned(d.and_hms_opt(0, 0, 0).unwrap_or_default(), tz)?),
            Self::Floating(dt) => Ok(to_zoned(*dt, tz)?),
            Self::Instant(dt) => Ok(dt.with_timezone(&tz)),
        }
    }
}

/// A property line reduced to name, parameters, and value.
struct ContentLine {
    name: String,
    params: Vec<(String, String)>,
    value: String,
}

impl ContentLine {
    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Splits input into unfolded content lines with 1-based line numbers.
///
/// Lines starting with SP/HTAB continue the previous line with the
/// leading whitespace removed; bare LF is accepted alongside CRLF.
fn split_lines(input: &str) -> Vec<(usize, String)> {
    let mut lines: Vec<(usize, String)> = Vec::new();
    for (i, raw) in input.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            if let Some((_, prev)) = lines.last_mut() {
                prev.push_str(&line[1..]);
            } else {
                lines.push((i + 1, line[1..].to_string()));
            }
        } else {
            lines.push((i + 1, line.to_string()));
        }
    }
    lines
}

/// Parses `NAME *(";" param "=" value) ":" value`.
fn parse_content_line(line: &str, line_num: usize) -> Result<ContentLine, ValidationError> {
    let colon = line
        .find(':')
        .ok_or_else(|| malformed(line_num, "content line has no ':'"))?;
    let value = line[colon + 1..].to_string();

    let mut head = line[..colon].split(';');
    let name = head
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase();
    if name.is_empty() {
        return Err(malformed(line_num, "content line has no property name"));
    }

    let mut params = Vec::new();
    for part in head {
        let eq = part
            .find('=')
            .ok_or_else(|| malformed(line_num, format!("parameter `{part}` has no '='")))?;
        let key = part[..eq].trim().to_ascii_uppercase();
        let val = part[eq + 1..].trim().trim_matches('"').to_string();
        params.push((key, val));
    }

    Ok(ContentLine {
        name,
        params,
        value,
    })
}

/// Parses an RRULE value into the raw rule model.
fn parse_rrule_value(s: &str, line: usize) -> Result<Rule, ValidationError> {
    let mut rule = Rule::default();
    for part in s.split(';') {
        if part.is_empty() {
            continue;
        }
        let eq = part
            .find('=')
            .ok_or_else(|| malformed(line, format!("rule part `{part}` has no '='")))?;
        let key = part[..eq].to_ascii_uppercase();
        let value = &part[eq + 1..];
        parse_rrule_part(&mut rule, &key, value, line)?;
    }
    Ok(rule)
}

fn parse_rrule_part(
    rule: &mut Rule,
    key: &str,
    value: &str,
    line: usize,
) -> Result<(), ValidationError> {
    match key {
        "FREQ" => {
            rule.freq = Some(
                Frequency::parse(value)
                    .ok_or_else(|| malformed(line, format!("unknown frequency `{value}`")))?,
            );
        }
        "INTERVAL" => rule.interval = Some(parse_number(value, "INTERVAL", line)?),
        "COUNT" => {
            if rule.until.is_some() {
                return Err(malformed(line, "COUNT and UNTIL are mutually exclusive"));
            }
            rule.count = Some(parse_number(value, "COUNT", line)?);
        }
        "UNTIL" => {
            if rule.count.is_some() {
                return Err(malformed(line, "COUNT and UNTIL are mutually exclusive"));
            }
            rule.until = Some(match parse_stamp(value, line)? {
                Stamp::Date(d) => Until::Date(d),
                Stamp::Floating(dt) => Until::Local(dt),
                Stamp::Instant(dt) => Until::Instant(dt),
            });
        }
        "WKST" => {
            rule.week_start = Some(
                parse_weekday(value)
                    .ok_or_else(|| malformed(line, format!("unknown weekday `{value}`")))?,
            );
        }
        "BYSECOND" => rule.by_second = parse_number_list(value, "BYSECOND", line)?,
        "BYMINUTE" => rule.by_minute = parse_number_list(value, "BYMINUTE", line)?,
        "BYHOUR" => rule.by_hour = parse_number_list(value, "BYHOUR", line)?,
        // Malformed BYDAY tokens are dropped, not errors.
        "BYDAY" => {
            rule.by_day = value
                .split(',')
                .filter_map(|token| NthWeekday::parse(token.trim()))
                .collect();
        }
        "BYMONTHDAY" => rule.by_month_day = parse_number_list(value, "BYMONTHDAY", line)?,
        "BYYEARDAY" => rule.by_year_day = parse_number_list(value, "BYYEARDAY", line)?,
        "BYWEEKNO" => rule.by_week_no = parse_number_list(value, "BYWEEKNO", line)?,
        "BYMONTH" => rule.by_month = parse_number_list(value, "BYMONTH", line)?,
        "BYSETPOS" => rule.by_set_pos = parse_number_list(value, "BYSETPOS", line)?,
        _ => {}
    }
    Ok(())
}

fn parse_number<T: FromStr>(value: &str, key: &str, line: usize) -> Result<T, ValidationError> {
    value
        .trim()
        .parse()
        .map_err(|_| malformed(line, format!("{key} value `{value}` is not a number")))
}

fn parse_number_list<T: FromStr>(
    value: &str,
    key: &str,
    line: usize,
) -> Result<Vec<T>, ValidationError> {
    value
        .split(',')
        .map(|v| parse_number(v, key, line))
        .collect()
}

/// Parses `YYYYMMDD`, `YYYYMMDDTHHMMSS`, or `YYYYMMDDTHHMMSSZ`.
fn parse_stamp(s: &str, line: usize) -> Result<Stamp, ValidationError> {
    let s = s.trim();
    if let Some(stripped) = s.strip_suffix('Z') {
        let local = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S")
            .map_err(|_| malformed(line, format!("malformed UTC date-time `{s}`")))?;
        Ok(Stamp::Instant(Utc.from_utc_datetime(&local)))
    } else if s.contains('T') {
        NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
            .map(Stamp::Floating)
            .map_err(|_| malformed(line, format!("malformed date-time `{s}`")))
    } else {
        NaiveDate::parse_from_str(s, "%Y%m%d")
            .map(Stamp::Date)
            .map_err(|_| malformed(line, format!("malformed date `{s}`")))
    }
}

/// Parses the comma-separated values of RDATE/EXDATE lines. A per-line
/// `TZID=` parameter overrides the block zone for that line; results are
/// always expressed in the rule's zone.
fn parse_stamp_lines(
    lines: &[(usize, ContentLine)],
    block_tz: Tz,
) -> Result<Vec<DateTime<Tz>>, ValidationError> {
    let mut stamps = Vec::new();
    for (line_num, content) in lines {
        let tz = match content.param("TZID") {
            Some(tzid) => resolve_tzid(tzid)?,
            None => block_tz,
        };
        for value in content.value.split(',') {
            let resolved = parse_stamp(value, *line_num)?.resolve(tz)?;
            stamps.push(resolved.with_timezone(&block_tz));
        }
    }
    Ok(stamps)
}

fn malformed(line: usize, message: impl Into<String>) -> ValidationError {
    ValidationError::MalformedText {
        line,
        message: message.into(),
    }
}

//! Change classification between two refreshes of a table cell.
//!
//! Cells arrive as pre-formatted text. Typed comparisons (percentages, byte
//! quantities, durations, integers) are done on exact scaled integers so that
//! equal values never flip between increase and decrease.

/// Cell value for a field the backend did not report.
pub const MISSING_VALUE: &str = "<none>";
/// Cell value for a field that has no meaning for the row.
pub const NA_VALUE: &str = "n/a";

// Fixed-point scale applied to every parsed number (nine fractional digits).
const SCALE: i128 = 1_000_000_000;
const MAX_FRACTION_DIGITS: usize = 9;

const BYTE_UNITS: [(&str, i128); 13] = [
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
    ("Ei", 1 << 60),
    ("k", 1_000),
    ("K", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("E", 1_000_000_000_000_000_000),
];

const NANOS_PER_SECOND: i128 = 1_000_000_000;
const DURATION_UNITS: [(&str, i128); 9] = [
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", NANOS_PER_SECOND),
    ("m", 60 * NANOS_PER_SECOND),
    ("h", 3_600 * NANOS_PER_SECOND),
    ("d", 86_400 * NANOS_PER_SECOND),
    ("y", 365 * 86_400 * NANOS_PER_SECOND),
];

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum DeltaMarker {
    #[default]
    None,
    Increase,
    Decrease,
    /// The value changed but has no meaningful direction (opaque text, or a
    /// transition to or from the missing sentinel).
    Indeterminate,
}

impl DeltaMarker {
    pub fn glyph(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Increase => "↑",
            Self::Decrease => "↓",
            Self::Indeterminate => "Δ",
        }
    }
}

type Parser = fn(&str) -> Option<i128>;

// Order matters: the first parser that accepts both values decides.
const PARSERS: [Parser; 4] = [parse_percentage, parse_bytes, parse_duration, parse_integer];

pub fn classify(previous: &str, current: &str) -> DeltaMarker {
    if previous == current {
        return DeltaMarker::None;
    }

    if previous == MISSING_VALUE || current == MISSING_VALUE {
        return DeltaMarker::Indeterminate;
    }

    if previous == NA_VALUE || current == NA_VALUE {
        return DeltaMarker::None;
    }

    for parse in PARSERS {
        if let (Some(before), Some(after)) = (parse(previous), parse(current)) {
            return match after.cmp(&before) {
                std::cmp::Ordering::Greater => DeltaMarker::Increase,
                std::cmp::Ordering::Less => DeltaMarker::Decrease,
                std::cmp::Ordering::Equal => DeltaMarker::None,
            };
        }
    }

    DeltaMarker::Indeterminate
}

fn parse_percentage(raw: &str) -> Option<i128> {
    parse_decimal(raw.trim().strip_suffix('%')?)
}

fn parse_bytes(raw: &str) -> Option<i128> {
    let raw = raw.trim();
    for (suffix, multiplier) in BYTE_UNITS {
        if let Some(number) = raw.strip_suffix(suffix) {
            return parse_decimal(number)?.checked_mul(multiplier);
        }
    }
    None
}

/// Parses clock-like durations made of one or more `<number><unit>` parts,
/// for example `2m33s`, `5d2h` or `1.5s`.
fn parse_duration(raw: &str) -> Option<i128> {
    let mut rest = raw.trim();
    if rest.is_empty() {
        return None;
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let (number, tail) = rest.split_at(number_len);
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let (_, nanos) = DURATION_UNITS.iter().find(|(name, _)| *name == unit)?;

        let part = parse_decimal(number)?.checked_mul(*nanos)?;
        total = total.checked_add(part)?;
        rest = tail;
    }

    Some(total)
}

fn parse_integer(raw: &str) -> Option<i128> {
    raw.trim().parse::<i128>().ok()?.checked_mul(SCALE)
}

/// Parses an optionally signed decimal into a value scaled by [`SCALE`].
fn parse_decimal(raw: &str) -> Option<i128> {
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, raw),
    };
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (digits, ""),
    };

    if whole.is_empty()
        || fraction.len() > MAX_FRACTION_DIGITS
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
        || (digits.contains('.') && fraction.is_empty())
    {
        return None;
    }

    let mut value = whole.parse::<i128>().ok()?.checked_mul(SCALE)?;
    if !fraction.is_empty() {
        let padding = 10i128.pow((MAX_FRACTION_DIGITS - fraction.len()) as u32);
        value = value.checked_add(fraction.parse::<i128>().ok()?.checked_mul(padding)?)?;
    }

    Some(if negative { -value } else { value })
}

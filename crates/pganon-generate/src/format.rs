//! Declarative format generators: date, number, and mask.
//!
//! Built from user-supplied pattern specs. The kind may be stated or
//! inferred: strftime directives mean a date, a printf integer directive
//! means a number, anything else is treated as a character mask.

use chrono::{Datelike, Utc};

use crate::generator::{
    random_digit, random_int, random_lower, random_range, random_upper, Generator,
};

/// Kind of a format pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Date,
    Number,
    Mask,
}

impl FormatKind {
    /// Parse an explicit kind string; unknown strings fall back to mask.
    pub fn parse(kind: &str) -> Option<FormatKind> {
        match kind {
            "date" => Some(FormatKind::Date),
            "number" => Some(FormatKind::Number),
            "mask" => Some(FormatKind::Mask),
            "" => None,
            _ => Some(FormatKind::Mask),
        }
    }

    /// Infer the kind from the format string itself.
    pub fn detect(format: &str) -> FormatKind {
        if contains_date_directive(format) {
            FormatKind::Date
        } else if contains_number_directive(format) {
            FormatKind::Number
        } else {
            FormatKind::Mask
        }
    }
}

const DATE_DIRECTIVES: &[&str] = &[
    "%Y", "%y", "%m", "%d", "%H", "%M", "%S", "%I", "%B", "%b", "%A", "%a", "%p", "%P",
];

fn contains_date_directive(format: &str) -> bool {
    DATE_DIRECTIVES.iter().any(|d| format.contains(d))
}

fn contains_number_directive(format: &str) -> bool {
    let bytes = format.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'%' {
            if bytes[i + 1] == b'%' {
                i += 2;
                continue;
            }
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'd' {
                return true;
            }
        }
        i += 1;
    }
    false
}

/// Bounds and format string for one declarative pattern.
#[derive(Debug, Clone)]
pub struct FormatSpec {
    pub format: String,
    pub kind: FormatKind,
    pub min: i64,
    pub max: i64,
    pub min_year: i32,
    pub max_year: i32,
}

impl FormatSpec {
    pub fn new(
        format: impl Into<String>,
        kind: Option<FormatKind>,
        min: Option<i64>,
        max: Option<i64>,
        min_year: Option<i32>,
        max_year: Option<i32>,
    ) -> Self {
        let format = format.into();
        let kind = kind.unwrap_or_else(|| FormatKind::detect(&format));
        let min = min.unwrap_or(0);
        let max = match max {
            Some(max) => max,
            None if kind == FormatKind::Number => 999_999_999,
            None => 0,
        };
        Self {
            format,
            kind,
            min,
            max,
            min_year: min_year.unwrap_or(1950),
            max_year: max_year.unwrap_or_else(|| Utc::now().year()),
        }
    }
}

/// Generator built from a [`FormatSpec`].
pub struct FormatGenerator {
    name: String,
    spec: FormatSpec,
}

impl FormatGenerator {
    pub fn new(name: impl Into<String>, spec: FormatSpec) -> Self {
        Self { name: name.into(), spec }
    }

    fn generate_date(&self) -> String {
        let span = (self.spec.max_year - self.spec.min_year).max(0) as usize;
        let year = self.spec.min_year + random_int(span + 1) as i32;
        let month = 1 + random_int(12);
        let day = 1 + random_int(28); // valid in every month
        let hour = random_int(24);
        let minute = random_int(60);
        let second = random_int(60);

        const MONTH_NAMES: &[&str] = &[
            "January", "February", "March", "April", "May", "June", "July", "August",
            "September", "October", "November", "December",
        ];
        const MONTH_ABBR: &[&str] = &[
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        const DAY_NAMES: &[&str] = &[
            "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
        ];
        const DAY_ABBR: &[&str] = &["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

        let mut out = self.spec.format.clone();
        out = out.replace("%Y", &format!("{year:04}"));
        out = out.replace("%y", &format!("{:02}", year.rem_euclid(100)));
        out = out.replace("%m", &format!("{month:02}"));
        out = out.replace("%d", &format!("{day:02}"));
        out = out.replace("%H", &format!("{hour:02}"));
        out = out.replace("%M", &format!("{minute:02}"));
        out = out.replace("%S", &format!("{second:02}"));
        out = out.replace("%I", &format!("{:02}", (hour % 12) + 1));
        out = out.replace("%B", MONTH_NAMES[month - 1]);
        out = out.replace("%b", MONTH_ABBR[month - 1]);
        out = out.replace("%A", DAY_NAMES[random_int(7)]);
        out = out.replace("%a", DAY_ABBR[random_int(7)]);
        if hour < 12 {
            out = out.replace("%p", "AM").replace("%P", "am");
        } else {
            out = out.replace("%p", "PM").replace("%P", "pm");
        }
        out
    }

    fn generate_number(&self) -> String {
        let min = self.spec.min;
        let max = if self.spec.max <= min {
            min + 1_000_000
        } else {
            self.spec.max
        };
        render_printf(&self.spec.format, random_range(min, max))
    }

    fn generate_mask(&self) -> String {
        let mut out = String::with_capacity(self.spec.format.len());
        let mut escaped = false;

        for c in self.spec.format.chars() {
            if escaped {
                out.push(c);
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '#' | '9' => out.push(random_digit()),
                'A' => out.push(random_upper()),
                'a' => out.push(random_lower()),
                'X' => out.push(if random_int(2) == 0 {
                    random_digit()
                } else {
                    random_upper()
                }),
                'x' => out.push(if random_int(2) == 0 {
                    random_digit()
                } else {
                    random_lower()
                }),
                '*' => out.push(match random_int(3) {
                    0 => random_digit(),
                    1 => random_upper(),
                    _ => random_lower(),
                }),
                other => out.push(other),
            }
        }
        out
    }
}

impl Generator for FormatGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, _input: &str) -> String {
        match self.spec.kind {
            FormatKind::Date => self.generate_date(),
            FormatKind::Number => self.generate_number(),
            FormatKind::Mask => self.generate_mask(),
        }
    }
}

/// Render a printf-style integer format: `%d` with optional width and
/// zero-pad flag, `%%` as a literal percent.
fn render_printf(format: &str, value: i64) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let bytes = format.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i] as char);
            i += 1;
            continue;
        }
        if i + 1 < bytes.len() && bytes[i + 1] == b'%' {
            out.push('%');
            i += 2;
            continue;
        }

        let mut j = i + 1;
        let zero_pad = j < bytes.len() && bytes[j] == b'0';
        let width_start = if zero_pad { j + 1 } else { j };
        j = width_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }

        if j < bytes.len() && bytes[j] == b'd' {
            let width: usize = format[width_start..j].parse().unwrap_or(0);
            let rendered = if zero_pad {
                format!("{value:0width$}")
            } else {
                format!("{value:width$}")
            };
            out.push_str(&rendered);
            i = j + 1;
        } else {
            // Not an integer directive, emit verbatim.
            out.push('%');
            i += 1;
        }
    }
    out
}

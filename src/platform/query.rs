//! Media query parsing for the simulated viewport.
//!
//! Supported grammar (case-insensitive):
//!
//! ```text
//! list     := query ("," query)*
//! query    := ["only" | "not"] term ("and" term)*
//! term     := "all" | "screen" | "print"        (first term only)
//!           | "(" feature ")"
//!           | range                              (bare, e.g. width<=768)
//! feature  := ["min-" | "max-"] ("width" | "height") ":" length
//!           | "orientation" ":" ("portrait" | "landscape")
//!           | range
//! range    := ("width" | "height") ("<" | "<=" | ">" | ">=" | "=") length
//! length   := number ["px" | "em"]
//! ```
//!
//! Unitless lengths are pixels; `1em` is 16px.

use std::sync::OnceLock;

use regex::Regex;

use super::PlatformError;

const PX_PER_EM: f64 = 16.0;

static AND_RE: OnceLock<Option<Regex>> = OnceLock::new();
static COLON_RE: OnceLock<Option<Regex>> = OnceLock::new();
static RANGE_RE: OnceLock<Option<Regex>> = OnceLock::new();
static ORIENTATION_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Result<&'static Regex, String> {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .ok_or_else(|| format!("internal query grammar failed to compile: {pattern}"))
}

/// Media type a query can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MediaType {
    /// Interactive display.
    #[default]
    Screen,
    /// Paged output.
    Print,
}

/// Viewport state a query is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryContext {
    /// Viewport width in CSS pixels.
    pub width: u32,
    /// Viewport height in CSS pixels.
    pub height: u32,
    /// Current media type.
    pub media_type: MediaType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Width,
    Height,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "=" => Some(Self::Eq),
            _ => None,
        }
    }

    fn holds(self, actual: f64, bound: f64) -> bool {
        match self {
            Self::Lt => actual < bound,
            Self::Le => actual <= bound,
            Self::Gt => actual > bound,
            Self::Ge => actual >= bound,
            Self::Eq => (actual - bound).abs() < f64::EPSILON,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, PartialEq)]
enum Feature {
    Dimension { axis: Axis, cmp: Comparison, px: f64 },
    Orientation(Orientation),
}

impl Feature {
    fn parse(term: &str) -> Result<Self, String> {
        let Some(inner) = term.strip_prefix('(').and_then(|t| t.strip_suffix(')')) else {
            return Self::parse_range(term)?.ok_or_else(|| format!("unrecognized term '{term}'"));
        };
        let inner = inner.trim();

        if let Some(caps) = compiled(&COLON_RE, r"^(min-|max-)?(width|height)\s*:\s*(\d+(?:\.\d+)?)\s*(px|em)?$")?
            .captures(inner)
        {
            let cmp = match caps.get(1).map(|m| m.as_str()) {
                Some("min-") => Comparison::Ge,
                Some("max-") => Comparison::Le,
                _ => Comparison::Eq,
            };
            return Ok(Self::Dimension {
                axis: parse_axis(&caps[2]),
                cmp,
                px: parse_length(&caps[3], caps.get(4).map(|m| m.as_str()))?,
            });
        }

        if let Some(caps) = compiled(&ORIENTATION_RE, r"^orientation\s*:\s*(portrait|landscape)$")?.captures(inner) {
            let orientation = if &caps[1] == "portrait" {
                Orientation::Portrait
            } else {
                Orientation::Landscape
            };
            return Ok(Self::Orientation(orientation));
        }

        Self::parse_range(inner)?.ok_or_else(|| format!("unknown media feature '({inner})'"))
    }

    fn parse_range(text: &str) -> Result<Option<Self>, String> {
        let re = compiled(&RANGE_RE, r"^(width|height)\s*(<=|>=|<|>|=)\s*(\d+(?:\.\d+)?)\s*(px|em)?$")?;
        let Some(caps) = re.captures(text) else {
            return Ok(None);
        };
        let cmp = Comparison::parse(&caps[2]).ok_or_else(|| format!("unknown comparison '{}'", &caps[2]))?;
        Ok(Some(Self::Dimension {
            axis: parse_axis(&caps[1]),
            cmp,
            px: parse_length(&caps[3], caps.get(4).map(|m| m.as_str()))?,
        }))
    }

    fn matches(&self, ctx: &QueryContext) -> bool {
        match self {
            Self::Dimension { axis, cmp, px } => {
                let actual = match axis {
                    Axis::Width => f64::from(ctx.width),
                    Axis::Height => f64::from(ctx.height),
                };
                cmp.holds(actual, *px)
            }
            Self::Orientation(Orientation::Portrait) => ctx.height >= ctx.width,
            Self::Orientation(Orientation::Landscape) => ctx.width > ctx.height,
        }
    }
}

fn parse_axis(name: &str) -> Axis {
    if name == "height" {
        Axis::Height
    } else {
        Axis::Width
    }
}

fn parse_length(number: &str, unit: Option<&str>) -> Result<f64, String> {
    let value: f64 = number
        .parse()
        .map_err(|e| format!("invalid length '{number}': {e}"))?;
    Ok(match unit {
        Some("em") => value * PX_PER_EM,
        _ => value,
    })
}

#[derive(Debug, Clone, PartialEq)]
struct MediaQuery {
    negated: bool,
    media: Option<MediaType>,
    features: Vec<Feature>,
}

impl MediaQuery {
    fn parse(text: &str) -> Result<Self, String> {
        if text.is_empty() {
            return Err("empty query in list".to_string());
        }

        let (negated, rest) = if let Some(rest) = text.strip_prefix("not ") {
            (true, rest.trim_start())
        } else if let Some(rest) = text.strip_prefix("only ") {
            (false, rest.trim_start())
        } else {
            (false, text)
        };

        let mut media = None;
        let mut features = Vec::new();
        for (idx, term) in compiled(&AND_RE, r"\s+and\s+")?.split(rest).enumerate() {
            let term = term.trim();
            if term.is_empty() {
                return Err("dangling 'and'".to_string());
            }
            if idx == 0 {
                match term {
                    "all" => continue,
                    "screen" => {
                        media = Some(MediaType::Screen);
                        continue;
                    }
                    "print" => {
                        media = Some(MediaType::Print);
                        continue;
                    }
                    _ => {}
                }
            }
            features.push(Feature::parse(term)?);
        }

        Ok(Self {
            negated,
            media,
            features,
        })
    }

    fn matches(&self, ctx: &QueryContext) -> bool {
        let media_ok = self.media.map_or(true, |m| m == ctx.media_type);
        let result = media_ok && self.features.iter().all(|f| f.matches(ctx));
        result != self.negated
    }
}

/// A parsed, comma-separated media query list.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaQueryList {
    queries: Vec<MediaQuery>,
}

impl MediaQueryList {
    /// Parses `text`, rejecting anything outside the supported grammar.
    pub fn parse(text: &str) -> Result<Self, PlatformError> {
        let lowered = text.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return Err(PlatformError::unsupported(text, "empty query"));
        }

        let queries = lowered
            .split(',')
            .map(|part| MediaQuery::parse(part.trim()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| PlatformError::unsupported(text, reason))?;

        Ok(Self { queries })
    }

    /// True if any query in the list matches `ctx`.
    #[must_use]
    pub fn matches(&self, ctx: &QueryContext) -> bool {
        self.queries.iter().any(|q| q.matches(ctx))
    }
}

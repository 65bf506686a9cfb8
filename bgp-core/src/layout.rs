//! Label sheet layout.
//!
//! A device's serial pattern like `SN-{####}` yields `SN-0001`, `SN-0002`, ...
//! Labels fill a template's grid row-major, one page after another. Rendering
//! happens elsewhere.

use bgp_sdk::objects::catalog::LabelPlacement;
use thiserror::Error;

/// Labels a single layout request may produce.
pub const MAX_LABELS_PER_REQUEST: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("serial pattern must contain exactly one {{#...}} counter: {0}")]
    InvalidPattern(String),

    #[error("serial {value} does not fit a {width}-digit counter")]
    CounterOverflow { value: u64, width: usize },

    #[error("a layout needs at least one label")]
    EmptyBatch,

    #[error("at most {max} labels per request, got {requested}")]
    TooManyLabels { requested: usize, max: u32 },

    #[error("serial at position {0} is blank")]
    BlankSerial(usize),

    #[error("give either serials or count, not both")]
    AmbiguousSource,

    #[error("grid must be between 1x1 and 50x50")]
    InvalidGrid,
}

/// A parsed serial pattern: literal prefix, zero-padded counter, literal suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPattern {
    prefix: String,
    width: usize,
    suffix: String,
}

impl SerialPattern {
    pub fn parse(pattern: &str) -> Result<Self, LayoutError> {
        let invalid = || LayoutError::InvalidPattern(pattern.to_owned());
        let (prefix, rest) = pattern.split_once('{').ok_or_else(invalid)?;
        let (counter, suffix) = rest.split_once('}').ok_or_else(invalid)?;
        if counter.is_empty()
            || !counter.chars().all(|c| c == '#')
            || suffix.contains(['{', '}'])
            || prefix.contains('}')
        {
            return Err(invalid());
        }
        Ok(Self {
            prefix: prefix.to_owned(),
            width: counter.len(),
            suffix: suffix.to_owned(),
        })
    }

    pub fn format(&self, value: u64) -> Result<String, LayoutError> {
        let digits = value.to_string();
        if digits.len() > self.width {
            return Err(LayoutError::CounterOverflow {
                value,
                width: self.width,
            });
        }
        Ok(format!(
            "{}{:0>width$}{}",
            self.prefix,
            digits,
            self.suffix,
            width = self.width
        ))
    }

    /// `count` consecutive serials starting at `start`.
    pub fn expand(&self, start: u64, count: u32) -> Result<Vec<String>, LayoutError> {
        (0..u64::from(count))
            .map(|offset| {
                let value = start.checked_add(offset).ok_or(LayoutError::CounterOverflow {
                    value: u64::MAX,
                    width: self.width,
                })?;
                self.format(value)
            })
            .collect()
    }
}

/// Units of a label sheet grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub rows: u32,
    pub columns: u32,
}

impl Grid {
    pub fn new(rows: u32, columns: u32) -> Result<Self, LayoutError> {
        if !(1..=50).contains(&rows) || !(1..=50).contains(&columns) {
            return Err(LayoutError::InvalidGrid);
        }
        Ok(Self { rows, columns })
    }

    fn per_page(&self) -> u32 {
        self.rows * self.columns
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSheet {
    pub pages: u32,
    pub labels: Vec<LabelPlacement>,
}

/// Place serials row-major across as many pages as needed.
pub fn place_labels(serials: Vec<String>, grid: Grid) -> LabelSheet {
    let per_page = grid.per_page();
    let labels: Vec<LabelPlacement> = serials
        .into_iter()
        .zip(0u32..)
        .map(|(serial, index)| {
            let within = index % per_page;
            LabelPlacement {
                serial,
                page: index / per_page + 1,
                row: within / grid.columns,
                column: within % grid.columns,
            }
        })
        .collect();
    let pages = labels.last().map_or(0, |l| l.page);
    LabelSheet { pages, labels }
}

/// Where the serials of a layout request come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialSource {
    Explicit(Vec<String>),
    Generated { start: u64, count: u32 },
}

impl SerialSource {
    pub fn from_request(
        serials: Option<Vec<String>>,
        count: Option<u32>,
        start: Option<u64>,
    ) -> Result<Self, LayoutError> {
        match (serials, count) {
            (Some(_), Some(_)) => Err(LayoutError::AmbiguousSource),
            (Some(serials), None) => Ok(SerialSource::Explicit(serials)),
            (None, Some(count)) => Ok(SerialSource::Generated {
                start: start.unwrap_or(1),
                count,
            }),
            (None, None) => Err(LayoutError::EmptyBatch),
        }
    }

    /// Resolve to the final serial list, checking the batch bounds.
    pub fn resolve(self, pattern: &str) -> Result<Vec<String>, LayoutError> {
        let serials = match self {
            SerialSource::Explicit(serials) => {
                if let Some(blank) = serials.iter().position(|s| s.trim().is_empty()) {
                    return Err(LayoutError::BlankSerial(blank));
                }
                serials
                    .into_iter()
                    .map(|s| s.trim().to_owned())
                    .collect()
            }
            SerialSource::Generated { start, count } => {
                if count > MAX_LABELS_PER_REQUEST {
                    return Err(LayoutError::TooManyLabels {
                        requested: count as usize,
                        max: MAX_LABELS_PER_REQUEST,
                    });
                }
                SerialPattern::parse(pattern)?.expand(start, count)?
            }
        };
        if serials.is_empty() {
            return Err(LayoutError::EmptyBatch);
        }
        if serials.len() > MAX_LABELS_PER_REQUEST as usize {
            return Err(LayoutError::TooManyLabels {
                requested: serials.len(),
                max: MAX_LABELS_PER_REQUEST,
            });
        }
        Ok(serials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_expansion_pads_counter() {
        let pattern = SerialPattern::parse("SN-{####}-X").unwrap();
        assert_eq!(
            pattern.expand(9, 3).unwrap(),
            vec!["SN-0009-X", "SN-0010-X", "SN-0011-X"]
        );
    }

    #[test]
    fn counter_overflow_is_rejected() {
        let pattern = SerialPattern::parse("{##}").unwrap();
        assert_eq!(pattern.format(99).unwrap(), "99");
        assert_eq!(
            pattern.format(100),
            Err(LayoutError::CounterOverflow {
                value: 100,
                width: 2
            })
        );
    }

    #[test]
    fn malformed_patterns() {
        for bad in ["SN-", "SN-{}", "SN-{#a#}", "{#}{#}", "A}{#}"] {
            assert!(
                matches!(SerialPattern::parse(bad), Err(LayoutError::InvalidPattern(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn labels_fill_rows_then_pages() {
        let serials: Vec<String> = (1..=7).map(|i| i.to_string()).collect();
        let sheet = place_labels(serials, Grid::new(2, 3).unwrap());
        assert_eq!(sheet.pages, 2);
        let coords: Vec<_> = sheet.labels.iter().map(|l| (l.page, l.row, l.column)).collect();
        assert_eq!(
            coords,
            vec![
                (1, 0, 0),
                (1, 0, 1),
                (1, 0, 2),
                (1, 1, 0),
                (1, 1, 1),
                (1, 1, 2),
                (2, 0, 0),
            ]
        );
    }

    #[test]
    fn grid_bounds() {
        assert_eq!(Grid::new(0, 3), Err(LayoutError::InvalidGrid));
        assert_eq!(Grid::new(3, 51), Err(LayoutError::InvalidGrid));
        assert!(Grid::new(50, 50).is_ok());
    }

    #[test]
    fn serial_sources() {
        assert_eq!(
            SerialSource::from_request(Some(vec!["a".into()]), Some(1), None),
            Err(LayoutError::AmbiguousSource)
        );
        assert_eq!(
            SerialSource::from_request(None, None, None),
            Err(LayoutError::EmptyBatch)
        );
        let generated = SerialSource::from_request(None, Some(2), None).unwrap();
        assert_eq!(generated.resolve("L{###}").unwrap(), vec!["L001", "L002"]);

        let explicit = SerialSource::Explicit(vec!["A1".into(), "  ".into()]);
        assert_eq!(explicit.resolve("ignored"), Err(LayoutError::BlankSerial(1)));
        let too_many = SerialSource::Generated {
            start: 1,
            count: MAX_LABELS_PER_REQUEST + 1,
        };
        assert!(matches!(
            too_many.resolve("{#####}"),
            Err(LayoutError::TooManyLabels { .. })
        ));
        assert_eq!(
            SerialSource::from_request(None, Some(0), None)
                .unwrap()
                .resolve("{#}"),
            Err(LayoutError::EmptyBatch)
        );
    }
}

// src/series.rs - Bounded multi-series sample buffer
use crate::{
    decoder::Sample,
    error::{RelayError, Result},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::trace;

/// Default number of points kept per series
pub const DEFAULT_CAPACITY: usize = 20;

/// One `(timestamp, value)` point
pub type Point = (f64, f64);

/// How series share (or don't share) their time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AxisMode {
    /// Each field keeps its own independently truncated history
    #[default]
    PerField,
    /// All fields share one time axis; absent fields get a `NaN` gap marker
    Shared,
}

/// Read-only copy of the buffer contents, ordered by field name
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Snapshot {
    series: BTreeMap<String, Vec<Point>>,
}

impl Snapshot {
    pub fn get(&self, field: &str) -> Option<&[Point]> {
        self.series.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Point])> + '_ {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Most recent non-gap point of a series
    pub fn latest(&self, field: &str) -> Option<Point> {
        self.series
            .get(field)?
            .iter()
            .rev()
            .find(|(_, v)| !v.is_nan())
            .copied()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<Point>> {
        self.series
    }
}

/// Fixed-capacity history of numeric fields
///
/// The buffer is owned by a single writer. Every append evicts from the front
/// of a series once it grows past the capacity, so no series ever holds more
/// than `capacity` points.
///
/// # Examples
///
/// ```rust
/// use vitals_relay::{decoder::decode, SeriesBuffer};
///
/// let mut buffer = SeriesBuffer::new(2)?;
/// for ts in [1, 2, 3] {
///     let payload = format!("timestamp={};value={}", ts, ts * 10);
///     buffer.append(&decode(payload.as_bytes())?);
/// }
///
/// let snapshot = buffer.snapshot();
/// assert_eq!(snapshot.get("value"), Some(&[(2.0, 20.0), (3.0, 30.0)][..]));
/// # Ok::<(), vitals_relay::RelayError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    capacity: usize,
    mode: AxisMode,
    excluded: BTreeSet<String>,
    // PerField: one point deque per field
    points: BTreeMap<String, VecDeque<Point>>,
    // Shared: one time axis plus one value deque per field, same length
    axis: VecDeque<f64>,
    values: BTreeMap<String, VecDeque<f64>>,
}

impl SeriesBuffer {
    /// Per-field buffer excluding the `type` discriminator
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_options(capacity, AxisMode::default(), ["type"])
    }

    pub fn with_options<I, S>(capacity: usize, mode: AxisMode, excluded: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if capacity == 0 {
            return Err(RelayError::Config(
                "series buffer capacity must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            mode,
            excluded: excluded.into_iter().map(Into::into).collect(),
            points: BTreeMap::new(),
            axis: VecDeque::with_capacity(capacity + 1),
            values: BTreeMap::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn mode(&self) -> AxisMode {
        self.mode
    }

    /// Fold a sample into the buffer
    ///
    /// Samples without a timestamp are ignored.
    pub fn append(&mut self, sample: &Sample) {
        let Some(timestamp) = sample.timestamp() else {
            trace!("Skipping sample without timestamp");
            return;
        };

        let excluded = &self.excluded;
        let fields = sample
            .numeric_fields()
            .filter(|(name, _)| !excluded.contains(*name));

        match self.mode {
            AxisMode::PerField => {
                let capacity = self.capacity;
                for (name, value) in fields {
                    let series = self
                        .points
                        .entry(name.to_string())
                        .or_insert_with(|| VecDeque::with_capacity(capacity + 1));
                    series.push_back((timestamp, value));
                    while series.len() > capacity {
                        series.pop_front();
                    }
                }
            }
            AxisMode::Shared => {
                let ticks = self.axis.len();
                let mut present: BTreeMap<&str, f64> = BTreeMap::new();
                for (name, value) in fields {
                    present.insert(name, value);
                    self.values
                        .entry(name.to_string())
                        .or_insert_with(|| std::iter::repeat(f64::NAN).take(ticks).collect());
                }

                if present.is_empty() {
                    trace!("Skipping sample without numeric fields");
                    return;
                }

                self.axis.push_back(timestamp);
                for (name, series) in self.values.iter_mut() {
                    series.push_back(present.get(name.as_str()).copied().unwrap_or(f64::NAN));
                }

                while self.axis.len() > self.capacity {
                    self.axis.pop_front();
                    for series in self.values.values_mut() {
                        series.pop_front();
                    }
                }
            }
        }
    }

    /// Copy the current contents without touching buffer state
    pub fn snapshot(&self) -> Snapshot {
        let series = match self.mode {
            AxisMode::PerField => self
                .points
                .iter()
                .map(|(name, points)| (name.clone(), points.iter().copied().collect()))
                .collect(),
            AxisMode::Shared => self
                .values
                .iter()
                .map(|(name, values)| {
                    let points = self.axis.iter().copied().zip(values.iter().copied()).collect();
                    (name.clone(), points)
                })
                .collect(),
        };
        Snapshot { series }
    }

    /// Points of one series, oldest first
    pub fn series(&self, field: &str) -> Option<Vec<Point>> {
        match self.mode {
            AxisMode::PerField => self.points.get(field).map(|p| p.iter().copied().collect()),
            AxisMode::Shared => self.values.get(field).map(|values| {
                self.axis.iter().copied().zip(values.iter().copied()).collect()
            }),
        }
    }

    /// Most recent non-gap point of a series
    pub fn latest(&self, field: &str) -> Option<Point> {
        self.series(field)?.into_iter().rev().find(|(_, v)| !v.is_nan())
    }

    /// Number of series
    pub fn len(&self) -> usize {
        match self.mode {
            AxisMode::PerField => self.points.len(),
            AxisMode::Shared => self.values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.axis.clear();
        self.values.clear();
    }
}

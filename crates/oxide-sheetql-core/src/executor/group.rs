//! Grouping and aggregation.
//!
//! Rows arrive with one cell per field, aggregate fields holding their
//! per-row argument. Grouping sorts on the key fields, then compresses each
//! run of equal keys into one row: plain fields keep the run's first value
//! and aggregate fields fold over the run.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::fields::{Aggregate, AggregateFunction, TableFields};
use crate::value::Value;

/// Folds the values of one aggregate field over a group.
trait Accumulator {
    fn add(&mut self, value: &Value);
    fn finish(&self) -> Value;
}

#[derive(Default)]
struct Sum(f64);

impl Accumulator for Sum {
    fn add(&mut self, value: &Value) {
        self.0 += value.as_number().unwrap_or(0.0);
    }

    fn finish(&self) -> Value {
        Value::Number(self.0)
    }
}

#[derive(Default)]
struct Count(usize);

impl Accumulator for Count {
    fn add(&mut self, _value: &Value) {
        self.0 += 1;
    }

    fn finish(&self) -> Value {
        #[allow(clippy::cast_precision_loss)]
        let count = self.0 as f64;
        Value::Number(count)
    }
}

#[derive(Default)]
struct Avg {
    sum: f64,
    count: usize,
}

impl Accumulator for Avg {
    fn add(&mut self, value: &Value) {
        if let Some(n) = value.as_number() {
            self.sum += n;
            self.count += 1;
        }
    }

    fn finish(&self) -> Value {
        if self.count == 0 {
            return Value::Null;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.count as f64;
        Value::Number(self.sum / count)
    }
}

/// `MIN` or `MAX`, depending on which ordering replaces the current value.
struct Extreme {
    best: Option<Value>,
    replace_when: Ordering,
}

impl Accumulator for Extreme {
    fn add(&mut self, value: &Value) {
        let replace = self
            .best
            .as_ref()
            .map_or(true, |best| value.sort_cmp(best) == self.replace_when);
        if replace {
            self.best = Some(value.clone());
        }
    }

    fn finish(&self) -> Value {
        self.best.clone().unwrap_or_default()
    }
}

/// Passes each distinct value to the wrapped accumulator once.
struct Distinct {
    seen: HashSet<String>,
    inner: Box<dyn Accumulator>,
}

impl Accumulator for Distinct {
    fn add(&mut self, value: &Value) {
        if self.seen.insert(value.to_key()) {
            self.inner.add(value);
        }
    }

    fn finish(&self) -> Value {
        self.inner.finish()
    }
}

fn accumulator(aggregate: Aggregate) -> Box<dyn Accumulator> {
    let inner: Box<dyn Accumulator> = match aggregate.function {
        AggregateFunction::Sum => Box::<Sum>::default(),
        AggregateFunction::Count => Box::<Count>::default(),
        AggregateFunction::Avg => Box::<Avg>::default(),
        AggregateFunction::Min => Box::new(Extreme {
            best: None,
            replace_when: Ordering::Less,
        }),
        AggregateFunction::Max => Box::new(Extreme {
            best: None,
            replace_when: Ordering::Greater,
        }),
    };
    if aggregate.distinct {
        Box::new(Distinct {
            seen: HashSet::new(),
            inner,
        })
    } else {
        inner
    }
}

/// Empty cells and the text `null` never take part in a fold.
fn excluded(value: &Value) -> bool {
    value.is_null() || value.as_str().is_some_and(|s| s.eq_ignore_ascii_case("null"))
}

/// Folds a run of rows into one: the first row with its aggregate cells
/// replaced by the folded values.
fn compress(fields: &TableFields, run: &[Vec<Value>]) -> Vec<Value> {
    let mut row = run
        .first()
        .cloned()
        .unwrap_or_else(|| vec![Value::Null; fields.len()]);
    for (slot, field) in fields.iter().enumerate() {
        let Some(aggregate) = field.aggregate else {
            continue;
        };
        let mut acc = accumulator(aggregate);
        for value in run.iter().filter_map(|r| r.get(slot)) {
            if !excluded(value) {
                acc.add(value);
            }
        }
        if let Some(cell) = row.get_mut(slot) {
            *cell = acc.finish();
        }
    }
    row
}

fn compare_keys(keys: &[usize], a: &[Value], b: &[Value]) -> Ordering {
    keys.iter()
        .map(|&k| match (a.get(k), b.get(k)) {
            (Some(x), Some(y)) => x.sort_cmp(y),
            _ => Ordering::Equal,
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Groups materialized rows by the fields in `keys`.
///
/// Without keys, a statement with aggregates collapses to one row and a
/// `DISTINCT` statement groups on all its selected plain fields. With
/// keys, `DISTINCT` additionally drops repeated output rows.
pub(super) fn apply(
    fields: &TableFields,
    keys: &[usize],
    distinct: bool,
    mut rows: Vec<Vec<Value>>,
) -> Vec<Vec<Value>> {
    if keys.is_empty() && fields.has_aggregates() {
        tracing::debug!(rows = rows.len(), "collapsing to one aggregate row");
        return vec![compress(fields, &rows)];
    }
    let implicit: Vec<usize>;
    let keys = if keys.is_empty() {
        if !distinct {
            return rows;
        }
        implicit = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.temporary && !f.is_aggregate())
            .map(|(slot, _)| slot)
            .collect();
        &implicit[..]
    } else {
        keys
    };

    rows.sort_by(|a, b| compare_keys(keys, a, b));
    let mut grouped = Vec::new();
    let mut start = 0;
    while start < rows.len() {
        let end = rows[start..]
            .iter()
            .position(|r| compare_keys(keys, &rows[start], r).is_ne())
            .map_or(rows.len(), |offset| start + offset);
        grouped.push(compress(fields, &rows[start..end]));
        start = end;
    }
    tracing::debug!(rows = rows.len(), groups = grouped.len(), "rows grouped");

    if distinct {
        let selected = fields.selected_len();
        let mut seen = HashSet::new();
        grouped.retain(|row| {
            let signature: Vec<String> = row.iter().take(selected).map(Value::to_key).collect();
            seen.insert(signature.join("::"))
        });
    }
    grouped
}

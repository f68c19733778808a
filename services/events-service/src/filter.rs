use chrono::NaiveDateTime;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Timestamp,
    SensorId,
}

impl Column {
    fn as_sql(self) -> &'static str {
        match self {
            Column::Timestamp => "timestamp",
            Column::SensorId => "sensor_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AtLeast,
    Before,
    Equals,
}

impl Comparison {
    fn as_sql(self) -> &'static str {
        match self {
            Comparison::AtLeast => ">=",
            Comparison::Before => "<",
            Comparison::Equals => "=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Timestamp(NaiveDateTime),
    Text(String),
}

impl FilterValue {
    fn as_param(&self) -> &(dyn ToSql + Sync) {
        match self {
            FilterValue::Timestamp(value) => value as &(dyn ToSql + Sync),
            FilterValue::Text(value) => value as &(dyn ToSql + Sync),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: Column,
    pub comparison: Comparison,
    pub value: FilterValue,
}

/// Conjunction of typed predicates over `detection_events`. Values only ever
/// travel as bind parameters.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    predicates: Vec<Predicate>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Half-open `[start, end)` window.
    pub fn time_range(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self::new()
            .with(Column::Timestamp, Comparison::AtLeast, FilterValue::Timestamp(start))
            .with(Column::Timestamp, Comparison::Before, FilterValue::Timestamp(end))
    }

    /// Restricts to one sensor; `None` or an empty id leaves the filter unchanged.
    pub fn sensor(self, sensor_id: Option<&str>) -> Self {
        match sensor_id {
            Some(id) if !id.is_empty() => self.with(
                Column::SensorId,
                Comparison::Equals,
                FilterValue::Text(id.to_string()),
            ),
            _ => self,
        }
    }

    pub fn with(mut self, column: Column, comparison: Comparison, value: FilterValue) -> Self {
        self.predicates.push(Predicate {
            column,
            comparison,
            value,
        });
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// `WHERE` clause with `$n` placeholders, empty when there are no predicates.
    pub fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }
        let terms: Vec<String> = self
            .predicates
            .iter()
            .enumerate()
            .map(|(index, predicate)| {
                format!(
                    "{} {} ${}",
                    predicate.column.as_sql(),
                    predicate.comparison.as_sql(),
                    index + 1
                )
            })
            .collect();
        format!("WHERE {}", terms.join(" AND "))
    }

    /// Bind parameters in placeholder order.
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.predicates
            .iter()
            .map(|predicate| predicate.value.as_param())
            .collect()
    }
}

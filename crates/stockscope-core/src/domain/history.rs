use serde::{Deserialize, Serialize};
use time::Date;

use crate::ValidationError;

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    #[serde(with = "date_label")]
    pub date: Date,
    pub price: f64,
}

impl HistoricalPoint {
    pub fn new(date: Date, price: f64) -> Self {
        Self { date, price }
    }
}

/// Chronologically ordered closes, oldest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct HistoricalSeries(Vec<HistoricalPoint>);

impl HistoricalSeries {
    pub fn new(points: Vec<HistoricalPoint>) -> Result<Self, ValidationError> {
        for point in &points {
            if !point.price.is_finite() {
                return Err(ValidationError::NonFiniteValue { field: "price" });
            }
            if point.price < 0.0 {
                return Err(ValidationError::NegativeValue { field: "price" });
            }
        }
        if points.windows(2).any(|pair| pair[0].date > pair[1].date) {
            return Err(ValidationError::UnorderedSeries);
        }

        Ok(Self(points))
    }

    pub fn points(&self) -> &[HistoricalPoint] {
        &self.0
    }

    pub fn prices(&self) -> Vec<f64> {
        self.0.iter().map(|point| point.price).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&HistoricalPoint> {
        self.0.last()
    }
}

mod date_label {
    use serde::de::Error as DeError;
    use serde::ser::Error as SerError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::macros::format_description;
    use time::Date;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let label = date
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(S::Error::custom)?;
        serializer.serialize_str(&label)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Date::parse(&label, format_description!("[year]-[month]-[day]")).map_err(D::Error::custom)
    }
}

/// Parse a provider `YYYY-MM-DD` date label.
pub fn parse_date_label(label: &str) -> Option<Date> {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(label.trim(), format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn rejects_out_of_order_points() {
        let points = vec![
            HistoricalPoint::new(date!(2024 - 03 - 05), 10.0),
            HistoricalPoint::new(date!(2024 - 03 - 04), 11.0),
        ];
        assert_eq!(
            HistoricalSeries::new(points),
            Err(ValidationError::UnorderedSeries)
        );
    }

    #[test]
    fn rejects_negative_or_nan_prices() {
        let negative = vec![HistoricalPoint::new(date!(2024 - 03 - 05), -1.0)];
        assert_eq!(
            HistoricalSeries::new(negative),
            Err(ValidationError::NegativeValue { field: "price" })
        );

        let nan = vec![HistoricalPoint::new(date!(2024 - 03 - 05), f64::NAN)];
        assert_eq!(
            HistoricalSeries::new(nan),
            Err(ValidationError::NonFiniteValue { field: "price" })
        );
    }

    #[test]
    fn serializes_as_plain_array_with_date_labels() {
        let series = HistoricalSeries::new(vec![
            HistoricalPoint::new(date!(2024 - 03 - 04), 174.5),
            HistoricalPoint::new(date!(2024 - 03 - 05), 175.43),
        ])
        .expect("ordered series");

        let json = serde_json::to_value(&series).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!([
                { "date": "2024-03-04", "price": 174.5 },
                { "date": "2024-03-05", "price": 175.43 }
            ])
        );
    }

    #[test]
    fn parses_provider_date_labels() {
        assert_eq!(parse_date_label("2024-03-05"), Some(date!(2024 - 03 - 05)));
        assert_eq!(parse_date_label("03/05/2024"), None);
    }
}

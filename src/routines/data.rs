use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use eyre::{eyre, Result, WrapErr};

/// Cumulative observed counts against days elapsed since the first row
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedSeries {
    reference_date: NaiveDate,
    days: Vec<f64>,
    values: Vec<f64>,
}

impl ObservedSeries {
    /// Build the series from `(date, count)` pairs in file order
    ///
    /// Dates are parsed with `date_format`. Counts are summed into a running total, and empty
    /// counts leave the total unchanged.
    pub fn from_records<'a, I>(records: I, date_format: &str) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut reference_date = None;
        let mut days = vec![];
        let mut values = vec![];
        let mut cumulative = 0.0;

        for (row, (date, count)) in records.into_iter().enumerate() {
            let date = NaiveDate::parse_from_str(date.trim(), date_format).wrap_err_with(|| {
                format!(
                    "Row {}: unable to parse date '{}' with format '{}'",
                    row + 1,
                    date,
                    date_format
                )
            })?;
            let date0 = *reference_date.get_or_insert(date);

            let count = count.trim();
            if !count.is_empty() {
                cumulative += count.parse::<f64>().wrap_err_with(|| {
                    format!("Row {}: '{}' is not a number", row + 1, count)
                })?;
            }

            days.push((date - date0).num_days() as f64);
            values.push(cumulative);
        }

        let reference_date =
            reference_date.ok_or_else(|| eyre!("No observations found in the data"))?;

        Ok(ObservedSeries {
            reference_date,
            days,
            values,
        })
    }

    /// Read the series from two named columns of a CSV file with a header row
    pub fn read(
        path: impl AsRef<Path>,
        date_column: &str,
        value_column: &str,
        date_format: &str,
    ) -> Result<Self> {
        let path = path.as_ref();
        let table = Table::read(path)?;
        let dates = table.column(date_column)?;
        let counts = table.column(value_column)?;
        let series = Self::from_records(dates.into_iter().zip(counts), date_format)
            .wrap_err_with(|| format!("Invalid observed data in {:?}", path))?;
        tracing::info!(
            "Read {} observations of '{}' starting {} from {:?}",
            series.len(),
            value_column,
            series.reference_date(),
            path
        );
        Ok(series)
    }

    /// The series divided by a population size
    pub fn normalized(&self, population: f64) -> Self {
        ObservedSeries {
            reference_date: self.reference_date,
            days: self.days.clone(),
            values: self.values.iter().map(|value| value / population).collect(),
        }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn days(&self) -> &[f64] {
        &self.days
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// The last cumulative value
    pub fn final_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.days
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect()
    }
}

/// A comma-separated table with a header row, read fully into memory
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl Table {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .wrap_err_with(|| format!("Unable to open {:?}", path))?;

        let headers = reader
            .headers()?
            .iter()
            .map(|header| header.trim().to_owned())
            .collect();
        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .wrap_err_with(|| format!("Unable to read records from {:?}", path))?;

        Ok(Table { headers, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn nrows(&self) -> usize {
        self.records.len()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| eyre!("Column {} is not present in the table", name))
    }

    /// All values of a column, missing cells being empty
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let index = self.index_of(name)?;
        Ok(self
            .records
            .iter()
            .map(|record| record.get(index).unwrap_or(""))
            .collect())
    }

    /// A new table with only the given columns, in the given order
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|name| self.index_of(name))
            .collect::<Result<Vec<_>>>()?;
        let records = self
            .records
            .iter()
            .map(|record| {
                indices
                    .iter()
                    .map(|&i| record.get(i).unwrap_or(""))
                    .collect::<StringRecord>()
            })
            .collect();
        Ok(Table {
            headers: names.iter().map(|name| name.to_string()).collect(),
            records,
        })
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for record in &self.records {
            for (width, value) in widths.iter_mut().zip(record.iter()) {
                *width = (*width).max(value.len());
            }
        }
        let index_width = self.records.len().to_string().len();

        write!(f, "{:>index_width$}", "")?;
        for (header, width) in self.headers.iter().zip(&widths) {
            write!(f, "  {:>width$}", header, width = width)?;
        }
        writeln!(f)?;
        for (row, record) in self.records.iter().enumerate() {
            write!(f, "{:>index_width$}", row)?;
            for (value, width) in record.iter().zip(&widths) {
                write!(f, "  {:>width$}", value, width = width)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "[{} rows x {} columns]", self.nrows(), self.headers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_counts_carry_forward() {
        let series = ObservedSeries::from_records(
            vec![("3/01/20", ""), ("3/02/20", "2"), ("3/03/20", "3")],
            "%m/%d/%y",
        )
        .unwrap();
        assert_eq!(series.days(), &[0.0, 1.0, 2.0]);
        assert_eq!(series.values(), &[0.0, 2.0, 5.0]);
        assert_eq!(
            series.reference_date(),
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
        );
    }

    #[test]
    fn gaps_keep_the_total() {
        let series = ObservedSeries::from_records(
            vec![
                ("2/29/20", "1"),
                ("3/01/20", " "),
                ("3/05/20", "4"),
            ],
            "%m/%d/%y",
        )
        .unwrap();
        assert_eq!(series.days(), &[0.0, 1.0, 5.0]);
        assert_eq!(series.values(), &[1.0, 1.0, 5.0]);
        assert_eq!(series.final_value(), Some(5.0));
    }

    #[test]
    fn normalization() {
        let series =
            ObservedSeries::from_records(vec![("3/01/20", "2"), ("3/02/20", "6")], "%m/%d/%y")
                .unwrap()
                .normalized(4.0);
        assert_eq!(series.values(), &[0.5, 2.0]);
        assert_eq!(series.days(), &[0.0, 1.0]);
    }

    #[test]
    fn invalid_rows() {
        assert!(ObservedSeries::from_records(vec![("2020-03-01", "1")], "%m/%d/%y").is_err());
        assert!(ObservedSeries::from_records(vec![("3/01/20", "many")], "%m/%d/%y").is_err());
        assert!(ObservedSeries::from_records(Vec::<(&str, &str)>::new(), "%m/%d/%y").is_err());
    }
}

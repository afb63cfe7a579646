//! Line-oriented terminal form that collects one [`RawRecord`] per submission.
//!
//! Categorical fields accept either the option number or the exact label.
//! Empty input keeps the default. Invalid input re-prompts the same field,
//! so only in-range values reach the feature preparer.

use crate::types::catalog::ProductCatalog;
use crate::types::record::{
    Category, Color, RawRecord, Size, Subcategory, CALENDAR_YEARS, DISCOUNT_RANGE,
    LIST_PRICE_RANGE, MARGIN_RANGE, MONTHS, PRODUCT_AGE_RANGE,
};
use std::io::{self, BufRead, Write};
use std::ops::RangeInclusive;

/// Starting values of the numeric fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDefaults {
    pub list_price: f64,
    pub margin: f64,
    pub product_age_months: u32,
    pub prior_month_discount: f64,
}

impl Default for FormDefaults {
    fn default() -> Self {
        Self {
            list_price: 1000.0,
            margin: 200.0,
            product_age_months: 24,
            prior_month_discount: 0.10,
        }
    }
}

/// Terminal form over any reader/writer pair
pub struct TerminalForm<R, W> {
    input: R,
    output: W,
    defaults: FormDefaults,
}

impl<R: BufRead, W: Write> TerminalForm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self::with_defaults(input, output, FormDefaults::default())
    }

    pub fn with_defaults(input: R, output: W, defaults: FormDefaults) -> Self {
        Self {
            input,
            output,
            defaults,
        }
    }

    /// Writer the form prints to, for rendering results in the same stream.
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Fill in every field. Returns `None` when input ends.
    pub fn read_record(&mut self, catalog: &ProductCatalog) -> io::Result<Option<RawRecord>> {
        writeln!(self.output, "\n== Monthly demand prediction ==")?;

        let Some(product) = self.choose("Product", catalog.products(), 0)? else {
            return Ok(None);
        };
        let Some(category) = self.choose_enum("Category", Category::ALL)? else {
            return Ok(None);
        };
        let Some(subcategory) = self.choose_enum("Subcategory", Subcategory::ALL)? else {
            return Ok(None);
        };
        let Some(color) = self.choose_enum("Color", Color::ALL)? else {
            return Ok(None);
        };
        let Some(size) = self.choose_enum("Size", Size::ALL)? else {
            return Ok(None);
        };

        let years: Vec<i32> = CALENDAR_YEARS.collect();
        let Some(year) = self.choose("Year", &years, 0)? else {
            return Ok(None);
        };
        let months: Vec<u32> = MONTHS.collect();
        let Some(month) = self.choose("Month", &months, 0)? else {
            return Ok(None);
        };
        let Some(holiday) = self.choose("Holiday season", &[true, false], 0)? else {
            return Ok(None);
        };

        let defaults = self.defaults.clone();
        let Some(list_price) = self.number("List price ($)", LIST_PRICE_RANGE, defaults.list_price)?
        else {
            return Ok(None);
        };
        let Some(margin) = self.number("Margin ($)", MARGIN_RANGE, defaults.margin)? else {
            return Ok(None);
        };
        let age_range = *PRODUCT_AGE_RANGE.start() as f64..=*PRODUCT_AGE_RANGE.end() as f64;
        let Some(age) = self.whole_number(
            "Product age (months)",
            age_range,
            defaults.product_age_months as f64,
        )?
        else {
            return Ok(None);
        };
        let Some(discount) = self.number(
            "Prior month average discount",
            DISCOUNT_RANGE,
            defaults.prior_month_discount,
        )?
        else {
            return Ok(None);
        };

        Ok(Some(RawRecord {
            product: catalog.products()[product].clone(),
            category,
            subcategory,
            color,
            size,
            calendar_year: years[year],
            month: months[month],
            holiday_season: [true, false][holiday],
            list_price,
            margin,
            product_age_months: age as u32,
            prior_month_discount: discount,
        }))
    }

    /// Yes/no question; empty input means `default`.
    pub fn confirm(&mut self, question: &str, default: bool) -> io::Result<Option<bool>> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            write!(self.output, "{} {} ", question, hint)?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                return Ok(None);
            };
            match line.to_ascii_lowercase().as_str() {
                "" => return Ok(Some(default)),
                "y" | "yes" => return Ok(Some(true)),
                "n" | "no" => return Ok(Some(false)),
                _ => writeln!(self.output, "  please answer y or n")?,
            }
        }
    }

    fn choose_enum<T: Copy + ToString>(&mut self, label: &str, all: &[T]) -> io::Result<Option<T>> {
        Ok(self.choose(label, all, 0)?.map(|i| all[i]))
    }

    /// Pick one option by number (1-based) or exact label; returns its index.
    fn choose<T: ToString>(
        &mut self,
        label: &str,
        options: &[T],
        default: usize,
    ) -> io::Result<Option<usize>> {
        let labels: Vec<String> = options.iter().map(|o| o.to_string()).collect();
        if default >= labels.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no option {}", label, default + 1),
            ));
        }

        writeln!(self.output, "{}:", label)?;
        for (i, option) in labels.iter().enumerate() {
            writeln!(self.output, "  {:>3}) {}", i + 1, option)?;
        }

        loop {
            write!(self.output, "{} [{}]: ", label, labels[default])?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                return Ok(None);
            };

            if line.is_empty() {
                return Ok(Some(default));
            }
            if let Some(i) = labels.iter().position(|l| *l == line) {
                return Ok(Some(i));
            }
            match line.parse::<usize>() {
                Ok(n) if (1..=labels.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => writeln!(
                    self.output,
                    "  '{}' is not an option; enter 1-{} or a listed value",
                    line,
                    labels.len()
                )?,
            }
        }
    }

    /// Read a number within `range`.
    fn number(
        &mut self,
        label: &str,
        range: RangeInclusive<f64>,
        default: f64,
    ) -> io::Result<Option<f64>> {
        loop {
            write!(
                self.output,
                "{} ({}-{}) [{}]: ",
                label,
                range.start(),
                range.end(),
                default
            )?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                return Ok(None);
            };

            if line.is_empty() {
                return Ok(Some(default));
            }
            match line.parse::<f64>() {
                Ok(value) if range.contains(&value) => return Ok(Some(value)),
                _ => writeln!(
                    self.output,
                    "  enter a number between {} and {}",
                    range.start(),
                    range.end()
                )?,
            }
        }
    }

    fn whole_number(
        &mut self,
        label: &str,
        range: RangeInclusive<f64>,
        default: f64,
    ) -> io::Result<Option<f64>> {
        loop {
            let Some(value) = self.number(label, range.clone(), default)? else {
                return Ok(None);
            };
            if value.fract() == 0.0 {
                return Ok(Some(value));
            }
            writeln!(self.output, "  enter a whole number")?;
        }
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{road_750_record, sample_catalog};
    use std::io::Cursor;

    fn run_form(script: &str) -> (Option<RawRecord>, String) {
        let mut output = Vec::new();
        let record = {
            let mut form = TerminalForm::new(Cursor::new(script.as_bytes()), &mut output);
            form.read_record(&sample_catalog()).unwrap()
        };
        (record, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_scripted_road_750() {
        let script = [
            "1",            // product
            "Bikes",        // category
            "'Road Bikes'", // subcategory
            "2",            // color: Black
            "52",           // size by label
            "2023",
            "6",
            "false",
            "750",
            "150",
            "12",
            "0.05",
        ]
        .join("\n");

        let (record, _) = run_form(&script);
        assert_eq!(record, Some(road_750_record()));
    }

    #[test]
    fn test_empty_answers_take_defaults() {
        let (record, _) = run_form(&"\n".repeat(12));
        let record = record.unwrap();

        assert_eq!(record.product, "Road-750 Black, 52");
        assert_eq!(record.category, Category::Accessories);
        assert_eq!(record.subcategory, Subcategory::Helmets);
        assert_eq!(record.color, Color::Red);
        assert_eq!(record.size, Size::Nan);
        assert_eq!(record.calendar_year, 2018);
        assert_eq!(record.month, 1);
        assert!(record.holiday_season);
        assert_eq!(record.list_price, 1000.0);
        assert_eq!(record.margin, 200.0);
        assert_eq!(record.product_age_months, 24);
        assert_eq!(record.prior_month_discount, 0.10);
    }

    #[test]
    fn test_invalid_answers_reprompt() {
        // Category "Boats" then "3"; price 5000 then 900; age 2.5 then 3
        let script = "\nBoats\n3\n\n\n\n\n\n\n5000\n900\n\n2.5\n3\n\n";

        let (record, output) = run_form(script);
        let record = record.unwrap();

        assert_eq!(record.category, Category::Bikes);
        assert_eq!(record.list_price, 900.0);
        assert_eq!(record.product_age_months, 3);
        assert!(output.contains("'Boats' is not an option"));
        assert!(output.contains("enter a number between 0 and 4000"));
        assert!(output.contains("enter a whole number"));
    }

    #[test]
    fn test_end_of_input_returns_none() {
        let (record, _) = run_form("1\nBikes\n");
        assert_eq!(record, None);
    }

    #[test]
    fn test_empty_catalog_is_an_error() {
        let mut output = Vec::new();
        let mut form = TerminalForm::new(Cursor::new(&b"1\n"[..]), &mut output);

        let err = form.read_record(&ProductCatalog::default()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_confirm() {
        let mut output = Vec::new();
        let mut form = TerminalForm::new(Cursor::new(&b"maybe\nn\n\n"[..]), &mut output);

        assert_eq!(form.confirm("Another?", true).unwrap(), Some(false));
        assert_eq!(form.confirm("Another?", true).unwrap(), Some(true));
        assert_eq!(form.confirm("Another?", true).unwrap(), None);
    }
}

//! Buy rules: boolean flags derived from indicator columns.
//!
//! A rule fires only when every one of its conditions holds. A missing input
//! (warm-up row, no movement, or the lagged value at row 0) makes the rule
//! false for that row, never an error.
//!
//! Rules read only rows `0..=row` of the table.

pub mod golden_cross;
pub mod oversold_reversal;

pub use golden_cross::GoldenCross;
pub use oversold_reversal::OversoldReversal;

use thiserror::Error;
use tracing::info;

use crate::table::{PriceTable, TableError};

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("rule '{rule}' needs column '{column}', which the table does not have")]
    MissingColumn { rule: String, column: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

pub trait BuyRule: Send + Sync {
    /// Flag column name, e.g. "buy_golden_cross".
    fn name(&self) -> &str;

    /// Derived columns the rule reads.
    fn required_columns(&self) -> Vec<String>;

    /// Whether the rule fires at `row`.
    fn evaluate(&self, table: &PriceTable, row: usize) -> bool;
}

/// Current and previous value of a column at `row`, if both exist.
pub(crate) fn current_and_previous(table: &PriceTable, key: &str, row: usize) -> Option<(f64, f64)> {
    let prev_row = row.checked_sub(1)?;
    Some((table.value(key, row)?, table.value(key, prev_row)?))
}

/// Validate every rule's inputs and flag name, then append one flag column
/// per rule. On error the table is left unchanged.
pub fn apply_rules(table: &mut PriceTable, rules: &[Box<dyn BuyRule>]) -> Result<(), SignalError> {
    for (i, rule) in rules.iter().enumerate() {
        let name = rule.name();
        if table.has_name(name) || rules[..i].iter().any(|r| r.name() == name) {
            return Err(TableError::DuplicateColumn(name.to_string()).into());
        }
        if let Some(column) = rule
            .required_columns()
            .into_iter()
            .find(|c| !table.has_column(c))
        {
            return Err(SignalError::MissingColumn {
                rule: rule.name().to_string(),
                column,
            });
        }
    }

    for rule in rules {
        let flags: Vec<bool> = (0..table.len()).map(|row| rule.evaluate(table, row)).collect();
        let fired = flags.iter().filter(|&&f| f).count();
        table.add_flag(rule.name(), flags)?;
        info!(rule = rule.name(), fired, "evaluated buy rule");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    struct EveryOtherRow;

    impl BuyRule for EveryOtherRow {
        fn name(&self) -> &str {
            "buy_even"
        }

        fn required_columns(&self) -> Vec<String> {
            vec!["x".to_string()]
        }

        fn evaluate(&self, _table: &PriceTable, row: usize) -> bool {
            row % 2 == 0
        }
    }

    #[test]
    fn missing_column_rejected_before_any_flag() {
        let mut table = PriceTable::from_bars(make_bars(&[1.0, 2.0])).unwrap();
        let rules: Vec<Box<dyn BuyRule>> = vec![Box::new(EveryOtherRow)];
        let err = apply_rules(&mut table, &rules).unwrap_err();
        assert!(matches!(err, SignalError::MissingColumn { ref column, .. } if column == "x"));
        assert!(table.flag_names().is_empty());
    }

    #[test]
    fn flag_appended_per_rule() {
        let mut table = PriceTable::from_bars(make_bars(&[1.0, 2.0, 3.0])).unwrap();
        table.add_column("x", vec![0.0; 3]).unwrap();
        let rules: Vec<Box<dyn BuyRule>> = vec![Box::new(EveryOtherRow)];
        apply_rules(&mut table, &rules).unwrap();
        assert_eq!(table.flagged_rows("buy_even"), vec![0, 2]);
    }

    #[test]
    fn applying_twice_is_a_duplicate() {
        let mut table = PriceTable::from_bars(make_bars(&[1.0, 2.0])).unwrap();
        table.add_column("x", vec![0.0; 2]).unwrap();
        let rules: Vec<Box<dyn BuyRule>> = vec![Box::new(EveryOtherRow)];
        apply_rules(&mut table, &rules).unwrap();
        assert!(matches!(
            apply_rules(&mut table, &rules),
            Err(SignalError::Table(TableError::DuplicateColumn(_)))
        ));
    }

    struct Named(&'static str);

    impl BuyRule for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn required_columns(&self) -> Vec<String> {
            Vec::new()
        }

        fn evaluate(&self, _table: &PriceTable, _row: usize) -> bool {
            true
        }
    }

    #[test]
    fn taken_flag_name_rejected_before_any_flag() {
        let mut table = PriceTable::from_bars(make_bars(&[1.0, 2.0])).unwrap();
        table.add_flag("buy_second", vec![false, false]).unwrap();
        let rules: Vec<Box<dyn BuyRule>> = vec![Box::new(Named("buy_first")), Box::new(Named("buy_second"))];
        assert!(matches!(
            apply_rules(&mut table, &rules),
            Err(SignalError::Table(TableError::DuplicateColumn(ref name))) if name == "buy_second"
        ));
        assert_eq!(table.flag_names(), vec!["buy_second"]);

        let twice: Vec<Box<dyn BuyRule>> = vec![Box::new(Named("buy_x")), Box::new(Named("buy_x"))];
        assert!(apply_rules(&mut table, &twice).is_err());
        assert_eq!(table.flag_names(), vec!["buy_second"]);
    }

    #[test]
    fn previous_value_missing_at_row_zero() {
        let mut table = PriceTable::from_bars(make_bars(&[1.0, 2.0])).unwrap();
        table.add_column("x", vec![5.0, 6.0]).unwrap();
        assert_eq!(current_and_previous(&table, "x", 0), None);
        assert_eq!(current_and_previous(&table, "x", 1), Some((6.0, 5.0)));
    }
}

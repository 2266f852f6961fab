//! Column names and per-column cleaning policies for the two input tables

/// Customer identifier shared by both tables
pub const CUSTOMER_ID: &str = "LYLTY_CARD_NBR";
/// Customer lifestage segment
pub const LIFESTAGE: &str = "LIFESTAGE";
/// Premium tier segment
pub const PREMIUM_CUSTOMER: &str = "PREMIUM_CUSTOMER";
/// Product identifier
pub const PRODUCT_ID: &str = "PROD_NBR";
/// Sale amount of a transaction
pub const TOTAL_SALES: &str = "TOT_SALES";

/// How missing values in a column are replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStrategy {
    /// Most frequent non-null value (text columns)
    Mode,
    /// Arithmetic mean of non-null values (numeric columns)
    Mean,
}

/// dtype a column is normalised to right after loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Keep whatever the CSV reader inferred
    Inferred,
    /// 64-bit integer identifier
    Identifier,
    /// 64-bit float amount
    Amount,
}

/// Declared handling of one column
#[derive(Debug, Clone, Copy)]
pub struct ColumnPolicy {
    pub name: &'static str,
    pub fill: FillStrategy,
    pub kind: ColumnKind,
    pub required: bool,
}

impl ColumnPolicy {
    const fn new(name: &'static str, fill: FillStrategy, kind: ColumnKind, required: bool) -> Self {
        Self {
            name,
            fill,
            kind,
            required,
        }
    }
}

/// Policy table for one input file
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    /// Human readable table name used in diagnostics and errors
    pub name: &'static str,
    pub columns: &'static [ColumnPolicy],
}

impl TableSchema {
    /// Look up the declared policy for a column
    pub fn policy(&self, column: &str) -> Option<&ColumnPolicy> {
        self.columns.iter().find(|c| c.name == column)
    }

    /// Columns that must be present in the file
    pub fn required_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().filter(|c| c.required).map(|c| c.name)
    }
}

/// `purchase_behaviour.csv`
pub const PURCHASE_BEHAVIOUR: TableSchema = TableSchema {
    name: "Purchase Behavior",
    columns: &[
        ColumnPolicy::new(CUSTOMER_ID, FillStrategy::Mean, ColumnKind::Identifier, true),
        ColumnPolicy::new(LIFESTAGE, FillStrategy::Mode, ColumnKind::Inferred, true),
        ColumnPolicy::new(PREMIUM_CUSTOMER, FillStrategy::Mode, ColumnKind::Inferred, true),
    ],
};

/// `transaction_data.csv`
pub const TRANSACTIONS: TableSchema = TableSchema {
    name: "Transaction",
    columns: &[
        ColumnPolicy::new("DATE", FillStrategy::Mean, ColumnKind::Inferred, false),
        ColumnPolicy::new("STORE_NBR", FillStrategy::Mean, ColumnKind::Inferred, false),
        ColumnPolicy::new(CUSTOMER_ID, FillStrategy::Mean, ColumnKind::Identifier, true),
        ColumnPolicy::new("TXN_ID", FillStrategy::Mean, ColumnKind::Inferred, false),
        ColumnPolicy::new(PRODUCT_ID, FillStrategy::Mean, ColumnKind::Identifier, true),
        ColumnPolicy::new("PROD_NAME", FillStrategy::Mode, ColumnKind::Inferred, false),
        ColumnPolicy::new("PROD_QTY", FillStrategy::Mean, ColumnKind::Inferred, false),
        ColumnPolicy::new(TOTAL_SALES, FillStrategy::Mean, ColumnKind::Amount, true),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_lookup() {
        assert_eq!(PURCHASE_BEHAVIOUR.policy(LIFESTAGE).unwrap().fill, FillStrategy::Mode);
        assert_eq!(TRANSACTIONS.policy(TOTAL_SALES).unwrap().fill, FillStrategy::Mean);
        assert!(TRANSACTIONS.policy("UNKNOWN").is_none());
    }

    #[test]
    fn test_required_columns() {
        let required: Vec<_> = TRANSACTIONS.required_columns().collect();
        assert_eq!(required, vec![CUSTOMER_ID, PRODUCT_ID, TOTAL_SALES]);
    }
}

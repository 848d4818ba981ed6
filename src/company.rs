//! # Company financials
//! Filing snapshots (balance sheet, debt, maturity ladder, P&L, cash flow) read
//! from a local JSON file and rendered as the text block the analyst sees.
//!
//! The file holds either one snapshot or an array of them; the first entry is
//! the home company shown by `GET /api/company` and in the chat context.
//! Lookups for anything not on file answer with an explanatory sentence,
//! never an error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Which slice of a snapshot a lookup wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    BalanceSheet,
    DebtMaturity,
    IncomeStatement,
    CashFlow,
    FullSnapshot,
}

impl DataType {
    pub const ALL: [DataType; 5] = [
        DataType::BalanceSheet,
        DataType::DebtMaturity,
        DataType::IncomeStatement,
        DataType::CashFlow,
        DataType::FullSnapshot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::BalanceSheet => "balance_sheet",
            DataType::DebtMaturity => "debt_maturity",
            DataType::IncomeStatement => "income_statement",
            DataType::CashFlow => "cash_flow",
            DataType::FullSnapshot => "full_snapshot",
        }
    }
}

impl FromStr for DataType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s.trim())
            .ok_or_else(|| anyhow::anyhow!("unknown data_type: {s}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaturityLadder {
    pub year1: Option<f64>,
    pub year2: Option<f64>,
    pub year3: Option<f64>,
    pub year4: Option<f64>,
    pub year5: Option<f64>,
    pub after_year5: Option<f64>,
}

/// Figures are raw USD amounts as filed; rendering divides to millions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanySnapshot {
    pub ticker: String,
    pub name: String,
    pub cik: String,
    pub period_end: String,
    pub filing_type: String,
    pub filing_date: String,
    pub cash: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub equity: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub long_term_debt_current: Option<f64>,
    pub long_term_debt_noncurrent: Option<f64>,
    pub short_term_borrowings: Option<f64>,
    pub maturity_ladder: MaturityLadder,
    pub revenue: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    pub interest_expense: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub amortization: Option<f64>,
}

fn millions(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("${:.0}M", x / 1e6),
        None => "N/A".to_string(),
    }
}

impl CompanySnapshot {
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_uppercase();
        !q.is_empty() && (self.ticker.to_uppercase() == q || self.name.to_uppercase().contains(&q))
    }

    fn period_label(&self) -> String {
        let year = self.period_end.get(..4).unwrap_or("N/A");
        if self.filing_type == "10-K" {
            format!("FY{year}")
        } else {
            format!("{} ({})", self.period_end, self.filing_type)
        }
    }

    fn balance_sheet(&self, out: &mut String) {
        out.push_str("Balance Sheet:\n");
        let _ = writeln!(
            out,
            "  Cash: {}  |  Total Assets: {}  |  Equity: {}",
            millions(self.cash),
            millions(self.total_assets),
            millions(self.equity)
        );
    }

    fn debt(&self, out: &mut String) {
        let net_debt = self.long_term_debt.zip(self.cash).map(|(d, c)| d - c);
        out.push_str("Debt:\n");
        let _ = writeln!(
            out,
            "  Total LT Debt: {}  |  Current: {}  |  Non-current: {}",
            millions(self.long_term_debt),
            millions(self.long_term_debt_current),
            millions(self.long_term_debt_noncurrent)
        );
        let _ = writeln!(out, "  Short-term Borrowings: {}", millions(self.short_term_borrowings));
        let _ = writeln!(out, "  Net Debt: {}", millions(net_debt));
    }

    fn ladder(&self, out: &mut String) {
        let base: i32 = self
            .period_end
            .get(..4)
            .and_then(|y| y.parse().ok())
            .unwrap_or(2025);
        let ml = &self.maturity_ladder;
        out.push_str("Debt Maturity Ladder:\n");
        let rows = [
            (ml.year1, format!("{}", base + 1)),
            (ml.year2, format!("{}", base + 2)),
            (ml.year3, format!("{}", base + 3)),
            (ml.year4, format!("{}", base + 4)),
            (ml.year5, format!("{}", base + 5)),
            (ml.after_year5, format!("After {}", base + 5)),
        ];
        let mut any = false;
        for (v, label) in rows {
            if v.is_some() {
                any = true;
                let _ = writeln!(out, "  {label}: {}", millions(v));
            }
        }
        if !any {
            out.push_str("  Not available in filing data\n");
        }
    }

    fn income(&self, out: &mut String) {
        let ebitda = self
            .operating_income
            .zip(self.amortization)
            .map(|(o, a)| o + a);
        out.push_str("Income Statement (annual):\n");
        let _ = writeln!(
            out,
            "  Revenue: {}  |  Operating Income: {}  |  Net Income: {}",
            millions(self.revenue),
            millions(self.operating_income),
            millions(self.net_income)
        );
        let _ = writeln!(
            out,
            "  EBITDA (approx): {}  |  Interest Expense: {}",
            millions(ebitda),
            millions(self.interest_expense)
        );
    }

    fn cash_flow(&self, out: &mut String) {
        out.push_str("Cash Flow:\n");
        let _ = writeln!(
            out,
            "  Operating CF: {}  |  FCF proxy: {}",
            millions(self.operating_cash_flow),
            millions(self.operating_cash_flow)
        );
    }

    /// Render the requested section(s) under a header line.
    pub fn render(&self, data_type: DataType) -> String {
        let mut out = format!(
            "--- {} ({}) | {} ({} filed {}) ---\n",
            self.name,
            self.ticker,
            self.period_label(),
            self.filing_type,
            self.filing_date
        );
        match data_type {
            DataType::BalanceSheet => self.balance_sheet(&mut out),
            DataType::DebtMaturity => {
                self.debt(&mut out);
                self.ladder(&mut out);
            }
            DataType::IncomeStatement => self.income(&mut out),
            DataType::CashFlow => self.cash_flow(&mut out),
            DataType::FullSnapshot => {
                self.balance_sheet(&mut out);
                self.debt(&mut out);
                self.ladder(&mut out);
                self.income(&mut out);
                self.cash_flow(&mut out);
            }
        }
        let _ = write!(out, "--- End {} snapshot ---", self.ticker);
        out
    }
}

/// Financial-data collaborator behind `lookup_company_financials`.
#[async_trait]
pub trait FinancialsLookup: Send + Sync {
    /// Text answer; failures are explained in the text, not raised.
    async fn lookup(&self, company: &str, data_type: DataType) -> String;
    /// Home-company block for the chat context, if any.
    fn context_block(&self) -> Option<String>;
    /// Home-company snapshot for `GET /api/company`.
    fn home(&self) -> Option<CompanySnapshot>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Many(Vec<CompanySnapshot>),
    One(Box<CompanySnapshot>),
}

/// Snapshots loaded from a JSON file on disk.
#[derive(Debug, Clone, Default)]
pub struct FileFinancials {
    snapshots: Vec<CompanySnapshot>,
}

impl FileFinancials {
    pub fn new(snapshots: Vec<CompanySnapshot>) -> Self {
        Self { snapshots }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading company snapshot {}", path.display()))?;
        let parsed: SnapshotFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing company snapshot {}", path.display()))?;
        let snapshots = match parsed {
            SnapshotFile::Many(v) => v,
            SnapshotFile::One(s) => vec![*s],
        };
        Ok(Self::new(snapshots))
    }

    /// `None` when the file is absent or unreadable (the tool is then not offered).
    pub fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load(path) {
            Ok(f) if !f.snapshots.is_empty() => Some(f),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = ?e, "company snapshot unusable; financial tool disabled");
                None
            }
        }
    }

    pub fn find(&self, query: &str) -> Option<&CompanySnapshot> {
        self.snapshots.iter().find(|s| s.matches(query))
    }
}

#[async_trait]
impl FinancialsLookup for FileFinancials {
    async fn lookup(&self, company: &str, data_type: DataType) -> String {
        match self.find(company) {
            Some(s) => s.render(data_type),
            None => format!(
                "Could not find a filing snapshot for \"{}\". It may not be a US public company or is not on file.",
                company.trim()
            ),
        }
    }

    fn context_block(&self) -> Option<String> {
        self.snapshots.first().map(|s| s.render(DataType::FullSnapshot))
    }

    fn home(&self) -> Option<CompanySnapshot> {
        self.snapshots.first().cloned()
    }
}

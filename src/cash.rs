//! Static cash-position dataset (USD millions) and the summary block the
//! analyst chat sees.

use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CashPosition {
    pub name: &'static str,
    /// USD millions.
    pub balance: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<&'static str>,
}

const fn country(name: &'static str, balance: u32, ccy: &'static str) -> CashPosition {
    CashPosition {
        name,
        balance,
        currency: Some(ccy),
    }
}

const fn bank(name: &'static str, balance: u32) -> CashPosition {
    CashPosition {
        name,
        balance,
        currency: None,
    }
}

pub const CASH_BY_COUNTRY: &[CashPosition] = &[
    country("United States", 847, "USD"),
    country("Germany", 318, "EUR"),
    country("United Kingdom", 276, "GBP"),
    country("Japan", 193, "JPY"),
    country("Singapore", 162, "SGD"),
    country("Canada", 138, "CAD"),
    country("France", 124, "EUR"),
    country("Australia", 91, "AUD"),
    country("Brazil", 73, "BRL"),
    country("China", 58, "CNY"),
];

pub const CASH_BY_BANK: &[CashPosition] = &[
    bank("JPMorgan Chase", 423),
    bank("Bank of America", 314),
    bank("Deutsche Bank", 278),
    bank("HSBC", 243),
    bank("Citibank", 208),
    bank("Wells Fargo", 183),
    bank("Barclays", 152),
    bank("BNP Paribas", 129),
    bank("Goldman Sachs", 94),
    bank("Mizuho Bank", 83),
];

pub fn total_exposure(positions: &[CashPosition]) -> u32 {
    positions.iter().map(|p| p.balance).sum()
}

/// 1234 -> "1,234"
fn thousands(n: u32) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_cash_summary(by_country: &[CashPosition], by_bank: &[CashPosition]) -> String {
    let mut out = String::from("Cash by Country (USD millions):\n");
    for c in by_country {
        let _ = write!(out, "  {}: ${}M", c.name, c.balance);
        if let Some(ccy) = c.currency {
            let _ = write!(out, " ({ccy})");
        }
        out.push('\n');
    }
    out.push_str("\nCash by Banking Counterparty (USD millions):\n");
    for b in by_bank {
        let _ = writeln!(out, "  {}: ${}M", b.name, b.balance);
    }
    let _ = write!(
        out,
        "Total counterparty exposure: ${}M",
        thousands(total_exposure(by_bank))
    );
    out
}

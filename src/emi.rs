//! Equated monthly installment for a fixed-rate, fixed-term loan.
//!
//! `EMI = P * r * (1 + r)^N / ((1 + r)^N - 1)` with `r = R / 12 / 100`,
//! rounded to the nearest rupee. A zero rate degenerates to `P / N`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShowroomError};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmiInputs {
    /// Loan amount in rupees.
    pub principal: f64,
    /// Annual interest rate in percent (10.5 means 10.5%).
    pub annual_rate: f64,
    pub months: u32,
}

impl EmiInputs {
    pub fn new(principal: f64, annual_rate: f64, months: u32) -> Self {
        Self { principal, annual_rate, months }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_finite() || self.principal <= 0.0 {
            return Err(ShowroomError::InvalidLoan(format!(
                "principal must be positive, got {}",
                self.principal
            )));
        }
        if !self.annual_rate.is_finite() || self.annual_rate < 0.0 {
            return Err(ShowroomError::InvalidLoan(format!(
                "rate must be zero or positive, got {}",
                self.annual_rate
            )));
        }
        if self.months == 0 {
            return Err(ShowroomError::InvalidLoan("term must be at least one month".into()));
        }
        Ok(())
    }

    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate / 12.0 / 100.0
    }

    /// Unrounded installment. Inputs must already be valid.
    ///
    /// `(1 + r)^N - 1` is taken through `ln_1p`/`exp_m1` so tiny rates do
    /// not cancel to zero.
    fn exact_installment(&self) -> f64 {
        let r = self.monthly_rate();
        let n = self.months as f64;
        if r == 0.0 {
            return self.principal / n;
        }
        let accrued = (n * r.ln_1p()).exp_m1();
        if accrued.is_infinite() {
            // growth / accrued tends to 1.
            return self.principal * r;
        }
        if !accrued.is_normal() || accrued <= 0.0 {
            return self.principal / n;
        }
        self.principal * r * ((1.0 + accrued) / accrued)
    }
}

// 2^64; every rounded installment must stay below it.
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Rounded monthly installment.
pub fn monthly_installment(inputs: &EmiInputs) -> Result<u64> {
    inputs.validate()?;
    let rounded = inputs.exact_installment().round();
    if !rounded.is_finite() || rounded < 0.0 || rounded >= U64_LIMIT {
        return Err(ShowroomError::InvalidLoan(format!(
            "installment for {} over {} months at {}% is out of range",
            inputs.principal, inputs.months, inputs.annual_rate
        )));
    }
    Ok(rounded as u64)
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmiQuote {
    pub emi: u64,
    pub total_payable: u64,
    pub total_interest: u64,
}

/// Installment plus what the buyer ends up paying over the whole term.
pub fn quote(inputs: &EmiInputs) -> Result<EmiQuote> {
    let emi = monthly_installment(inputs)?;
    let total_payable = emi.checked_mul(inputs.months as u64).ok_or_else(|| {
        ShowroomError::InvalidLoan(format!("total payable over {} months overflows", inputs.months))
    })?;
    let principal = inputs.principal.round() as u64;
    Ok(EmiQuote {
        emi,
        total_payable,
        total_interest: total_payable.saturating_sub(principal),
    })
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub month: u32,
    pub interest: f64,
    pub principal: f64,
    pub balance: f64,
}

/// Month-by-month split of each payment into interest and principal.
///
/// Uses the unrounded installment so the balance reaches zero; the last
/// row pays off whatever float drift is left.
pub fn schedule(inputs: &EmiInputs) -> Result<Vec<Installment>> {
    inputs.validate()?;
    let r = inputs.monthly_rate();
    let payment = inputs.exact_installment();

    let mut balance = inputs.principal;
    let mut rows = Vec::with_capacity(inputs.months as usize);
    for month in 1..=inputs.months {
        let interest = balance * r;
        let principal = if month == inputs.months { balance } else { payment - interest };
        balance = (balance - principal).max(0.0);
        rows.push(Installment { month, interest, principal, balance });
    }
    Ok(rows)
}

/// A slider range. Advisory only: the calculator accepts anything positive.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Starting point and slider ranges offered next to a bike's price.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmiDefaults {
    pub inputs: EmiInputs,
    pub loan_amount: Range,
    pub annual_rate: Range,
    pub months: Range,
}

pub const MIN_LOAN: f64 = 10_000.0;
pub const DEFAULT_LOAN_SHARE: f64 = 0.8;
pub const DEFAULT_RATE: f64 = 10.5;
pub const DEFAULT_MONTHS: u32 = 36;

impl EmiDefaults {
    pub fn for_price(price: u64) -> Self {
        let price = price as f64;
        Self {
            inputs: EmiInputs::new(price * DEFAULT_LOAN_SHARE, DEFAULT_RATE, DEFAULT_MONTHS),
            loan_amount: Range { min: MIN_LOAN, max: price, step: 1000.0 },
            annual_rate: Range { min: 5.0, max: 20.0, step: 0.1 },
            months: Range { min: 12.0, max: 60.0, step: 6.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_closed_form() {
        let inputs = EmiInputs::new(182_000.0, 10.5, 36);
        assert!((inputs.monthly_rate() - 0.00875).abs() < 1e-12);

        let r: f64 = 0.00875;
        let g = (1.0 + r).powi(36);
        let expected = (182_000.0 * r * g / (g - 1.0)).round() as u64;
        assert_eq!(monthly_installment(&inputs).unwrap(), expected);
        assert_eq!(expected, 5915);
    }

    #[test]
    fn zero_rate_is_straight_division() {
        let inputs = EmiInputs::new(100_000.0, 0.0, 7);
        assert_eq!(monthly_installment(&inputs).unwrap(), 14286);
    }

    #[test]
    fn tiny_rates_approach_straight_division() {
        let inputs = EmiInputs::new(120_000.0, 1e-15, 12);
        assert_eq!(monthly_installment(&inputs).unwrap(), 10_000);
        let q = quote(&inputs).unwrap();
        assert_eq!(q.total_payable, 120_000);
        assert_eq!(q.total_interest, 0);
    }

    #[test]
    fn oversized_loans_are_invalid() {
        assert!(matches!(
            monthly_installment(&EmiInputs::new(1e25, 10.0, 12)),
            Err(ShowroomError::InvalidLoan(_))
        ));
        // Installment fits in u64 but twelve of them do not.
        let inputs = EmiInputs::new(18e18, 10.0, 12);
        assert!(monthly_installment(&inputs).is_ok());
        assert!(matches!(quote(&inputs), Err(ShowroomError::InvalidLoan(_))));
        assert!(matches!(
            monthly_installment(&EmiInputs::new(1000.0, 1e300, 12)),
            Err(ShowroomError::InvalidLoan(_))
        ));
    }

    #[test]
    fn accepts_values_outside_slider_ranges() {
        assert!(monthly_installment(&EmiInputs::new(500.0, 35.0, 3)).is_ok());
        assert!(monthly_installment(&EmiInputs::new(5_000_000.0, 1.0, 240)).is_ok());
    }

    #[test]
    fn rejects_degenerate_terms() {
        assert!(matches!(
            monthly_installment(&EmiInputs::new(0.0, 10.0, 12)),
            Err(ShowroomError::InvalidLoan(_))
        ));
        assert!(monthly_installment(&EmiInputs::new(1000.0, -1.0, 12)).is_err());
        assert!(monthly_installment(&EmiInputs::new(1000.0, 10.0, 0)).is_err());
        assert!(monthly_installment(&EmiInputs::new(f64::NAN, 10.0, 12)).is_err());
    }

    #[test]
    fn quote_totals() {
        let q = quote(&EmiInputs::new(182_000.0, 10.5, 36)).unwrap();
        assert_eq!(q.total_payable, 5915 * 36);
        assert_eq!(q.total_interest, 5915 * 36 - 182_000);
    }

    #[test]
    fn schedule_pays_off_the_loan() {
        let rows = schedule(&EmiInputs::new(100_000.0, 12.0, 12)).unwrap();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows.last().unwrap().balance, 0.0);
        let repaid: f64 = rows.iter().map(|r| r.principal).sum();
        assert!((repaid - 100_000.0).abs() < 1e-6);
        assert!((rows[0].interest - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn defaults_follow_price() {
        let d = EmiDefaults::for_price(182_000);
        assert_eq!(d.inputs.principal, 145_600.0);
        assert_eq!(d.inputs.months, 36);
        assert_eq!(d.loan_amount.max, 182_000.0);
    }
}

//! All-in equity account used to mark a run to market.

use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

/// Cash account that moves fully in and out of a single instrument.
///
/// Units are fractional. `commission_pct` is charged on each side.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub initial_capital: f64,
    pub commission_pct: f64,
    pub cash: f64,
    pub units: f64,
    pub equity_curve: Vec<EquityPoint>,
}

impl Account {
    pub fn new(initial_capital: f64, commission_pct: f64) -> Self {
        Account {
            initial_capital,
            commission_pct,
            cash: initial_capital,
            units: 0.0,
            equity_curve: Vec::new(),
        }
    }

    fn fee_rate(&self) -> f64 {
        self.commission_pct / 100.0
    }

    /// Spend all cash at `price`.
    pub fn buy(&mut self, price: f64) {
        if price <= 0.0 || self.cash <= 0.0 {
            return;
        }
        self.units += self.cash * (1.0 - self.fee_rate()) / price;
        self.cash = 0.0;
    }

    /// Sell all units at `price`.
    pub fn sell(&mut self, price: f64) {
        self.cash += self.units * price * (1.0 - self.fee_rate());
        self.units = 0.0;
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.units * price
    }

    pub fn mark(&mut self, timestamp: NaiveDateTime, price: f64) {
        let equity = self.equity(price);
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }
}

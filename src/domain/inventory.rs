//! Cost-basis bookkeeping for a single security.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use super::error::FolioError;

/// How sold shares are matched against purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CostMethod {
    /// Oldest lots are consumed first.
    #[default]
    Fifo,
    /// All purchases fold into one running average.
    AverageCost,
}

impl FromStr for CostMethod {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fifo" => Ok(CostMethod::Fifo),
            "average" | "avg" | "averagecost" | "average_cost" => Ok(CostMethod::AverageCost),
            _ => Err(FolioError::invalid(
                "method",
                format!("unknown cost method {s:?} (expected fifo or average)"),
            )),
        }
    }
}

impl fmt::Display for CostMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostMethod::Fifo => f.write_str("fifo"),
            CostMethod::AverageCost => f.write_str("average"),
        }
    }
}

/// An unconsumed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lot {
    pub date: NaiveDate,
    pub quantity: Decimal,
    pub cost: Decimal,
}

impl Lot {
    pub fn unit_cost(&self) -> Decimal {
        if self.quantity.is_zero() {
            Decimal::ZERO
        } else {
            self.cost / self.quantity
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inventory {
    Fifo(VecDeque<Lot>),
    AverageCost { quantity: Decimal, cost: Decimal },
}

impl Inventory {
    pub fn new(method: CostMethod) -> Self {
        match method {
            CostMethod::Fifo => Inventory::Fifo(VecDeque::new()),
            CostMethod::AverageCost => Inventory::AverageCost {
                quantity: Decimal::ZERO,
                cost: Decimal::ZERO,
            },
        }
    }

    pub fn add(&mut self, date: NaiveDate, quantity: Decimal, cost: Decimal) {
        match self {
            Inventory::Fifo(lots) => lots.push_back(Lot {
                date,
                quantity,
                cost,
            }),
            Inventory::AverageCost {
                quantity: held,
                cost: total,
            } => {
                *held += quantity;
                *total += cost;
            }
        }
    }

    /// Remove `quantity` shares and return the cost basis released.
    ///
    /// Removing more than is held releases the cost of what is held; the
    /// excess carries no cost.
    pub fn remove(&mut self, quantity: Decimal) -> Decimal {
        match self {
            Inventory::Fifo(lots) => {
                let mut remaining = quantity;
                let mut released = Decimal::ZERO;
                while remaining > Decimal::ZERO {
                    let Some(front) = lots.front_mut() else {
                        break;
                    };
                    if front.quantity <= remaining {
                        remaining -= front.quantity;
                        released += front.cost;
                        lots.pop_front();
                    } else {
                        let part = front.cost * remaining / front.quantity;
                        front.quantity -= remaining;
                        front.cost -= part;
                        released += part;
                        remaining = Decimal::ZERO;
                    }
                }
                released
            }
            Inventory::AverageCost {
                quantity: held,
                cost: total,
            } => {
                if *held <= Decimal::ZERO {
                    return Decimal::ZERO;
                }
                let taken = quantity.min(*held);
                if taken == *held {
                    let released = *total;
                    *held = Decimal::ZERO;
                    *total = Decimal::ZERO;
                    return released;
                }
                let released = *total * taken / *held;
                *held -= taken;
                *total -= released;
                released
            }
        }
    }

    /// Scale held quantities by a split ratio; cost is unchanged.
    pub fn split(&mut self, ratio: Decimal) {
        match self {
            Inventory::Fifo(lots) => {
                for lot in lots.iter_mut() {
                    lot.quantity *= ratio;
                }
            }
            Inventory::AverageCost { quantity, .. } => *quantity *= ratio,
        }
    }

    pub fn quantity(&self) -> Decimal {
        match self {
            Inventory::Fifo(lots) => lots.iter().map(|l| l.quantity).sum(),
            Inventory::AverageCost { quantity, .. } => *quantity,
        }
    }

    pub fn cost_basis(&self) -> Decimal {
        match self {
            Inventory::Fifo(lots) => lots.iter().map(|l| l.cost).sum(),
            Inventory::AverageCost { cost, .. } => *cost,
        }
    }

    pub fn average_unit_cost(&self) -> Decimal {
        let quantity = self.quantity();
        if quantity.is_zero() {
            Decimal::ZERO
        } else {
            self.cost_basis() / quantity
        }
    }

    /// Open lots, oldest first. Average-cost inventories have none.
    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        let lots = match self {
            Inventory::Fifo(lots) => Some(lots.iter()),
            Inventory::AverageCost { .. } => None,
        };
        lots.into_iter().flatten()
    }
}

//! Profit and ordering-pattern reports computed over rows already loaded
//! from the database.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::requirements::{compute_requirements, stock_deltas, CompositionLine};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderFact {
    pub id: i64,
    pub customer_name: String,
    pub product_type_id: Option<i64>,
    pub product_name: Option<String>,
    pub order_date: NaiveDate,
    pub quantity: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PricePoint {
    pub material_id: i64,
    pub purchase_date: NaiveDate,
    pub price: Decimal,
}

/// Purchase prices per material, ordered by date.
#[derive(Debug, Default)]
pub struct PriceHistory {
    by_material: HashMap<i64, Vec<(NaiveDate, Decimal)>>,
}

impl PriceHistory {
    pub fn new(points: Vec<PricePoint>) -> Self {
        let mut by_material: HashMap<i64, Vec<(NaiveDate, Decimal)>> = HashMap::new();
        for p in points {
            by_material
                .entry(p.material_id)
                .or_default()
                .push((p.purchase_date, p.price));
        }
        for prices in by_material.values_mut() {
            // Stable: same-day purchases keep load order, the last one wins.
            prices.sort_by_key(|(date, _)| *date);
        }
        Self { by_material }
    }

    /// Latest purchase price on or before `date`.
    pub fn price_on(&self, material_id: i64, date: NaiveDate) -> Option<Decimal> {
        let prices = self.by_material.get(&material_id)?;
        let idx = prices.partition_point(|(d, _)| *d <= date);
        idx.checked_sub(1).map(|i| prices[i].1)
    }
}

#[derive(Debug, Clone)]
pub struct CostedOrder {
    pub order: OrderFact,
    pub cost: Decimal,
}

/// Material cost of each order from its product's recipe and the purchase
/// prices in effect on the order date. Unpriced materials cost nothing.
pub fn cost_orders(
    orders: Vec<OrderFact>,
    recipes: &HashMap<i64, Vec<CompositionLine>>,
    prices: &PriceHistory,
) -> Vec<CostedOrder> {
    orders
        .into_iter()
        .map(|order| {
            let lines = order
                .product_type_id
                .and_then(|id| recipes.get(&id))
                .map(Vec::as_slice)
                .unwrap_or_default();
            let cost = compute_requirements(order.quantity, lines)
                .ok()
                .and_then(|reqs| {
                    stock_deltas(&reqs)
                        .into_iter()
                        .try_fold(Decimal::ZERO, |acc, (material_id, qty)| {
                            let price = prices
                                .price_on(material_id, order.order_date)
                                .unwrap_or(Decimal::ZERO);
                            acc.checked_add(qty.checked_mul(price)?)
                        })
                })
                .unwrap_or_else(|| {
                    warn!(order_id = order.id, "Order cost could not be computed");
                    Decimal::ZERO
                })
                .round_dp(2);
            CostedOrder { order, cost }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfitLine {
    pub total_sales: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    /// Percent of sales.
    pub profit_rate: Decimal,
    pub total_quantity: Decimal,
    pub total_orders: i64,
}

impl ProfitLine {
    fn add(&mut self, costed: &CostedOrder) {
        self.total_sales += costed.order.total_price;
        self.total_cost += costed.cost;
        self.total_quantity += costed.order.quantity;
        self.total_orders += 1;
        self.total_profit = self.total_sales - self.total_cost;
        self.profit_rate = if self.total_sales.is_zero() {
            Decimal::ZERO
        } else {
            (self.total_profit / self.total_sales * Decimal::ONE_HUNDRED).round_dp(2)
        };
    }
}

#[derive(Debug, Serialize)]
pub struct ProductProfit {
    pub product_type_id: Option<i64>,
    pub product_name: String,
    #[serde(flatten)]
    pub profit: ProfitLine,
}

#[derive(Debug, Serialize)]
pub struct CustomerProfit {
    pub customer_name: String,
    #[serde(flatten)]
    pub profit: ProfitLine,
}

#[derive(Debug, Serialize)]
pub struct MonthlyProfit {
    /// `YYYY-MM`
    pub month: String,
    #[serde(flatten)]
    pub profit: ProfitLine,
}

pub fn summarize(orders: &[CostedOrder]) -> ProfitLine {
    let mut line = ProfitLine::default();
    for o in orders {
        line.add(o);
    }
    line
}

/// Running costs charged against a period on top of materials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverheadRates {
    /// Bag cost per kg sold.
    pub packaging_per_kg: Decimal,
    /// Shipping box cost, charged per `kg_per_box` sold.
    pub shipping_box: Decimal,
    pub kg_per_box: Decimal,
    /// Box cost per order.
    pub per_order: Decimal,
    pub monthly_rent: Decimal,
}

impl Default for OverheadRates {
    fn default() -> Self {
        Self {
            packaging_per_kg: Decimal::from(1_000),
            shipping_box: Decimal::from(6_000),
            kg_per_box: Decimal::from(15),
            per_order: Decimal::from(1_000),
            monthly_rent: Decimal::from(650_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overheads {
    pub packaging_cost: Decimal,
    pub shipping_box_cost: Decimal,
    pub order_box_cost: Decimal,
    pub months: u32,
    pub rent_cost: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetProfit {
    pub net_profit: Decimal,
    /// Percent of sales.
    pub net_profit_rate: Decimal,
}

/// Calendar months touched by `start..=end`; a period inside one month counts as one.
pub fn months_spanned(start: NaiveDate, end: NaiveDate) -> u32 {
    let months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32 + 1;
    months.max(0) as u32
}

pub fn overheads(line: &ProfitLine, months: u32, rates: &OverheadRates) -> Overheads {
    let packaging_cost = (line.total_quantity * rates.packaging_per_kg).round_dp(2);
    let shipping_box_cost = if rates.kg_per_box.is_zero() {
        Decimal::ZERO
    } else {
        (line.total_quantity / rates.kg_per_box * rates.shipping_box).round_dp(2)
    };
    let order_box_cost = Decimal::from(line.total_orders) * rates.per_order;
    let rent_cost = Decimal::from(months) * rates.monthly_rent;

    Overheads {
        packaging_cost,
        shipping_box_cost,
        order_box_cost,
        months,
        rent_cost,
        total: packaging_cost + shipping_box_cost + order_box_cost + rent_cost,
    }
}

pub fn net_profit(line: &ProfitLine, overheads: &Overheads) -> NetProfit {
    let net_profit = line.total_profit - overheads.total;
    let net_profit_rate = if line.total_sales.is_zero() {
        Decimal::ZERO
    } else {
        (net_profit / line.total_sales * Decimal::ONE_HUNDRED).round_dp(2)
    };
    NetProfit {
        net_profit,
        net_profit_rate,
    }
}

/// Highest profit first.
pub fn by_product(orders: &[CostedOrder]) -> Vec<ProductProfit> {
    let mut groups: BTreeMap<(Option<i64>, String), ProfitLine> = BTreeMap::new();
    for o in orders {
        let name = o
            .order
            .product_name
            .clone()
            .unwrap_or_else(|| "(unassigned)".to_string());
        groups
            .entry((o.order.product_type_id, name))
            .or_default()
            .add(o);
    }
    let mut rows: Vec<_> = groups
        .into_iter()
        .map(|((product_type_id, product_name), profit)| ProductProfit {
            product_type_id,
            product_name,
            profit,
        })
        .collect();
    rows.sort_by(|a, b| b.profit.total_profit.cmp(&a.profit.total_profit));
    rows
}

/// Highest profit first.
pub fn by_customer(orders: &[CostedOrder]) -> Vec<CustomerProfit> {
    let mut groups: BTreeMap<String, ProfitLine> = BTreeMap::new();
    for o in orders {
        groups.entry(o.order.customer_name.clone()).or_default().add(o);
    }
    let mut rows: Vec<_> = groups
        .into_iter()
        .map(|(customer_name, profit)| CustomerProfit {
            customer_name,
            profit,
        })
        .collect();
    rows.sort_by(|a, b| b.profit.total_profit.cmp(&a.profit.total_profit));
    rows
}

/// Chronological.
pub fn monthly(orders: &[CostedOrder]) -> Vec<MonthlyProfit> {
    let mut groups: BTreeMap<(i32, u32), ProfitLine> = BTreeMap::new();
    for o in orders {
        let d = o.order.order_date;
        groups.entry((d.year(), d.month())).or_default().add(o);
    }
    groups
        .into_iter()
        .map(|((year, month), profit)| MonthlyProfit {
            month: format!("{year:04}-{month:02}"),
            profit,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderCycle {
    /// Distinct order dates; several orders on one day count once.
    pub total_orders: usize,
    pub last_order_date: Option<NaiveDate>,
    pub next_expected_date: Option<NaiveDate>,
    pub average_interval_days: f64,
    pub average_quantity: Decimal,
    /// Days from `today` until the next expected order; negative when overdue.
    pub days_until_next: Option<i64>,
}

pub fn order_cycle<I>(orders: I, today: NaiveDate) -> OrderCycle
where
    I: IntoIterator<Item = (NaiveDate, Decimal)>,
{
    let mut dates = BTreeSet::new();
    let mut total_quantity = Decimal::ZERO;
    for (date, quantity) in orders {
        dates.insert(date);
        total_quantity += quantity;
    }

    let total_orders = dates.len();
    let average_quantity = if total_orders == 0 {
        Decimal::ZERO
    } else {
        (total_quantity / Decimal::from(total_orders)).round_dp(1)
    };

    let ordered: Vec<NaiveDate> = dates.into_iter().collect();
    let intervals: Vec<i64> = ordered
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .filter(|days| *days > 0)
        .collect();
    let average_interval = if intervals.is_empty() {
        0.0
    } else {
        intervals.iter().sum::<i64>() as f64 / intervals.len() as f64
    };

    let last_order_date = ordered.last().copied();
    let next_expected_date = match last_order_date {
        Some(last) if average_interval > 0.0 => {
            Some(last + Duration::days(average_interval.floor() as i64))
        }
        _ => None,
    };

    OrderCycle {
        total_orders,
        last_order_date,
        next_expected_date,
        average_interval_days: (average_interval * 10.0).round() / 10.0,
        average_quantity,
        days_until_next: next_expected_date.map(|next| (next - today).num_days()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn order(id: i64, customer: &str, product: Option<i64>, date: NaiveDate, qty: Decimal, total: Decimal) -> OrderFact {
        OrderFact {
            id,
            customer_name: customer.to_string(),
            product_type_id: product,
            product_name: product.map(|p| format!("product-{p}")),
            order_date: date,
            quantity: qty,
            total_price: total,
        }
    }

    fn recipe(material_id: i64, ratio: Decimal) -> CompositionLine {
        CompositionLine {
            material_id,
            material_name: format!("m{material_id}"),
            unit: "kg".to_string(),
            ratio,
            default_ratio: Decimal::ONE,
            is_required: true,
        }
    }

    #[test]
    fn price_on_picks_latest_purchase_not_after_the_date() {
        let history = PriceHistory::new(vec![
            PricePoint { material_id: 1, purchase_date: d(2025, 3, 1), price: dec!(12000) },
            PricePoint { material_id: 1, purchase_date: d(2025, 1, 1), price: dec!(10000) },
        ]);

        assert_eq!(history.price_on(1, d(2024, 12, 31)), None);
        assert_eq!(history.price_on(1, d(2025, 1, 1)), Some(dec!(10000)));
        assert_eq!(history.price_on(1, d(2025, 2, 15)), Some(dec!(10000)));
        assert_eq!(history.price_on(1, d(2025, 3, 1)), Some(dec!(12000)));
        assert_eq!(history.price_on(2, d(2025, 3, 1)), None);
    }

    #[test]
    fn order_cost_uses_recipe_and_price_in_effect() {
        let recipes = HashMap::from([(10, vec![recipe(1, dec!(0.5)), recipe(2, dec!(0.5))])]);
        let prices = PriceHistory::new(vec![
            PricePoint { material_id: 1, purchase_date: d(2025, 1, 1), price: dec!(10000) },
            PricePoint { material_id: 2, purchase_date: d(2025, 1, 1), price: dec!(20000) },
        ]);
        let costed = cost_orders(
            vec![order(1, "Cafe A", Some(10), d(2025, 2, 1), dec!(2), dec!(50000))],
            &recipes,
            &prices,
        );

        // 1kg × 10000 + 1kg × 20000
        assert_eq!(costed[0].cost, dec!(30000));
    }

    #[test]
    fn orders_without_product_cost_nothing() {
        let costed = cost_orders(
            vec![order(1, "Cafe A", None, d(2025, 2, 1), dec!(2), dec!(50000))],
            &HashMap::new(),
            &PriceHistory::default(),
        );
        assert_eq!(costed[0].cost, Decimal::ZERO);
    }

    fn costed(id: i64, customer: &str, product: i64, date: NaiveDate, total: Decimal, cost: Decimal) -> CostedOrder {
        CostedOrder {
            order: order(id, customer, Some(product), date, dec!(1), total),
            cost,
        }
    }

    #[test]
    fn summary_totals_and_rate() {
        let orders = vec![
            costed(1, "A", 1, d(2025, 1, 5), dec!(100), dec!(60)),
            costed(2, "B", 1, d(2025, 1, 6), dec!(100), dec!(20)),
        ];
        let line = summarize(&orders);

        assert_eq!(line.total_sales, dec!(200));
        assert_eq!(line.total_cost, dec!(80));
        assert_eq!(line.total_profit, dec!(120));
        assert_eq!(line.profit_rate, dec!(60));
        assert_eq!(line.total_orders, 2);
    }

    #[test]
    fn empty_summary_has_zero_rate() {
        assert_eq!(summarize(&[]), ProfitLine::default());
    }

    #[test]
    fn months_spanned_counts_partial_months() {
        assert_eq!(months_spanned(d(2025, 1, 10), d(2025, 1, 20)), 1);
        assert_eq!(months_spanned(d(2025, 1, 31), d(2025, 2, 1)), 2);
        assert_eq!(months_spanned(d(2024, 7, 1), d(2025, 6, 30)), 12);
        assert_eq!(months_spanned(d(2025, 3, 1), d(2025, 1, 1)), 0);
    }

    #[test]
    fn overheads_follow_quantity_orders_and_months() {
        let line = ProfitLine {
            total_sales: dec!(3000000),
            total_cost: dec!(1200000),
            total_profit: dec!(1800000),
            profit_rate: dec!(60),
            total_quantity: dec!(60),
            total_orders: 4,
        };
        let costs = overheads(&line, 2, &OverheadRates::default());

        assert_eq!(costs.packaging_cost, dec!(60000)); // 60kg × 1000
        assert_eq!(costs.shipping_box_cost, dec!(24000)); // 60kg / 15 × 6000
        assert_eq!(costs.order_box_cost, dec!(4000)); // 4 × 1000
        assert_eq!(costs.rent_cost, dec!(1300000)); // 2 × 650000
        assert_eq!(costs.total, dec!(1388000));

        let net = net_profit(&line, &costs);
        assert_eq!(net.net_profit, dec!(412000));
        assert_eq!(net.net_profit_rate, dec!(13.73));
    }

    #[test]
    fn net_rate_is_zero_without_sales() {
        let line = ProfitLine::default();
        let costs = overheads(&line, 1, &OverheadRates::default());
        assert_eq!(costs.total, dec!(650000));

        let net = net_profit(&line, &costs);
        assert_eq!(net.net_profit, dec!(-650000));
        assert_eq!(net.net_profit_rate, Decimal::ZERO);
    }

    #[test]
    fn groupings_sort_as_documented() {
        let orders = vec![
            costed(1, "A", 1, d(2025, 2, 5), dec!(100), dec!(50)),
            costed(2, "B", 2, d(2025, 1, 6), dec!(300), dec!(100)),
            costed(3, "A", 2, d(2025, 2, 7), dec!(50), dec!(10)),
            // Biggest seller, smallest margin.
            costed(4, "C", 3, d(2025, 3, 1), dec!(1000), dec!(990)),
        ];

        let products = by_product(&orders);
        let ids: Vec<_> = products.iter().map(|p| p.product_type_id).collect();
        assert_eq!(ids, vec![Some(2), Some(1), Some(3)]);
        assert_eq!(products[0].profit.total_profit, dec!(240));
        assert_eq!(products[0].profit.total_sales, dec!(350));

        let customers = by_customer(&orders);
        let names: Vec<_> = customers.iter().map(|c| c.customer_name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(customers[1].profit.total_orders, 2);

        let months = monthly(&orders);
        let labels: Vec<_> = months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, vec!["2025-01", "2025-02", "2025-03"]);
        assert_eq!(months[1].profit.total_sales, dec!(150));
    }

    #[test]
    fn order_cycle_counts_same_day_orders_once() {
        let cycle = order_cycle(
            vec![
                (d(2025, 1, 1), dec!(10)),
                (d(2025, 1, 1), dec!(5)),
                (d(2025, 1, 11), dec!(15)),
                (d(2025, 1, 25), dec!(30)),
            ],
            d(2025, 2, 1),
        );

        assert_eq!(cycle.total_orders, 3);
        assert_eq!(cycle.average_quantity, dec!(20));
        // intervals 10 and 14
        assert_eq!(cycle.average_interval_days, 12.0);
        assert_eq!(cycle.last_order_date, Some(d(2025, 1, 25)));
        assert_eq!(cycle.next_expected_date, Some(d(2025, 2, 6)));
        assert_eq!(cycle.days_until_next, Some(5));
    }

    #[test]
    fn single_order_has_no_prediction() {
        let cycle = order_cycle(vec![(d(2025, 1, 1), dec!(3))], d(2025, 1, 2));
        assert_eq!(cycle.total_orders, 1);
        assert_eq!(cycle.next_expected_date, None);
        assert_eq!(cycle.days_until_next, None);
        assert_eq!(cycle.average_interval_days, 0.0);
    }

    #[test]
    fn fractional_interval_is_floored_for_the_prediction() {
        // intervals 3 and 4 → 3.5 → next = last + 3
        let cycle = order_cycle(
            vec![
                (d(2025, 1, 1), dec!(1)),
                (d(2025, 1, 4), dec!(1)),
                (d(2025, 1, 8), dec!(1)),
            ],
            d(2025, 1, 20),
        );
        assert_eq!(cycle.average_interval_days, 3.5);
        assert_eq!(cycle.next_expected_date, Some(d(2025, 1, 11)));
        assert_eq!(cycle.days_until_next, Some(-9));
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::reports::{NetProfit, Overheads, ProfitLine};

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Period {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Serialize)]
pub struct ProfitSummaryResponse {
    #[serde(flatten)]
    pub period: Period,
    #[serde(flatten)]
    pub summary: ProfitLine,
    pub overheads: Overheads,
    #[serde(flatten)]
    pub net: NetProfit,
}

#[derive(Serialize)]
pub struct ProfitBreakdownResponse<T: Serialize> {
    #[serde(flatten)]
    pub period: Period,
    pub rows: Vec<T>,
}

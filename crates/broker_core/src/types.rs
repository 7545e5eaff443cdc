use chrono::NaiveDate;
use serde::Deserialize;

/// The closed set of operation kinds a broker row can normalize into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum OperationKind {
    Trade,
    MonetaryFlow,
    SecurityFlow,
    MutualFund,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Trade => "Trade",
            OperationKind::MonetaryFlow => "MonetaryFlow",
            OperationKind::SecurityFlow => "SecurityFlow",
            OperationKind::MutualFund => "MutualFund",
        }
    }
}

/// Direction of a monetary or security flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    In,
    Out,
}

impl FlowDirection {
    /// Negative values flow out of the account, everything else flows in.
    pub fn from_sign(value: f64) -> Self {
        if value < 0.0 {
            FlowDirection::Out
        } else {
            FlowDirection::In
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowDirection::In => "IN",
            FlowDirection::Out => "OUT",
        }
    }
}

/// Sub-kind of a mutual fund operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundFlow {
    Subscription,
    Redemption,
}

impl FundFlow {
    /// "Rescate" rows are redemptions; every other settlement label is a subscription.
    pub fn from_label(label: &str) -> Self {
        if label.trim() == "Rescate" {
            FundFlow::Redemption
        } else {
            FundFlow::Subscription
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FundFlow::Subscription => "FundSubscription",
            FundFlow::Redemption => "FundRedemption",
        }
    }
}

/// Per-format policy for quantity/amount signs.
///
/// Mutual-fund statements store magnitudes; the generic path keeps amounts
/// as-signed so flow directions stay derivable downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SignPolicy {
    AbsoluteValue,
    PreserveSign,
}

impl SignPolicy {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            SignPolicy::AbsoluteValue => value.abs(),
            SignPolicy::PreserveSign => value,
        }
    }
}

/// One normalized broker operation.
///
/// The shared fields hold what every kind carries; `detail` holds the fields
/// that only exist for the specific kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub currency: String,
    pub broker: String,
    pub detail: OperationDetail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationDetail {
    Trade {
        symbol: String,
        quantity: f64,
        price: f64,
        total_amount: f64,
        commission: Option<f64>,
        taxes: Option<f64>,
    },
    MonetaryFlow {
        direction: FlowDirection,
        reference: Option<String>,
    },
    SecurityFlow {
        symbol: String,
        quantity: f64,
        direction: FlowDirection,
    },
    MutualFund {
        flow: FundFlow,
        fund_name: String,
        quantity: f64,
        nav: f64,
        total_amount: f64,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self.detail {
            OperationDetail::Trade { .. } => OperationKind::Trade,
            OperationDetail::MonetaryFlow { .. } => OperationKind::MonetaryFlow,
            OperationDetail::SecurityFlow { .. } => OperationKind::SecurityFlow,
            OperationDetail::MutualFund { .. } => OperationKind::MutualFund,
        }
    }
}

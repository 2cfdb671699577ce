//! Transaction Records
//!
//! Append-only audit log entries. A record is created by every state-changing
//! engine call; afterwards only settlement touches it (status, settlement
//! epoch, attempt bookkeeping).

use serde::{Deserialize, Serialize};

use super::{Address, AssetAmount, Epoch};

/// What kind of operation produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Redeem,
    EmergencyRedeem,
    YieldInjection,
}

impl TransactionKind {
    fn id_prefix(&self) -> &'static str {
        match self {
            Self::Deposit => "dp",
            Self::Redeem => "rd",
            Self::EmergencyRedeem => "er",
            Self::YieldInjection => "yi",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Redeem => write!(f, "redeem"),
            Self::EmergencyRedeem => write!(f, "emergency_redeem"),
            Self::YieldInjection => write!(f, "yield_injection"),
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "redeem" => Ok(Self::Redeem),
            "emergency_redeem" => Ok(Self::EmergencyRedeem),
            "yield_injection" => Ok(Self::YieldInjection),
            _ => Err(format!("unknown transaction kind: {}", s)),
        }
    }
}

/// Settlement status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Waiting for an epoch boundary (or a retried transfer)
    Pending,
    Settled,
    /// Rejected by the ledger; nothing was applied
    Failed,
}

impl Default for TransactionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Settled => write!(f, "settled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "settled" => Ok(Self::Settled),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown status: {}", s)),
        }
    }
}

/// One audit log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique record ID
    pub id: String,
    /// Wallet the record belongs to (the operator for yield injections)
    pub user: Address,
    pub kind: TransactionKind,
    /// Underlying assets deposited, per asset
    pub asset_amounts: Vec<AssetAmount>,
    /// Liquid units minted, locked or burned
    pub liquid_amount: u64,
    /// Underlying units credited to or paid out of the vault
    pub underlying_amount: u64,
    /// Fee in liquid units (emergency redemptions only)
    pub fee_amount: u64,
    pub request_epoch: Epoch,
    pub settlement_epoch: Option<Epoch>,
    pub status: TransactionStatus,
    /// Failed transfer attempts
    pub attempts: u32,
    /// Last error seen for this record
    pub error: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl TransactionRecord {
    /// Create a new pending record
    pub fn new(user: Address, kind: TransactionKind, request_epoch: Epoch) -> Self {
        let now = chrono::Utc::now().timestamp().max(0) as u64;

        Self {
            id: format!("{}_{}", kind.id_prefix(), uuid::Uuid::new_v4().simple()),
            user,
            kind,
            asset_amounts: Vec::new(),
            liquid_amount: 0,
            underlying_amount: 0,
            fee_amount: 0,
            request_epoch,
            settlement_epoch: None,
            status: TransactionStatus::Pending,
            attempts: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_assets(mut self, asset_amounts: Vec<AssetAmount>) -> Self {
        self.asset_amounts = asset_amounts;
        self
    }

    pub fn with_liquid(mut self, liquid_amount: u64) -> Self {
        self.liquid_amount = liquid_amount;
        self
    }

    pub fn with_underlying(mut self, underlying_amount: u64) -> Self {
        self.underlying_amount = underlying_amount;
        self
    }

    pub fn with_fee(mut self, fee_amount: u64) -> Self {
        self.fee_amount = fee_amount;
        self
    }

    /// Mark as settled at `epoch`
    pub fn mark_settled(&mut self, epoch: Epoch) {
        self.settlement_epoch = Some(epoch);
        self.status = TransactionStatus::Settled;
        self.touch();
    }

    /// Record a failed transfer attempt; the record stays pending
    pub fn record_attempt_failure(&mut self, error: String) {
        self.attempts += 1;
        self.error = Some(error);
        self.touch();
    }

    /// Mark as failed
    pub fn mark_failed(&mut self, error: String) {
        self.attempts += 1;
        self.error = Some(error);
        self.status = TransactionStatus::Failed;
        self.touch();
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp().max(0) as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Asset;

    #[test]
    fn test_record_lifecycle() {
        let user = Address::from_bytes([1; 20]);
        let mut record = TransactionRecord::new(user, TransactionKind::Redeem, Epoch(4))
            .with_liquid(500);

        assert!(record.id.starts_with("rd_"));
        assert!(record.is_pending());

        record.record_attempt_failure("insufficient funds".to_string());
        assert!(record.is_pending());
        assert_eq!(record.attempts, 1);

        record.mark_settled(Epoch(6));
        assert_eq!(record.status, TransactionStatus::Settled);
        assert_eq!(record.settlement_epoch, Some(Epoch(6)));
        assert_eq!(record.request_epoch, Epoch(4));
    }

    #[test]
    fn test_kind_and_status_strings() {
        for kind in [
            TransactionKind::Deposit,
            TransactionKind::Redeem,
            TransactionKind::EmergencyRedeem,
            TransactionKind::YieldInjection,
        ] {
            assert_eq!(kind.to_string().parse::<TransactionKind>().unwrap(), kind);
        }
        assert_eq!("settled".parse::<TransactionStatus>().unwrap(), TransactionStatus::Settled);
        assert!("done".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_record_serialization() {
        let record = TransactionRecord::new(
            Address::from_bytes([2; 20]),
            TransactionKind::Deposit,
            Epoch(0),
        )
        .with_assets(vec![AssetAmount::new(Asset::WBtc, 100)]);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "deposit");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["asset_amounts"][0]["asset"], "w_btc");
    }
}

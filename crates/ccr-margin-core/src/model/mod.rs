pub mod collateral;
pub mod market_data;
pub mod maturity;
pub mod netting_set;
pub mod risk_factor;
pub mod trade;

pub use collateral::Collateral;
pub use market_data::{HistoricalMarketData, Position, PricePoint, VarAssetType};
pub use maturity::{BucketRates, MaturityBucket};
pub use netting_set::{MarginType, NettingSet};
pub use risk_factor::{RiskFactor, RiskType};
pub use trade::{AssetClass, PositionType, Trade, TradeTerms, TransactionType};

pub mod bar;
pub mod config;
pub mod config_loader;
pub mod config_watcher;
pub mod error;
pub mod position_sizing;
pub mod signal;
pub mod timeframe;
pub mod traits;

pub use bar::{Bar, BarSeries, MIN_WINDOW};
pub use config::{
    AlertConfig, AnomalyPolicy, AppConfig, ArimaOrder, CacheConfig, ForecastConfig,
    IndicatorConfig, InstrumentConfig, OrderSelection, ProviderConfig, RegimeConfig, RiskConfig,
    TimeframeConfig,
};
pub use config_loader::ConfigLoader;
pub use config_watcher::ConfigWatcher;
pub use error::SignalError;
pub use position_sizing::{
    calculate_lot_size, calculate_position_size, risk_amount, ContractSpec, PositionSizer,
    RiskBudget, SizeSuggestion,
};
pub use signal::{ConsensusVerdict, Direction, TrendVerdict};
pub use timeframe::{Interval, Period, PeriodUnit};
pub use traits::{AlertSink, LogAlertSink, MarketDataProvider};

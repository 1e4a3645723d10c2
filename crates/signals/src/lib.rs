pub mod absorption;
pub mod alert;
pub mod analysis;
pub mod consensus;
pub mod forecast;
pub mod kmeans;
pub mod regime;
pub mod scanner;
pub mod stats;
pub mod volume_profile;
pub mod vwap;

// Re-export indicators for convenience
pub use absorption::{
    detect_absorption, relative_volume, wick_rejection, AbsorptionReading, AnomalyConfig, WickSide,
};
pub use volume_profile::{point_of_control, volume_profile, PriceBin, VolumeProfile};
pub use vwap::{latest_vwap, vwap_series};

// Re-export regime and forecasting
pub use forecast::{
    forecast_price, forecast_volatility, percent_returns, ArimaModel, Forecast, ForecastBundle,
    GarchModel, PriceForecast, RiskRead, VolatilityForecast, VolatilityLevel,
};
pub use kmeans::{kmeans, KMeansFit};
pub use regime::{MarketRegime, RegimeClassifier, RegimeClusters, RegimeReading};

// Re-export pipeline
pub use alert::{dispatch, format_alert, AlertGate};
pub use analysis::{analyze_timeframe, TimeframeAnalysis};
pub use consensus::{aggregate, aggregate_partial, DEFAULT_REQUIRED_VERDICTS};
pub use scanner::{InstrumentReport, Scanner, TimeframeReport};

pub mod stats;
pub mod preparer;
pub mod analysis;

pub use preparer::DatasetPreparer;
pub use analysis::{
    Analysis, AnalysisError, BivariateView, BoxSummary, Candle, CategoricalView, CategoryCount,
    CorrelationMatrix, NumericCount, Summary, TimeSeriesView, UnivariateView,
};

//! Report output port trait.

use crate::domain::error::SizerError;
use crate::domain::pipeline::{OptionSizingReport, StockSizingReport, TickerAnalysis};

/// Port for presenting sizing results.
pub trait ReportPort {
    fn write_stock_sizing(&self, report: &StockSizingReport) -> Result<(), SizerError>;

    fn write_option_sizing(&self, report: &OptionSizingReport) -> Result<(), SizerError>;

    fn write_analysis(&self, analysis: &TickerAnalysis) -> Result<(), SizerError>;
}

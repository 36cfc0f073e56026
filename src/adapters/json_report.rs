//! JSON report written to a file with serde_json.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use serde::Serialize;

use crate::domain::error::SizerError;
use crate::domain::pipeline::{OptionSizingReport, StockSizingReport, TickerAnalysis};
use crate::ports::report_port::ReportPort;

pub struct JsonReport {
    path: PathBuf,
}

impl JsonReport {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write_value<T: Serialize>(&self, value: &T) -> Result<(), SizerError> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        Ok(())
    }
}

impl ReportPort for JsonReport {
    fn write_stock_sizing(&self, report: &StockSizingReport) -> Result<(), SizerError> {
        self.write_value(report)
    }

    fn write_option_sizing(&self, report: &OptionSizingReport) -> Result<(), SizerError> {
        self.write_value(report)
    }

    fn write_analysis(&self, analysis: &TickerAnalysis) -> Result<(), SizerError> {
        self.write_value(analysis)
    }
}

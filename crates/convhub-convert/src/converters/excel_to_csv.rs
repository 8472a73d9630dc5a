//! `excel_to_csv`: the first worksheet of a workbook as CSV.

use std::path::Path;

use async_trait::async_trait;
use calamine::{Data, Reader, open_workbook_auto};

use crate::converter::{Converter, run_blocking};
use crate::error::ConversionError;

/// Spreadsheet → CSV converter (xlsx, xlsm, xls, ods).
#[derive(Debug, Default, Clone, Copy)]
pub struct ExcelToCsv;

impl ExcelToCsv {
    fn convert_file(input: &Path, output: &Path) -> Result<(), ConversionError> {
        let mut workbook = open_workbook_auto(input)
            .map_err(|e| ConversionError::InvalidInput(format!("unreadable workbook: {e}")))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ConversionError::InvalidInput("workbook has no worksheets".to_string()))?
            .map_err(|e| ConversionError::InvalidInput(format!("unreadable worksheet: {e}")))?;

        let mut writer = csv::Writer::from_path(output)
            .map_err(|e| ConversionError::Converter(format!("failed to create CSV: {e}")))?;
        for row in range.rows() {
            writer
                .write_record(row.iter().map(cell_to_string))
                .map_err(|e| ConversionError::Converter(format!("failed to write CSV: {e}")))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Render a cell the way a spreadsheet shows it: whole floats without a
/// trailing `.0`, empty cells as empty fields.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string().to_uppercase(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Converter for ExcelToCsv {
    fn name(&self) -> &'static str {
        "excel-to-csv"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        run_blocking(input, output, Self::convert_file).await
    }
}

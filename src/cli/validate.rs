//! Dataset validation command implementation.

use super::output::{JsonDatasetInfo, format_dataset};
use super::{CliError, OutputFormat};
use std::path::Path;
use tinygp::DatFile;

/// Execute the validate command.
///
/// # Errors
///
/// Returns an error if the dataset cannot be read or is malformed.
pub(crate) fn execute(dataset: &Path, format: OutputFormat) -> Result<(), CliError> {
    let file = DatFile::load(dataset)
        .map_err(|e| CliError::new(format!("Invalid dataset {}: {e}", dataset.display())))?;
    let info = JsonDatasetInfo::new(file.header, &file.dataset);

    match format {
        OutputFormat::Text => {
            println!("Validating: {}", dataset.display());
            println!();
            println!("{}", format_dataset(&info));
            println!();
            println!("Validation successful!");
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&info)?),
    }

    Ok(())
}

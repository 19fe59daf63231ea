//! Output path guard for the batch command.
//!
//! Batch output is always overwritten, so refuse anything that could be the
//! input or a configuration document.

use anyhow::{bail, Result};
use std::path::Path;

/// Extension every batch output must carry
pub const OUTPUT_EXTENSION: &str = "jsonl";

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output must end in `.jsonl`
/// - Output cannot be the same as any of the provided source paths
pub fn validate_output_path(output: &Path, source_paths: &[&Path]) -> Result<()> {
    let extension = output.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !extension.eq_ignore_ascii_case(OUTPUT_EXTENSION) {
        bail!(
            "Safety check failed: output file '{}' must end in '.{}'",
            output.display(),
            OUTPUT_EXTENSION
        );
    }

    for source in source_paths {
        let same = output == *source
            || matches!(
                (output.canonicalize(), source.canonicalize()),
                (Ok(a), Ok(b)) if a == b
            );
        if same {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_valid_output() {
        let output = PathBuf::from("/tmp/parsed.jsonl");
        let source = PathBuf::from("/data/titles.tsv");
        assert!(validate_output_path(&output, &[&source]).is_ok());
    }

    #[test]
    fn test_wrong_extension() {
        let output = PathBuf::from("/tmp/parsed.json");
        let source = PathBuf::from("/data/titles.tsv");
        let result = validate_output_path(&output, &[&source]);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("must end in '.jsonl'"));
    }

    #[test]
    fn test_output_equals_source() {
        let path = PathBuf::from("/data/titles.jsonl");
        let result = validate_output_path(&path, &[&path]);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot be the same as source"));
    }

    #[test]
    fn test_config_paths_protected() {
        let output = PathBuf::from("/etc/policy.jsonl");
        let policy = PathBuf::from("/etc/policy.jsonl");
        let input = PathBuf::from("/data/titles.tsv");
        assert!(validate_output_path(&output, &[&input, &policy]).is_err());
    }
}

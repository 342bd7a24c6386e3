use std::path::PathBuf;

use clap::Parser;
use leadflow::intake::Workbook;

#[derive(Debug, Parser)]
#[clap(name = "leadflow", version)]
pub struct Cli {
    /// Uploaded workbook, as exported by the file picker (JSON)
    pub workbook: PathBuf,

    /// Record leads under this source file name instead of the workbook's
    #[clap(long)]
    pub source_name: Option<String>,

    /// Parse and normalize the upload without touching the database
    #[clap(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Apply `--source-name` to the first uploaded file, the only one read.
    pub(crate) fn rename_upload(&self, files: &mut [Workbook]) {
        if let (Some(name), Some(first)) = (&self.source_name, files.first_mut()) {
            first.name = name.clone();
        }
    }
}

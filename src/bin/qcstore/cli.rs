use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI для QcStore: накопление QC plot data и сборка отчёта по модулю
#[derive(Parser, Debug)]
#[command(name = "qcstore", version, about = "QcStore CLI", arg_required_else_help = true)]
pub struct Cli {
    /// Store root (overrides QCSTORE_ROOT)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Template directory for `show` (overrides QCSTORE_TEMPLATE_DIR)
    #[arg(long, global = true)]
    pub template_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Cmd,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Run analysis modules over input locations and store their data
    ///
    /// Примеры:
    ///   qcstore load --input ./run1 --input ./run2
    ///   qcstore load --input paths.txt --file-list
    ///   qcstore load --input ./run1 --overwrite
    Load {
        #[arg(long, required = true)]
        input: Vec<PathBuf>,
        /// The single --input is a text file with one path per line
        #[arg(long, default_value_t = false)]
        file_list: bool,
        /// Clear previously stored plot data / data sources before writing
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Add a pre-built aggregated run (<dir>/multiqc_data.json)
    Add {
        #[arg(long)]
        dir: PathBuf,
    },
    /// List modules found in data sources
    Modules {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List samples of a module
    Samples {
        #[arg(long)]
        module: String,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Merge stored snapshots of one module for the given samples and render the report
    ///
    /// Пример:
    ///   qcstore show --module fastqc --samples s1,s2,s3
    ///   qcstore show --module fastqc --samples s1 --template-dir ./tpl --out report.html
    Show {
        /// Module name; a comma separated list is rejected (exactly one module)
        #[arg(long)]
        module: String,
        /// Comma separated sample identifiers
        #[arg(long)]
        samples: String,
        /// Write the rendered report to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print store layout summary and metrics
    Status {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

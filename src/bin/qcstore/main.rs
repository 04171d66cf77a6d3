use anyhow::Result;
use env_logger::{Builder, Env};
use log::{debug, error};

use QcStore::config::StoreConfig;
use QcStore::outcome::Outcome;
use QcStore::session::Session;

mod cli;
mod cmd_add;
mod cmd_load;
mod cmd_modules;
mod cmd_samples;
mod cmd_show;
mod cmd_status;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт: info.
    // Пример: RUST_LOG=debug qcstore show --module fastqc --samples s1,s2
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        // Логируем ошибку и выходим с кодом 1.
        error!("{:?}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse_args();

    let mut cfg = StoreConfig::from_env();
    if let Some(root) = cli.root {
        cfg = cfg.with_root(root);
    }
    if let Some(dir) = cli.template_dir {
        cfg = cfg.with_template_dir(Some(dir));
    }
    let session = Session::open(cfg)?;

    let res = match cli.cmd {
        cli::Cmd::Load { input, file_list, overwrite } =>
            cmd_load::exec(&session, input, file_list, overwrite),

        cli::Cmd::Add { dir } =>
            cmd_add::exec(&session, dir),

        cli::Cmd::Modules { json } =>
            cmd_modules::exec(&session, json),

        cli::Cmd::Samples { module, json } =>
            cmd_samples::exec(&session, module, json),

        cli::Cmd::Show { module, samples, out } =>
            cmd_show::exec(&session, module, samples, out),

        cli::Cmd::Status { json } =>
            cmd_status::exec(&session, json),
    };
    debug!("metrics: {:?}", QcStore::metrics::snapshot());
    res
}

/// Print a rejection for the user; not a failure of the process.
pub(crate) fn report_rejected<T>(outcome: &Outcome<T>) -> bool {
    match outcome.rejection() {
        Some(e) => {
            println!("{}", e);
            true
        }
        None => false,
    }
}

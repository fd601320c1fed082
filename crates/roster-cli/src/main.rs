// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use roster_app::{AppState, TableKind};
use roster_db::{MemoryStorage, StoragePort, Store};
use runtime::DbRuntime;
use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const DEMO_SEED: u64 = 2024;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `roster --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let log_path = init_logging(&config)?;
    info!(db = %db_path.display(), log = %log_path.display(), demo = options.demo, "starting");

    if options.demo {
        let mut runtime = DbRuntime::new(MemoryStorage::new(), config.export_dir());
        runtime.seed_demo(DEMO_SEED, OffsetDateTime::now_utc())?;
        return launch(runtime, &options, &config);
    }

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or ROSTER_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    launch(DbRuntime::new(store, config.export_dir()), &options, &config)
}

fn launch<S: StoragePort>(
    mut runtime: DbRuntime<S>,
    options: &CliOptions,
    config: &Config,
) -> Result<()> {
    if let Some(kind) = options.export {
        let path = runtime.export(kind, options.export_out.clone())?;
        println!("{}", path.display());
        return Ok(());
    }

    runtime.check()?;
    if options.check_only {
        return Ok(());
    }

    let mut state = AppState::starting_at(config.start_tab());
    roster_tui::run_app(&mut state, &mut runtime)
}

fn init_logging(config: &Config) -> Result<PathBuf> {
    let path = config.log_path()?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].file to a writable path",
                path.display()
            )
        })?;

    let directive = config.log_filter();
    let filter = EnvFilter::try_new(&directive).with_context(|| {
        format!("invalid log filter {directive:?}; use a level such as info or roster_db=debug")
    })?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("install log subscriber")?;
    Ok(path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    export: Option<TableKind>,
    export_out: Option<PathBuf>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
        export: None,
        export_out: None,
    };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let flag = arg.as_ref();
        match flag {
            "--config" => {
                options.config_path = PathBuf::from(flag_value(&mut args, flag, "a file path")?);
            }
            "--export" => {
                let table = flag_value(&mut args, flag, "a table name (resources)")?;
                options.export = Some(parse_export_table(&table)?);
            }
            "--out" => {
                let target = flag_value(&mut args, flag, "a file or directory path")?;
                options.export_out = Some(PathBuf::from(target));
            }
            "--print-config-path" => options.print_config_path = true,
            "--print-path" => options.print_db_path = true,
            "--print-example-config" => options.print_example = true,
            "--demo" => options.demo = true,
            "--check" => options.check_only = true,
            "--help" | "-h" => options.show_help = true,
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    if options.export_out.is_some() && options.export.is_none() {
        bail!("--out only applies to --export; add `--export resources` and retry");
    }

    Ok(options)
}

fn flag_value<I, S>(args: &mut I, flag: &str, expected: &str) -> Result<String>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    args.next()
        .map(|value| value.as_ref().to_owned())
        .ok_or_else(|| anyhow!("{flag} requires {expected}"))
}

fn parse_export_table(raw: &str) -> Result<TableKind> {
    let Some(kind) = TableKind::parse(raw) else {
        bail!("unknown table {raw:?}; expected clients, agents, or resources");
    };
    if !kind.supports_export() {
        bail!("{} cannot be exported; only resources can", kind.as_str());
    }
    Ok(kind)
}

fn print_help() {
    println!("roster");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with generated demo data (in-memory)");
    println!("  --check                  Validate config + storage, then exit");
    println!("  --export <table>         Write the table as JSON and print the path");
    println!("  --out <path>             Export target file or directory");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use roster_app::TableKind;
    use std::path::PathBuf;

    const DEFAULT_CONFIG: &str = "/tmp/roster-config.toml";

    fn parse(args: &[&str]) -> Result<CliOptions> {
        parse_cli_args(args.iter().copied(), PathBuf::from(DEFAULT_CONFIG))
    }

    fn parse_error(args: &[&str]) -> String {
        match parse(args) {
            Ok(options) => panic!("{args:?} parsed unexpectedly: {options:?}"),
            Err(error) => error.to_string(),
        }
    }

    #[test]
    fn no_arguments_keep_the_default_config_path() -> Result<()> {
        let options = parse(&[])?;
        assert_eq!(
            options,
            CliOptions {
                config_path: PathBuf::from(DEFAULT_CONFIG),
                print_config_path: false,
                print_db_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
                export: None,
                export_out: None,
            }
        );
        Ok(())
    }

    #[test]
    fn switches_set_their_flags() -> Result<()> {
        let options = parse(&["--print-config-path", "--print-example-config", "--check"])?;
        assert!(options.print_config_path && options.print_example && options.check_only);
        assert!(!options.print_db_path && !options.demo && !options.show_help);

        let options = parse(&["--demo", "--print-path"])?;
        assert!(options.demo && options.print_db_path);

        assert!(parse(&["--help"])?.show_help);
        assert!(parse(&["-h"])?.show_help);
        Ok(())
    }

    #[test]
    fn valued_flags_take_the_next_argument() -> Result<()> {
        let options = parse(&[
            "--config",
            "/custom/config.toml",
            "--export",
            "resources",
            "--out",
            "/tmp/team.json",
        ])?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        assert_eq!(options.export, Some(TableKind::Resources));
        assert_eq!(options.export_out, Some(PathBuf::from("/tmp/team.json")));
        Ok(())
    }

    #[test]
    fn missing_values_name_what_is_expected() {
        assert!(parse_error(&["--config"]).contains("--config requires a file path"));
        assert!(parse_error(&["--export"]).contains("requires a table name"));
        assert!(parse_error(&["--export", "resources", "--out"]).contains("--out requires"));
    }

    #[test]
    fn bad_arguments_are_rejected_with_a_hint() {
        let message = parse_error(&["--wat"]);
        assert!(message.contains("unknown argument") && message.contains("--help"));

        assert!(parse_error(&["--export", "clients"]).contains("only resources"));
        assert!(parse_error(&["--export", "vendors"]).contains("unknown table"));
        assert!(parse_error(&["--out", "/tmp/x.json"]).contains("--export resources"));
    }
}

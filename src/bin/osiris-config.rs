//! Osiris Configuration Tooling
//!
//! This is the entry-point of `osiris-config`, a command-line tool to
//! resolve the build configuration of Android application modules. Its main
//! input is the `osiris-config.toml` manifest, which declares the
//! configuration fragments of the application module. Injected values are
//! passed via `--property NAME=VALUE`, or read from the environment if an
//! environment prefix is given.
//!
//! This CLI is mainly a dispatcher of all the operations available in
//! `osiris_config::op::*`. It is a simple clap-based CLI that forwards the
//! arguments to `osiris_config` and visualizes the results.

use clap;
use osiris_config;
use tracing_subscriber;

struct Cli {
    cmd: clap::Command,
}

fn arg_property(s: &str) -> Result<String, clap::error::Error> {
    match s.split_once('=') {
        Some((name, _)) if !name.trim().is_empty() => Ok(s.to_string()),
        _ => Err(
            clap::error::Error::raw(
                clap::error::ErrorKind::ValueValidation,
                "Property must be of the form NAME=VALUE",
            )
        ),
    }
}

// Print a resolver error
//
// Validation errors are printed with one line per violation, so all
// problems are visible in a single run.
fn print_resolver_error(op: &str, e: &osiris_config::resolver::Error) {
    match e {
        osiris_config::resolver::Error::Validation(violations) => {
            eprintln!("Cannot {}: {}", op, e);
            for v in violations.iter() {
                eprintln!("  {}", v);
            }
        },
        _ => {
            eprintln!("Cannot {}: {}", op, e);
        },
    }
}

impl Cli {
    fn new() -> Self {
        let mut cmd;

        cmd = clap::Command::new("osiris-config")
            .propagate_version(true)
            .subcommand_required(true)
            .about("Osiris Configuration Tooling")
            .long_about("Resolve the build configuration of Android application modules")
            .version(clap::crate_version!());

        cmd = cmd.arg(
            clap::Arg::new("manifest")
                .long("manifest")
                .value_name("PATH")
                .help("Path to the configuration manifest relative to the working directory")
                .default_value("./osiris-config.toml")
                .value_parser(clap::builder::ValueParser::os_string())
        );

        cmd = cmd.arg(
            clap::Arg::new("variant")
                .long("variant")
                .value_name("NAME")
                .help("Build variant to resolve the configuration for")
        );

        cmd = cmd.arg(
            clap::Arg::new("property")
                .long("property")
                .short('P')
                .value_name("NAME=VALUE")
                .help("Provide a variable for injected fragments")
                .action(clap::ArgAction::Append)
                .value_parser(arg_property)
        );

        cmd = cmd.arg(
            clap::Arg::new("env-prefix")
                .long("env-prefix")
                .value_name("PREFIX")
                .help("Read variables not provided via --property from the environment")
        );

        cmd = cmd.subcommand(
            clap::Command::new("resolve")
                .about("Resolve the configuration and print it as JSON")
        );

        cmd = cmd.subcommand(
            clap::Command::new("get")
                .about("Resolve the configuration and print a single setting")
                .arg(
                    clap::Arg::new("key")
                        .value_name("KEY")
                        .help("Key of the setting to print")
                        .required(true)
                )
        );

        cmd = cmd.subcommand(
            clap::Command::new("emit")
                .about("Resolve the configuration and write it as a properties file")
                .long_about("Resolve the configuration and write it as a properties file. The file is replaced entirely and must be loaded explicitly by the build script.")
                .arg(
                    clap::Arg::new("output")
                        .long("output")
                        .value_name("PATH")
                        .help("Path of the properties file to write")
                        .default_value("./osiris-config.properties")
                        .value_parser(clap::builder::ValueParser::os_string())
                )
        );

        Self {
            cmd: cmd,
        }
    }

    fn manifest(
        &self,
        m: &clap::ArgMatches,
    ) -> Result<osiris_config::manifest::Manifest, u8> {
        let manifest_path = m.get_one::<std::ffi::OsString>("manifest")
            .ok_or(2u8)?;

        osiris_config::manifest::Manifest::parse_path(
            std::path::Path::new(manifest_path)
        ).map_err(
            |e| {
                eprintln!("Cannot parse configuration manifest: {}", e);
                1
            }
        )
    }

    fn resolve(
        &self,
        m: &clap::ArgMatches,
        op: &str,
    ) -> Result<osiris_config::resolver::Resolved, u8> {
        let manifest = self.manifest(m)?;
        let variant = m.get_one::<String>("variant").map(|v| v.as_str());

        let mut properties = osiris_config::provider::MapProvider::new();
        for v in m.get_many::<String>("property").into_iter().flatten() {
            properties.set_assignment(v).map_err(|_| 2u8)?;
        }

        let env = m.get_one::<String>("env-prefix")
            .map(|v| osiris_config::provider::EnvProvider::new(v));

        let mut provider = osiris_config::provider::ChainProvider::new();
        provider.push(&properties);
        if let Some(ref v) = env {
            provider.push(v);
        }

        match osiris_config::op::resolve::resolve(&manifest, &provider, variant) {
            Err(osiris_config::op::resolve::Error::Manifest(e)) => {
                eprintln!("Cannot {}: {}", op, e);
                Err(1)
            },
            Err(osiris_config::op::resolve::Error::Resolve(e)) => {
                print_resolver_error(op, &e);
                Err(1)
            },
            Ok(v) => Ok(v),
        }
    }

    fn op_resolve(
        &self,
        m: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let resolved = self.resolve(m, "resolve configuration")?;

        match serde_json::to_string_pretty(&resolved.to_json()) {
            Ok(v) => {
                println!("{}", v);
                Ok(())
            },
            Err(e) => {
                eprintln!("Cannot serialize configuration: {}", e);
                Err(1)
            },
        }
    }

    fn op_get(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let resolved = self.resolve(m, "resolve configuration")?;
        let key = m_op.get_one::<String>("key").ok_or(2u8)?;

        match resolved.get(key) {
            Ok(v) => {
                println!("{}", v);
                Ok(())
            },
            Err(e) => {
                print_resolver_error("query configuration", &e);
                Err(1)
            },
        }
    }

    fn op_emit(
        &self,
        m: &clap::ArgMatches,
        m_op: &clap::ArgMatches,
    ) -> Result<(), u8> {
        let resolved = self.resolve(m, "emit configuration")?;
        let output = m_op.get_one::<std::ffi::OsString>("output").ok_or(2u8)?;

        match osiris_config::op::emit::emit(&resolved, std::path::Path::new(output)) {
            Err(osiris_config::op::emit::Error::DirectoryCreation(dir, error)) => {
                eprintln!("Cannot emit configuration: Failed to create directory {:?} ({})", dir, error);
                Err(1)
            },
            Err(osiris_config::op::emit::Error::FileUpdate(file, error)) => {
                eprintln!("Cannot emit configuration: Failed to update {:?} ({})", file, error);
                Err(1)
            },
            Ok(_) => {
                Ok(())
            },
        }
    }

    fn run(mut self) -> Result<(), u8> {
        let (m, r);

        r = self.cmd.try_get_matches_from_mut(
            std::env::args_os(),
        );

        match r {
            Ok(v) => m = v,
            Err(e) => {
                return match e.kind() {
                    clap::error::ErrorKind::DisplayHelp |
                    clap::error::ErrorKind::DisplayVersion => {
                        let _ = e.print();
                        Ok(())
                    },
                    _ => {
                        let _ = e.print();
                        Err(2)
                    }
                }
            }
        }

        match m.subcommand() {
            Some(("resolve", _)) => self.op_resolve(&m),
            Some(("get", m_op)) => self.op_get(&m, m_op),
            Some(("emit", m_op)) => self.op_emit(&m, m_op),
            _ => std::unreachable!(),
        }
    }
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::new().run() {
        Ok(()) => 0.into(),
        Err(v) => v.into(),
    }
}

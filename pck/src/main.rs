//TODO: update clap to remove the need for this
#![allow(dangerous_implicit_autorefs)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{crate_description, crate_name, crate_version, App, AppSettings, Arg, SubCommand};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbosity: u64) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let arg_archive = Arg::with_name("archive")
        .help("Archive file")
        .required(true)
        .value_name("ARCHIVE");

    let arg_outdir = Arg::with_name("outdir")
        .help("Directory to unpack to (defaults to '.')")
        .short("o")
        .long("output")
        .required(true)
        .takes_value(true)
        .value_name("DIR")
        .default_value(".");

    let matches = App::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .help("Log more (-v for info, -vv for debug); RUST_LOG overrides")
                .short("v")
                .long("verbose")
                .multiple(true),
        )
        .subcommand(
            SubCommand::with_name("pack")
                .about("Pack files into an archive")
                .arg(
                    Arg::with_name("output")
                        .help("Archive file to create")
                        .short("o")
                        .long("output")
                        .required(true)
                        .takes_value(true)
                        .value_name("FILE"),
                )
                .arg(
                    Arg::with_name("keep-order")
                        .help("Pack files in the order given instead of sorted by path")
                        .long("keep-order"),
                )
                .arg(
                    Arg::with_name("files")
                        .help("Files to pack")
                        .multiple(true)
                        .value_name("FILE"),
                ),
        )
        .subcommand(
            SubCommand::with_name("unpack")
                .about("Unpack archives, each into a folder named after it")
                .arg(&arg_outdir)
                .arg(
                    Arg::with_name("flat")
                        .help("Unpack straight into the output directory")
                        .long("flat"),
                )
                .arg(
                    Arg::with_name("archives")
                        .help("Archive files; arguments without a lowercase .pck extension are skipped")
                        .required(true)
                        .multiple(true)
                        .value_name("ARCHIVE"),
                ),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List archive")
                .arg(&arg_archive),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("Verify an unpacked archive")
                .arg(&arg_outdir)
                .arg(&arg_archive),
        )
        .get_matches();

    init_tracing(matches.occurrences_of("verbose"));

    if let Some(matches) = matches.subcommand_matches("pack") {
        let files = pck::pack_order(
            matches
                .values_of_os("files")
                .into_iter()
                .flatten()
                .map(PathBuf::from)
                .collect(),
            matches.is_present("keep-order"),
        );
        let output = matches.value_of_os("output").unwrap();

        pck::pack(&files, output)
            .with_context(|| format!("Failed to pack {}", Path::new(output).display()))?;
        println!("Packed {} file(s) into {}", files.len(), Path::new(output).display());
    } else if let Some(matches) = matches.subcommand_matches("unpack") {
        let outdir = Path::new(matches.value_of_os("outdir").unwrap());
        let archives = matches.values_of_os("archives").into_iter().flatten();

        let unpacked = pck::unpack_all(archives, outdir, matches.is_present("flat"))
            .context("Failed to unpack")?;
        println!("Unpacked {} archive(s) into {}", unpacked, outdir.display());
    } else if let Some(matches) = matches.subcommand_matches("list") {
        let archive = Path::new(matches.value_of_os("archive").unwrap());
        let entries = pck::list(archive)
            .with_context(|| format!("Failed to list {}", archive.display()))?;
        for (name, entry) in entries {
            println!("{}\t{}\t{}", name, entry.offset(), entry.size());
        }
    } else if let Some(matches) = matches.subcommand_matches("verify") {
        let archive = Path::new(matches.value_of_os("archive").unwrap());
        let outdir = Path::new(matches.value_of_os("outdir").unwrap());
        pck::verify(archive, outdir)
            .with_context(|| format!("Failed to verify {}", archive.display()))?;
        println!("{} matches {}", archive.display(), outdir.display());
    }

    Ok(())
}

use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;
use tokio::io::AsyncWriteExt;

use adbfs::logging::{debug, init_tracing};
use adbfs::{AdbFs, Config, FileInfo};

///////////////////////
// Utility functions //
///////////////////////

fn load_config(matches: &ArgMatches) -> Result<Config, Box<dyn Error>> {
	let mut config = match matches.get_one::<String>("config") {
		Some(path) => Config::load(&PathBuf::from(path))?,
		None => match Config::default_path() {
			Some(path) if path.exists() => Config::load(&path)?,
			_ => Config::default(),
		},
	};
	config.apply_env();
	if let Some(server) = matches.get_one::<String>("server") {
		config.server = server.clone();
	}
	if let Some(serial) = matches.get_one::<String>("serial") {
		config.serial = Some(serial.clone());
	}
	config.validate()?;
	Ok(config)
}

fn format_info(info: &FileInfo) -> String {
	let mtime = info.modified().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
	format!("{} {:>10} {:>10} {}", info.mode(), info.size(), mtime, info.name())
}

async fn run(fs: &AdbFs, matches: &ArgMatches, json: bool) -> Result<(), Box<dyn Error>> {
	match matches.subcommand() {
		Some(("stat", sub)) => {
			let path = sub.get_one::<String>("path").ok_or("stat: path argument required")?;
			let info = fs.stat(path).await?;
			if json {
				println!("{}", serde_json::to_string_pretty(&info)?);
			} else {
				println!("{}", format_info(&info));
			}
		}
		Some(("ls", sub)) => {
			let path = sub.get_one::<String>("path").map(|s| s.as_str()).unwrap_or(".");
			let entries = fs.read_dir(path).await?;
			if json {
				println!("{}", serde_json::to_string_pretty(&entries)?);
			} else {
				for entry in &entries {
					println!("{}", format_info(entry.metadata()));
				}
			}
		}
		Some(("cat", sub)) => {
			let path = sub.get_one::<String>("path").ok_or("cat: path argument required")?;
			let mut file = fs.open(path).await?;
			let mut out = tokio::io::stdout();
			let mut buf = vec![0u8; 64 * 1024];
			loop {
				let n = file.read(&mut buf).await?;
				if n == 0 {
					break;
				}
				out.write_all(&buf[..n]).await?;
			}
			out.flush().await?;
		}
		Some(("features", _)) => {
			for feature in fs.features() {
				println!("{}", feature);
			}
		}
		_ => return Err("unknown command".into()),
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = Command::new("adbfs")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Browse and read device files over the adb sync protocol")
		.subcommand_required(true)
		.arg(Arg::new("server").short('H').long("server").value_name("ADDR").help("adb server address"))
		.arg(Arg::new("serial").short('s').long("serial").value_name("SERIAL").help("Device serial"))
		.arg(Arg::new("config").short('c').long("config").value_name("FILE").help("Config file"))
		.arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("JSON output"))
		.subcommand(
			Command::new("stat").about("Show file metadata").arg(Arg::new("path").required(true)),
		)
		.subcommand(Command::new("ls").about("List a directory").arg(Arg::new("path")))
		.subcommand(
			Command::new("cat").about("Write a file to stdout").arg(Arg::new("path").required(true)),
		)
		.subcommand(Command::new("features").about("List device features"))
		.get_matches();

	let config = load_config(&matches)?;
	init_tracing(&config.log_level);
	debug!("config: {:?}", config);

	let fs = AdbFs::connect_with(&config).await?;
	let result = run(&fs, &matches, matches.get_flag("json")).await;
	fs.close().await;
	result
}

// vim: ts=4

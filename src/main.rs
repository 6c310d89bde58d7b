use std::path::PathBuf;
use std::process::exit;

use deobflow::persistence::JsonlEventStore;
use deobflow::config::config;
use deobflow::{BuildRequest, Driver, SourceSetDirs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "uso: deobflow setup --minecraft <dir> --srg <fichero> --names <dir> --patches <dir> \
                     [--inject <dir>] [--at <fichero>]... [--at-dir <dir>]... [--dep-bundle <dir>]... [--cp <ruta>]... \
                     [--retromap <set>:<src>:<replaced>]...";

fn parse_request(args: &[String]) -> Result<BuildRequest, String> {
    let mut req = BuildRequest::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        i += 1;
        let Some(value) = args.get(i) else {
            return Err(format!("falta el valor de {flag}"));
        };
        match flag {
            "--minecraft" => req.minecraft = PathBuf::from(value),
            "--srg" => req.srg = PathBuf::from(value),
            "--names" => req.mcp_names = PathBuf::from(value),
            "--patches" => req.patches = PathBuf::from(value),
            "--inject" => req.inject = Some(PathBuf::from(value)),
            "--at" => req.access_transformers.push(PathBuf::from(value)),
            "--at-dir" => req.at_source_dirs.push(PathBuf::from(value)),
            "--dep-bundle" => req.dependency_bundles.push(PathBuf::from(value)),
            "--cp" => req.classpath.push(PathBuf::from(value)),
            "--retromap" => {
                let mut parts = value.splitn(3, ':');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(name), Some(src), Some(replaced)) => req.source_sets.push(SourceSetDirs { name: name.to_string(),
                                                                                                    source_dir: src.into(),
                                                                                                    replaced_dir: replaced.into() }),
                    _ => return Err(format!("--retromap espera <set>:<src>:<replaced>, recibido '{value}'")),
                }
            }
            other => return Err(format!("opción desconocida {other}")),
        }
        i += 1;
    }
    for (name, path) in [("--minecraft", &req.minecraft), ("--srg", &req.srg), ("--names", &req.mcp_names), ("--patches", &req.patches)] {
        if path.as_os_str().is_empty() {
            return Err(format!("{name} es obligatorio"));
        }
    }
    Ok(req)
}

fn main() {
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
                                  .with(tracing_subscriber::fmt::layer().without_time())
                                  .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) != Some("setup") {
        eprintln!("{USAGE}");
        exit(2);
    }
    let request = match parse_request(&args[1..]) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[deobflow] {e}\n{USAGE}");
            exit(2);
        }
    };
    let cfg = match config() {
        Ok(c) => c.clone(),
        Err(e) => {
            eprintln!("[deobflow] {e}");
            exit(3);
        }
    };
    let mut events = match JsonlEventStore::new(&cfg.cache.events_dir()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[deobflow] event store: {e}");
            exit(5);
        }
    };
    match Driver::new(cfg).run(&request, &mut events) {
        Ok(outcome) => {
            println!("run={}", outcome.run_id);
            println!("dev binary: {}", outcome.dev_binary.display());
            println!("dev sources: {}", outcome.dev_sources.display());
            println!("recompiled: {}", outcome.recompiled.display());
            for (stage, dir) in &outcome.retromapped {
                println!("{stage}: {}", dir.display());
            }
        }
        Err(e) => {
            eprintln!("[deobflow] build failed: {e}");
            exit(5);
        }
    }
}

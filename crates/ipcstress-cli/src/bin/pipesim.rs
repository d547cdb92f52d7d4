//! `pipesim` - pipeline simulator for local runs and end-to-end tests.
//!
//! Stands in for any of the three real executables, inferring its role
//! from the flag set it is invoked with:
//!
//! - `-c <locals> -t <threads>`: cache service - validates the locals
//!   manifest and idles until signaled;
//! - `-n <segments> -p <port> -t <threads> -z <bytes>`: proxy service -
//!   binds its port and idles until signaled;
//! - `-p <port> -t <threads> -w <workload> -r <count>`: download client -
//!   "retrieves" files by copying them from the source directory into
//!   the results directory, round-robin over the workload entries.
//!
//! The simulator moves real bytes, so a full generate/run/verify round
//! trip works against it without the actual pipeline.

use std::collections::HashMap;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let flags = parse_flags(&args);

    let code = if flags.contains_key("-w") {
        run_download(&flags)
    } else if flags.contains_key("-z") {
        run_proxy(&flags)
    } else if flags.contains_key("-c") {
        run_cache(&flags)
    } else {
        eprintln!("pipesim: unrecognized flag set: {args:?}");
        2
    };
    std::process::exit(code);
}

fn parse_flags(args: &[String]) -> HashMap<String, String> {
    let mut flags = HashMap::new();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        if let Some(value) = iter.next() {
            flags.insert(flag.clone(), value.clone());
        }
    }
    flags
}

fn required<'a>(flags: &'a HashMap<String, String>, flag: &str) -> Result<&'a str, i32> {
    flags.get(flag).map(String::as_str).ok_or_else(|| {
        eprintln!("pipesim: missing required flag {flag}");
        2
    })
}

fn run_cache(flags: &HashMap<String, String>) -> i32 {
    let locals = match required(flags, "-c") {
        Ok(v) => v,
        Err(code) => return code,
    };
    match std::fs::read_to_string(locals) {
        Ok(content) => {
            println!(
                "pipesim cache: serving {} entries from {locals}",
                content.lines().filter(|l| !l.is_empty()).count()
            );
        }
        Err(e) => {
            eprintln!("pipesim cache: cannot read {locals}: {e}");
            return 1;
        }
    }
    idle()
}

fn run_proxy(flags: &HashMap<String, String>) -> i32 {
    let port: u16 = match required(flags, "-p").map(str::parse) {
        Ok(Ok(port)) => port,
        Ok(Err(e)) => {
            eprintln!("pipesim proxy: bad port: {e}");
            return 2;
        }
        Err(code) => return code,
    };
    let listener = match TcpListener::bind(("127.0.0.1", port)) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("pipesim proxy: cannot bind port {port}: {e}");
            return 1;
        }
    };
    println!("pipesim proxy: listening on port {port}");
    // Keep the socket for the process lifetime so a second proxy on the
    // same port fails, like the real service.
    let _listener = listener;
    idle()
}

fn run_download(flags: &HashMap<String, String>) -> i32 {
    let workload_path = match required(flags, "-w") {
        Ok(v) => v,
        Err(code) => return code,
    };
    let count: u64 = match required(flags, "-r").map(str::parse) {
        Ok(Ok(count)) => count,
        Ok(Err(e)) => {
            eprintln!("pipesim download: bad request count: {e}");
            return 2;
        }
        Err(code) => return code,
    };

    let workload = match std::fs::read_to_string(workload_path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("pipesim download: cannot read {workload_path}: {e}");
            return 1;
        }
    };
    let entries: Vec<&str> = workload.lines().filter(|l| !l.is_empty()).collect();
    if entries.is_empty() {
        eprintln!("pipesim download: empty workload file");
        return 1;
    }

    let mut delivered = 0u64;
    let mut not_found = 0u64;
    for i in 0..count {
        let url_path = entries[(i % entries.len() as u64) as usize];
        let relative = PathBuf::from(url_path.trim_start_matches('/'));
        let Some(basename) = relative.file_name() else {
            not_found += 1;
            continue;
        };
        let source = Path::new("ipcstress_files").join(basename);

        if let Some(parent) = relative.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("pipesim download: cannot create {}: {e}", parent.display());
                return 1;
            }
        }
        match std::fs::copy(&source, &relative) {
            Ok(_) => delivered += 1,
            Err(_) => not_found += 1,
        }
    }

    println!("pipesim download: {delivered} delivered, {not_found} not found");
    0
}

fn idle() -> i32 {
    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}

use clap::{CommandFactory, Parser};
use colored::*;
use std::io::Write;
use std::process;

use cobra::{read_lines, ConsoleSink, ScanConfig, ScanEngine};

#[derive(Parser, Debug)]
#[command(
    name = "cobra",
    version,
    about = "Web fuzzer for sensitive paths, code injection and reflected payloads",
    override_usage = "cobra <target>  <options>",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Quick scan:                     cobra http://target.com
  Polite scan (2s between hits):  cobra http://target.com -d 2
  Deeper crawl:                   cobra http://target.com -c 3
  With proxy (Burp):              cobra http://target.com --proxy http://127.0.0.1:8080
  Custom headers:                 cobra http://target.com -H \"Authorization: Bearer TOKEN\"
  Custom seed payloads:           cobra http://target.com -p ./payloads
  Scan from file:                 cobra -l targets.txt
  Dry-run test:                   cobra http://target.com --dry-run"
)]
pub struct Args {
    #[arg(required_unless_present_any = ["list", "config"])]
    pub target: Option<String>,

    #[arg(short = 'd', long, help = "Seconds to wait before every request")]
    pub delay: Option<f64>,

    #[arg(short = 'c', long, help = "Crawl depth")]
    pub crawl: Option<u32>,

    #[arg(long, help = "Request timeout in seconds for non-timing probes")]
    pub timeout: Option<u64>,

    #[arg(short = 'o', long, help = "Log file hits are appended to")]
    pub output: Option<String>,

    #[arg(long, help = "Proxy URL (e.g. http://127.0.0.1:8080)")]
    pub proxy: Option<String>,

    #[arg(short = 'H', long = "header", help = "Custom header (e.g. \"Authorization: Bearer TOKEN\")")]
    pub headers: Vec<String>,

    #[arg(short = 'p', long, help = "Directory of <category>.txt seed payload files")]
    pub payloads: Option<String>,

    #[arg(short = 'l', long = "list", help = "File containing target URLs (one per line)")]
    pub list: Option<String>,

    #[arg(long, help = "JSON scan config; flags given on the command line win")]
    pub config: Option<String>,

    #[arg(long, default_value_t = false, help = "Don't clear the terminal between phases")]
    pub no_clear: bool,

    #[arg(short = 'v', long, default_value_t = false, help = "Log skipped probes (Verbose Mode)")]
    pub verbose: bool,

    #[arg(long, help = "Simulate scan without sending real requests")]
    pub dry_run: bool,
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let args = Args::parse();

    let base = match args.config {
        Some(ref path) => match ScanConfig::from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprint!("{}\r\n", format!("[!] Failed to load config '{}': {}", path, e).red());
                process::exit(1);
            }
        },
        None => ScanConfig::default(),
    };
    let base = apply_args(base, &args);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&base))).init();

    let mut targets: Vec<String> = Vec::new();

    if let Some(ref list_path) = args.list {
        match read_lines(list_path) {
            Ok(lines) => {
                print!(
                    "{}\r\n",
                    format!("[+] Loaded {} target(s) from {}", lines.len(), list_path)
                        .green().bold()
                );
                std::io::stdout().flush().ok();
                targets.extend(lines);
            }
            Err(e) => {
                eprint!("{}\r\n", format!("[!] Failed to read '{}': {}", list_path, e).red());
                process::exit(1);
            }
        }
    }

    if let Some(ref t) = args.target {
        targets.push(t.clone());
    } else if targets.is_empty() && !base.target.is_empty() {
        targets.push(base.target.clone());
    }

    if targets.is_empty() {
        eprint!("{}\r\n", "[!] No targets specified. Provide a URL or use -l <file>.".red());
        let mut cmd = Args::command();
        cmd.print_help().ok();
        process::exit(1);
    }

    let total = targets.len();
    for (i, target) in targets.iter().enumerate() {
        if total > 1 {
            print!(
                "\r\n{}\r\n",
                format!("━━━ Target {}/{}: {} ━━━", i + 1, total, target)
                    .bright_white().bold()
            );
            std::io::stdout().flush().ok();
        }
        let config = ScanConfig {
            target: normalize_target(target),
            ..base.clone()
        };
        run_scan(config, args.dry_run).await;
    }
}

/// Command-line flags override whatever the config file said.
fn apply_args(mut config: ScanConfig, args: &Args) -> ScanConfig {
    if let Some(delay) = args.delay {
        config.delay = delay;
    }
    if let Some(crawl) = args.crawl {
        config.crawl = crawl;
    }
    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }
    if let Some(ref output) = args.output {
        config.output = output.clone();
    }
    if let Some(ref proxy) = args.proxy {
        config.proxy = proxy.clone();
    }
    if !args.headers.is_empty() {
        config.headers = args.headers.clone();
    }
    if let Some(ref payloads) = args.payloads {
        config.payloads = payloads.clone();
    }
    if args.no_clear {
        config.clear_screen = false;
    }
    config.verbose |= args.verbose;
    config
}

fn log_filter(config: &ScanConfig) -> &'static str {
    if config.verbose { "debug" } else { "warn" }
}

/// Bare hostnames are scanned over plain http.
fn normalize_target(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("http://{}", target)
    }
}

async fn run_scan(config: ScanConfig, dry_run: bool) {
    if dry_run {
        println!("[DRY RUN] Would scan target: {}", config.target);
        return;
    }

    print_scan_config(&config);

    let sink = ConsoleSink::new_ref(config.clear_screen);
    let engine = match ScanEngine::from_config(config, sink) {
        Ok(engine) => engine,
        Err(e) => {
            eprint!("{}\r\n", format!("[!] Failed to set up scanner: {}", e).red());
            return;
        }
    };

    if let Err(e) = engine.run_and_report().await {
        eprint!("{}\r\n", format!("[!] Failed to write '{}': {}", engine.config().output, e).red());
    }
    print!("{}\r\n", format!("[+] Requests sent: {}", engine.requests_sent()).blue());
    std::io::stdout().flush().ok();
}

/// Prints the scan configuration summary for a target.
fn print_scan_config(config: &ScanConfig) {
    print!("{}\r\n", format!("[+] Target:     {}", config.target).green().bold());
    print!("{}\r\n", format!("[+] Delay:      {}s", config.delay).blue());
    print!("{}\r\n", format!("[+] Crawl:      {}", config.crawl).blue());
    print!("{}\r\n", format!("[+] Timeout:    {}s", config.timeout).blue());
    print!("{}\r\n", format!("[+] Output:     {}", config.output).blue());
    if let Some(proxy) = config.proxy_ref() {
        print!("{}\r\n", format!("[+] Proxy:      {}", proxy).yellow());
    }
    if !config.header_list().is_empty() {
        print!("{}\r\n", format!("[+] Headers:    {} custom", config.header_list().len()).yellow());
    }
    if let Some(dir) = config.payloads_ref() {
        print!("{}\r\n", format!("[+] Payloads:   {}", dir).yellow());
    }
    print!("{}\r\n", "──────────────────────────────────────────────────".dimmed());
    std::io::stdout().flush().ok();
}

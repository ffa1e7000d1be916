use cf_cli::cc::{CloudControllerUserRepository, HttpGateway};
use cf_cli::CommandOutput;
use cf_core::config::{Config, LoggingConfig};

fn main() {
    cf_cli::set_version(env!("CARGO_PKG_VERSION"));
    let args: Vec<String> = std::env::args().skip(1).collect();

    let out = match run(&args) {
        Ok(out) => out,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    if !out.stdout.is_empty() {
        print!("{}", out.stdout);
    }
    if !out.stderr.is_empty() {
        eprint!("{}", out.stderr);
    }
    std::process::exit(out.exit_code);
}

fn run(args: &[String]) -> Result<CommandOutput, String> {
    // Logging comes first so config loading itself can be traced.
    let logging = LoggingConfig::from_lookup(|key| std::env::var(key).ok());
    let logged = cf_cli::init_logging(&logging);

    let config = if cf_cli::requires_session(args) {
        logged?;
        Config::load().map_err(|err| err.to_string())?
    } else {
        Config::default()
    };

    let gateway = HttpGateway::new(&config.access_token)?;
    let repo = CloudControllerUserRepository::from_config(gateway, &config);
    Ok(cf_cli::run_cli(args, &config, &repo))
}

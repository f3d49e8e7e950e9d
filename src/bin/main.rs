use std::{
    error::Error,
    io::{self, Write},
    process,
};

use serde_json::Value;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use npkg::{
    cli::{Cli, Commands, ConfigCommand, JobTarget, parse_args},
    client::{ServiceClient, StartOutcome},
    config::{DefaultsFile, Settings, display_value},
    error::ControlError,
    hash,
    install::Installer,
    interpolate::UnresolvedPolicy,
    job::{RunOption, RunRequest, StdioSpec},
    logs,
    package::{JsonManifestReader, PackageRef},
    resolver::{Invocation, JobResolver, runtime_dir},
    runner,
    show::{self, ShowFilter},
};

fn main() {
    let args = parse_args();
    init_logging(&args);

    if let Err(err) = dispatch(args) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout belongs to the job.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn build_settings(args: &Cli) -> Result<Settings, Box<dyn Error>> {
    let mut settings = Settings::from_env()?;
    if let Some(host) = &args.host {
        settings.host = host.clone();
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    settings.dry_run |= args.dry_run;
    if args.strict {
        settings.policy = UnresolvedPolicy::Reject;
    }
    debug!("Using supervisor at {}", settings.endpoint());
    Ok(settings)
}

fn dispatch(args: Cli) -> Result<(), Box<dyn Error>> {
    let settings = build_settings(&args)?;

    match args.command {
        Commands::Run { package } => {
            let job = resolver(&settings)?.resolve(&package)?;
            let code = runner::run(&job)?;
            process::exit(code);
        }
        Commands::Start { package, attach } => start(&settings, &package, attach)?,
        Commands::Stop(target) => {
            let key = job_key(&target)?;
            client(&settings)?.stop(&key)?;
            println!("stopped : {key}");
        }
        Commands::Attach(target) => {
            let key = job_key(&target)?;
            let stream = client(&settings)?.attach(&key)?;
            stream.pipe_to(&mut io::stdout().lock())?;
        }
        Commands::List => {
            let jobs = client(&settings)?.list()?;
            let mut out = io::stdout().lock();
            for (name, job) in jobs {
                writeln!(
                    out,
                    "{:<20} {:<10} {:<10} {:<10}",
                    name,
                    job.status.as_deref().unwrap_or("-"),
                    job.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                    job.respawn
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "-".into()),
                )?;
            }
        }
        Commands::Status(target) => {
            let key = job_key(&target)?;
            let detail = client(&settings)?.status(&key)?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        Commands::Logs { package, lines } => {
            let job = resolver(&settings)?.resolve(&package)?;
            let log_dir = runtime_dir(&job.env, &job.cwd, "LOGDIR")
                .ok_or_else(|| missing_log_dir(&package))?;
            let path = logs::log_path(&log_dir, &hash::identity(&package));
            if !logs::show_log(&path, lines, &mut io::stdout().lock())? {
                eprintln!("No log file for '{package}' at {}", path.display());
            }
        }
        Commands::Show { start, bin } => {
            let filter = if start {
                ShowFilter::Startable
            } else if bin {
                ShowFilter::WithBin
            } else {
                ShowFilter::All
            };
            let packages =
                show::installed_packages(&settings.paths().node_modules(), &JsonManifestReader)?;
            show::render(&packages, filter, &mut io::stdout().lock())?;
        }
        Commands::Config { name, action } => config(&settings, name.as_deref(), action)?,
        Commands::Install { package } => {
            let defaults = Installer::new(settings.paths()).install(&package)?;
            println!("installed : {package}");
            println!("config    : {}", defaults.display());
        }
    }

    Ok(())
}

fn resolver(settings: &Settings) -> Result<JobResolver, Box<dyn Error>> {
    Ok(JobResolver::new(settings, Invocation::capture()?))
}

fn client(settings: &Settings) -> Result<ServiceClient, ControlError> {
    Ok(ServiceClient::new(&settings.endpoint())?.dry_run(settings.dry_run))
}

fn job_key(target: &JobTarget) -> Result<String, Box<dyn Error>> {
    if target.key {
        if target.package.is_empty() {
            return Err("job key cannot be empty".into());
        }
        return Ok(target.package.clone());
    }
    let package = PackageRef::parse(&target.package)?;
    Ok(hash::identity(package.as_str()))
}

fn missing_log_dir(package: &str) -> String {
    format!("LOGDIR is not configured for '{package}' (try: npkg config set LOGDIR=<dir>)")
}

fn start(settings: &Settings, package: &str, attach: bool) -> Result<(), Box<dyn Error>> {
    let job = resolver(settings)?.resolve(package)?;
    let key = hash::identity(package);
    let log_dir =
        runtime_dir(&job.env, &job.cwd, "LOGDIR").ok_or_else(|| missing_log_dir(package))?;
    let log = logs::log_path(&log_dir, &key);

    let request = RunRequest::new(job, Some(StdioSpec::combined(log.clone())));
    let options = if attach {
        vec![RunOption::StreamStdio]
    } else {
        Vec::new()
    };

    let response = client(settings)?.start(&key, &request, &options)?;
    let mut out = io::stdout().lock();
    writeln!(out, "{}", response.outcome)?;
    response.body.pipe_to(&mut out)?;

    match response.outcome {
        StartOutcome::Started => {
            writeln!(out)?;
            writeln!(out, "started : {key}")?;
            writeln!(out, "logfile : {}", log.display())?;
            Ok(())
        }
        StartOutcome::DryRun => Ok(()),
        StartOutcome::Rejected => Err(format!("supervisor rejected '{package}'").into()),
        StartOutcome::Unknown(status) => Err(ControlError::UnexpectedStatus {
            operation: "start",
            status,
        }
        .into()),
    }
}

fn config(
    settings: &Settings,
    name: Option<&str>,
    action: ConfigCommand,
) -> Result<(), Box<dyn Error>> {
    let path = settings.paths().defaults_for(name);

    match action {
        ConfigCommand::Get { key } => {
            let file = DefaultsFile::load(&path);
            println!("{}", file.get(&key).map(display_value).unwrap_or_default());
        }
        ConfigCommand::Set { key, value } => {
            let (key, value) = ConfigCommand::key_value(&key, value.as_deref());
            if key.is_empty() {
                return Err("config key cannot be empty".into());
            }
            DefaultsFile::update(&path, |file| file.set(key, Value::String(value)))?;
        }
        ConfigCommand::Rm { key } => {
            if !DefaultsFile::update(&path, |file| file.remove(&key))? {
                warn!("'{key}' was not set in {:?}", path);
            }
        }
        ConfigCommand::List => {
            for key in DefaultsFile::load(&path).keys() {
                println!("{key}");
            }
        }
        ConfigCommand::Cat => {
            for (key, value) in DefaultsFile::load(&path).entries() {
                println!("{key}={}", display_value(value));
            }
        }
        ConfigCommand::Gen { package } => {
            for (key, value) in resolver(settings)?.environment(&package)? {
                println!("{key}={value}");
            }
        }
    }

    Ok(())
}

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Run,
    Once,
    Stop,
    Status,
    InitDb,
    Enqueue,
    SetParam,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "run" => CliVerb::Run,
        "once" => CliVerb::Once,
        "stop" => CliVerb::Stop,
        "status" => CliVerb::Status,
        "init-db" => CliVerb::InitDb,
        "enqueue" => CliVerb::Enqueue,
        "set-param" => CliVerb::SetParam,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub state_root: Option<PathBuf>,
    pub trace: bool,
}

pub fn split_global_options(args: Vec<String>) -> Result<(GlobalOptions, Vec<String>), String> {
    let mut options = GlobalOptions::default();
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--trace" => options.trace = true,
            "--state-root" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "`--state-root` requires a directory".to_string())?;
                options.state_root = Some(PathBuf::from(value));
            }
            _ => match arg.strip_prefix("--state-root=") {
                Some(value) => options.state_root = Some(PathBuf::from(value)),
                None => rest.push(arg),
            },
        }
    }
    Ok((options, rest))
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  run                                  Poll the folder create queue until stopped"
            .to_string(),
        "  once                                 Drain the queue once and exit".to_string(),
        "  stop                                 Ask a running manager to shut down".to_string(),
        "  status                               Show status file and queue counts".to_string(),
        "  init-db                              Create settings (if missing) and queue tables"
            .to_string(),
        "  enqueue <xml> | --file <path>        Queue a folder create command".to_string(),
        "  set-param <name> <value>             Store a manager parameter in the database"
            .to_string(),
        "  help                                 Show this help".to_string(),
        String::new(),
        "Options:".to_string(),
        "  --state-root <dir>                   State directory (default ~/.foldercreate)"
            .to_string(),
        "  --trace                              Log at debug level".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}

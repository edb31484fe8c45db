use crate::app::cli::{help_text, parse_cli_verb, split_global_options, CliVerb};

pub mod daemon;
pub mod queue;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let (options, args) = split_global_options(args)?;
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Run => daemon::cmd_run(&options),
        CliVerb::Once => daemon::cmd_once(&options),
        CliVerb::Stop => daemon::cmd_stop(&options),
        CliVerb::Status => daemon::cmd_status(&options),
        CliVerb::InitDb => queue::cmd_init_db(&options),
        CliVerb::Enqueue => queue::cmd_enqueue(&options, &args[1..]),
        CliVerb::SetParam => queue::cmd_set_param(&options, &args[1..]),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}

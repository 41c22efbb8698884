use crate::collectors::{COLLECTOR_NAMES, Collector, all_factories};
use clap::{Arg, ArgAction, Command};

/// Add `--collector.<name>` and `--no-collector.<name>` for every registered collector.
///
/// Each enable flag defaults to the collector's `enabled_by_default`; whichever of the pair
/// comes last on the command line wins.
pub fn add_collectors_args(cmd: Command) -> Command {
    let factories = all_factories();

    COLLECTOR_NAMES
        .iter()
        .flat_map(|&name| {
            let on = factories
                .get(name)
                .is_some_and(|factory| factory().enabled_by_default());
            collector_flags(name, on)
        })
        .fold(cmd, Command::arg)
}

// clap ids and help strings must be 'static; the set of collectors is fixed at build time.
fn leak(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

fn collector_flags(name: &'static str, enabled_by_default: bool) -> [Arg; 2] {
    let enable = leak(format!("collector.{name}"));
    let disable = leak(format!("no-collector.{name}"));
    let state = if enabled_by_default { "enabled" } else { "disabled" };

    [
        Arg::new(enable)
            .long(enable)
            .help(leak(format!("Enable the {name} collector [default: {state}]")))
            .action(ArgAction::SetTrue)
            .default_value(if enabled_by_default { "true" } else { "false" }),
        Arg::new(disable)
            .long(disable)
            .help(leak(format!("Disable the {name} collector")))
            .action(ArgAction::SetTrue)
            .overrides_with(enable),
    ]
}

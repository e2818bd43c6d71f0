use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::context::Theme;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubeterm",
    version,
    about = "Exec shells and live log streams for the Kubernetes dashboard gateway."
)]
pub struct CliArgs {
    /// Gateway base URL (overrides `server` from the config file)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Color theme (overrides `theme` from the config file)
    #[arg(long, value_enum, global = true)]
    pub theme: Option<Theme>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_filter: String,

    /// Runtime config file (default: KUBETERM_CONFIG, then kubeterm.yaml lookup)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of discarding them
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Open an interactive shell in a pod container
    Exec(PodArgs),
    /// Follow the logs of a pod container
    Logs(LogsArgs),
    /// Show the manifest and recent events of a resource
    Describe(DescribeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PodArgs {
    pub pod: String,

    #[arg(short, long)]
    pub namespace: Option<String>,

    #[arg(short, long)]
    pub container: Option<String>,

    /// kubeconfig context known to the gateway
    #[arg(long)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct LogsArgs {
    #[command(flatten)]
    pub pod: PodArgs,

    /// Start with timestamps hidden
    #[arg(long)]
    pub no_timestamps: bool,

    /// Start with line wrapping enabled
    #[arg(long)]
    pub wrap: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DescribeArgs {
    pub kind: String,
    pub name: String,

    #[arg(short, long)]
    pub namespace: Option<String>,

    #[arg(long)]
    pub context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{CliArgs, Command};
    use crate::context::Theme;
    use clap::Parser;

    #[test]
    fn exec_args_parse() {
        let args = CliArgs::try_parse_from([
            "kubeterm", "--server", "https://host", "exec", "web-1", "-n", "shop", "-c", "app",
            "--context", "prod",
        ])
        .expect("args");
        assert_eq!(args.server.as_deref(), Some("https://host"));
        let Command::Exec(pod) = args.command else {
            panic!("expected exec");
        };
        assert_eq!(pod.pod, "web-1");
        assert_eq!(pod.namespace.as_deref(), Some("shop"));
        assert_eq!(pod.container.as_deref(), Some("app"));
        assert_eq!(pod.context.as_deref(), Some("prod"));
    }

    #[test]
    fn logs_flags_and_global_options_parse_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "kubeterm", "logs", "web-1", "--no-timestamps", "--wrap", "--theme", "light",
        ])
        .expect("args");
        assert_eq!(args.theme, Some(Theme::Light));
        assert_eq!(args.log_filter, "info");
        let Command::Logs(logs) = args.command else {
            panic!("expected logs");
        };
        assert!(logs.no_timestamps);
        assert!(logs.wrap);
        assert_eq!(logs.pod.pod, "web-1");
    }

    #[test]
    fn describe_requires_kind_and_name() {
        assert!(CliArgs::try_parse_from(["kubeterm", "describe", "Pod"]).is_err());
        let args = CliArgs::try_parse_from(["kubeterm", "describe", "Node", "worker-1"])
            .expect("args");
        let Command::Describe(describe) = args.command else {
            panic!("expected describe");
        };
        assert_eq!(describe.kind, "Node");
        assert_eq!(describe.namespace, None);
    }
}

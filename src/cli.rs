use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "krill",
    version,
    about = "A terminal dashboard for browsing a live Kubernetes cluster."
)]
pub struct CliArgs {
    /// Refresh interval in milliseconds
    #[arg(long, default_value_t = 2_000)]
    pub refresh_ms: u64,

    /// Start in a specific namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Start with all namespaces selected
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Initial view command (for example: pods, deploy, ns)
    #[arg(short, long, default_value = "pods")]
    pub command: String,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn defaults_open_pods() {
        let args = CliArgs::parse_from(["krill"]);
        assert_eq!(args.refresh_ms, 2_000);
        assert_eq!(args.command, "pods");
        assert!(!args.all_namespaces);
        assert!(args.log_file.is_none());
    }

    #[test]
    fn short_flags_parse() {
        let args = CliArgs::parse_from(["krill", "-A", "-c", "deploy", "-n", "prod"]);
        assert!(args.all_namespaces);
        assert_eq!(args.command, "deploy");
        assert_eq!(args.namespace.as_deref(), Some("prod"));
    }
}

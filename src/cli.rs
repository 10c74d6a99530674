use clap::Parser;

/// Command line flags for the `mr-chord-server` binary.
#[derive(Parser, Debug)]
#[command(name = "mr-chord-server")]
pub struct ServerCli {
    /// gRPC address this node listens on and registers under in the
    /// directory, e.g. 127.0.0.1:5601.
    #[arg(long)]
    pub address: String,

    /// Address of an existing ring member to join through. Omit to start a
    /// brand-new singleton ring.
    #[arg(long)]
    pub peer: Option<String>,

    /// Optional ini config file overriding the built-in defaults.
    #[arg(long)]
    pub config: Option<String>,

    /// Enables debug-only RPCs (node summary, kv dump).
    #[arg(long, default_value_t = false)]
    pub dev_mode: bool,
}

/// Command line flags for the `mr-chord-client` binary.
#[derive(Parser, Debug)]
#[command(name = "mr-chord-client")]
pub struct ClientCli {
    /// Any live ring member to submit the job through.
    #[arg(long)]
    pub entry: String,

    /// Path to a newline-delimited input file; each line becomes one
    /// `(in_key, in_value)` pair keyed by its line number.
    #[arg(long)]
    pub input: String,

    /// Registered kernel id for the map phase.
    #[arg(long, default_value = "split_words")]
    pub map_kernel: String,

    /// Registered kernel id for the reduce phase.
    #[arg(long, default_value = "sum_counts")]
    pub reduce_kernel: String,
}

use clap::{Args, Parser, Subcommand};

/// aura — provision and tear down managed graph database instances for CI
#[derive(Parser, Debug)]
#[command(name = "aura", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Tenant and API client credentials shared by every command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    /// Tenant (project) that owns the instance
    #[arg(long, env = "AURA_TENANT_ID")]
    pub tenant_id: String,
    /// API client id
    #[arg(long, env = "AURA_CLIENT_ID")]
    pub client_id: String,
    /// API client secret
    #[arg(long, env = "AURA_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an instance, wait until it is running, print its connection settings
    Configure {
        #[command(flatten)]
        auth: AuthArgs,
        #[arg(long)]
        region: String,
        #[arg(long)]
        cloud_provider: String,
        #[arg(long, default_value = "gh-action-genai-workshop")]
        name: String,
        #[arg(long, default_value = "5")]
        version: String,
        #[arg(long, default_value = "8GB")]
        memory: String,
        #[arg(long = "type", default_value = "enterprise-ds")]
        instance_type: String,
        /// Seconds to wait for the instance to reach `running`
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Delete an instance (no-op if it no longer exists)
    Delete {
        #[command(flatten)]
        auth: AuthArgs,
        #[arg(long)]
        instance_id: String,
    },

    /// Print the current status of an instance
    Status {
        #[command(flatten)]
        auth: AuthArgs,
        #[arg(long)]
        instance_id: String,
    },
}

impl Commands {
    pub fn auth(&self) -> &AuthArgs {
        match self {
            Commands::Configure { auth, .. }
            | Commands::Delete { auth, .. }
            | Commands::Status { auth, .. } => auth,
        }
    }
}

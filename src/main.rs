#[macro_use]
extern crate tracing;

use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use clap::{ArgAction, Parser};
use k8s_test_operations::{
    Context, Operation,
    client::{Client, KubeClient},
    config::StepConfig,
    namespacer::DefaultNamespacer,
    operations::Delete,
};

/// Delete Kubernetes resources described by a test step and wait until they
/// are gone.
#[derive(Parser, Debug)]
#[command(rename_all = "kebab-case", version)]
struct Opts {
    /// Step file holding a `delete` operation.
    #[arg(short, long, env = "K8S_DELETE_CONFIG")]
    config: PathBuf,

    /// Namespace given to namespaced targets that don't set one.
    #[arg(short, long, default_value = "default", env = "K8S_DELETE_NAMESPACE")]
    namespace: String,

    /// Seconds to wait for the resources to be gone, overriding the step file.
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Enable more detailed logging. Repeat to increase level.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Reduce detail of logging. Repeat to reduce further.
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,
}

impl Opts {
    const fn log_level(&self) -> &'static str {
        match self.quiet {
            0 => match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            },
            1 => "warn",
            2 => "error",
            _ => "off",
        }
    }
}

fn init_tracing(levels: &str) {
    let levels = std::env::var("K8S_DELETE_LOG").unwrap_or_else(|_| {
        format!("k8s_test_operations={levels},k8s_delete={levels},kube=warn")
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(levels)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();
    init_tracing(opts.log_level());

    let step = match StepConfig::load(&opts.config) {
        Ok(step) => step,
        Err(error) => {
            error!(message = "Invalid step file.", %error);
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };
    let base_dir = opts
        .config
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    let targets = match step.delete.targets(&base_dir) {
        Ok(targets) => targets,
        Err(error) => {
            error!(message = "Invalid delete step.", %error);
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };

    let client: Arc<dyn Client> = match KubeClient::try_default().await {
        Ok(client) => Arc::new(client),
        Err(error) => {
            error!(message = "Unable to connect to the cluster.", %error);
            return ExitCode::from(exitcode::UNAVAILABLE as u8);
        }
    };
    let namespacer = Arc::new(DefaultNamespacer::new(
        opts.namespace.clone(),
        Arc::clone(&client),
    ));

    let timeout = opts
        .timeout
        .map_or(step.delete.timeout, Duration::from_secs);
    let ctx = Context::background().with_timeout(timeout);

    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling.");
            signal_ctx.cancel();
        }
    });

    for target in targets {
        let operation = Delete::new(Arc::clone(&client), target)
            .with_namespacer(Arc::clone(&namespacer) as _)
            .with_propagation(step.delete.deletion_propagation_policy);
        if operation.exec(&ctx).await.is_err() {
            // The failure itself has been logged by the operation.
            return ExitCode::from(exitcode::SOFTWARE as u8);
        }
    }

    ExitCode::SUCCESS
}
